use anyhow::{Context, Result};
use releval_core::config::Config;
use releval_core::{load_judgements, load_results};
use releval_eval::{EvaluationOptions, evaluate, render};
use tracing::info;

/// Load both inputs, score every query and emit the report.
///
/// Both files are read completely before anything is written, so the output
/// path may safely point at one of the inputs.
pub fn run(config: &Config, to_stdout: bool) -> Result<()> {
    let qrels_path = config.qrels_path();
    let results_path = config.results_path();

    let oracle = load_judgements(&qrels_path, config.load.judgement_duplicates_typed())
        .context("failed to load relevance judgements")?;
    let results = load_results(&results_path, config.load.result_duplicates_typed())
        .context("failed to load retrieved results")?;
    info!(
        judgements = oracle.len(),
        queries = results.query_count(),
        items = results.item_count(),
        "inputs loaded"
    );

    let options = EvaluationOptions::from_config(config);
    let report = evaluate(&oracle, &results, &options).context("evaluation failed")?;
    let undefined = report.queries_with_undefined().count();
    if undefined > 0 {
        info!(
            queries = undefined,
            "some queries have undefined metrics; see the report"
        );
    }

    let rendered =
        render(&report, config.report.format_typed()).context("failed to render report")?;

    if to_stdout {
        print!("{rendered}");
        return Ok(());
    }

    let output_path = config.output_path();
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&output_path, rendered)
        .with_context(|| format!("failed to write report to {}", output_path.display()))?;
    println!("report: {}", output_path.display());
    Ok(())
}
