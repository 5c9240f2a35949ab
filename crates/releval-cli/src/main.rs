mod commands;

use clap::Parser;
use releval_core::config::Config;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Single-dash long flags accepted for compatibility with older invocations.
const LEGACY_FLAGS: [&str; 3] = ["qrels", "results", "output"];

#[derive(Parser)]
#[command(
    name = "releval",
    version,
    about = "Score ranked retrieval results against relevance judgements",
    long_about = "releval reads a relevance judgements file and a ranked results file, then\n\
        reports precision, recall, F1, precision at k, average precision and\n\
        recall-precision curves per query, followed by the mean over all queries.\n\n\
        Quick start:\n  \
        releval --qrels qrels.tsv --results run.tsv --output report.txt\n  \
        releval --qrels qrels.tsv --results run.tsv --format json --stdout"
)]
struct Cli {
    /// Enable verbose logging (set log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Path to config file (default: .releval.toml in the working directory)
    #[arg(long)]
    config: Option<String>,

    /// Relevance judgements file: <query>\t<item>\t<grade>
    #[arg(long)]
    qrels: Option<String>,

    /// Ranked results file: <query>\t<item>, in rank order
    #[arg(long)]
    results: Option<String>,

    /// Where the report is written
    #[arg(long)]
    output: Option<String>,

    /// Report format (text, json)
    #[arg(long)]
    format: Option<String>,

    /// Cutoff k for precision at k
    #[arg(long)]
    precision_cutoff: Option<usize>,

    /// Cutoff for average precision
    #[arg(long)]
    ap_cutoff: Option<usize>,

    /// What to do with undefined values in the mean (exclude, fail)
    #[arg(long)]
    undefined: Option<String>,

    /// Also score judged queries that have no retrieved items
    #[arg(long)]
    include_unretrieved: bool,

    /// Worker threads for scoring (0 = one per core)
    #[arg(long)]
    jobs: Option<usize>,

    /// Print the report to stdout instead of writing --output
    #[arg(long)]
    stdout: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(qrels) = &self.qrels {
            config.inputs.qrels = qrels.clone();
        }
        if let Some(results) = &self.results {
            config.inputs.results = results.clone();
        }
        if let Some(output) = &self.output {
            config.inputs.output = output.clone();
        }
        if let Some(format) = &self.format {
            config.report.format = format.clone();
        }
        if let Some(k) = self.precision_cutoff {
            config.metrics.precision_cutoff = k;
        }
        if let Some(k) = self.ap_cutoff {
            config.metrics.average_precision_cutoff = k;
        }
        if let Some(policy) = &self.undefined {
            config.metrics.undefined_policy = policy.clone();
        }
        if self.include_unretrieved {
            config.metrics.include_unretrieved = true;
        }
        if let Some(jobs) = self.jobs {
            config.runtime.parallelism = jobs;
        }
    }
}

/// Rewrite `-qrels path` and `-qrels=path` into their `--` forms.
fn normalize_legacy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            let Some(rest) = arg.strip_prefix('-') else {
                return arg;
            };
            if rest.starts_with('-') {
                return arg;
            }
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            if LEGACY_FLAGS.contains(&name) {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args()));

    let working_dir = std::env::current_dir()?;
    let config_file = cli.config.as_deref().map(Path::new);
    let mut config = Config::load_with_file(Some(&working_dir), config_file)?;

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli.apply_to(&mut config);
    config.normalize();

    commands::evaluate::run(&config, cli.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn legacy_single_dash_flags_are_rewritten() {
        let normalized = normalize_legacy_args(args(&[
            "releval",
            "-qrels",
            "q.tsv",
            "-results=r.tsv",
            "-output",
            "out",
            "-v",
            "--format",
            "json",
        ]));
        assert_eq!(
            normalized,
            args(&[
                "releval",
                "--qrels",
                "q.tsv",
                "--results=r.tsv",
                "--output",
                "out",
                "-v",
                "--format",
                "json",
            ])
        );
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::parse_from(normalize_legacy_args(args(&[
            "releval",
            "-qrels",
            "judged",
            "--precision-cutoff",
            "5",
            "--undefined",
            "fail",
            "--jobs",
            "2",
            "--include-unretrieved",
        ])));
        let mut config = Config::default();
        cli.apply_to(&mut config);
        config.normalize();

        assert_eq!(config.inputs.qrels, "judged");
        assert_eq!(config.inputs.results, "index");
        assert_eq!(config.metrics.precision_cutoff, 5);
        assert_eq!(config.metrics.undefined_policy, "fail");
        assert!(config.metrics.include_unretrieved);
        assert_eq!(config.runtime.parallelism, 2);
    }

    #[test]
    fn zero_cutoff_from_flags_falls_back_to_default() {
        let cli = Cli::parse_from(args(&["releval", "--ap-cutoff", "0"]));
        let mut config = Config::default();
        cli.apply_to(&mut config);
        config.normalize();
        assert_eq!(config.metrics.average_precision_cutoff, 45);
    }
}
