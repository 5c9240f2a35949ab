use crate::evaluate::{EvaluationReport, MeanCurve, MeanValue};
use crate::metrics::{CurvePoint, QueryMetrics};
use releval_core::constants::{INTERPOLATED_RECALL_LEVELS, RECALL_PRECISION_LEVELS};
use releval_core::types::ReportFormat;

const UNDEFINED: &str = "undefined";

pub fn render(
    report: &EvaluationReport,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => render_json(report),
    }
}

pub fn render_json(report: &EvaluationReport) -> Result<String, serde_json::Error> {
    let mut output = serde_json::to_string_pretty(report)?;
    output.push('\n');
    Ok(output)
}

/// Plain-text report: one block per query in id order, then the TOTAL block.
pub fn render_text(report: &EvaluationReport) -> String {
    let k = report.settings.precision_cutoff;
    let mut output = String::new();

    for query in &report.per_query {
        render_query(&mut output, query, k);
        output.push('\n');
    }

    let aggregate = &report.aggregate;
    output.push_str("TOTAL\n");
    output.push_str(&format!("QUERIES:\t{}\n", report.total_queries));
    output.push_str(&format!("PRECISION:\t{}\n", mean(&aggregate.precision)));
    output.push_str(&format!("RECALL:\t{}\n", mean(&aggregate.recall)));
    output.push_str(&format!("F1 SCORE:\t{}\n", mean(&aggregate.f1)));
    output.push_str(&format!("PREC@{k}:\t{}\n", mean(&aggregate.precision_at_k)));
    output.push_str(&format!("MAP:\t{}\n", mean(&aggregate.mean_average_precision)));
    output.push_str("RECALL-PRECISION\n");
    render_mean_curve(&mut output, &aggregate.recall_precision, &RECALL_PRECISION_LEVELS);
    output.push_str("INTERPOLATED RECALL PRECISION\n");
    render_mean_curve(
        &mut output,
        &aggregate.interpolated_precision,
        &INTERPOLATED_RECALL_LEVELS,
    );

    let undefined: Vec<&str> = report
        .queries_with_undefined()
        .map(|query| query.query_id.as_str())
        .collect();
    if !undefined.is_empty() {
        output.push_str(&format!(
            "QUERIES WITH UNDEFINED METRICS:\t{}\n",
            undefined.join(",")
        ));
    }
    output
}

fn render_query(output: &mut String, query: &QueryMetrics, k: usize) {
    output.push_str(&format!("INFO NEED {}\n", query.query_id));
    output.push_str(&format!("PRECISION:\t{}\n", value(query.precision)));
    output.push_str(&format!("RECALL:\t{}\n", value(query.recall)));
    output.push_str(&format!("F1 SCORE:\t{}\n", value(query.f1)));
    output.push_str(&format!("PREC@{k}:\t{}\n", value(query.precision_at_k)));
    output.push_str(&format!("AVERAGE_PRECISION:\t{}\n", value(query.average_precision)));
    output.push_str("RECALL-PRECISION\n");
    render_curve(output, query.recall_precision.as_deref(), &RECALL_PRECISION_LEVELS);
    output.push_str("INTERPOLATED RECALL PRECISION\n");
    render_curve(
        output,
        query.interpolated_precision.as_deref(),
        &INTERPOLATED_RECALL_LEVELS,
    );
    if !query.undefined.is_empty() {
        output.push_str(&format!("UNDEFINED:\t{}\n", query.undefined.join(",")));
    }
}

fn render_mean_curve(output: &mut String, curve: &MeanCurve, levels: &[f64]) {
    render_curve(output, curve.points.as_deref(), levels);
}

fn render_curve(output: &mut String, curve: Option<&[CurvePoint]>, levels: &[f64]) {
    match curve {
        Some(points) => {
            for point in points {
                output.push_str(&format!("{:.1}\t{:.4}\n", point.recall, point.precision));
            }
        }
        None => {
            for recall in levels {
                output.push_str(&format!("{recall:.1}\t{UNDEFINED}\n"));
            }
        }
    }
}

fn value(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED.to_string(), |v| format!("{v:.4}"))
}

fn mean(mean: &MeanValue) -> String {
    value(mean.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{EvaluationOptions, evaluate};
    use releval_core::types::DuplicatePolicy;
    use releval_core::{parse_judgements, parse_results};

    fn sample_report() -> EvaluationReport {
        let oracle =
            parse_judgements("qrels", "1\ta\t1\n1\tc\t1\n", DuplicatePolicy::KeepLast).unwrap();
        let results = parse_results(
            "index",
            "1\ta\n1\tb\n1\tc\n2\tx\n",
            DuplicatePolicy::KeepFirst,
        )
        .unwrap();
        evaluate(&oracle, &results, &EvaluationOptions::default()).unwrap()
    }

    #[test]
    fn text_report_lists_queries_then_total() {
        let text = render_text(&sample_report());

        let first = text.find("INFO NEED 1").unwrap();
        let second = text.find("INFO NEED 2").unwrap();
        let total = text.find("TOTAL").unwrap();
        assert!(first < second && second < total);

        assert!(text.contains("PRECISION:\t0.6667\n"));
        assert!(text.contains("RECALL:\t1.0000\n"));
        assert!(text.contains("PREC@10:\t0.2000\n"));
        assert!(text.contains("AVERAGE_PRECISION:\t0.8333\n"));
        assert!(text.contains("0.5\t1.0000\n"));
        assert!(text.contains("MAP:\t0.8333\n"));
    }

    #[test]
    fn undefined_values_render_as_word() {
        let text = render_text(&sample_report());
        let block = &text[text.find("INFO NEED 2").unwrap()..text.find("TOTAL").unwrap()];

        assert!(block.contains("RECALL:\tundefined\n"));
        assert!(block.contains("0.0\tundefined\n"));
        assert!(block.contains("1.0\tundefined\n"));
        assert!(block.contains("UNDEFINED:\trecall,f1,average_precision"));
        assert!(text.contains("QUERIES WITH UNDEFINED METRICS:\t2\n"));
    }

    #[test]
    fn json_report_carries_settings_and_nulls() {
        let json = render(&sample_report(), ReportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["version"], "releval-report-v1");
        assert_eq!(parsed["settings"]["precision_cutoff"], 10);
        assert_eq!(parsed["settings"]["undefined_policy"], "exclude");
        assert_eq!(parsed["per_query"][1]["recall"], serde_json::Value::Null);
        assert_eq!(parsed["aggregate"]["recall"]["queries"], 1);
    }
}
