use releval_core::types::DuplicatePolicy;
use releval_core::{load_judgements, load_results};
use releval_eval::{EvaluationOptions, evaluate, render_text};

#[test]
fn judgements_without_relevant_items_leave_recall_undefined_everywhere() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let qrels_path = tmp.path().join("qrels");
    let results_path = tmp.path().join("index");
    std::fs::write(&qrels_path, "1\ta\t0\n2\tb\t2\n").unwrap();
    std::fs::write(&results_path, "1\ta\n1\tb\n2\tb\n").unwrap();

    let oracle = load_judgements(&qrels_path, DuplicatePolicy::KeepLast).expect("load qrels");
    let results = load_results(&results_path, DuplicatePolicy::KeepFirst).expect("load results");
    let report = evaluate(&oracle, &results, &EvaluationOptions::default()).expect("evaluate");

    assert_eq!(report.total_queries, 2);
    for query in &report.per_query {
        assert_eq!(query.precision, Some(0.0));
        assert_eq!(query.recall, None);
        assert_eq!(query.average_precision, None);
        assert!(query.undefined.iter().any(|name| name == "recall"));
        assert!(query.undefined.iter().any(|name| name == "average_precision"));
    }
    assert_eq!(report.aggregate.recall.value, None);
    assert_eq!(report.aggregate.mean_average_precision.queries, 0);

    let text = render_text(&report);
    assert!(text.contains("MAP:\tundefined\n"));
    assert!(text.contains("QUERIES WITH UNDEFINED METRICS:\t1,2\n"));
}

#[test]
fn repeated_judgement_uses_the_last_grade() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let qrels_path = tmp.path().join("qrels");
    let results_path = tmp.path().join("index");
    std::fs::write(&qrels_path, "1\ta\t0\n1\ta\t1\n1\tb\t1\n").unwrap();
    std::fs::write(&results_path, "1\ta\n1\tc\n1\ta\n").unwrap();

    let oracle = load_judgements(&qrels_path, DuplicatePolicy::KeepLast).expect("load qrels");
    let results = load_results(&results_path, DuplicatePolicy::KeepFirst).expect("load results");
    let report = evaluate(&oracle, &results, &EvaluationOptions::default()).expect("evaluate");

    let query = &report.per_query[0];
    assert_eq!(query.retrieved, 2);
    assert_eq!(query.relevant, 2);
    assert_eq!(query.precision, Some(0.5));
    assert_eq!(query.recall, Some(0.5));
    assert_eq!(query.average_precision, Some(1.0));
}
