//! Ranked retrieval output of the system under test.
//!
//! Results file format, one record per line, no header:
//!
//! ```text
//! <query_id>\t<item_suffix>[\t<ignored>...]
//! ```
//!
//! Line order within a query is rank order.

use crate::error::LoadError;
use crate::input::{read_input, records, required_column};
use crate::types::{DuplicatePolicy, item_key};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

const MIN_RESULT_COLUMNS: usize = 2;

/// Ranked item ids per query, exactly in input order.
#[derive(Debug, Clone, Default)]
pub struct RetrievalSet {
    by_query: BTreeMap<String, Vec<String>>,
}

impl RetrievalSet {
    /// Build from `(query_id, item_id)` pairs in rank order.
    pub fn from_ranked<I>(items: I, duplicates: DuplicatePolicy) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut by_query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (query_id, item_id) in items {
            by_query.entry(query_id).or_default().push(item_id);
        }

        let mut duplicate_count = 0usize;
        for ranking in by_query.values_mut() {
            let before = ranking.len();
            *ranking = collapse_duplicates(std::mem::take(ranking), duplicates);
            duplicate_count += before - ranking.len();
        }

        if duplicate_count > 0 {
            warn!(
                duplicates = duplicate_count,
                policy = %duplicates,
                "duplicate retrieved items collapsed"
            );
        }

        Self { by_query }
    }

    /// Distinct query ids, ordered by id.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.by_query.keys().map(String::as_str)
    }

    /// Rank-ordered items for `query_id`; empty for an unknown query.
    pub fn items_for(&self, query_id: &str) -> &[String] {
        self.by_query
            .get(query_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn query_count(&self) -> usize {
        self.by_query.len()
    }

    pub fn item_count(&self) -> usize {
        self.by_query.values().map(Vec::len).sum()
    }
}

fn collapse_duplicates(ranking: Vec<String>, duplicates: DuplicatePolicy) -> Vec<String> {
    let mut seen = HashSet::new();
    match duplicates {
        DuplicatePolicy::KeepFirst => ranking
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect(),
        DuplicatePolicy::KeepLast => {
            let mut kept: Vec<String> = ranking
                .into_iter()
                .rev()
                .filter(|item| seen.insert(item.clone()))
                .collect();
            kept.reverse();
            kept
        }
    }
}

/// Parse retrieved-results records from `text`. `source` names the input in diagnostics.
pub fn parse_results(
    source: &str,
    text: &str,
    duplicates: DuplicatePolicy,
) -> Result<RetrievalSet, LoadError> {
    let mut ranked = Vec::new();
    for record in records(text) {
        if record.columns.len() < MIN_RESULT_COLUMNS {
            return Err(LoadError::parse(
                source,
                record.line,
                format!(
                    "expected at least {MIN_RESULT_COLUMNS} tab-separated columns, found {}",
                    record.columns.len()
                ),
            ));
        }
        let query_id = required_column(source, &record, 0, "query id")?;
        let suffix = required_column(source, &record, 1, "item id")?;
        ranked.push((query_id.to_string(), item_key(query_id, suffix)));
    }

    let set = RetrievalSet::from_ranked(ranked, duplicates);
    debug!(
        source,
        queries = set.query_count(),
        items = set.item_count(),
        "loaded retrieved results"
    );
    Ok(set)
}

/// Read and parse a results file. Any malformed line aborts the whole load.
pub fn load_results(path: &Path, duplicates: DuplicatePolicy) -> Result<RetrievalSet, LoadError> {
    let text = read_input(path)?;
    parse_results(&path.display().to_string(), &text, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_input_order_per_query() {
        let set = parse_results(
            "index",
            "q2\tz\nq1\tc\tscore=3\nq1\ta\nq2\ty\nq1\tb\n",
            DuplicatePolicy::KeepFirst,
        )
        .unwrap();

        let queries: Vec<&str> = set.queries().collect();
        assert_eq!(queries, vec!["q1", "q2"]);
        assert_eq!(set.items_for("q1"), ["q1c", "q1a", "q1b"]);
        assert_eq!(set.items_for("q2"), ["q2z", "q2y"]);
        assert_eq!(set.item_count(), 5);
    }

    #[test]
    fn unknown_query_yields_empty_ranking() {
        let set = parse_results("index", "q1\ta\n", DuplicatePolicy::KeepFirst).unwrap();
        assert!(set.items_for("q404").is_empty());
        assert_eq!(set.query_count(), 1);
    }

    #[test]
    fn keep_first_holds_the_original_rank() {
        let set = parse_results(
            "index",
            "q1\ta\nq1\tb\nq1\ta\nq1\tc\n",
            DuplicatePolicy::KeepFirst,
        )
        .unwrap();
        assert_eq!(set.items_for("q1"), ["q1a", "q1b", "q1c"]);
    }

    #[test]
    fn keep_last_moves_the_item_to_its_last_rank() {
        let set = parse_results(
            "index",
            "q1\ta\nq1\tb\nq1\ta\nq1\tc\nq1\tb\n",
            DuplicatePolicy::KeepLast,
        )
        .unwrap();
        assert_eq!(set.items_for("q1"), ["q1a", "q1c", "q1b"]);
    }

    #[test]
    fn single_column_line_aborts_with_line_number() {
        let err = parse_results("index", "q1\ta\nq1\n", DuplicatePolicy::KeepFirst)
            .expect_err("one column must fail");
        match err {
            LoadError::Parse { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("found 1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn padded_ids_are_distinct() {
        let set = parse_results("index", "q1\ta\nq1 \ta\nq1\ta \n", DuplicatePolicy::KeepFirst)
            .unwrap();
        assert_eq!(set.query_count(), 2);
        assert_eq!(set.items_for("q1"), ["q1a", "q1a "]);
        assert_eq!(set.items_for("q1 "), ["q1 a"]);
    }
}
