//! Relevance judgements and the read-only oracle built from them.
//!
//! Judgement file format, one record per line, no header:
//!
//! ```text
//! <query_id>\t<item_suffix>\t<grade>
//! ```
//!
//! The item key is `query_id + item_suffix`. Only grade `1` counts as relevant.

use crate::error::LoadError;
use crate::input::{read_input, records, required_column};
use crate::types::{DuplicatePolicy, Judgement, item_key};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

const JUDGEMENT_COLUMNS: usize = 3;

/// Answers relevance questions for (query, item) pairs.
///
/// Judgements are keyed by query first, so two pairs whose joined item keys
/// happen to coincide never overwrite each other. Items without a judgement
/// are non-relevant. The oracle never changes after construction.
#[derive(Debug, Clone, Default)]
pub struct RelevanceOracle {
    by_query: BTreeMap<String, HashMap<String, Judgement>>,
    relevant_by_query: HashMap<String, usize>,
}

impl RelevanceOracle {
    pub fn from_judgements<I>(judgements: I, duplicates: DuplicatePolicy) -> Self
    where
        I: IntoIterator<Item = Judgement>,
    {
        let mut by_query: BTreeMap<String, HashMap<String, Judgement>> = BTreeMap::new();
        let mut duplicate_count = 0usize;

        for judgement in judgements {
            let items = by_query.entry(judgement.query_id.clone()).or_default();
            match items.entry(judgement.item_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(judgement);
                }
                Entry::Occupied(mut slot) => {
                    duplicate_count += 1;
                    if duplicates == DuplicatePolicy::KeepLast {
                        slot.insert(judgement);
                    }
                }
            }
        }

        if duplicate_count > 0 {
            warn!(
                duplicates = duplicate_count,
                policy = %duplicates,
                "duplicate judgements collapsed"
            );
        }

        let relevant_by_query = by_query
            .iter()
            .map(|(query_id, items)| {
                let relevant = items.values().filter(|j| j.is_relevant()).count();
                (query_id.clone(), relevant)
            })
            .collect();

        Self {
            by_query,
            relevant_by_query,
        }
    }

    /// True iff `item_id` has a judgement for `query_id` with the relevant grade.
    pub fn is_relevant(&self, query_id: &str, item_id: &str) -> bool {
        self.by_query
            .get(query_id)
            .and_then(|items| items.get(item_id))
            .is_some_and(Judgement::is_relevant)
    }

    /// Number of relevant judgements for `query_id`; the recall denominator.
    pub fn relevant_count(&self, query_id: &str) -> usize {
        self.relevant_by_query.get(query_id).copied().unwrap_or(0)
    }

    /// How many of `items` are relevant for `query_id`.
    pub fn relevant_count_in<S: AsRef<str>>(&self, query_id: &str, items: &[S]) -> usize {
        items
            .iter()
            .filter(|item| self.is_relevant(query_id, item.as_ref()))
            .count()
    }

    /// Query ids with at least one judgement, relevant or not.
    pub fn judged_queries(&self) -> impl Iterator<Item = &str> {
        self.by_query.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_query.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_query.is_empty()
    }
}

/// Parse judgement records from `text`. `source` names the input in diagnostics.
pub fn parse_judgements(
    source: &str,
    text: &str,
    duplicates: DuplicatePolicy,
) -> Result<RelevanceOracle, LoadError> {
    let mut judgements = Vec::new();
    for record in records(text) {
        if record.columns.len() != JUDGEMENT_COLUMNS {
            return Err(LoadError::parse(
                source,
                record.line,
                format!(
                    "expected {JUDGEMENT_COLUMNS} tab-separated columns, found {}",
                    record.columns.len()
                ),
            ));
        }
        let query_id = required_column(source, &record, 0, "query id")?;
        let suffix = required_column(source, &record, 1, "item id")?;
        let raw_grade = required_column(source, &record, 2, "relevance grade")?;
        let grade = raw_grade.trim().parse::<i64>().map_err(|_| {
            LoadError::parse(
                source,
                record.line,
                format!("relevance grade '{raw_grade}' is not an integer"),
            )
        })?;
        judgements.push(Judgement::new(query_id, item_key(query_id, suffix), grade));
    }

    let oracle = RelevanceOracle::from_judgements(judgements, duplicates);
    debug!(
        source,
        judgements = oracle.len(),
        queries = oracle.by_query.len(),
        "loaded judgements"
    );
    Ok(oracle)
}

/// Read and parse a judgement file. Any malformed line aborts the whole load.
pub fn load_judgements(
    path: &Path,
    duplicates: DuplicatePolicy,
) -> Result<RelevanceOracle, LoadError> {
    let text = read_input(path)?;
    parse_judgements(&path.display().to_string(), &text, duplicates)
}
