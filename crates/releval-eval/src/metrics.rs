//! Per-query effectiveness metrics.
//!
//! Every function works on one query's ranking in the order the system under
//! test returned it; nothing here re-sorts. A metric whose denominator is
//! structurally zero returns [`MetricError::Undefined`] instead of NaN.

use releval_core::RelevanceOracle;
use releval_core::constants::{INTERPOLATED_RECALL_LEVELS, RECALL_PRECISION_LEVELS};
use releval_core::error::MetricError;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PRECISION: &str = "precision";
pub const RECALL: &str = "recall";
pub const F1: &str = "f1";
pub const PRECISION_AT_K: &str = "precision_at_k";
pub const AVERAGE_PRECISION: &str = "average_precision";
pub const RECALL_PRECISION: &str = "recall_precision";
pub const INTERPOLATED_PRECISION: &str = "interpolated_precision";

/// One query's ranking with the relevance of every position resolved.
#[derive(Debug, Clone)]
pub struct JudgedRanking<'a> {
    pub query_id: &'a str,
    /// `hits[i]` is true when the item at rank `i + 1` is relevant.
    pub hits: Vec<bool>,
    /// Relevant judgements for the query, retrieved or not.
    pub relevant_total: usize,
    pub relevant_retrieved: usize,
}

impl<'a> JudgedRanking<'a> {
    pub fn new(query_id: &'a str, items: &[String], oracle: &RelevanceOracle) -> Self {
        Self {
            query_id,
            hits: items
                .iter()
                .map(|item| oracle.is_relevant(query_id, item))
                .collect(),
            relevant_total: oracle.relevant_count(query_id),
            relevant_retrieved: oracle.relevant_count_in(query_id, items),
        }
    }

    pub fn from_hits(query_id: &'a str, hits: Vec<bool>, relevant_total: usize) -> Self {
        let relevant_retrieved = hits.iter().filter(|hit| **hit).count();
        Self {
            query_id,
            hits,
            relevant_total,
            relevant_retrieved,
        }
    }

    pub fn retrieved(&self) -> usize {
        self.hits.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub recall: f64,
    pub precision: f64,
}

pub fn precision(ranking: &JudgedRanking<'_>) -> Result<f64, MetricError> {
    if ranking.hits.is_empty() {
        return Err(MetricError::undefined(
            PRECISION,
            ranking.query_id,
            "no items retrieved",
        ));
    }
    Ok(ranking.relevant_retrieved as f64 / ranking.retrieved() as f64)
}

pub fn recall(ranking: &JudgedRanking<'_>) -> Result<f64, MetricError> {
    if ranking.relevant_total == 0 {
        return Err(MetricError::undefined(
            RECALL,
            ranking.query_id,
            "no relevant judgements",
        ));
    }
    Ok(ranking.relevant_retrieved as f64 / ranking.relevant_total as f64)
}

/// Harmonic mean of precision and recall.
pub fn f1_score(
    query_id: &str,
    precision: Option<f64>,
    recall: Option<f64>,
) -> Result<f64, MetricError> {
    let (Some(p), Some(r)) = (precision, recall) else {
        return Err(MetricError::undefined(
            F1,
            query_id,
            "precision or recall is undefined",
        ));
    };
    if p + r <= 0.0 {
        return Err(MetricError::undefined(
            F1,
            query_id,
            "precision and recall are both zero",
        ));
    }
    Ok(2.0 * p * r / (p + r))
}

/// Relevant items among the first `k`, divided by `k`.
///
/// The denominator stays `k` when fewer than `k` items were retrieved, so a
/// short ranking lowers the score instead of being padded.
pub fn precision_at_k(ranking: &JudgedRanking<'_>, k: usize) -> Result<f64, MetricError> {
    if k == 0 {
        return Err(MetricError::undefined(
            PRECISION_AT_K,
            ranking.query_id,
            "cutoff is zero",
        ));
    }
    let found = ranking.hits.iter().take(k).filter(|hit| **hit).count();
    Ok(found as f64 / k as f64)
}

/// Mean of the precision values at each relevant rank within the first `k`.
pub fn average_precision(ranking: &JudgedRanking<'_>, k: usize) -> Result<f64, MetricError> {
    let mut found = 0usize;
    let mut sum = 0.0;
    for (idx, hit) in ranking.hits.iter().take(k).enumerate() {
        if *hit {
            found += 1;
            sum += found as f64 / (idx + 1) as f64;
        }
    }
    if found == 0 {
        return Err(MetricError::undefined(
            AVERAGE_PRECISION,
            ranking.query_id,
            "no relevant item within cutoff",
        ));
    }
    Ok(sum / found as f64)
}

/// Precision at the first rank whose recall reaches each level of
/// [`RECALL_PRECISION_LEVELS`]; 0.0 for levels never reached.
pub fn recall_precision_curve(ranking: &JudgedRanking<'_>) -> Result<Vec<CurvePoint>, MetricError> {
    if ranking.relevant_total == 0 {
        return Err(MetricError::undefined(
            RECALL_PRECISION,
            ranking.query_id,
            "no relevant judgements",
        ));
    }
    Ok(RECALL_PRECISION_LEVELS
        .iter()
        .map(|&level| CurvePoint {
            recall: level,
            precision: precision_reaching_recall(&ranking.hits, ranking.relevant_total, level),
        })
        .collect())
}

/// Highest precision over all ranks whose recall is at least each level of
/// [`INTERPOLATED_RECALL_LEVELS`]. Non-increasing in recall.
pub fn interpolated_precision_curve(
    ranking: &JudgedRanking<'_>,
) -> Result<Vec<CurvePoint>, MetricError> {
    if ranking.relevant_total == 0 {
        return Err(MetricError::undefined(
            INTERPOLATED_PRECISION,
            ranking.query_id,
            "no relevant judgements",
        ));
    }
    Ok(INTERPOLATED_RECALL_LEVELS
        .iter()
        .map(|&level| CurvePoint {
            recall: level,
            precision: max_precision_from_recall(&ranking.hits, ranking.relevant_total, level),
        })
        .collect())
}

fn precision_reaching_recall(hits: &[bool], relevant_total: usize, level: f64) -> f64 {
    let mut found = 0usize;
    for (idx, hit) in hits.iter().enumerate() {
        if *hit {
            found += 1;
        }
        if found as f64 / relevant_total as f64 >= level {
            return found as f64 / (idx + 1) as f64;
        }
    }
    0.0
}

fn max_precision_from_recall(hits: &[bool], relevant_total: usize, level: f64) -> f64 {
    let mut found = 0usize;
    let mut best = 0.0f64;
    for (idx, hit) in hits.iter().enumerate() {
        if *hit {
            found += 1;
        }
        if found as f64 / relevant_total as f64 >= level {
            best = best.max(found as f64 / (idx + 1) as f64);
        }
    }
    best
}

/// All metrics for one query. Built once; undefined values are `None` and
/// their names are listed in `undefined`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub query_id: String,
    pub retrieved: usize,
    pub relevant: usize,
    pub relevant_retrieved: usize,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub precision_at_k: Option<f64>,
    pub average_precision: Option<f64>,
    pub recall_precision: Option<Vec<CurvePoint>>,
    pub interpolated_precision: Option<Vec<CurvePoint>>,
    #[serde(default)]
    pub undefined: Vec<String>,
}

impl QueryMetrics {
    pub fn compute(
        ranking: &JudgedRanking<'_>,
        precision_cutoff: usize,
        average_precision_cutoff: usize,
    ) -> Self {
        let mut undefined = Vec::new();
        let mut keep = |result: Result<f64, MetricError>| record(result, &mut undefined);

        let precision = keep(precision(ranking));
        let recall = keep(recall(ranking));
        let f1 = keep(f1_score(ranking.query_id, precision, recall));
        let precision_at_k = keep(precision_at_k(ranking, precision_cutoff));
        let average_precision = keep(average_precision(ranking, average_precision_cutoff));
        let recall_precision = record(recall_precision_curve(ranking), &mut undefined);
        let interpolated_precision = record(interpolated_precision_curve(ranking), &mut undefined);

        if !undefined.is_empty() {
            debug!(
                query_id = ranking.query_id,
                undefined = %undefined.join(","),
                "metrics undefined for query"
            );
        }

        Self {
            query_id: ranking.query_id.to_string(),
            retrieved: ranking.retrieved(),
            relevant: ranking.relevant_total,
            relevant_retrieved: ranking.relevant_retrieved,
            precision,
            recall,
            f1,
            precision_at_k,
            average_precision,
            recall_precision,
            interpolated_precision,
            undefined,
        }
    }

    pub fn is_fully_defined(&self) -> bool {
        self.undefined.is_empty()
    }
}

fn record<T>(result: Result<T, MetricError>, undefined: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(
            MetricError::Undefined { metric, .. }
            | MetricError::UndefinedInAggregate { metric, .. },
        ) => {
            undefined.push(metric.to_string());
            None
        }
    }
}
