use crate::metrics::{self, CurvePoint, JudgedRanking, QueryMetrics};
use rayon::prelude::*;
use releval_core::config::Config;
use releval_core::constants::{
    DEFAULT_AVERAGE_PRECISION_CUTOFF, DEFAULT_PRECISION_CUTOFF, REPORT_VERSION,
};
use releval_core::error::MetricError;
use releval_core::types::UndefinedPolicy;
use releval_core::{RelevanceOracle, RetrievalSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Metric(#[from] MetricError),
    #[error("failed to build evaluation worker pool: {0}")]
    WorkerPool(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub precision_cutoff: usize,
    pub average_precision_cutoff: usize,
    pub undefined_policy: UndefinedPolicy,
    /// Also score judged queries that have no retrieved items.
    pub include_unretrieved: bool,
    /// Worker threads; 0 lets rayon pick.
    #[serde(skip)]
    pub parallelism: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            precision_cutoff: DEFAULT_PRECISION_CUTOFF,
            average_precision_cutoff: DEFAULT_AVERAGE_PRECISION_CUTOFF,
            undefined_policy: UndefinedPolicy::default(),
            include_unretrieved: false,
            parallelism: 0,
        }
    }
}

impl EvaluationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            precision_cutoff: config.metrics.precision_cutoff,
            average_precision_cutoff: config.metrics.average_precision_cutoff,
            undefined_policy: config.metrics.undefined_policy_typed(),
            include_unretrieved: config.metrics.include_unretrieved,
            parallelism: config.runtime.parallelism,
        }
    }
}

/// Mean of one metric over the queries where it is defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanValue {
    pub value: Option<f64>,
    /// Queries that contributed to `value`.
    pub queries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanCurve {
    pub points: Option<Vec<CurvePoint>>,
    pub queries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub precision: MeanValue,
    pub recall: MeanValue,
    pub f1: MeanValue,
    pub precision_at_k: MeanValue,
    pub mean_average_precision: MeanValue,
    pub recall_precision: MeanCurve,
    pub interpolated_precision: MeanCurve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub version: String,
    pub total_queries: usize,
    pub settings: EvaluationOptions,
    pub per_query: Vec<QueryMetrics>,
    pub aggregate: AggregateMetrics,
}

impl EvaluationReport {
    /// Queries with at least one undefined metric, in report order.
    pub fn queries_with_undefined(&self) -> impl Iterator<Item = &QueryMetrics> {
        self.per_query.iter().filter(|query| !query.is_fully_defined())
    }
}

/// Score every query and build the aggregate row.
///
/// Queries are the distinct ids in `retrievals`, plus judged queries without
/// results when `include_unretrieved` is set. Per-query work runs on a
/// dedicated rayon pool; the report is ordered by query id regardless.
pub fn evaluate(
    oracle: &RelevanceOracle,
    retrievals: &RetrievalSet,
    options: &EvaluationOptions,
) -> Result<EvaluationReport, EvalError> {
    let mut query_ids: BTreeSet<&str> = retrievals.queries().collect();
    if options.include_unretrieved {
        query_ids.extend(oracle.judged_queries());
    }
    let query_ids: Vec<&str> = query_ids.into_iter().collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.parallelism)
        .thread_name(|idx| format!("releval-eval-{idx}"))
        .build()
        .map_err(|err| EvalError::WorkerPool(err.to_string()))?;

    let by_query: BTreeMap<String, QueryMetrics> = pool.install(|| {
        query_ids
            .par_iter()
            .map(|query_id| {
                let ranking = JudgedRanking::new(query_id, retrievals.items_for(query_id), oracle);
                let scored = QueryMetrics::compute(
                    &ranking,
                    options.precision_cutoff,
                    options.average_precision_cutoff,
                );
                (query_id.to_string(), scored)
            })
            .collect()
    });
    let per_query: Vec<QueryMetrics> = by_query.into_values().collect();

    let aggregate = aggregate(&per_query, options.undefined_policy)?;
    debug!(
        queries = per_query.len(),
        threads = pool.current_num_threads(),
        "evaluation complete"
    );

    Ok(EvaluationReport {
        version: REPORT_VERSION.to_string(),
        total_queries: per_query.len(),
        settings: options.clone(),
        per_query,
        aggregate,
    })
}

/// Arithmetic means over per-query values.
///
/// With [`UndefinedPolicy::Exclude`] an undefined value is left out of both
/// the sum and the divisor. With [`UndefinedPolicy::Fail`] the first metric
/// that is undefined for any query aborts with the offending query ids.
pub fn aggregate(
    per_query: &[QueryMetrics],
    policy: UndefinedPolicy,
) -> Result<AggregateMetrics, MetricError> {
    if policy == UndefinedPolicy::Fail {
        ensure_defined(per_query, metrics::PRECISION, |q| q.precision.is_some())?;
        ensure_defined(per_query, metrics::RECALL, |q| q.recall.is_some())?;
        ensure_defined(per_query, metrics::F1, |q| q.f1.is_some())?;
        ensure_defined(per_query, metrics::PRECISION_AT_K, |q| q.precision_at_k.is_some())?;
        ensure_defined(per_query, metrics::AVERAGE_PRECISION, |q| {
            q.average_precision.is_some()
        })?;
        ensure_defined(per_query, metrics::RECALL_PRECISION, |q| q.recall_precision.is_some())?;
        ensure_defined(per_query, metrics::INTERPOLATED_PRECISION, |q| {
            q.interpolated_precision.is_some()
        })?;
    }

    let aggregate = AggregateMetrics {
        precision: mean_of(per_query.iter().map(|q| q.precision)),
        recall: mean_of(per_query.iter().map(|q| q.recall)),
        f1: mean_of(per_query.iter().map(|q| q.f1)),
        precision_at_k: mean_of(per_query.iter().map(|q| q.precision_at_k)),
        mean_average_precision: mean_of(per_query.iter().map(|q| q.average_precision)),
        recall_precision: mean_curve(per_query.iter().map(|q| q.recall_precision.as_deref())),
        interpolated_precision: mean_curve(
            per_query.iter().map(|q| q.interpolated_precision.as_deref()),
        ),
    };
    debug!(
        map_queries = aggregate.mean_average_precision.queries,
        curve_queries = aggregate.recall_precision.queries,
        "aggregated per-query metrics"
    );
    Ok(aggregate)
}

fn ensure_defined(
    per_query: &[QueryMetrics],
    metric: &'static str,
    is_defined: impl Fn(&QueryMetrics) -> bool,
) -> Result<(), MetricError> {
    let queries: Vec<String> = per_query
        .iter()
        .filter(|query| !is_defined(query))
        .map(|query| query.query_id.clone())
        .collect();
    if queries.is_empty() {
        Ok(())
    } else {
        Err(MetricError::UndefinedInAggregate { metric, queries })
    }
}

fn mean_of(values: impl Iterator<Item = Option<f64>>) -> MeanValue {
    let mut sum = 0.0;
    let mut queries = 0usize;
    for value in values.flatten() {
        sum += value;
        queries += 1;
    }
    MeanValue {
        value: (queries > 0).then(|| sum / queries as f64),
        queries,
    }
}

/// Pointwise mean of the defined curves. All curves of one kind share the
/// same recall levels.
fn mean_curve<'a>(curves: impl Iterator<Item = Option<&'a [CurvePoint]>>) -> MeanCurve {
    let mut sums: Vec<CurvePoint> = Vec::new();
    let mut queries = 0usize;
    for curve in curves.flatten() {
        if sums.is_empty() {
            sums = curve
                .iter()
                .map(|point| CurvePoint {
                    recall: point.recall,
                    precision: 0.0,
                })
                .collect();
        }
        for (sum, point) in sums.iter_mut().zip(curve) {
            sum.precision += point.precision;
        }
        queries += 1;
    }
    if queries == 0 {
        return MeanCurve {
            points: None,
            queries,
        };
    }
    for point in &mut sums {
        point.precision /= queries as f64;
    }
    MeanCurve {
        points: Some(sums),
        queries,
    }
}
