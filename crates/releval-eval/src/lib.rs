pub mod evaluate;
pub mod metrics;
pub mod report;

pub use evaluate::{
    AggregateMetrics, EvalError, EvaluationOptions, EvaluationReport, MeanCurve, MeanValue,
    aggregate, evaluate,
};
pub use metrics::{CurvePoint, JudgedRanking, QueryMetrics};
pub use report::{render, render_json, render_text};
