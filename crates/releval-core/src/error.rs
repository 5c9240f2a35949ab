use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed line in {path} at line {line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },
}

impl LoadError {
    pub fn parse(path: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("{metric} is undefined for query {query_id}: {reason}")]
    Undefined {
        metric: &'static str,
        query_id: String,
        reason: &'static str,
    },

    #[error("{metric} is undefined for {} queries: {}", .queries.len(), .queries.join(","))]
    UndefinedInAggregate {
        metric: &'static str,
        queries: Vec<String>,
    },
}

impl MetricError {
    pub fn undefined(metric: &'static str, query_id: &str, reason: &'static str) -> Self {
        Self::Undefined {
            metric,
            query_id: query_id.to_string(),
            reason,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
