use crate::constants::RELEVANT_GRADE;
use serde::{Deserialize, Serialize};

/// Build the internal item key: the query id followed by the item suffix, no separator.
///
/// Both input files use this construction, so an item key is unique across queries.
pub fn item_key(query_id: &str, item_suffix: &str) -> String {
    let mut key = String::with_capacity(query_id.len() + item_suffix.len());
    key.push_str(query_id);
    key.push_str(item_suffix);
    key
}

/// Ground-truth relevance label for one (query, item) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    pub query_id: String,
    pub item_id: String,
    pub grade: i64,
}

impl Judgement {
    pub fn new(query_id: impl Into<String>, item_id: impl Into<String>, grade: i64) -> Self {
        Self {
            query_id: query_id.into(),
            item_id: item_id.into(),
            grade,
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.grade == RELEVANT_GRADE
    }
}

/// Which occurrence wins when a key appears more than once in an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    KeepFirst,
    KeepLast,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeepFirst => "keep_first",
            Self::KeepLast => "keep_last",
        }
    }

    pub fn parse_policy(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep_first" | "first" => Some(Self::KeepFirst),
            "keep_last" | "last" => Some(Self::KeepLast),
            _ => None,
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How undefined per-query values enter the aggregate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPolicy {
    /// Leave undefined values out of both the sum and the query count.
    #[default]
    Exclude,
    /// Fail the run as soon as any per-query value is undefined.
    Fail,
}

impl UndefinedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::Fail => "fail",
        }
    }

    pub fn parse_policy(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" | "skip" => Some(Self::Exclude),
            "fail" | "error" => Some(Self::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for UndefinedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    pub fn parse_format(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
