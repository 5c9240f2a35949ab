use crate::error::LoadError;
use std::path::Path;

/// One non-blank line of a tab-delimited input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record<'a> {
    /// 1-based line number in the source file.
    pub line: usize,
    pub columns: Vec<&'a str>,
}

pub(crate) fn read_input(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Split `text` into tab-separated records, skipping blank lines and stripping `\r`.
pub(crate) fn records(text: &str) -> impl Iterator<Item = Record<'_>> {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            return None;
        }
        Some(Record {
            line: idx + 1,
            columns: line.split('\t').collect(),
        })
    })
}

/// Column `idx` exactly as written, or a parse error naming `field` when it is
/// missing or blank. Ids are compared byte for byte, so whitespace is kept.
pub(crate) fn required_column<'a>(
    source: &str,
    record: &Record<'a>,
    idx: usize,
    field: &str,
) -> Result<&'a str, LoadError> {
    match record.columns.get(idx) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LoadError::parse(
            source,
            record.line,
            format!("empty {field} in column {}", idx + 1),
        )),
    }
}
