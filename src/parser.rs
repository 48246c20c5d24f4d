use crate::fetch::Page;
use crate::record::Promise;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// Load promise records from a file.
///
/// Three layouts are accepted:
/// - a JSON array of promises
/// - a search response object `{"promises": [...], "cursor": ...}`
/// - JSONL, one promise per line (blank lines and `#` comments skipped)
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Promise>, ParseError> {
    let content = fs::read_to_string(path)?;
    parse_records(&content)
}

pub fn parse_records(content: &str) -> Result<Vec<Promise>, ParseError> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let promises: Vec<Promise> = serde_json::from_str(trimmed).map_err(|e| ParseError::Json {
            line: e.line(),
            source: e,
        })?;
        warn_duplicate_ids(&promises);
        return Ok(promises);
    }

    // A single document that is not a promise is treated as a search response
    if trimmed.starts_with('{')
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed)
        && value.get("promises").is_some()
    {
        let page: Page = serde_json::from_value(value).map_err(|e| ParseError::Json {
            line: 1,
            source: e,
        })?;
        warn_duplicate_ids(&page.promises);
        return Ok(page.promises);
    }

    let mut promises = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let promise: Promise = serde_json::from_str(trimmed).map_err(|e| ParseError::Json {
            line: line_num + 1,
            source: e,
        })?;
        promises.push(promise);
    }

    warn_duplicate_ids(&promises);
    Ok(promises)
}

/// Log every id that occurs more than once. Returns the duplicated ids.
fn warn_duplicate_ids(promises: &[Promise]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for p in promises {
        if !seen.insert(p.id.as_str()) {
            tracing::warn!(id = %p.id, "duplicate promise id in input");
            duplicates.push(p.id.as_str());
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PromiseState;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let records = load_records(file.path()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_load_json_array() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"[{{"id":"a","state":"RESOLVED","createdOn":1}},{{"id":"a.1","state":"PENDING"}}]"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].created_on, Some(1));
        assert_eq!(records[1].state, PromiseState::Pending);
    }

    #[test]
    fn test_load_search_response() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"promises":[{{"id":"a","state":"REJECTED_TIMEDOUT"}}],"cursor":"next"}}"#
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, PromiseState::RejectedTimedout);
    }

    #[test]
    fn test_load_jsonl_skips_blank_lines_and_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# exported records").unwrap();
        writeln!(file, r#"{{"id":"a","state":"RESOLVED"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"id":"a.1","state":"SOMETHING_NEW"}}"#).unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].state, PromiseState::Unknown);
    }

    #[test]
    fn test_load_invalid_jsonl_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id":"a","state":"RESOLVED"}}"#).unwrap();
        writeln!(file, r#"{{"id":"a.1","state":"#).unwrap();

        match load_records(file.path()) {
            Err(ParseError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_nonexistent_file_returns_error() {
        let result = load_records("/nonexistent/records.json");
        assert!(matches!(result, Err(ParseError::Io(_))));
    }

    #[test]
    fn test_duplicate_ids_detected_in_every_layout() {
        let array = parse_records(r#"[{"id":"a"},{"id":"b"},{"id":"a"}]"#).unwrap();
        assert_eq!(warn_duplicate_ids(&array), vec!["a"]);

        let page = parse_records(r#"{"promises":[{"id":"x"},{"id":"x"}]}"#).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(warn_duplicate_ids(&page), vec!["x"]);

        let lines = parse_records("{\"id\":\"k\"}\n{\"id\":\"k\"}\n").unwrap();
        assert_eq!(warn_duplicate_ids(&lines), vec!["k"]);
        assert!(warn_duplicate_ids(&lines[..1]).is_empty());
    }

    #[test]
    fn test_single_promise_object_is_jsonl() {
        let records = parse_records(r#"{"id":"solo","state":"PENDING"}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "solo");
    }
}
