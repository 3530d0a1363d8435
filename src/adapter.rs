//! Event log adapter
//!
//! Parses the window logger's tabular output (CSV or NDJSON) into an
//! `EventLog`. Rows with a missing or blank title, or a timestamp that cannot
//! be parsed, are dropped and counted rather than coerced.

use crate::error::PipelineError;
use crate::types::{Event, EventLog};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Timestamp column name in the logger's CSV header
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Window title column name in the logger's CSV header
pub const TITLE_COLUMN: &str = "Window_Title";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Supported input encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    #[default]
    Csv,
    Ndjson,
}

/// Row accounting for a parsed input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterStats {
    /// Data rows seen (header excluded)
    pub total_rows: usize,
    /// Rows kept in the event log
    pub retained_rows: usize,
    /// Rows dropped for a missing or blank title
    pub missing_title: usize,
    /// Rows dropped for a missing or unparseable timestamp
    pub bad_timestamp: usize,
    /// Rows whose fields were not valid UTF-8, or NDJSON lines that were
    /// not JSON objects
    pub malformed_records: usize,
}

impl AdapterStats {
    pub fn dropped_rows(&self) -> usize {
        self.total_rows - self.retained_rows
    }
}

/// Parse a timestamp in any of the logger's accepted layouts.
///
/// RFC 3339 values keep their local wall-clock time; the offset is discarded
/// because every temporal feature is defined on local time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Read an event log from disk
pub fn load_event_log(
    path: &Path,
    format: InputFormat,
) -> Result<(EventLog, AdapterStats), PipelineError> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    parse_event_bytes(&data, format)
}

/// Parse an in-memory event log
pub fn parse_event_log(
    data: &str,
    format: InputFormat,
) -> Result<(EventLog, AdapterStats), PipelineError> {
    parse_event_bytes(data.as_bytes(), format)
}

/// Parse raw input bytes.
///
/// Fields are decoded per row, so a title with invalid UTF-8 drops only its
/// own row.
pub fn parse_event_bytes(
    data: &[u8],
    format: InputFormat,
) -> Result<(EventLog, AdapterStats), PipelineError> {
    let (log, stats) = match format {
        InputFormat::Csv => parse_csv(data)?,
        InputFormat::Ndjson => parse_ndjson(data),
    };

    if stats.dropped_rows() > 0 {
        log::warn!(
            "dropped {} of {} input rows ({} missing title, {} bad timestamp, {} malformed)",
            stats.dropped_rows(),
            stats.total_rows,
            stats.missing_title,
            stats.bad_timestamp,
            stats.malformed_records
        );
    }
    log::info!("loaded {} events", log.len());
    Ok((log, stats))
}

fn parse_csv(data: &[u8]) -> Result<(EventLog, AdapterStats), PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers = reader.byte_headers()?.clone();
    let timestamp_idx = find_column(&headers, TIMESTAMP_COLUMN)?;
    let title_idx = find_column(&headers, TITLE_COLUMN)?;

    let mut stats = AdapterStats::default();
    let mut events = Vec::new();

    for record in reader.byte_records() {
        let record = record?;
        stats.total_rows += 1;

        let raw_timestamp = record.get(timestamp_idx).map(std::str::from_utf8);
        let raw_title = record.get(title_idx).map(std::str::from_utf8);
        let (raw_timestamp, raw_title) = match (raw_timestamp.transpose(), raw_title.transpose()) {
            (Ok(ts), Ok(title)) => (ts, title),
            _ => {
                stats.malformed_records += 1;
                continue;
            }
        };

        if let Some(event) = build_event(raw_timestamp, raw_title, &mut stats) {
            events.push(event);
        }
    }

    stats.retained_rows = events.len();
    Ok((EventLog::new(events), stats))
}

fn parse_ndjson(data: &[u8]) -> (EventLog, AdapterStats) {
    let mut stats = AdapterStats::default();
    let mut events = Vec::new();

    for line in data.split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        stats.total_rows += 1;

        let value: serde_json::Value = match serde_json::from_slice(line) {
            Ok(v @ serde_json::Value::Object(_)) => v,
            _ => {
                stats.malformed_records += 1;
                continue;
            }
        };

        let raw_timestamp = lookup_str(&value, TIMESTAMP_COLUMN);
        let raw_title = lookup_str(&value, TITLE_COLUMN);
        if let Some(event) = build_event(raw_timestamp, raw_title, &mut stats) {
            events.push(event);
        }
    }

    stats.retained_rows = events.len();
    (EventLog::new(events), stats)
}

/// Titles are kept byte-for-byte; whitespace only decides blankness
fn build_event(
    raw_timestamp: Option<&str>,
    raw_title: Option<&str>,
    stats: &mut AdapterStats,
) -> Option<Event> {
    let title = match raw_title {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            stats.missing_title += 1;
            return None;
        }
    };

    match raw_timestamp.and_then(parse_timestamp) {
        Some(timestamp) => Some(Event::new(timestamp, title)),
        None => {
            stats.bad_timestamp += 1;
            None
        }
    }
}

fn find_column(headers: &csv::ByteRecord, name: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name.as_bytes()))
        .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
}

/// Look up a string field by its column name or its snake_case form
fn lookup_str<'a>(value: &'a serde_json::Value, column: &str) -> Option<&'a str> {
    value
        .get(column)
        .or_else(|| value.get(column.to_ascii_lowercase()))
        .and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSegmenter;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-15 14:00:05"), Some(ts(14, 0, 5)));
        assert_eq!(parse_timestamp("2024-01-15T14:00:05"), Some(ts(14, 0, 5)));
        assert_eq!(
            parse_timestamp("2024-01-15T14:00:05+02:00"),
            Some(ts(14, 0, 5))
        );
        assert_eq!(parse_timestamp("2024-01-15 14:00"), Some(ts(14, 0, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_parse_csv() {
        let data = "Timestamp,Window_Title\n\
                    2024-01-15 14:00:00,main.rs - VS Code\n\
                    2024-01-15 14:00:05,main.rs - VS Code\n\
                    2024-01-15 14:00:10,Slack | general\n";

        let (log, stats) = parse_event_log(data, InputFormat::Csv).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.dropped_rows(), 0);
        assert_eq!(log.events[2].window_title, "Slack | general");
        assert_eq!(log.events[1].timestamp, ts(14, 0, 5));
    }

    #[test]
    fn test_csv_drops_missing_titles_and_bad_timestamps() {
        let data = "Timestamp,Window_Title\n\
                    2024-01-15 14:00:00,Editor\n\
                    2024-01-15 14:00:05,\n\
                    not-a-date,Editor\n\
                    2024-01-15 14:00:15,   \n\
                    2024-01-15 14:00:20\n\
                    2024-01-15 14:00:25,Browser\n";

        let (log, stats) = parse_event_log(data, InputFormat::Csv).unwrap();
        assert_eq!(log.titles().collect::<Vec<_>>(), vec!["Editor", "Browser"]);
        assert_eq!(stats.total_rows, 6);
        assert_eq!(stats.missing_title, 3);
        assert_eq!(stats.bad_timestamp, 1);
        assert_eq!(stats.dropped_rows(), 4);
    }

    #[test]
    fn test_csv_extra_columns_and_quoted_titles() {
        let data = "id,Timestamp,Window_Title,extra\n\
                    1,2024-01-15 14:00:00,\"Inbox, 3 unread - Mail\",x\n";

        let (log, _) = parse_event_log(data, InputFormat::Csv).unwrap();
        assert_eq!(log.events[0].window_title, "Inbox, 3 unread - Mail");
    }

    #[test]
    fn test_csv_missing_column() {
        let data = "Time,Title\n2024-01-15 14:00:00,Editor\n";
        let err = parse_event_log(data, InputFormat::Csv).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == TIMESTAMP_COLUMN));
    }

    #[test]
    fn test_header_only_csv_is_empty_log() {
        let (log, stats) =
            parse_event_log("Timestamp,Window_Title\n", InputFormat::Csv).unwrap();
        assert!(log.is_empty());
        assert_eq!(stats.total_rows, 0);
    }

    #[test]
    fn test_parse_ndjson() {
        let data = r#"{"Timestamp": "2024-01-15 14:00:00", "Window_Title": "Editor"}
{"timestamp": "2024-01-15T14:00:05", "window_title": "Terminal"}
{"Timestamp": "2024-01-15 14:00:10", "Window_Title": null}
not json

[1, 2]
"#;

        let (log, stats) = parse_event_log(data, InputFormat::Ndjson).unwrap();
        assert_eq!(log.titles().collect::<Vec<_>>(), vec!["Editor", "Terminal"]);
        assert_eq!(stats.total_rows, 5);
        assert_eq!(stats.missing_title, 1);
        assert_eq!(stats.malformed_records, 2);
    }

    #[test]
    fn test_titles_kept_verbatim() {
        let data = "Timestamp,Window_Title\n\
                    2024-01-15 14:00:00,Editor\n\
                    2024-01-15 14:00:05,Editor \n";

        let (log, _) = parse_event_log(data, InputFormat::Csv).unwrap();
        assert_eq!(log.titles().collect::<Vec<_>>(), vec!["Editor", "Editor "]);

        let sessions = SessionSegmenter::segment(&log, 5);
        let ids: Vec<u32> = sessions.iter().map(|s| s.session_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_invalid_utf8_title_drops_only_its_row() {
        let mut data = b"Timestamp,Window_Title\n2024-01-15 14:00:00,Editor\n".to_vec();
        data.extend_from_slice(b"2024-01-15 14:00:05,Bad \xff title\n");
        data.extend_from_slice(b"2024-01-15 14:00:10,Browser\n");

        let (log, stats) = parse_event_bytes(&data, InputFormat::Csv).unwrap();
        assert_eq!(log.titles().collect::<Vec<_>>(), vec!["Editor", "Browser"]);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.malformed_records, 1);
        assert_eq!(stats.dropped_rows(), 1);
    }

    #[test]
    fn test_invalid_utf8_ndjson_line_is_malformed() {
        let mut data = br#"{"Timestamp": "2024-01-15 14:00:00", "Window_Title": "Editor"}"#.to_vec();
        data.extend_from_slice(b"\n{\"Timestamp\": \"2024-01-15 14:00:05\", \"Window_Title\": \"\xff\"}\n");

        let (log, stats) = parse_event_bytes(&data, InputFormat::Ndjson).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(stats.malformed_records, 1);
    }

    #[test]
    fn test_load_file_with_invalid_utf8() {
        let dir = std::env::temp_dir().join(format!("focus-adapter-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("log.csv");
        fs::write(
            &path,
            b"Timestamp,Window_Title\n2024-01-15 14:00:00,\xfe\xff\n2024-01-15 14:00:05,Editor\n",
        )
        .unwrap();

        let (log, stats) = load_event_log(&path, InputFormat::Csv).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(stats.malformed_records, 1);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_event_log(Path::new("/nonexistent/activity.csv"), InputFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));
    }
}
