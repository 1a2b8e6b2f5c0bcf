// src/formatting.rs

use crate::core::LogRecord;
use serde_json::Value;

/// A trait for rendering one record as console text.
pub trait RecordFormatter: Send + Sync {
    fn format_record(&self, record: &LogRecord) -> String;
}

/// Human-readable single-line layout with a full timestamp, in the style of
/// classic text log formatters:
///
/// `time="2026-08-23T14:02:11+00:00" level=error msg="disk full" user=a`
pub struct TextRecordFormatter;

impl RecordFormatter for TextRecordFormatter {
    fn format_record(&self, record: &LogRecord) -> String {
        let mut line = format!(
            "time=\"{}\" level={} msg={}",
            record.timestamp.to_rfc3339(),
            record.severity,
            quote_value(&record.message),
        );
        // Field order is stable for a given record: keys sorted so the same
        // record always renders the same line.
        let mut keys: Vec<&String> = record.fields.keys().collect();
        keys.sort();
        for key in keys {
            let rendered = match &record.fields[key] {
                Value::String(s) => quote_value(s),
                other => other.to_string(),
            };
            line.push_str(&format!(" {}={}", key, rendered));
        }
        line
    }
}

/// Structured one-record-per-line JSON layout.
pub struct JsonRecordFormatter;

impl RecordFormatter for JsonRecordFormatter {
    fn format_record(&self, record: &LogRecord) -> String {
        serde_json::to_string(record).unwrap_or_else(|_| {
            // Field data that cannot be serialized degrades to the text
            // layout instead of dropping the record.
            TextRecordFormatter.format_record(record)
        })
    }
}

/// Quotes a value if it contains whitespace or quotes, mirroring the layout
/// consumers expect from text formatters.
fn quote_value(value: &str) -> String {
    if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '=') {
        format!("{:?}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogRecord, Severity};
    use chrono::TimeZone;

    fn create_test_record() -> LogRecord {
        let mut record = LogRecord::new(Severity::Warn, "pool exhausted")
            .with_field("pool", "primary")
            .with_field("in_use", 32);
        record.timestamp = chrono::Utc.with_ymd_and_hms(2026, 8, 23, 9, 30, 0).unwrap();
        record
    }

    #[test]
    fn test_text_layout_single_line() {
        let line = TextRecordFormatter.format_record(&create_test_record());
        assert_eq!(
            line,
            "time=\"2026-08-23T09:30:00+00:00\" level=warn msg=\"pool exhausted\" in_use=32 pool=primary"
        );
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_bare_values_are_not_quoted() {
        let record = LogRecord::new(Severity::Error, "oom");
        let line = TextRecordFormatter.format_record(&record);
        assert!(line.contains("msg=oom"));
    }

    #[test]
    fn test_json_layout_round_trips() {
        let record = create_test_record();
        let line = JsonRecordFormatter.format_record(&record);
        let parsed: LogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }
}
