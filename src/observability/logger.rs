//! Structured JSON logger
//!
//! - One record per line, flushed immediately
//! - `event` first, `severity` second, remaining keys sorted
//! - ERROR and FATAL to stderr, everything else to stdout

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-iteration detail (backoff rounds, lock waits)
    Trace = 0,
    /// Lifecycle and completed operations
    Info = 1,
    /// Escalations and rejected commits
    Warn = 2,
    /// Failed checkpoints
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(value: u8) -> Severity {
        match value {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-wide minimum severity. TRACE is filtered by default.
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// JSON string literal for `s`, escapes included.
fn quoted(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Records below `severity` are dropped.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Writes one record if `severity` passes the filter.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        if severity >= Severity::Error {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    /// Log a typed event at its own severity
    pub fn event(event: Event, fields: &[(&str, &str)]) {
        Self::log(event.severity(), event.as_str(), fields);
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::format_line(severity, event, fields);
        // Logging never fails the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    pub(crate) fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);

        let mut line = format!("{{\"event\":{},\"severity\":\"{}\"", quoted(event), severity);
        for (key, value) in sorted {
            line.push(',');
            line.push_str(&quoted(key));
            line.push(':');
            line.push_str(&quoted(value));
        }
        line.push_str("}\n");
        line
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_line_is_json_with_event_first() {
        let line = Logger::format_line(Severity::Info, "COMMIT_MERGED", &[("head", "ab12")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "COMMIT_MERGED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["head"], "ab12");
        assert!(line.find("\"event\"").unwrap() < line.find("\"severity\"").unwrap());
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_fields_are_sorted() {
        let a = Logger::format_line(Severity::Info, "E", &[("zebra", "1"), ("apple", "2")]);
        let b = Logger::format_line(Severity::Info, "E", &[("apple", "2"), ("zebra", "1")]);
        assert_eq!(a, b);
        assert!(a.find("apple").unwrap() < a.find("zebra").unwrap());
    }

    #[test]
    fn test_escapes_special_chars() {
        let line = Logger::format_line(Severity::Warn, "E", &[("reason", "say \"hi\"\n\tbye")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["reason"], "say \"hi\"\n\tbye");
    }

    #[test]
    fn test_trace_filtered_by_default() {
        assert!(!Logger::enabled(Severity::Trace));
        assert!(Logger::enabled(Severity::Error));
    }
}
