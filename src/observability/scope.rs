//! ObservationScope for begin/complete/failed logging around an operation

use std::time::Instant;

use super::logger::Logger;

/// Logs `{name}_BEGIN` on creation and exactly one of `{name}_COMPLETE`,
/// `{name}_FAILED` or `{name}_INCOMPLETE` (on drop) afterwards. Closing
/// records carry `elapsed_ms`.
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    start: Instant,
    closed: bool,
}

impl ObservationScope {
    /// `fields` are repeated on every record of the scope.
    pub fn with_fields(name: &'static str, fields: Vec<(&'static str, String)>) -> Self {
        let scope = Self {
            name,
            fields,
            start: Instant::now(),
            closed: false,
        };
        scope.emit("BEGIN", &[], false);
        scope
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.closed = true;
        self.emit("COMPLETE", extra, true);
    }

    /// Logged at ERROR.
    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        let event = format!("{}_FAILED", self.name);
        let elapsed = self.elapsed_ms();
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::error(&event, &fields);
    }

    fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    fn emit(&self, suffix: &str, extra: &[(&str, &str)], timed: bool) {
        let event = format!("{}_{}", self.name, suffix);
        let elapsed = self.elapsed_ms();
        let mut fields = self.field_refs();
        fields.extend(extra.iter().copied());
        if timed {
            fields.push(("elapsed_ms", elapsed.as_str()));
        }
        Logger::info(&event, &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.closed {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}
