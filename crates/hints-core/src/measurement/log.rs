use serde::Serialize;

use super::record::{MeasurementRecord, HEADER};

/// One entry of the session log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Record(MeasurementRecord),
    /// Free text; rendered as a blank line followed by the text.
    Marker { text: String },
}

/// Append-only log of records and markers, in the order they happened.
///
/// The header row is implicit: an empty log renders as the header alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&mut self, record: MeasurementRecord) {
        self.entries.push(LogEntry::Record(record));
    }

    pub fn push_marker(&mut self, text: impl Into<String>) {
        self.entries.push(LogEntry::Marker { text: text.into() });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, LogEntry::Record(_)))
            .count()
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Marker { text } => Some(text.as_str()),
            LogEntry::Record(_) => None,
        })
    }

    /// Full log text: header, then every entry in order.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(HEADER.len() + self.entries.len() * 900);
        out.push_str(HEADER);
        for entry in &self.entries {
            match entry {
                LogEntry::Record(record) => record.write_line(&mut out),
                LogEntry::Marker { text } => {
                    out.push('\n');
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn empty_log_renders_header_only() {
        assert_eq!(SessionLog::new().render(), HEADER);
    }

    #[test]
    fn markers_start_with_a_blank_line() {
        let mut log = SessionLog::new();
        log.push_marker("Start raum instructions at: 2024-03-05 14:07:09.042");
        log.push_marker("Start still instructions at: 2024-03-05 14:08:15.000");

        let expected = indoc! {"

            Start raum instructions at: 2024-03-05 14:07:09.042

            Start still instructions at: 2024-03-05 14:08:15.000
        "};
        assert_eq!(log.render(), format!("{HEADER}{expected}"));
        assert_eq!(log.markers().count(), 2);
        assert_eq!(log.record_count(), 0);
    }
}
