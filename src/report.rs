use std::fmt::Display;

use tracing::{info, warn};

/// Running record of a multi-step operation: what went fine and
/// which best-effort steps failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("⚠ {message}");
        self.warnings.push(message);
    }

    /// Log and record a failed best-effort step instead of
    /// propagating it.
    pub fn best_effort<T, E: Display>(&mut self, step: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.warn(format!("{step} failed: {e}"));
                None
            }
        }
    }

    /// Append another report's entries after this one's.
    pub fn merge(&mut self, other: Self) {
        self.notes.extend(other.notes);
        self.warnings.extend(other.warnings);
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Log a closing summary.
    pub fn summarize(&self, title: &str) {
        info!("===== {title} =====");
        for note in &self.notes {
            info!("  {note}");
        }
        if self.is_clean() {
            info!("  no warnings");
        } else {
            for w in &self.warnings {
                warn!("  ⚠ {w}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_records_failure_and_continues() {
        let mut report = Report::new();

        let ok: Option<u32> = report.best_effort("first", Ok::<_, String>(1));
        let failed: Option<u32> = report.best_effort("second", Err("boom"));

        assert_eq!(ok, Some(1));
        assert!(failed.is_none());
        assert_eq!(report.warnings, vec!["second failed: boom"]);
        assert!(!report.is_clean());
    }
}
