use crate::dns::DomainName;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// The zone is broken; callers should treat the check as failed
    Error,
    /// The zone works but something looks wrong
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("Error"),
            Severity::Warning => f.write_str("Warning"),
        }
    }
}

/// One finding of a zone check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Result of checking one zone: the findings in the order they were raised
/// plus the number of records looked at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneReport {
    pub zone: DomainName,
    pub diagnostics: Vec<Diagnostic>,
    pub record_count: u64,
}

impl ZoneReport {
    pub fn new(zone: DomainName) -> Self {
        Self {
            zone,
            diagnostics: Vec::new(),
            record_count: 0,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Only errors fail a zone; warnings never do
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

impl fmt::Display for ZoneReport {
    /// One-line summary, e.g. `Checked 12 records of 'example.com.', 0 errors, 1 warnings.`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Checked {} records of '{}', {} errors, {} warnings.",
            self.record_count,
            self.zone.to_fqdn(),
            self.error_count(),
            self.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(Diagnostic::error("broken").to_string(), "[Error] broken");
        assert_eq!(Diagnostic::warning("odd").to_string(), "[Warning] odd");
    }

    #[test]
    fn test_report_counts() {
        let mut report = ZoneReport::new(DomainName::parse("example.com").unwrap());
        report.record_count = 3;
        assert!(!report.has_errors());

        report.push(Diagnostic::warning("odd"));
        assert!(!report.has_errors());

        report.push(Diagnostic::error("broken"));
        report.push(Diagnostic::error("also broken"));
        assert!(report.has_errors());
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(
            report.to_string(),
            "Checked 3 records of 'example.com.', 2 errors, 1 warnings."
        );
    }

    #[test]
    fn test_report_serialization() {
        let mut report = ZoneReport::new(DomainName::parse("example.com").unwrap());
        report.record_count = 2;
        report.push(Diagnostic::warning("odd"));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "zone": "example.com.",
                "diagnostics": [{"severity": "Warning", "message": "odd"}],
                "record_count": 2
            })
        );
    }
}
