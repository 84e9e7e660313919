//! Accumulated warnings and errors from expression evaluation and provider
//! calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Where the problem was found, e.g. the configuration body it came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// The evaluated configuration body the problem was reported against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            subject: None,
            body: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
            subject: None,
            body: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}", self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        if let Some(subject) = &self.subject {
            write!(f, " (in {subject})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Fills in the subject and evaluated body of every diagnostic that
    /// doesn't have them yet.
    pub fn in_config_body(mut self, subject: &str, body: &Value) -> Self {
        for diag in &mut self.0 {
            if diag.subject.is_none() {
                diag.subject = Some(subject.to_string());
            }
            if diag.body.is_none() {
                diag.body = Some(body.clone());
            }
        }
        self
    }

    /// Splits into an error (if any error-level diagnostic is present) and the
    /// warnings that should be reported regardless.
    pub fn err_with_warnings(self) -> (Result<(), EvalError>, Diagnostics) {
        if self.has_errors() {
            return (Err(EvalError::Diagnostics(self)), Diagnostics::new());
        }
        (Ok(()), self)
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for diag in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{diag}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_warnings_only_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("deprecated"));
        assert!(!diags.has_errors());
        let (result, warnings) = diags.err_with_warnings();
        assert!(result.is_ok());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_error_diagnostic_becomes_error() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("deprecated"));
        diags.push(Diagnostic::error("bad region"));
        let (result, warnings) = diags.err_with_warnings();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("bad region"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_in_config_body_keeps_existing_subject() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error("a"));
        diags.push(Diagnostic {
            subject: Some("elsewhere".into()),
            ..Diagnostic::error("b")
        });
        let body = json!({ "region": "us-east-1" });
        let diags = diags.in_config_body("provider.aws", &body);
        let subjects: Vec<_> = diags.iter().map(|d| d.subject.clone().unwrap()).collect();
        assert_eq!(subjects, vec!["provider.aws", "elsewhere"]);
        assert!(diags.iter().all(|d| d.body.as_ref() == Some(&body)));
    }

    #[test]
    fn test_body_is_not_serialized_when_absent() {
        let plain = serde_json::to_value(Diagnostic::error("bad")).unwrap();
        assert!(plain.get("body").is_none());

        let diags = Diagnostics::from(Diagnostic::error("bad"))
            .in_config_body("provider.aws", &json!({ "region": "" }));
        let with_body = serde_json::to_value(&diags).unwrap();
        assert_eq!(with_body[0]["body"], json!({ "region": "" }));
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::error("bad").with_detail("region is empty");
        assert_eq!(diag.to_string(), "error: bad: region is empty");
    }
}
