use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
  #[default]
  Error,
  Warning,
  Info,
}

/// This is a user facing error or warning.
///
/// Diagnostics are attached to results rather than returned as errors when the
/// problem only affects a single file, so that sibling files still complete.
#[derive(Error, Debug, Deserialize, PartialEq, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
  /// A summary user-facing message
  pub message: String,

  pub severity: DiagnosticSeverity,

  /// Indicates where this diagnostic was emitted from
  pub origin: Option<String>,

  /// Output file the diagnostic applies to
  pub file: Option<String>,

  /// Hints for the user
  pub hints: Option<Vec<String>>,
}

impl Display for Diagnostic {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.message)
  }
}

impl Diagnostic {
  pub fn error(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: DiagnosticSeverity::Error,
      ..Default::default()
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: DiagnosticSeverity::Warning,
      ..Default::default()
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: DiagnosticSeverity::Info,
      ..Default::default()
    }
  }

  pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
    self.origin = Some(origin.into());
    self
  }

  pub fn with_file(mut self, file: impl Into<String>) -> Self {
    self.file = Some(file.into());
    self
  }

  pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
    self.hints.get_or_insert_with(Vec::new).push(hint.into());
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity == DiagnosticSeverity::Error
  }

  pub fn is_warning(&self) -> bool {
    self.severity == DiagnosticSeverity::Warning
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_serializes_camel_case() {
    let diagnostic = Diagnostic::warning("No translation found")
      .with_origin("postbuild:i18n")
      .with_file("main-es2015.js");

    assert_eq!(
      serde_json::to_value(&diagnostic).unwrap(),
      serde_json::json!({
        "message": "No translation found",
        "severity": "warning",
        "origin": "postbuild:i18n",
        "file": "main-es2015.js",
        "hints": null
      })
    );
  }

  #[test]
  fn test_hints_accumulate() {
    let diagnostic = Diagnostic::error("broken")
      .with_hint("first")
      .with_hint("second");

    assert_eq!(
      diagnostic.hints,
      Some(vec![String::from("first"), String::from("second")])
    );
    assert!(diagnostic.is_error());
    assert!(!diagnostic.is_warning());
  }
}
