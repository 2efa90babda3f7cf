use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::diagnostic::Diagnostic;

/// Substitute translations into one processed file for one locale
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineAction {
  pub filename: String,

  /// Shared between the actions of every locale
  pub code: Arc<str>,

  pub source_map: Option<Arc<str>>,
  pub locale: String,
  pub is_downleveled: bool,

  /// The main chunk also receives the locale assignment read by `$localize`
  pub is_main_chunk: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineResult {
  pub file: String,
  pub locale: String,
  pub substitution_count: usize,
  pub diagnostics: Vec<Diagnostic>,
}

impl InlineResult {
  pub fn has_errors(&self) -> bool {
    self.diagnostics.iter().any(Diagnostic::is_error)
  }
}
