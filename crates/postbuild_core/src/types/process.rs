use serde::Deserialize;
use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::integrity::IntegrityAlgorithm;

/// Work item for a single output script
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessAction {
  /// Chunk name, used for labels and diagnostics
  pub name: String,

  /// File name relative to the output path
  pub file_name: String,

  pub code: String,
  pub source_map: Option<String>,
  pub is_runtime: bool,
  pub requires_downlevel: bool,
  pub requires_optimize: bool,

  /// Drop the original output once the downlevel variant is written
  pub ignore_original: bool,

  pub integrity_algorithm: Option<IntegrityAlgorithm>,

  /// File name substitutions applied to the downlevel variant, so it references the
  /// downleveled copies of worker scripts
  pub side_effect_free_replacements: Vec<(String, String)>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMap {
  pub filename: String,
  pub size: u64,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedArtifact {
  pub filename: String,
  pub size: u64,
  pub integrity: Option<String>,
  pub map: Option<ProcessedMap>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
  /// File name of the processed input
  pub name: String,

  /// Digest of the input as the bundler emitted it
  pub integrity: Option<String>,

  pub original: Option<ProcessedArtifact>,
  pub downlevel: Option<ProcessedArtifact>,
  pub diagnostics: Vec<Diagnostic>,
}

impl ProcessResult {
  pub fn artifacts(&self) -> impl Iterator<Item = &ProcessedArtifact> {
    self.original.iter().chain(self.downlevel.iter())
  }

  pub fn has_errors(&self) -> bool {
    self.diagnostics.iter().any(Diagnostic::is_error)
  }
}
