use serde::Deserialize;
use serde::Serialize;

use super::BundlerStats;

/// An output file written by the bundler
///
/// The contents live on disk at `<output_path>/<file_name>`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmittedFile {
  pub file_name: String,

  /// Name of the chunk that produced this file, for example `main` or `runtime`
  pub name: Option<String>,

  pub chunk_id: Option<String>,

  /// Assets are files that were copied or emitted by loaders rather than produced by a chunk
  pub is_asset: bool,

  pub initial: bool,
}

impl EmittedFile {
  pub fn extension(&self) -> Option<&str> {
    std::path::Path::new(&self.file_name)
      .extension()
      .and_then(|ext| ext.to_str())
  }

  pub fn is_script(&self) -> bool {
    self.extension() == Some("js")
  }
}

/// Everything the bundler hands over to the pipeline for one build
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildManifest {
  pub emitted_files: Vec<EmittedFile>,
  pub stats: BundlerStats,
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_deserialize_manifest() {
    let manifest: BuildManifest = serde_json::from_str(
      r#"{
        "emittedFiles": [
          { "fileName": "main-es2015.js", "name": "main", "chunkId": "0", "initial": true },
          { "fileName": "favicon.ico", "isAsset": true }
        ],
        "stats": { "hash": "abc123" }
      }"#,
    )
    .unwrap();

    assert_eq!(
      manifest.emitted_files,
      vec![
        EmittedFile {
          file_name: String::from("main-es2015.js"),
          name: Some(String::from("main")),
          chunk_id: Some(String::from("0")),
          is_asset: false,
          initial: true,
        },
        EmittedFile {
          file_name: String::from("favicon.ico"),
          is_asset: true,
          ..EmittedFile::default()
        },
      ]
    );
    assert_eq!(manifest.stats.hash, Some(String::from("abc123")));
    assert!(manifest.emitted_files[0].is_script());
    assert!(!manifest.emitted_files[1].is_script());
  }
}
