use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::Budget;
use super::I18nOptions;

/// Language level of emitted scripts
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EcmaTarget {
  Es5,
  #[default]
  Es2015,
  Es2016,
  Es2017,
  Es2018,
  Es2019,
  Es2020,
  EsNext,
}

impl EcmaTarget {
  /// Tag used in differential loading file names, e.g. `main-es2015.js`
  pub fn file_tag(&self) -> &'static str {
    match self {
      EcmaTarget::Es5 => "es5",
      EcmaTarget::Es2015 => "es2015",
      EcmaTarget::Es2016 => "es2016",
      EcmaTarget::Es2017 => "es2017",
      EcmaTarget::Es2018 => "es2018",
      EcmaTarget::Es2019 => "es2019",
      EcmaTarget::Es2020 => "es2020",
      EcmaTarget::EsNext => "esnext",
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationOptions {
  /// Minify scripts
  pub scripts: bool,

  /// Preserve function and class names
  pub keep_names: bool,

  /// Drop `/*! */`, `@license` and `@preserve` comment blocks
  pub remove_licenses: bool,

  /// Global identifiers replaced with literal values, e.g. `ngDevMode: false`
  pub define: BTreeMap<String, serde_json::Value>,

  pub target: EcmaTarget,

  /// Run the exhaustive second minification stage
  pub advanced: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceMapOptions {
  pub scripts: bool,

  /// Write maps without a `sourceMappingURL` reference
  pub hidden: bool,

  pub vendor: bool,
}

/// The options passed into the pipeline through the CLI or the programmatic API
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostbuildOptions {
  pub output_path: PathBuf,
  pub project_root: PathBuf,

  /// Emit an ES5 variant of every script next to the original
  pub differential_loading: bool,

  pub optimization: OptimizationOptions,
  pub source_map: SourceMapOptions,
  pub subresource_integrity: bool,

  /// Chunks whose name starts with this are treated as the runtime bundle
  pub runtime_chunk_name: String,

  /// Names of global script bundles, copied through untouched
  pub scripts_entry_points: Vec<String>,

  pub i18n: Option<I18nOptions>,
  pub budgets: Vec<Budget>,
  pub max_workers: Option<usize>,

  /// Location of the on-disk transform cache, disabled when unset
  pub cache_path: Option<PathBuf>,

  pub task_timeout_ms: Option<u64>,
  pub verbose: bool,
}

impl Default for PostbuildOptions {
  fn default() -> Self {
    Self {
      output_path: PathBuf::from("dist"),
      project_root: PathBuf::new(),
      differential_loading: false,
      optimization: OptimizationOptions::default(),
      source_map: SourceMapOptions::default(),
      subresource_integrity: false,
      runtime_chunk_name: String::from("runtime"),
      scripts_entry_points: Vec::new(),
      i18n: None,
      budgets: Vec::new(),
      max_workers: None,
      cache_path: None,
      task_timeout_ms: None,
      verbose: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_deserialize_partial_options() {
    let options: PostbuildOptions = serde_json::from_str(
      r#"{
        "outputPath": "dist/app",
        "differentialLoading": true,
        "optimization": { "scripts": true, "define": { "ngDevMode": false }, "target": "es2017" },
        "budgets": [{ "type": "initial", "maximumError": "2mb" }]
      }"#,
    )
    .unwrap();

    assert_eq!(options.output_path, PathBuf::from("dist/app"));
    assert!(options.differential_loading);
    assert_eq!(options.optimization.target, EcmaTarget::Es2017);
    assert_eq!(
      options.optimization.define.get("ngDevMode"),
      Some(&serde_json::Value::Bool(false))
    );
    assert_eq!(options.runtime_chunk_name, "runtime");
    assert_eq!(options.budgets.len(), 1);
  }

  #[test]
  fn test_targets_are_ordered() {
    assert!(EcmaTarget::Es5 < EcmaTarget::Es2015);
    assert!(EcmaTarget::Es2017 < EcmaTarget::EsNext);
    assert_eq!(EcmaTarget::EsNext.file_tag(), "esnext");
  }
}
