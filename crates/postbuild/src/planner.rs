use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use postbuild_core::types::EmittedFile;
use postbuild_core::types::IntegrityAlgorithm;
use postbuild_core::types::PostbuildOptions;
use postbuild_core::types::ProcessAction;
use postbuild_filesystem::FileSystemRef;
use rayon::prelude::*;

use crate::action_executor::BundleAction;
use crate::javascript_optimizer::ScriptAsset;
use crate::process_bundle::downlevel_filename;

const VENDOR_CHUNK: &str = "vendor";
const MAIN_CHUNK: &str = "main";

/// A script that becomes a process action
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlannedScript {
  pub file_name: String,
  pub name: String,
  pub is_runtime: bool,
  pub ignore_original: bool,
}

/// How every emitted file of a build is handled
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilePlan {
  pub scripts: Vec<PlannedScript>,

  /// Files written by the bundler that are not processed
  pub passthrough: Vec<String>,

  /// Worker scripts and the names of their downleveled copies
  pub worker_replacements: Vec<(String, String)>,

  /// Files of the chunk that receives the locale assignment
  pub main_chunk_files: Vec<String>,
}

impl FilePlan {
  pub fn is_main_chunk(&self, file_name: &str) -> bool {
    self.main_chunk_files.iter().any(|file| file == file_name)
  }
}

/// Sort the emitted files into scripts to process and files to pass through
pub fn plan_files(files: &[EmittedFile], options: &PostbuildOptions) -> FilePlan {
  let mut plan = FilePlan::default();
  let mut seen = HashSet::new();

  for file in files {
    if !seen.insert(file.file_name.as_str()) {
      tracing::debug!(file = %file.file_name, "Skipping duplicate emitted file");
      continue;
    }

    // Worker scripts are processed too, so that the downleveled copy they are replaced with exists
    if file.is_asset {
      if file.file_name.ends_with(".worker.js") {
        plan.worker_replacements.push((
          file.file_name.clone(),
          downlevel_filename(&file.file_name),
        ));
        plan.scripts.push(PlannedScript {
          file_name: file.file_name.clone(),
          ..PlannedScript::default()
        });
      } else {
        plan.passthrough.push(file.file_name.clone());
      }
      continue;
    }

    let name = file.name.clone().unwrap_or_default();
    if !file.is_script() || options.scripts_entry_points.contains(&name) {
      plan.passthrough.push(file.file_name.clone());
      continue;
    }

    plan.scripts.push(PlannedScript {
      file_name: file.file_name.clone(),
      is_runtime: name.starts_with(&options.runtime_chunk_name),
      ignore_original: file.file_name.starts_with("polyfills-es5"),
      name,
    });
  }

  let main_chunk_id = find_chunk_id(files, VENDOR_CHUNK).or_else(|| find_chunk_id(files, MAIN_CHUNK));
  if let Some(chunk_id) = main_chunk_id {
    for file in files {
      if file.is_script()
        && file.chunk_id.as_deref() == Some(chunk_id)
        && !plan.is_main_chunk(&file.file_name)
      {
        plan.main_chunk_files.push(file.file_name.clone());
      }
    }
  }

  plan
}

fn find_chunk_id<'a>(files: &'a [EmittedFile], name: &str) -> Option<&'a str> {
  files
    .iter()
    .find(|file| !file.is_asset && file.name.as_deref() == Some(name))
    .and_then(|file| file.chunk_id.as_deref())
}

/// Read the planned scripts, and their source maps when enabled, from the output directory
pub fn load_scripts(
  plan: &FilePlan,
  options: &PostbuildOptions,
  fs: &FileSystemRef,
) -> anyhow::Result<Vec<ScriptAsset>> {
  let span = tracing::trace_span!("load_scripts", scripts = plan.scripts.len()).entered();
  let assets = plan
    .scripts
    .par_iter()
    .map(|script| {
      let path = options.output_path.join(&script.file_name);
      let code = fs
        .read_to_string(&path)
        .with_context(|| format!("Unable to read {}", path.display()))?;

      let map_path = options
        .output_path
        .join(format!("{}.map", script.file_name));
      let read_map = options.source_map.scripts
        && (options.source_map.vendor || script.name != VENDOR_CHUNK)
        && fs.is_file(&map_path);
      let source_map = if read_map {
        Some(
          fs.read_to_string(&map_path)
            .with_context(|| format!("Unable to read {}", map_path.display()))?,
        )
      } else {
        None
      };

      Ok(ScriptAsset {
        name: script.file_name.clone(),
        code,
        source_map,
        minimized: false,
      })
    })
    .collect::<anyhow::Result<Vec<_>>>()?;
  span.exit();

  Ok(assets)
}

/// Write optimized scripts back so the output directory matches the in-memory assets
pub fn store_scripts(
  assets: &[ScriptAsset],
  output_path: &Path,
  fs: &FileSystemRef,
) -> std::io::Result<()> {
  for asset in assets.iter().filter(|asset| asset.minimized) {
    let path = output_path.join(&asset.name);
    fs.write(&path, asset.code.as_bytes())?;
    if let Some(map) = &asset.source_map {
      fs.write(&output_path.join(format!("{}.map", asset.name)), map.as_bytes())?;
    }
  }
  Ok(())
}

/// One action per planned script. The runtime is held back for the end of the batch only when
/// integrity digests have to be embedded into it.
pub fn create_actions(
  plan: &FilePlan,
  assets: Vec<ScriptAsset>,
  options: &PostbuildOptions,
) -> Vec<BundleAction> {
  let integrity_algorithm = options
    .subresource_integrity
    .then_some(IntegrityAlgorithm::Sha384);

  plan
    .scripts
    .iter()
    .zip(assets)
    .map(|(script, asset)| {
      let action = ProcessAction {
        name: script.name.clone(),
        file_name: script.file_name.clone(),
        code: asset.code,
        source_map: asset.source_map,
        is_runtime: script.is_runtime,
        requires_downlevel: options.differential_loading,
        requires_optimize: options.optimization.scripts,
        ignore_original: script.ignore_original,
        integrity_algorithm,
        side_effect_free_replacements: plan.worker_replacements.clone(),
      };

      if script.is_runtime && options.subresource_integrity {
        BundleAction::Runtime(action)
      } else {
        BundleAction::Process(action)
      }
    })
    .collect()
}
