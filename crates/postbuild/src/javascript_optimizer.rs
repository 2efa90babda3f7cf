use std::path::Path;
use std::sync::Arc;

use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::types::OptimizationOptions;
use postbuild_sourcemap::append_sourcemap_url;
use postbuild_sourcemap::compose_source_maps;
use postbuild_sourcemap::find_sourcemap_url;
use postbuild_sourcemap::remove_sourcemap_url;
use postbuild_sourcemap::rename_source_map_file;
use postbuild_transforms::optimize_script;
use postbuild_worker_pool::WorkerPool;

/// A script held in memory between the bundler and the planner
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptAsset {
  pub name: String,
  pub code: String,
  pub source_map: Option<String>,
  pub minimized: bool,
}

impl ScriptAsset {
  fn is_eligible(&self) -> bool {
    !self.minimized && self.name.ends_with(".js")
  }
}

/// Indices of the assets to optimize, smallest first. Ties keep their input order.
pub fn submission_order(assets: &[ScriptAsset]) -> Vec<usize> {
  let mut order = assets
    .iter()
    .enumerate()
    .filter(|(_, asset)| asset.is_eligible())
    .map(|(index, _)| index)
    .collect::<Vec<_>>();
  order.sort_by_key(|index| assets[*index].code.len());
  order
}

/// Minify every script that is not minimized yet, replacing it in place.
///
/// A failure leaves the asset untouched and is reported as an error diagnostic.
pub async fn optimize_assets(
  pool: &WorkerPool,
  assets: &mut [ScriptAsset],
  options: &OptimizationOptions,
  source_map: bool,
) -> Vec<Diagnostic> {
  let options = Arc::new(options.clone());

  let handles = submission_order(assets)
    .into_iter()
    .map(|index| {
      let asset = assets[index].clone();
      let options = options.clone();
      let handle = pool.submit(move || optimize_asset(&asset, &options, source_map));
      (index, handle)
    })
    .collect::<Vec<_>>();

  tracing::info!(assets = handles.len(), "Optimizing scripts");

  let mut diagnostics = Vec::new();
  for (index, handle) in handles {
    let asset = &mut assets[index];
    match handle.join().await {
      Ok((code, map)) => {
        asset.code = code;
        if map.is_some() {
          asset.source_map = map;
        }
        asset.minimized = true;
      }
      Err(error) => diagnostics.push(
        Diagnostic::error(format!("Optimization error [{}]: {}", asset.name, error))
          .with_file(asset.name.clone())
          .with_origin("postbuild:optimizer"),
      ),
    }
  }

  diagnostics
}

#[tracing::instrument(level = "trace", skip_all, fields(file = %asset.name))]
fn optimize_asset(
  asset: &ScriptAsset,
  options: &OptimizationOptions,
  source_map: bool,
) -> anyhow::Result<(String, Option<String>)> {
  let url = find_sourcemap_url(&asset.code).map(|found| found.url);
  let input_map = asset.source_map.as_deref().filter(|_| source_map);

  let output = optimize_script(
    remove_sourcemap_url(&asset.code),
    options,
    input_map.is_some(),
  )?;

  let map = match (input_map, output.source_map) {
    (Some(input), Some(transform)) => {
      let composed = compose_source_maps(input.as_bytes(), &transform)?;
      let file = Path::new(&asset.name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&asset.name);
      Some(String::from_utf8(rename_source_map_file(&composed, file)?)?)
    }
    _ => None,
  };

  let code = match url {
    Some(url) => append_sourcemap_url(&output.code, &url),
    None => output.code,
  };

  Ok((code, map))
}
