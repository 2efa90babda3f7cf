use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::types::EcmaTarget;
use postbuild_core::types::IntegrityAlgorithm;
use postbuild_core::types::OptimizationOptions;
use postbuild_core::types::ProcessAction;
use postbuild_core::types::ProcessResult;
use postbuild_core::types::ProcessedArtifact;
use postbuild_core::types::ProcessedMap;
use postbuild_core::types::SourceMapOptions;
use postbuild_filesystem::FileSystem;
use postbuild_sourcemap::append_sourcemap_url;
use postbuild_sourcemap::compose_source_maps;
use postbuild_sourcemap::insert_before_sourcemap_url;
use postbuild_sourcemap::remove_sourcemap_url;
use postbuild_sourcemap::rename_source_map_file;
use postbuild_transforms::downlevel_to_es5;
use postbuild_transforms::optimize_script;
use postbuild_transforms::DownlevelOptions;
use postbuild_transforms::TransformOutput;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

/// Global holding the integrity digests of every sibling file in the runtime bundle
pub const INTEGRITY_MANIFEST_GLOBAL: &str = "__POSTBUILD_INTEGRITY__";

static ES_TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"-(es20\d{2}|esnext)").unwrap());

static ES5_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-es5(\.|$)").unwrap());

static LAZY_CHUNK_TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#""-(es20\d{2}|esnext)\."#).unwrap());

/// Settings shared by every process action of a build
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBundleOptions {
  pub output_path: PathBuf,
  pub optimization: OptimizationOptions,
  pub source_map: SourceMapOptions,
}

/// A file produced by processing a bundle, relative to the output path
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
  pub filename: String,
  pub contents: String,
}

/// Everything processing a bundle does to the output directory, so it can be replayed from the
/// cache without running the transforms
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutput {
  pub result: ProcessResult,
  pub files: Vec<OutputFile>,
  pub removed: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Variant {
  Original,
  Downlevel,
}

/// Name of the ES5 variant of a file: `main-es2015.js` becomes `main-es5.js` and `main.js`
/// becomes `main-es5.js`. Only the last language tag is replaced, so `polyfills-es5-es2015.js`
/// becomes `polyfills-es5-es5.js`. Files already tagged `-es5` keep their name.
pub fn downlevel_filename(file_name: &str) -> String {
  if let Some(tag) = ES_TAG.find_iter(file_name).last() {
    return format!("{}-es5{}", &file_name[..tag.start()], &file_name[tag.end()..]);
  }
  if ES5_TAG.is_match(file_name) {
    return file_name.to_string();
  }

  match file_name.strip_suffix(".js") {
    Some(stem) => format!("{}-es5.js", stem),
    None => format!("{}-es5", file_name),
  }
}

fn map_filename(file_name: &str) -> String {
  format!("{}.map", file_name)
}

fn basename(file_name: &str) -> &str {
  Path::new(file_name)
    .file_name()
    .and_then(|name| name.to_str())
    .unwrap_or(file_name)
}

/// Downlevel and digest a bundle that is not the runtime
#[tracing::instrument(level = "trace", skip_all, fields(file = %action.file_name))]
pub fn process_bundle(action: &ProcessAction, options: &ProcessBundleOptions) -> ProcessOutput {
  process(action, None, options)
}

/// Process the runtime bundle once every sibling result is known. Only reachable through
/// `RuntimeTask`.
#[tracing::instrument(level = "trace", skip_all, fields(file = %action.file_name))]
pub(crate) fn process_runtime(
  action: &ProcessAction,
  siblings: &[ProcessResult],
  options: &ProcessBundleOptions,
) -> ProcessOutput {
  process(action, Some(siblings), options)
}

fn process(
  action: &ProcessAction,
  siblings: Option<&[ProcessResult]>,
  options: &ProcessBundleOptions,
) -> ProcessOutput {
  let algorithm = action.integrity_algorithm;
  let digest = |bytes: &[u8]| algorithm.map(|algorithm| algorithm.digest(bytes));
  let source_map = action
    .source_map
    .as_ref()
    .filter(|_| options.source_map.scripts);

  let mut output = ProcessOutput {
    result: ProcessResult {
      name: action.file_name.clone(),
      integrity: digest(action.code.as_bytes()),
      ..ProcessResult::default()
    },
    ..ProcessOutput::default()
  };

  let downlevel = if action.requires_downlevel {
    match downlevel_variant(action, options) {
      Ok(downlevel) => Some(downlevel),
      Err(error) => {
        output.result.diagnostics.push(
          Diagnostic::error(format!(
            "Failed to downlevel {}: {:#}",
            action.file_name, error
          ))
          .with_file(action.file_name.clone())
          .with_origin("postbuild:process-bundle"),
        );
        None
      }
    }
  } else {
    None
  };

  // The original is only dropped when a downleveled replacement exists
  if action.ignore_original && downlevel.is_some() {
    output.removed.push(action.file_name.clone());
    output.removed.push(map_filename(&action.file_name));
  } else {
    let code = match siblings {
      Some(siblings) => {
        let code = rewrite_runtime(&action.code, Variant::Original, siblings, algorithm);
        output.files.push(OutputFile {
          filename: action.file_name.clone(),
          contents: code.clone(),
        });
        code
      }
      None => action.code.clone(),
    };

    output.result.original = Some(ProcessedArtifact {
      filename: action.file_name.clone(),
      size: code.len() as u64,
      integrity: digest(code.as_bytes()),
      map: source_map.map(|map| ProcessedMap {
        filename: map_filename(&action.file_name),
        size: map.len() as u64,
      }),
    });
  }

  if let Some(TransformOutput { code, source_map }) = downlevel {
    let filename = downlevel_filename(&action.file_name);
    let mut code = code;
    if action.is_runtime {
      code = LAZY_CHUNK_TAG.replace_all(&code, "\"-es5.").into_owned();
    }
    if let Some(siblings) = siblings {
      code = rewrite_runtime(&code, Variant::Downlevel, siblings, algorithm);
    }

    let map = match source_map.map(String::from_utf8) {
      Some(Ok(map)) => Some(map),
      Some(Err(error)) => {
        output.result.diagnostics.push(
          Diagnostic::warning(format!("Discarding invalid source map for {}: {}", filename, error))
            .with_file(filename.clone()),
        );
        None
      }
      None => None,
    };

    if map.is_some() && !options.source_map.hidden {
      code = append_sourcemap_url(&code, basename(&map_filename(&filename)));
    }

    output.result.downlevel = Some(ProcessedArtifact {
      filename: filename.clone(),
      size: code.len() as u64,
      integrity: digest(code.as_bytes()),
      map: map.as_ref().map(|map| ProcessedMap {
        filename: map_filename(&filename),
        size: map.len() as u64,
      }),
    });

    output.files.push(OutputFile {
      filename: filename.clone(),
      contents: code,
    });
    if let Some(map) = map {
      output.files.push(OutputFile {
        filename: map_filename(&filename),
        contents: map,
      });
    }
  }

  output
}

fn downlevel_variant(
  action: &ProcessAction,
  options: &ProcessBundleOptions,
) -> anyhow::Result<TransformOutput> {
  let input_map = action
    .source_map
    .as_ref()
    .filter(|_| options.source_map.scripts);
  let with_map = input_map.is_some();

  let code = remove_sourcemap_url(&action.code);
  let mut output = downlevel_to_es5(
    code,
    &DownlevelOptions {
      minify: false,
      source_map: with_map,
    },
  )?;

  if action.requires_optimize {
    let optimized = optimize_script(
      &output.code,
      &OptimizationOptions {
        target: EcmaTarget::Es5,
        ..options.optimization.clone()
      },
      with_map,
    )?;

    let source_map = match (output.source_map, optimized.source_map) {
      (Some(downlevel), Some(optimized)) => Some(compose_source_maps(&downlevel, &optimized)?),
      _ => None,
    };
    output = TransformOutput {
      code: optimized.code,
      source_map,
    };
  }

  for (from, to) in &action.side_effect_free_replacements {
    output.code = output.code.replace(from.as_str(), to);
  }

  if let (Some(input), Some(transform)) = (input_map, &output.source_map) {
    let composed = compose_source_maps(input.as_bytes(), transform)?;
    output.source_map = Some(rename_source_map_file(
      &composed,
      basename(&downlevel_filename(&action.file_name)),
    )?);
  }

  Ok(output)
}

/// Replace stale digests of sibling inputs with the digests of the matching variant and
/// add the integrity manifest
fn rewrite_runtime(
  code: &str,
  variant: Variant,
  siblings: &[ProcessResult],
  algorithm: Option<IntegrityAlgorithm>,
) -> String {
  let mut code = code.to_string();
  let mut manifest = serde_json::Map::new();

  for sibling in siblings {
    let artifact = match variant {
      Variant::Original => sibling.original.as_ref(),
      Variant::Downlevel => sibling.downlevel.as_ref(),
    };
    let Some(artifact) = artifact else {
      continue;
    };

    if let (Some(stale), Some(integrity)) = (&sibling.integrity, &artifact.integrity) {
      if stale != integrity {
        code = code.replace(stale.as_str(), integrity);
      }
    }

    if let Some(integrity) = &artifact.integrity {
      manifest.insert(
        artifact.filename.clone(),
        serde_json::Value::String(integrity.clone()),
      );
    }
  }

  if algorithm.is_none() {
    return code;
  }

  let statement = format!(
    "var {} = {};",
    INTEGRITY_MANIFEST_GLOBAL,
    serde_json::Value::Object(manifest)
  );
  insert_before_sourcemap_url(&code, &statement)
}

/// Apply the effects of processing a bundle to the output directory
pub fn write_process_output(
  fs: &dyn FileSystem,
  output_path: &Path,
  output: &ProcessOutput,
) -> std::io::Result<()> {
  for removed in &output.removed {
    let path = output_path.join(removed);
    if fs.is_file(&path) {
      fs.remove_file(&path)?;
    }
  }

  for file in &output.files {
    fs.write(&output_path.join(&file.filename), file.contents.as_bytes())?;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use postbuild_filesystem::InMemoryFileSystem;
  use pretty_assertions::assert_eq;

  use super::*;

  fn action(file_name: &str, code: &str) -> ProcessAction {
    ProcessAction {
      name: file_name.to_string(),
      file_name: file_name.to_string(),
      code: code.to_string(),
      ..ProcessAction::default()
    }
  }

  fn options() -> ProcessBundleOptions {
    ProcessBundleOptions {
      output_path: PathBuf::from("/dist"),
      ..ProcessBundleOptions::default()
    }
  }

  #[test]
  fn test_downlevel_filename() {
    assert_eq!(downlevel_filename("main-es2015.js"), "main-es5.js");
    assert_eq!(downlevel_filename("main-es2017.abc123.js"), "main-es5.abc123.js");
    assert_eq!(downlevel_filename("polyfills-esnext.js"), "polyfills-es5.js");
    assert_eq!(downlevel_filename("main.js"), "main-es5.js");
    assert_eq!(downlevel_filename("polyfills-es5.js"), "polyfills-es5.js");
    assert_eq!(downlevel_filename("vendor"), "vendor-es5");
    assert_eq!(downlevel_filename("polyfills-es5-es2015.js"), "polyfills-es5-es5.js");
    assert_eq!(downlevel_filename("vendor-esnext-es2018.abc.js"), "vendor-esnext-es5.abc.js");
    assert_eq!(downlevel_filename("polyfills-es5.abc123.js"), "polyfills-es5.abc123.js");
  }

  #[test]
  fn test_passes_original_through() {
    let output = process_bundle(&action("main.js", "console.log(1);"), &options());

    assert_eq!(
      output,
      ProcessOutput {
        result: ProcessResult {
          name: String::from("main.js"),
          original: Some(ProcessedArtifact {
            filename: String::from("main.js"),
            size: 15,
            ..ProcessedArtifact::default()
          }),
          ..ProcessResult::default()
        },
        ..ProcessOutput::default()
      }
    );
  }

  #[test]
  fn test_computes_integrity_of_every_artifact() {
    let code = "alert('Hello, world.');";
    let output = process_bundle(
      &ProcessAction {
        integrity_algorithm: Some(IntegrityAlgorithm::Sha384),
        requires_downlevel: true,
        ..action("main-es2015.js", code)
      },
      &options(),
    );

    let expected = "sha384-H8BRh8j48O9oYatfu5AZzq6A9RINhZO5H16dQZngK7T62em8MUt1FLm52t+eX6xO";
    assert_eq!(output.result.integrity.as_deref(), Some(expected));
    assert_eq!(
      output.result.original.unwrap().integrity.as_deref(),
      Some(expected)
    );

    let downlevel = output.result.downlevel.unwrap();
    assert_eq!(
      downlevel.integrity,
      Some(IntegrityAlgorithm::Sha384.digest(output.files[0].contents.as_bytes()))
    );
  }

  #[test]
  fn test_downlevels_into_es5_file() {
    let output = process_bundle(
      &ProcessAction {
        requires_downlevel: true,
        side_effect_free_replacements: vec![(
          String::from("worker-es2015.js"),
          String::from("worker-es5.js"),
        )],
        ..action(
          "main-es2015.js",
          "const start = () => new Worker(\"worker-es2015.js\");",
        )
      },
      &options(),
    );

    assert_eq!(output.files.len(), 1);
    let file = &output.files[0];
    assert_eq!(file.filename, "main-es5.js");
    assert!(!file.contents.contains("=>"));
    assert!(file.contents.contains("worker-es5.js"));
    assert_eq!(
      output.result.downlevel.unwrap().size,
      file.contents.len() as u64
    );
    assert!(output.result.original.is_some());
  }

  #[test]
  fn test_downlevel_source_map() {
    let input_map = r#"{"version":3,"file":"main-es2015.js","sources":["main.ts"],"names":[],"mappings":"AAAA"}"#;
    let output = process_bundle(
      &ProcessAction {
        requires_downlevel: true,
        source_map: Some(input_map.to_string()),
        ..action(
          "main-es2015.js",
          "const a = () => 1;\n//# sourceMappingURL=main-es2015.js.map",
        )
      },
      &ProcessBundleOptions {
        source_map: SourceMapOptions {
          scripts: true,
          ..SourceMapOptions::default()
        },
        ..options()
      },
    );

    let filenames = output
      .files
      .iter()
      .map(|file| file.filename.as_str())
      .collect::<Vec<_>>();
    assert_eq!(filenames, vec!["main-es5.js", "main-es5.js.map"]);
    assert!(output.files[0]
      .contents
      .ends_with("//# sourceMappingURL=main-es5.js.map\n"));

    let map: serde_json::Value = serde_json::from_str(&output.files[1].contents).unwrap();
    assert_eq!(map["file"], "main-es5.js");
    assert_eq!(map["sources"][0], "main.ts");
  }

  #[test]
  fn test_ignore_original_removes_files() {
    let output = process_bundle(
      &ProcessAction {
        requires_downlevel: true,
        ignore_original: true,
        ..action("polyfills-es5.js", "var a = 1;")
      },
      &options(),
    );

    assert_eq!(output.result.original, None);
    assert_eq!(
      output.removed,
      vec![
        String::from("polyfills-es5.js"),
        String::from("polyfills-es5.js.map")
      ]
    );
    assert_eq!(
      output.result.downlevel.map(|artifact| artifact.filename),
      Some(String::from("polyfills-es5.js"))
    );
  }

  #[test]
  fn test_downlevel_failure_keeps_original() {
    let output = process_bundle(
      &ProcessAction {
        requires_downlevel: true,
        ignore_original: true,
        ..action("main-es2015.js", "function (")
      },
      &options(),
    );

    assert!(output.result.has_errors());
    assert_eq!(output.result.downlevel, None);
    assert!(output.result.original.is_some());
    assert!(output.removed.is_empty());
  }

  #[test]
  fn test_runtime_receives_integrity_manifest() {
    let algorithm = IntegrityAlgorithm::Sha384;
    let stale = algorithm.digest(b"main before");
    let fresh_original = algorithm.digest(b"main after");
    let fresh_downlevel = algorithm.digest(b"main es5");

    let siblings = vec![ProcessResult {
      name: String::from("main-es2015.js"),
      integrity: Some(stale.clone()),
      original: Some(ProcessedArtifact {
        filename: String::from("main-es2015.js"),
        size: 10,
        integrity: Some(fresh_original.clone()),
        map: None,
      }),
      downlevel: Some(ProcessedArtifact {
        filename: String::from("main-es5.js"),
        size: 8,
        integrity: Some(fresh_downlevel.clone()),
        map: None,
      }),
      diagnostics: vec![],
    }];

    let code = format!(
      "var integrity = {{ 1: \"{}\" }};\nvar chunk = \"main\" + \"-es2015.js\";\n//# sourceMappingURL=runtime-es2015.js.map",
      stale
    );
    let output = process_runtime(
      &ProcessAction {
        is_runtime: true,
        requires_downlevel: true,
        integrity_algorithm: Some(algorithm),
        ..action("runtime-es2015.js", &code)
      },
      &siblings,
      &options(),
    );

    let original = &output.files[0];
    assert_eq!(original.filename, "runtime-es2015.js");
    assert!(original.contents.contains(&fresh_original));
    assert!(!original.contents.contains(&stale));
    assert!(original.contents.ends_with(&format!(
      "var __POSTBUILD_INTEGRITY__ = {{\"main-es2015.js\":\"{}\"}};\n//# sourceMappingURL=runtime-es2015.js.map",
      fresh_original
    )));

    let downlevel = &output.files[1];
    assert_eq!(downlevel.filename, "runtime-es5.js");
    assert!(downlevel.contents.contains(&fresh_downlevel));
    assert!(downlevel.contents.contains("\"-es5.js\""));
    assert!(downlevel.contents.contains(&format!(
      "var __POSTBUILD_INTEGRITY__ = {{\"main-es5.js\":\"{}\"}};",
      fresh_downlevel
    )));

    assert_eq!(
      output.result.original.unwrap().integrity,
      Some(algorithm.digest(original.contents.as_bytes()))
    );
  }

  #[test]
  fn test_write_process_output() {
    let fs = InMemoryFileSystem::default();
    fs.write(Path::new("/dist/polyfills-es5.js"), b"old").unwrap();

    write_process_output(
      &fs,
      Path::new("/dist"),
      &ProcessOutput {
        files: vec![OutputFile {
          filename: String::from("polyfills-es5.js"),
          contents: String::from("new"),
        }],
        removed: vec![
          String::from("polyfills-es5.js"),
          String::from("polyfills-es5.js.map"),
        ],
        ..ProcessOutput::default()
      },
    )
    .unwrap();

    assert_eq!(fs.files(), vec![PathBuf::from("/dist/polyfills-es5.js")]);
    assert_eq!(
      fs.read_to_string(Path::new("/dist/polyfills-es5.js"))
        .unwrap(),
      "new"
    );
  }
}
