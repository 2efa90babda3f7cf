use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::types::InlineAction;
use postbuild_core::types::InlineResult;
use postbuild_core::types::MissingTranslation;
use postbuild_core::types::MissingTranslationFallback;
use postbuild_core::types::SourceMapOptions;
use postbuild_core::types::Translations;
use postbuild_filesystem::FileSystem;
use postbuild_sourcemap::append_sourcemap_url;
use postbuild_sourcemap::compose_source_maps;
use postbuild_sourcemap::remove_sourcemap_url;
use postbuild_sourcemap::rename_source_map_file;
use postbuild_transforms::inline_translations;
use postbuild_transforms::LocalizeOptions;

const LOCALIZE_MARKER: &str = "$localize";

/// Settings shared by the inline actions of every locale
#[derive(Debug, Default)]
pub struct InlineContext {
  /// Output directory of each locale
  pub output_paths: BTreeMap<String, PathBuf>,

  pub source_locale: String,
  pub translations: HashMap<String, Arc<Translations>>,
  pub missing_translation: MissingTranslation,
  pub missing_translation_fallback: MissingTranslationFallback,
  pub source_map: SourceMapOptions,

  /// Emit inlined code without whitespace
  pub minify: bool,
}

/// Write the `action.locale` build of one processed file into the locale's output directory
#[tracing::instrument(level = "trace", skip_all, fields(file = %action.filename, locale = %action.locale))]
pub fn inline_locale(
  action: &InlineAction,
  context: &InlineContext,
  fs: &dyn FileSystem,
) -> anyhow::Result<InlineResult> {
  let output_dir = context
    .output_paths
    .get(&action.locale)
    .ok_or_else(|| anyhow!("No output path configured for locale {}", action.locale))?;
  let input_map = action
    .source_map
    .as_deref()
    .filter(|_| context.source_map.scripts);

  let mut result = InlineResult {
    file: action.filename.clone(),
    locale: action.locale.clone(),
    ..InlineResult::default()
  };

  if !action.code.contains(LOCALIZE_MARKER) && !action.is_main_chunk {
    write_file(fs, output_dir, &action.filename, &action.code, input_map)?;
    return Ok(result);
  }

  let empty = Translations::new();
  let translations = context
    .translations
    .get(&action.locale)
    .map(|translations| translations.as_ref())
    .unwrap_or(&empty);

  let inlined = inline_translations(
    remove_sourcemap_url(&action.code),
    &LocalizeOptions {
      locale: &action.locale,
      source_locale: &context.source_locale,
      translations,
      missing_translation: context.missing_translation,
      fallback: &context.missing_translation_fallback,
      downleveled: action.is_downleveled,
      set_locale: action.is_main_chunk,
      minify: context.minify,
      source_map: input_map.is_some(),
    },
  );

  let inlined = match inlined {
    Ok(inlined) => inlined,
    Err(error) => {
      result.diagnostics.push(
        Diagnostic::error(format!(
          "Failed to inline translations into {}: {}",
          action.filename, error
        ))
        .with_file(action.filename.clone())
        .with_origin("postbuild:i18n"),
      );
      write_file(fs, output_dir, &action.filename, &action.code, input_map)?;
      return Ok(result);
    }
  };

  result.substitution_count = inlined.substitution_count;
  result.diagnostics = inlined
    .diagnostics
    .into_iter()
    .map(|diagnostic| diagnostic.with_file(action.filename.clone()))
    .collect();

  let map = match (input_map, &inlined.output.source_map) {
    (Some(input), Some(transform)) => {
      let composed = compose_source_maps(input.as_bytes(), transform)?;
      let renamed = rename_source_map_file(&composed, basename(&action.filename))?;
      Some(String::from_utf8(renamed)?)
    }
    _ => None,
  };

  let mut code = inlined.output.code;
  if map.is_some() && !context.source_map.hidden {
    code = append_sourcemap_url(&code, &format!("{}.map", basename(&action.filename)));
  }

  let path = output_dir.join(&action.filename);
  fs.write(&path, code.as_bytes())?;
  if let Some(map) = map {
    fs.write(&map_path(&path), map.as_bytes())?;
  }

  Ok(result)
}

/// Copy files untouched by inlining into each locale directory so that every locale holds a
/// complete build
pub fn copy_to_locale(
  fs: &dyn FileSystem,
  output_path: &Path,
  locale_dir: &Path,
  files: &[String],
) -> std::io::Result<()> {
  if output_path == locale_dir {
    return Ok(());
  }

  for file in files {
    let from = output_path.join(file);
    if fs.is_file(&from) {
      fs.copy(&from, &locale_dir.join(file))?;
    }
  }

  Ok(())
}

fn write_file(
  fs: &dyn FileSystem,
  output_dir: &Path,
  filename: &str,
  code: &str,
  map: Option<&str>,
) -> std::io::Result<()> {
  let path = output_dir.join(filename);
  fs.write(&path, code.as_bytes())?;
  if let Some(map) = map {
    fs.write(&map_path(&path), map.as_bytes())?;
  }
  Ok(())
}

fn map_path(path: &Path) -> PathBuf {
  let mut path = path.as_os_str().to_owned();
  path.push(".map");
  PathBuf::from(path)
}

fn basename(filename: &str) -> &str {
  Path::new(filename)
    .file_name()
    .and_then(|name| name.to_str())
    .unwrap_or(filename)
}

#[cfg(test)]
mod tests {
  use postbuild_filesystem::InMemoryFileSystem;
  use pretty_assertions::assert_eq;

  use super::*;

  fn context() -> InlineContext {
    InlineContext {
      output_paths: BTreeMap::from([
        (String::from("en-US"), PathBuf::from("/dist/en-US")),
        (String::from("fr"), PathBuf::from("/dist/fr")),
      ]),
      source_locale: String::from("en-US"),
      translations: HashMap::from([(
        String::from("fr"),
        Arc::new(Translations::from([(
          String::from("greeting"),
          String::from("Bonjour {$name} !"),
        )])),
      )]),
      ..InlineContext::default()
    }
  }

  fn action(filename: &str, code: &str, locale: &str) -> InlineAction {
    InlineAction {
      filename: filename.to_string(),
      code: Arc::from(code),
      source_map: None,
      locale: locale.to_string(),
      is_downleveled: false,
      is_main_chunk: false,
    }
  }

  #[test]
  fn test_inlines_translation_into_locale_directory() {
    let fs = InMemoryFileSystem::default();

    let result = inline_locale(
      &action(
        "lazy.js",
        "const title = $localize`:@@greeting:Hello ${user}:name: !`;",
        "fr",
      ),
      &context(),
      &fs,
    )
    .unwrap();

    assert_eq!(
      result,
      InlineResult {
        file: String::from("lazy.js"),
        locale: String::from("fr"),
        substitution_count: 1,
        diagnostics: vec![],
      }
    );
    assert_eq!(
      fs.read_to_string(Path::new("/dist/fr/lazy.js")).unwrap(),
      "const title = `Bonjour ${user} !`;\n"
    );
  }

  #[test]
  fn test_copies_files_without_markers() {
    let fs = InMemoryFileSystem::default();

    let result = inline_locale(&action("vendor.js", "var a = 1;", "fr"), &context(), &fs).unwrap();

    assert_eq!(result.substitution_count, 0);
    assert_eq!(
      fs.read_to_string(Path::new("/dist/fr/vendor.js")).unwrap(),
      "var a = 1;"
    );
  }

  #[test]
  fn test_main_chunk_receives_locale() {
    let fs = InMemoryFileSystem::default();

    inline_locale(
      &InlineAction {
        is_main_chunk: true,
        ..action("main.js", "bootstrap();", "fr")
      },
      &context(),
      &fs,
    )
    .unwrap();

    let code = fs.read_to_string(Path::new("/dist/fr/main.js")).unwrap();
    assert!(code.starts_with("var $localize = Object.assign(void 0 === $localize ? {} : $localize, {"));
    assert!(code.contains("locale: \"fr\""));
    assert!(code.contains("bootstrap();"));
  }

  #[test]
  fn test_missing_translation_is_reported_on_file() {
    let fs = InMemoryFileSystem::default();

    let result = inline_locale(
      &action("lazy.js", "const a = $localize`Untranslated`;", "fr"),
      &context(),
      &fs,
    )
    .unwrap();

    assert_eq!(
      result.diagnostics,
      vec![Diagnostic::warning(
        "No translation found for \"Untranslated\" (\"Untranslated\")."
      )
      .with_origin("postbuild:i18n")
      .with_file("lazy.js")]
    );
  }

  #[test]
  fn test_composes_source_maps() {
    let fs = InMemoryFileSystem::default();
    let input_map = r#"{"version":3,"file":"main.js","sources":["main.ts"],"names":[],"mappings":"AAAA"}"#;

    inline_locale(
      &InlineAction {
        source_map: Some(Arc::from(input_map)),
        ..action(
          "main.js",
          "const a = $localize`:@@greeting:Hi ${b}:name:`;\n//# sourceMappingURL=main.js.map",
          "fr",
        )
      },
      &InlineContext {
        source_map: SourceMapOptions {
          scripts: true,
          ..SourceMapOptions::default()
        },
        ..context()
      },
      &fs,
    )
    .unwrap();

    let code = fs.read_to_string(Path::new("/dist/fr/main.js")).unwrap();
    assert!(code.ends_with("//# sourceMappingURL=main.js.map\n"));

    let map: serde_json::Value =
      serde_json::from_str(&fs.read_to_string(Path::new("/dist/fr/main.js.map")).unwrap())
        .unwrap();
    assert_eq!(map["file"], "main.js");
    assert_eq!(map["sources"][0], "main.ts");
  }

  #[test]
  fn test_copy_to_locale() {
    let fs = InMemoryFileSystem::default();
    fs.write(Path::new("/dist/styles.css"), b"body{}").unwrap();

    copy_to_locale(
      &fs,
      Path::new("/dist"),
      Path::new("/dist/fr"),
      &[String::from("styles.css"), String::from("missing.txt")],
    )
    .unwrap();

    assert_eq!(
      fs.read_to_string(Path::new("/dist/fr/styles.css")).unwrap(),
      "body{}"
    );
  }
}
