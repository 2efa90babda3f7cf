use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use postbuild_core::diagnostic::Diagnostic;
use postbuild_core::types::Translations;
use postbuild_filesystem::FileSystem;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TranslationFile {
  locale: Option<String>,
  #[serde(default)]
  translations: HashMap<String, String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct LoadedTranslations {
  pub translations: Translations,
  pub diagnostics: Vec<Diagnostic>,
}

/// Merge the translation catalogs of a locale in order.
///
/// A message translated by several files keeps the last translation and produces a warning.
/// Unreadable or malformed catalogs are fatal.
pub fn load_translations(
  fs: &dyn FileSystem,
  project_root: &Path,
  locale: &str,
  files: &[PathBuf],
) -> anyhow::Result<LoadedTranslations> {
  let mut loaded = LoadedTranslations::default();

  for file in files {
    let path = project_root.join(file);
    let contents = fs
      .read_to_string(&path)
      .with_context(|| format!("Unable to load translation file {}", path.display()))?;
    let catalog: TranslationFile = serde_json::from_str(&contents)
      .with_context(|| format!("Invalid translation file {}", path.display()))?;

    if let Some(file_locale) = &catalog.locale {
      if file_locale != locale {
        loaded.diagnostics.push(
          Diagnostic::warning(format!(
            "File target locale (\"{}\") does not match configured locale (\"{}\")",
            file_locale, locale
          ))
          .with_file(path.display().to_string())
          .with_origin("postbuild:i18n"),
        );
      }
    }

    let mut ids = catalog.translations.into_iter().collect::<Vec<_>>();
    ids.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (id, text) in ids {
      if loaded.translations.insert(id.clone(), text).is_some() {
        loaded.diagnostics.push(
          Diagnostic::warning(format!(
            "Duplicate translations for message \"{}\" when merging \"{}\"",
            id,
            path.display()
          ))
          .with_origin("postbuild:i18n"),
        );
      }
    }
  }

  tracing::debug!(
    locale,
    messages = loaded.translations.len(),
    "Loaded translations"
  );
  Ok(loaded)
}
