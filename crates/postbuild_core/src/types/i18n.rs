use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Message id to translated text, placeholders written as `{$NAME}`
pub type Translations = HashMap<String, String>;

/// What to report when a message has no translation for the target locale
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingTranslation {
  Error,
  #[default]
  Warning,
  Ignore,
}

/// Text substituted for a message without a translation
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingTranslationFallback {
  /// The message as written in the source locale
  #[default]
  Source,
  /// The message id
  MessageId,
  /// A fixed replacement text
  Text(String),
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocaleOptions {
  /// Translation catalogs, merged in order
  pub translation: Vec<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct I18nOptions {
  pub source_locale: String,
  pub locales: BTreeMap<String, LocaleOptions>,

  /// Locales to produce an output directory for. All configured locales plus the
  /// source locale when empty.
  pub inline_locales: Vec<String>,

  pub missing_translation: MissingTranslation,
  pub missing_translation_fallback: MissingTranslationFallback,
}

impl Default for I18nOptions {
  fn default() -> Self {
    Self {
      source_locale: String::from("en-US"),
      locales: BTreeMap::new(),
      inline_locales: Vec::new(),
      missing_translation: MissingTranslation::default(),
      missing_translation_fallback: MissingTranslationFallback::default(),
    }
  }
}

impl I18nOptions {
  pub fn should_inline(&self) -> bool {
    !self.inline_locales.is_empty() || !self.locales.is_empty()
  }

  /// Locales that get an output directory, in a stable order
  pub fn output_locales(&self) -> Vec<String> {
    if !self.inline_locales.is_empty() {
      return self.inline_locales.clone();
    }

    let mut locales = vec![self.source_locale.clone()];
    for locale in self.locales.keys() {
      if !locales.contains(locale) {
        locales.push(locale.clone());
      }
    }
    locales
  }
}
