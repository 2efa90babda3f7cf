use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::Diagnostic;

#[derive(Error, Default, Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
  pub fn as_ref(&self) -> &Vec<Diagnostic> {
    &self.0
  }

  pub fn into_inner(self) -> Vec<Diagnostic> {
    self.0
  }

  pub fn push(&mut self, diagnostic: Diagnostic) {
    self.0.push(diagnostic);
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn has_errors(&self) -> bool {
    self.0.iter().any(Diagnostic::is_error)
  }

  pub fn has_warnings(&self) -> bool {
    self.0.iter().any(Diagnostic::is_warning)
  }

  pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
    self.0.iter().filter(|d| d.is_error())
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
    self.0.iter().filter(|d| d.is_warning())
  }
}

impl Extend<Diagnostic> for Diagnostics {
  fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
    self.0.extend(iter);
  }
}

impl Display for Diagnostics {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut output = String::new();
    for diagnostic in &self.0 {
      output += &format!("{}\n", diagnostic);
    }
    write!(f, "{}", output)
  }
}

impl Serialize for Diagnostics {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    self.0.serialize(serializer)
  }
}

impl From<Vec<Diagnostic>> for Diagnostics {
  fn from(diagnostics: Vec<Diagnostic>) -> Self {
    Diagnostics(diagnostics)
  }
}

impl From<Diagnostic> for Diagnostics {
  fn from(diagnostic: Diagnostic) -> Self {
    Diagnostics(vec![diagnostic])
  }
}
