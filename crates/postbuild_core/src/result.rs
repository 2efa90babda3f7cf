use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::diagnostic::Diagnostics;

pub type PostbuildResult<T> = std::result::Result<T, PostbuildError>;

#[derive(Error, Debug)]
pub enum PostbuildError {
  #[error("{}", .0)]
  Io(#[from] std::io::Error),

  #[error("{}", .0)]
  Diagnostic(#[from] Diagnostic),

  #[error("{}", .0)]
  Diagnostics(#[from] Diagnostics),

  #[error("{}", .0)]
  Message(String),

  #[error("{}", .0)]
  Unknown(anyhow::Error),
}

impl From<anyhow::Error> for PostbuildError {
  fn from(error: anyhow::Error) -> Self {
    match error.downcast::<Diagnostic>() {
      Ok(diagnostic) => PostbuildError::Diagnostic(diagnostic),
      Err(error) => match error.downcast::<std::io::Error>() {
        Ok(error) => PostbuildError::Io(error),
        Err(error) => PostbuildError::Unknown(error),
      },
    }
  }
}

impl PostbuildError {
  /// Flatten the error into the diagnostics reported to the user
  pub fn into_diagnostics(self) -> Vec<Diagnostic> {
    match self {
      PostbuildError::Diagnostic(diagnostic) => vec![diagnostic],
      PostbuildError::Diagnostics(diagnostics) => diagnostics.into_inner(),
      PostbuildError::Io(error) => vec![Diagnostic::error(error.to_string())],
      PostbuildError::Message(message) => vec![Diagnostic::error(message)],
      PostbuildError::Unknown(error) => vec![Diagnostic::error(format!("{:#}", error))],
    }
  }
}
