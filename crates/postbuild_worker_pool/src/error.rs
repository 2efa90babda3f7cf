use std::any::Any;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
  #[error("{0}")]
  Failed(anyhow::Error),
  #[error("Worker task panicked: {0}")]
  Panicked(String),
  #[error("Worker task did not complete within {0:?}")]
  TimedOut(Duration),
  #[error("Worker task was cancelled before completing")]
  Cancelled,
}

impl TaskError {
  pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
      message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
      message.clone()
    } else {
      String::from("unknown panic payload")
    };

    TaskError::Panicked(message)
  }
}
