//! This module configures `tracing_subscriber` to write to a log file and, optionally, to
//! standard output or a chrome profile.
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::anyhow;
use serde::Deserialize;
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::from_env::optional_var;
use crate::from_env::FromEnvError;

const TRACING_MODE_VAR: &str = "POSTBUILD_TRACING_MODE";

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum TracerMode {
  /// Output the Tracer logs to Stdout
  Stdout,
  /// Output a Chrome profile
  Chrome,
}

impl TracerMode {
  pub fn from_env() -> Result<Vec<Self>, FromEnvError> {
    let Some(mode) = optional_var(TRACING_MODE_VAR) else {
      return Ok(vec![]);
    };

    let mut tracer_modes = vec![];
    for mode in mode.split(',').map(|s| s.trim()) {
      let tracer_mode = match mode {
        "stdout" => Self::Stdout,
        "chrome" => Self::Chrome,
        // The log file is always written
        "file" => continue,
        value => {
          return Err(FromEnvError::InvalidKey(
            String::from(TRACING_MODE_VAR),
            anyhow!("Invalid value: {}", value),
          ))
        }
      };

      if !tracer_modes.contains(&tracer_mode) {
        tracer_modes.push(tracer_mode);
      }
    }

    Ok(tracer_modes)
  }
}

enum TracerGuard {
  #[allow(unused)]
  WorkerGuard(WorkerGuard),
  #[allow(unused)]
  ChromeGuard(tracing_chrome::FlushGuard),
}

pub struct Tracer {
  #[allow(unused)]
  worker_guards: Arc<Mutex<Vec<TracerGuard>>>,
}

impl Tracer {
  pub fn new(options: &[TracerMode]) -> anyhow::Result<Self> {
    let mut worker_guards = vec![];

    let directory = std::env::temp_dir()
      .join("postbuild_trace")
      .to_string_lossy()
      .to_string();
    let file_appender = tracing_appender::rolling::Builder::new()
      .rotation(tracing_appender::rolling::Rotation::HOURLY)
      .max_log_files(4)
      .filename_prefix("postbuild-tracing")
      .build(&directory)
      .map_err(|err| anyhow!(err))?;
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);

    let layer = tracing_subscriber::fmt::layer()
      .with_writer(non_blocking)
      .with_span_events(FmtSpan::CLOSE)
      .with_filter(EnvFilter::from_default_env());

    worker_guards.push(TracerGuard::WorkerGuard(worker_guard));

    let stdout_layer = if options.contains(&TracerMode::Stdout) {
      let (non_blocking, worker_guard) = tracing_appender::non_blocking(std::io::stdout());
      let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_filter(EnvFilter::from_default_env());

      worker_guards.push(TracerGuard::WorkerGuard(worker_guard));

      Some(stdout_layer)
    } else {
      None
    };

    let chrome_layer = if options.contains(&TracerMode::Chrome) {
      let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .include_args(true)
        .build();

      worker_guards.push(TracerGuard::ChromeGuard(guard));

      Some(chrome_layer)
    } else {
      None
    };

    let subscriber = Registry::default()
      .with(layer)
      .with(stdout_layer)
      .with(chrome_layer);

    // A global subscriber may already be installed by an embedding process
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
      tracing::debug!("Tracing subscriber already set: {}", error);
    }

    Ok(Self {
      worker_guards: Arc::new(Mutex::new(worker_guards)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

  #[test]
  fn test_tracing_options_sets_to_none_if_no_mode_is_set() {
    let _guard = TEST_LOCK.lock();
    std::env::remove_var(TRACING_MODE_VAR);
    let options = TracerMode::from_env().unwrap();
    assert!(options.is_empty());
  }

  #[test]
  fn test_tracing_options_are_deduplicated() {
    let _guard = TEST_LOCK.lock();
    std::env::set_var(TRACING_MODE_VAR, "stdout, file, stdout,chrome");
    let options = TracerMode::from_env().unwrap();
    assert_eq!(options, vec![TracerMode::Stdout, TracerMode::Chrome]);
    std::env::remove_var(TRACING_MODE_VAR);
  }

  #[test]
  fn test_tracing_options_reject_unknown_modes() {
    let _guard = TEST_LOCK.lock();
    std::env::set_var(TRACING_MODE_VAR, "sentry");
    assert!(TracerMode::from_env().is_err());
    std::env::remove_var(TRACING_MODE_VAR);
  }
}
