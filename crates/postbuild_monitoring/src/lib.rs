//! This module configures tracing for the postbuild pipeline.
//!
//! Tracing to stdout and chrome profiles is disabled by default.
//!
//! Monitoring should only be initialized once.
use std::sync::Mutex;

pub use from_env::optional_bool_var;
pub use from_env::optional_usize_var;
pub use from_env::optional_var;
pub use from_env::FromEnvError;
pub use tracer::TracerMode;

mod from_env;
mod tracer;

pub static MONITORING_GUARD: Mutex<Option<MonitoringGuard>> = Mutex::new(None);

#[derive(Default)]
pub struct MonitoringGuard {
  #[allow(unused)]
  tracer: Option<tracer::Tracer>,
}

#[derive(Debug, Default)]
pub struct MonitoringOptions {
  pub tracing_options: Vec<TracerMode>,
}

impl MonitoringOptions {
  pub fn from_env() -> Result<Self, FromEnvError> {
    Ok(Self {
      tracing_options: TracerMode::from_env()?,
    })
  }
}

pub fn initialize_monitoring(options: MonitoringOptions) -> anyhow::Result<()> {
  let mut global = MONITORING_GUARD
    .lock()
    .map_err(|_| anyhow::anyhow!("Monitoring guard is poisoned"))?;
  if global.is_some() {
    tracing::warn!("Monitoring is getting set-up twice, this will no-op");
    return Ok(());
  }

  let tracer = Some(tracer::Tracer::new(&options.tracing_options)?);
  *global = Some(MonitoringGuard { tracer });

  Ok(())
}

pub fn initialize_from_env() -> anyhow::Result<()> {
  initialize_monitoring(MonitoringOptions::from_env()?)
}

/// Flush pending log lines by dropping the tracer guards
pub fn close_monitoring() {
  let Ok(mut monitoring_guard) = MONITORING_GUARD.lock() else {
    return;
  };
  if let Some(guard) = monitoring_guard.as_mut() {
    tracing::debug!("Flushing tracing output");
    guard.tracer.take();
  }
}
