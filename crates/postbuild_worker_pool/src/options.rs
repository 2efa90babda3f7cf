use std::time::Duration;

use postbuild_monitoring::optional_usize_var;
use postbuild_monitoring::optional_var;
use postbuild_monitoring::FromEnvError;

#[derive(Clone, Debug, PartialEq)]
pub struct WorkerPoolOptions {
  pub max_workers: usize,

  /// Deadline for each task, measured from when a worker starts running it
  pub task_timeout: Option<Duration>,
}

impl Default for WorkerPoolOptions {
  fn default() -> Self {
    Self {
      max_workers: num_cpus::get(),
      task_timeout: None,
    }
  }
}

impl WorkerPoolOptions {
  /// Resolve the number of workers from the environment.
  ///
  /// * `CI` set to anything but `0`/`false` forces a single worker
  /// * `POSTBUILD_MAX_WORKERS` overrides `configured`
  /// * Otherwise `configured`, defaulting to the number of CPUs
  pub fn from_env(
    configured: Option<usize>,
    task_timeout: Option<Duration>,
  ) -> Result<Self, FromEnvError> {
    let is_ci = optional_var("CI")
      .map(|value| !matches!(value.trim().to_lowercase().as_str(), "0" | "false"))
      .unwrap_or(false);

    let max_workers = if is_ci {
      1
    } else if let Some(max_workers) = optional_usize_var("POSTBUILD_MAX_WORKERS")? {
      max_workers
    } else {
      configured.unwrap_or_else(num_cpus::get)
    };

    Ok(Self {
      max_workers: max_workers.max(1),
      task_timeout,
    })
  }
}
