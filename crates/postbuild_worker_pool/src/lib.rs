//! A bounded pool of OS threads running CPU heavy tasks for an async coordinator.
//!
//! Tasks are started in submission order. Each task resolves a [`TaskHandle`] that can be
//! awaited from the tokio runtime driving the build.
pub use error::TaskError;
pub use options::*;
pub use pool::*;

mod error;
mod options;
mod pool;
