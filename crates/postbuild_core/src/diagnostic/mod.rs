//! User facing diagnostics reported by every stage of the pipeline
mod diagnostic;
mod diagnostics;

pub use self::diagnostic::*;
pub use self::diagnostics::*;
