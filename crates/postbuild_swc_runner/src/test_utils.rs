use swc_core::ecma::visit::VisitMut;

use crate::runner::run_visit;
pub use crate::runner::RunContext;
pub use crate::runner::RunVisitResult;

/// Helper to test SWC visitors.
///
/// * Parse `code` with SWC
/// * Run a visitor over it
/// * Return the result
///
pub fn run_test_visit<V: VisitMut>(
  code: &str,
  make_visit: impl FnOnce(RunContext) -> V,
) -> RunVisitResult<V> {
  match run_visit(code, make_visit) {
    Ok(result) => result,
    Err(error) => panic!("Failed to run test visitor: {}", error),
  }
}

/// Remove whitespace from line starts and ends
pub fn remove_code_whitespace(code: &str) -> String {
  code
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .collect::<Vec<_>>()
    .join("\n")
}
