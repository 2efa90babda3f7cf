pub use action_executor::*;
pub use postbuild::*;
pub use postbuild_filesystem as file_system;

pub mod action_executor;
pub mod bundle_calculator;
pub mod i18n_inlining;
pub mod javascript_optimizer;
pub mod output_paths;
pub mod planner;
pub mod postbuild;
pub mod process_bundle;
pub mod stats;
pub mod translations;
