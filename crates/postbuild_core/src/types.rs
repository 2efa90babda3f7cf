pub use self::budget::*;
pub use self::bundle_stat::*;
pub use self::bundler_stats::*;
pub use self::emitted_file::*;
pub use self::i18n::*;
pub use self::inline::*;
pub use self::postbuild_options::*;
pub use self::process::*;
pub use crate::integrity::IntegrityAlgorithm;

mod budget;
mod bundle_stat;
mod bundler_stats;
mod emitted_file;
mod i18n;
mod inline;
mod postbuild_options;
mod process;
