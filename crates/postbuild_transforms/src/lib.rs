//! Transforms applied to bundler output scripts.
//!
//! Every transform takes code as text and returns code as text plus an optional source map
//! relative to its input. Callers compose that map with the bundler's map.
pub use downlevel::*;
pub use global_defines::*;
pub use license::*;
pub use localize::*;
pub use minify::*;

mod downlevel;
mod global_defines;
mod license;
mod localize;
mod minify;

use postbuild_core::types::EcmaTarget;
use postbuild_sourcemap::ComposeSourceMapError;
use postbuild_swc_runner::RunWithTransformationError;
use swc_core::ecma::ast::EsVersion;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformOutput {
  pub code: String,
  pub source_map: Option<Vec<u8>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
  #[error(transparent)]
  Swc(#[from] RunWithTransformationError),
  #[error(transparent)]
  SourceMap(#[from] ComposeSourceMapError),
  #[error("Invalid downlevel target: {0}")]
  InvalidTarget(String),
}

pub fn es_version(target: EcmaTarget) -> EsVersion {
  match target {
    EcmaTarget::Es5 => EsVersion::Es5,
    EcmaTarget::Es2015 => EsVersion::Es2015,
    EcmaTarget::Es2016 => EsVersion::Es2016,
    EcmaTarget::Es2017 => EsVersion::Es2017,
    EcmaTarget::Es2018 => EsVersion::Es2018,
    EcmaTarget::Es2019 => EsVersion::Es2019,
    EcmaTarget::Es2020 => EsVersion::Es2020,
    EcmaTarget::EsNext => EsVersion::EsNext,
  }
}
