/// Version of the postbuild crates. Part of every cache key so that upgrading
/// invalidates previously cached transform output.
pub fn postbuild_version() -> &'static str {
  env!("CARGO_PKG_VERSION")
}
