pub mod cache;
pub mod diagnostic;
pub mod hash;
pub mod integrity;
pub mod result;
pub mod types;
pub mod version;
