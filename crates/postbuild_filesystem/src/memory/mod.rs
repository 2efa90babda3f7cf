mod canonicalize;
mod file_system;

pub use file_system::InMemoryFileSystem;
