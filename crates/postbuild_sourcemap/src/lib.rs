pub use compose::*;
pub use find_source_map_url::*;

mod compose;
mod find_source_map_url;
