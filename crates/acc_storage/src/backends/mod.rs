pub mod json;
pub mod memory;

pub use json::{JsonFileStorage, DEFAULT_CONTENT_DIR};
pub use memory::InMemoryStorage;
