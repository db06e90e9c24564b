//! Key/value stores for caching resolver output.
//!
//! The batch scheduler never touches a store itself; application code
//! checks a store before scheduling a query and writes resolved results
//! back afterwards.
//!
//! Two backends are provided:
//!
//! - [`MemoryStore`]: in-process map, for tests and short-lived caches
//! - [`JsonFileStore`]: named instance persisted as a JSON file

mod error;
mod json_file;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use json_file::{JsonFileStore, DEFAULT_STORE_NAME};
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
