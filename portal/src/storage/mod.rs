pub mod local;
pub mod paths;

pub use local::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, UnavailableKeyValueStore};
pub use paths::PortalPaths;
