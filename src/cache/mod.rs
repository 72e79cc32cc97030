mod error;
mod file;
mod memory;
mod traits;

use std::sync::Arc;

pub use error::{CacheError, CacheResult};
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use traits::SnapshotStore;

use crate::config::CacheConfig;

/// Build the snapshot store selected by configuration.
pub fn create_store(config: &CacheConfig) -> Arc<dyn SnapshotStore> {
    match config {
        CacheConfig::Memory(_) => Arc::new(MemorySnapshotStore::new()),
        CacheConfig::File(file) => Arc::new(FileSnapshotStore::new(&file.path)),
    }
}
