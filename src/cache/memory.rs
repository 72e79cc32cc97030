use async_trait::async_trait;
use parking_lot::RwLock;

use super::{error::CacheResult, traits::SnapshotStore};
use crate::models::CacheRecord;

/// In-process snapshot slot. Lost when the process exits.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slot: RwLock<Option<CacheRecord>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn write(&self, record: CacheRecord) -> CacheResult<()> {
        *self.slot.write() = Some(record);
        Ok(())
    }

    async fn read(&self) -> CacheResult<Option<CacheRecord>> {
        Ok(self.slot.read().clone())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
