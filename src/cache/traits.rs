use async_trait::async_trait;

use super::error::CacheResult;
use crate::models::CacheRecord;

/// Single-slot snapshot storage.
///
/// Exactly one record exists at a time. `write` replaces it whole; readers
/// never observe a partially written record. Absence is a normal state
/// (cold start, restart of an in-memory store), not an error.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the stored record.
    async fn write(&self, record: CacheRecord) -> CacheResult<()>;

    /// Current record, if any.
    async fn read(&self) -> CacheResult<Option<CacheRecord>>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
