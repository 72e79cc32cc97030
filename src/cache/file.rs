use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    error::{CacheError, CacheResult},
    traits::SnapshotStore,
};
use crate::models::CacheRecord;

/// Snapshot slot persisted as a single JSON file.
///
/// The document is `{"writtenAt": ..., "snapshot": {...}}`. Writes go to a
/// sibling temp file which is then renamed over the slot, so a concurrent
/// reader sees either the old record or the new one.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn write(&self, record: CacheRecord) -> CacheResult<()> {
        let json =
            serde_json::to_vec(&record).map_err(|e| CacheError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!(path = ?self.path, "Wrote snapshot cache file");
        Ok(())
    }

    async fn read(&self) -> CacheResult<Option<CacheRecord>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Organization, Snapshot};

    fn record() -> CacheRecord {
        let at = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        CacheRecord::new(
            Snapshot {
                organizations: vec![Organization {
                    name: "acme.com".into(),
                    users: vec![],
                }],
                start_date: at.date_naive(),
                end_date: at.date_naive(),
                refreshed_at: at,
            },
            at,
        )
    }

    fn create_test_store() -> (FileSnapshotStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("cache.json"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let (store, _temp) = create_test_store();
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (store, _temp) = create_test_store();
        store.write(record()).await.unwrap();

        let read = store.read().await.unwrap().unwrap();
        assert_eq!(read, record());
    }

    #[tokio::test]
    async fn test_stored_document_layout() {
        let (store, _temp) = create_test_store();
        store.write(record()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["writtenAt"], "2025-01-10T12:00:00Z");
        assert_eq!(json["snapshot"]["organizations"][0]["name"], "acme.com");
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("nested/dir/cache.json"));
        store.write(record()).await.unwrap();
        assert!(store.read().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (store, temp) = create_test_store();
        store.write(record()).await.unwrap();
        store.write(record()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cache.json".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupted_file_is_deserialization_error() {
        let (store, _temp) = create_test_store();
        std::fs::write(store.path(), "{ not json").unwrap();

        let result = store.read().await;
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }
}
