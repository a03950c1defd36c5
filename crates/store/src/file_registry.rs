//! File-based registry: persistent JSON-lines storage.
//!
//! Each line is a JSON-encoded [`RegistrationRecord`]. Records are loaded into
//! memory on creation and the whole file is rewritten on every `put`, which
//! keeps the file free of superseded records.
//!
//! Default location: `~/.shamba/registry.jsonl`

use async_trait::async_trait;
use shamba_core::error::RegistryError;
use shamba_core::registry::{RegistrationRecord, Registry};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed registry using JSONL (one record per line).
pub struct FileRegistry {
    path: PathBuf,
    records: Arc<RwLock<HashMap<String, RegistrationRecord>>>,
}

impl FileRegistry {
    /// Open the registry at `path`.
    ///
    /// A missing file means an empty registry; the file is created on the
    /// first write. Any other read failure is an error, so a registry that
    /// could not be loaded never rewrites the file.
    pub fn new(path: PathBuf) -> Result<Self, RegistryError> {
        let records = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), count = records.len(), "File registry loaded");
        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<HashMap<String, RegistrationRecord>, RegistryError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(RegistryError::Storage(format!(
                    "Failed to read registry file {}: {e}",
                    path.display()
                )));
            }
        };

        let mut records = HashMap::new();
        for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping non-UTF-8 registry line");
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RegistrationRecord>(line) {
                Ok(record) => {
                    records.insert(record.end_user_id.clone(), record);
                }
                Err(e) => warn!(line = index + 1, error = %e, "Skipping corrupted registry line"),
            }
        }
        Ok(records)
    }

    /// Rewrite the file from the given records.
    fn flush(&self, records: &HashMap<String, RegistrationRecord>) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::Storage(format!("Failed to create registry directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records.values() {
            let line = serde_json::to_string(record).map_err(|e| RegistryError::Serialization {
                end_user_id: record.end_user_id.clone(),
                reason: e.to_string(),
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| RegistryError::Storage(format!("Failed to write registry file: {e}")))
    }
}

#[async_trait]
impl Registry for FileRegistry {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, end_user_id: &str) -> Result<Option<RegistrationRecord>, RegistryError> {
        Ok(self.records.read().await.get(end_user_id).cloned())
    }

    async fn put(&self, record: RegistrationRecord) -> Result<(), RegistryError> {
        let mut records = self.records.write().await;
        let previous = records.insert(record.end_user_id.clone(), record.clone());

        if let Err(e) = self.flush(&records) {
            // Keep memory and disk in agreement when the write fails.
            match previous {
                Some(old) => records.insert(record.end_user_id.clone(), old),
                None => records.remove(&record.end_user_id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RegistrationRecord>, RegistryError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(phone: &str, crop: &str) -> RegistrationRecord {
        RegistrationRecord {
            name: "Wanjiku Kamau".into(),
            county: "Kiambu".into(),
            crop: crop.into(),
            farm_size: 1.25,
            end_user_id: phone.into(),
            registered_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.jsonl");

        let registry = FileRegistry::new(path.clone()).unwrap();
        registry.put(record("+254711000001", "Tea")).await.unwrap();
        registry.put(record("+254711000002", "Coffee")).await.unwrap();
        drop(registry);

        let reopened = FileRegistry::new(path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let found = reopened.get("+254711000001").await.unwrap().unwrap();
        assert_eq!(found.crop, "Tea");
    }

    #[tokio::test]
    async fn overwrite_leaves_one_line_per_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.jsonl");

        let registry = FileRegistry::new(path.clone()).unwrap();
        registry.put(record("+254711000001", "Tea")).await.unwrap();
        registry.put(record("+254711000001", "Maize")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("Maize"));
    }

    #[tokio::test]
    async fn corrupted_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.jsonl");
        let good = serde_json::to_string(&record("+254711000001", "Rice")).unwrap();
        std::fs::write(&path, format!("{good}\nnot json at all\n\n")).unwrap();

        let registry = FileRegistry::new(path).unwrap();
        assert_eq!(registry.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("absent.jsonl")).unwrap();
        assert_eq!(registry.count().await.unwrap(), 0);
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_line_keeps_the_other_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.jsonl");

        let mut content = Vec::new();
        for phone in ["+254711000001", "+254711000002", "+254711000003"] {
            content.extend(serde_json::to_vec(&record(phone, "Tea")).unwrap());
            content.push(b'\n');
        }
        content.extend(b"\xff\xfe\n");
        std::fs::write(&path, content).unwrap();

        let registry = FileRegistry::new(path.clone()).unwrap();
        assert_eq!(registry.count().await.unwrap(), 3);

        registry.put(record("+254711000004", "Maize")).await.unwrap();
        drop(registry);

        let reopened = FileRegistry::new(path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 4);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as one.
        let result = FileRegistry::new(dir.path().to_path_buf());
        assert!(matches!(result, Err(RegistryError::Storage(_))));
    }
}
