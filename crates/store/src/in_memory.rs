//! In-memory registry: the default backend, also used in tests.

use async_trait::async_trait;
use shamba_core::error::RegistryError;
use shamba_core::registry::{RegistrationRecord, Registry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A registry that keeps records in a map keyed by phone number.
/// Contents are lost when the process exits.
pub struct InMemoryRegistry {
    records: Arc<RwLock<HashMap<String, RegistrationRecord>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, end_user_id: &str) -> Result<Option<RegistrationRecord>, RegistryError> {
        Ok(self.records.read().await.get(end_user_id).cloned())
    }

    async fn put(&self, record: RegistrationRecord) -> Result<(), RegistryError> {
        self.records
            .write()
            .await
            .insert(record.end_user_id.clone(), record);
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

    fn record(phone: &str, name: &str, farm_size: f64) -> RegistrationRecord {
        RegistrationRecord {
            name: name.into(),
            county: "Nakuru".into(),
            crop: "Wheat".into(),
            farm_size,
            end_user_id: phone.into(),
            registered_at: Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn put_and_get() {
        let registry = InMemoryRegistry::new();
        registry.put(record("+254700000001", "Jane", 2.0)).await.unwrap();

        let found = registry.get("+254700000001").await.unwrap().unwrap();
        assert_eq!(found.name, "Jane");
        assert!(registry.get("+254700000002").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_record() {
        let registry = InMemoryRegistry::new();
        registry.put(record("+254700000001", "Jane", 2.0)).await.unwrap();
        registry.put(record("+254700000001", "Jane W.", 4.5)).await.unwrap();

        assert_eq!(registry.count().await.unwrap(), 1);
        let found = registry.get("+254700000001").await.unwrap().unwrap();
        assert_eq!(found.name, "Jane W.");
        assert_eq!(found.farm_size, 4.5);
    }

    #[tokio::test]
    async fn list_returns_every_caller() {
        let registry = InMemoryRegistry::new();
        registry.put(record("+254700000001", "Jane", 2.0)).await.unwrap();
        registry.put(record("+254700000002", "Otieno", 1.0)).await.unwrap();
        assert_eq!(registry.list().await.unwrap().len(), 2);
    }
}
