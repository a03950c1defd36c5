//! Registry trait: the store of completed farmer registrations.
//!
//! The dialogue only ever reads a record (status check) or writes one
//! (successful confirmation). Writes overwrite: one record per caller,
//! no merge and no history.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// A completed registration, keyed by the caller's phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    pub name: String,
    pub county: String,
    pub crop: String,

    /// Farm size in acres
    pub farm_size: f64,

    pub end_user_id: String,

    /// Wall-clock time in the service's reference timezone
    pub registered_at: DateTime<FixedOffset>,
}

/// The core Registry trait.
///
/// Implementations: in-memory (default), JSON-lines file.
#[async_trait]
pub trait Registry: Send + Sync {
    /// The backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Look up the record for a caller.
    async fn get(&self, end_user_id: &str) -> Result<Option<RegistrationRecord>, RegistryError>;

    /// Store a record, replacing any previous one for the same caller.
    async fn put(&self, record: RegistrationRecord) -> Result<(), RegistryError>;

    /// All records, in no particular order.
    async fn list(&self) -> Result<Vec<RegistrationRecord>, RegistryError>;

    /// Number of registered callers.
    async fn count(&self) -> Result<usize, RegistryError>;
}
