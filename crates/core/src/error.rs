//! Error types for the Shamba domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for Shamba operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to encode registration for {end_user_id}: {reason}")]
    Serialization { end_user_id: String, reason: String },
}
