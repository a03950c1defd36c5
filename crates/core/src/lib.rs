//! # Shamba Core
//!
//! Domain types, traits, and error definitions for the Shamba farmer
//! registration service. This crate has **no framework dependencies**: it
//! defines the dialogue model that the store, engine and gateway crates
//! build on.
//!
//! ## Layout
//!
//! - [`input`] decodes the cumulative `*`-delimited USSD text
//! - [`session`] holds the per-dialogue state and the [`Stage`] enum
//! - [`directive`] is the engine's answer to the transport (`CON`/`END`)
//! - [`registry`] is the key-value contract for completed registrations

pub mod directive;
pub mod error;
pub mod input;
pub mod registry;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use directive::{Directive, DirectiveKind};
pub use error::{Error, RegistryError, Result};
pub use input::{DecodedInput, INPUT_DELIMITER, decode};
pub use registry::{RegistrationRecord, Registry};
pub use session::{PendingRegistration, Session, Stage};
