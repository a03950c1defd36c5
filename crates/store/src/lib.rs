//! Storage for Shamba: live USSD sessions and completed registrations.
//!
//! Sessions are in-memory only and are swept after inactivity. Registrations
//! go to a [`Registry`](shamba_core::Registry) backend: in-memory or a
//! JSON-lines file.

pub mod file_registry;
pub mod in_memory;
pub mod sessions;
pub mod sweeper;

pub use file_registry::FileRegistry;
pub use in_memory::InMemoryRegistry;
pub use sessions::{SessionGuard, SessionStore};
pub use sweeper::{spawn_sweeper, sweep_once};
