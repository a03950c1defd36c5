//! The registration dialogue for Shamba.
//!
//! [`StageEngine`] is the state machine that moves a session through the
//! registration stages. [`Dispatcher`] wraps it with decoding, session
//! storage and per-session locking so that a transport only has to hand
//! over the raw request and render the returned [`Directive`].
//!
//! [`Directive`]: shamba_core::Directive

pub mod dispatcher;
pub mod engine;
pub mod menus;

pub use dispatcher::{Dispatcher, DispatcherStats, SessionView, UssdRequest};
pub use engine::{Disposition, Outcome, StageEngine};
