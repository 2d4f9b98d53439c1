//! Session state and the per-call registry.
//!
//! One `Session` per call identifier holds the dialog position, caller
//! choices, accepted identity fields, and attempt counters. The
//! `SessionRegistry` owns all live sessions and serializes event handling
//! per call through an `Arc<Mutex<Session>>` handle.

pub mod registry;
pub mod state;

pub use registry::{SessionRegistry, SharedSessionRegistry};
pub use state::{AttemptField, CallId, EndReason, QuestionKind, Session};
