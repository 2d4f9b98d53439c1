//! Identity records, the record store, and verification.
//!
//! Callers prove who they are with three fields: SSN last four, date of
//! birth, and ZIP. Records are matched by exact string equality on that
//! composite key; the store behind the lookup is swappable behind
//! `IdentityStore`.

pub mod record;
pub mod store;
pub mod verifier;

pub use record::{IdentityRecord, RecordKey};
pub use store::{IdentityStore, JsonFileStore, MemoryStore};
pub use verifier::IdentityVerifier;
