//! Caller-Identification Call Flow Library
//!
//! This library provides:
//! - A multi-turn dialog engine for a telephone line: language selection,
//!   recorded-line disclosure, representative-hours gate, question intake,
//!   identity collection, record verification, and transfer routing
//! - A keyed session registry with one lock per live call
//! - A pluggable question-intent classifier (keyword rules or HTTP endpoint)
//!
//! # Dialog
//!
//! Every inbound `CallEvent` is answered by exactly one `Directive`:
//! - `Prompt`: speak localized text, optionally capturing digits or speech
//! - `Redirect`: re-enter the flow at a named step
//! - `Transfer`: dial the representative line with a computed caller-ID
//! - `Hangup`: speak a final message and terminate
//!
//! General questions transfer immediately. Account questions first collect
//! the last four SSN digits, date of birth, and ZIP code, verify them
//! against the enrolled records, and present the caller's own number as
//! caller-ID on the transfer.
//!
//! # Usage
//!
//! ```bash
//! # Interactive simulator with the bundled keyword classifier
//! callflow --records records.json --seed-demo
//!
//! # Spoken question intake against a remote classifier
//! callflow --intake speech --classifier-url http://localhost:8088/classify
//! ```

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod attempts;
pub mod classify;
pub mod config;
pub mod directive;
pub mod error;
pub mod hours;
pub mod identity;
pub mod locale;
pub mod router;
pub mod routing;
pub mod session;
pub mod step;
pub mod validate;

// Re-export key flow types
pub use directive::{CallEvent, Directive, GatherSpec, InputKind};
pub use router::StepRouter;
pub use step::{is_legal_transition, IllegalStepTransition, Step, TransitionRecord};

// Re-export config and error types
pub use config::{FlowConfig, IntakeMode};
pub use error::{FlowError, FlowResult};

// Re-export key session types
pub use session::{
    AttemptField, CallId, EndReason, QuestionKind, Session, SessionRegistry,
    SharedSessionRegistry,
};

// Re-export key identity types
pub use identity::{
    IdentityRecord, IdentityStore, IdentityVerifier, JsonFileStore, MemoryStore, RecordKey,
};

// Re-export localization types
pub use locale::{Locale, MessageCatalog, MessageKey};

// Re-export classifier types
pub use classify::{HttpClassifier, IntentClassifier, KeywordClassifier};

// Re-export attempt budget types
pub use attempts::{AttemptGuard, GuardResult, IDENTITY_FIELDS};

// Re-export routing types
pub use routing::{route, Route};
