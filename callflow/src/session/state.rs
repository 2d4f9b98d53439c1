//! Per-call session state.
//!
//! One `Session` per call identifier: where the dialog is, what the caller
//! has chosen and entered so far, per-field attempt counters, and an audit
//! log of every step change. Mutated exclusively by step handlers while the
//! registry's per-call lock is held.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::step::{is_legal_transition, IllegalStepTransition, Step, TransitionRecord};

/// Opaque call identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

impl CallId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What the caller is calling about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Anything that does not require the caller's account.
    General,
    /// Needs the caller identified against an enrolled record.
    AccountSpecific,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::AccountSpecific => write!(f, "account-specific"),
        }
    }
}

/// Fields whose bad entries are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptField {
    Language,
    Question,
    SsnLast4,
    Dob,
    Zip,
}

impl fmt::Display for AttemptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Language => write!(f, "language"),
            Self::Question => write!(f, "question"),
            Self::SsnLast4 => write!(f, "ssn_last4"),
            Self::Dob => write!(f, "dob"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

/// Why a session stopped producing anything but Hangup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A field's consecutive-failure cap was hit.
    AttemptsExceeded,
    /// A server-side fault terminated the call.
    SystemError,
}

/// Per-call dialog state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Call identifier (registry key).
    pub id: CallId,

    /// Caller's number as reported by the collaborator at call start.
    pub caller_number: String,

    /// The step the session is resting at.
    pub current_step: Step,

    /// Language choice; set at most once, before any identity collection.
    pub language: Option<Locale>,

    /// Classified reason for the call.
    pub question: Option<QuestionKind>,

    /// Accepted identity fields; cleared only by the verification-failure
    /// reset, never overwritten piecemeal.
    pub ssn_last4: Option<String>,
    pub dob: Option<String>,
    pub zip: Option<String>,

    /// Number used for record linking and caller-ID override.
    pub phone_number: String,

    /// Bad entries per field.
    pub attempts: HashMap<AttemptField, u32>,

    /// Completed identity-collection cycles that ended in a verification miss.
    pub verify_cycles: u32,

    /// Set once a terminal hangup has been produced.
    pub ended: Option<EndReason>,

    /// Audit log of step changes.
    pub transitions: Vec<TransitionRecord>,

    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Fresh session resting at the entry step.
    pub fn new(id: CallId, caller_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            caller_number: caller_number.into(),
            current_step: Step::entry(),
            language: None,
            question: None,
            ssn_last4: None,
            dob: None,
            zip: None,
            phone_number: String::new(),
            attempts: HashMap::new(),
            verify_cycles: 0,
            ended: None,
            transitions: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Move to `to`, validating against the transition table and recording
    /// the change in the audit log.
    pub fn advance(&mut self, to: Step, reason: Option<&str>) -> Result<(), IllegalStepTransition> {
        if !is_legal_transition(self.current_step, to) {
            return Err(IllegalStepTransition {
                from: self.current_step,
                to,
            });
        }

        let elapsed = Utc::now().signed_duration_since(self.created_at);
        let record = TransitionRecord {
            from: self.current_step,
            to,
            elapsed_ms: elapsed.num_milliseconds().max(0) as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            call_id = %self.id,
            from = %self.current_step,
            to = %to,
            "Step transition"
        );

        self.transitions.push(record);
        self.current_step = to;
        Ok(())
    }

    /// Current bad-entry count for a field.
    pub fn attempt_count(&self, field: AttemptField) -> u32 {
        self.attempts.get(&field).copied().unwrap_or(0)
    }

    /// Count one more bad entry; returns the new count.
    pub fn record_attempt(&mut self, field: AttemptField) -> u32 {
        let count = self.attempts.entry(field).or_insert(0);
        *count += 1;
        *count
    }

    /// Zero the named counters.
    pub fn reset_attempts(&mut self, fields: &[AttemptField]) {
        for field in fields {
            self.attempts.insert(*field, 0);
        }
    }

    /// Set the language if not already chosen; the first choice sticks.
    pub fn choose_language(&mut self, locale: Locale) {
        self.language.get_or_insert(locale);
    }

    /// All three identity fields accepted.
    pub fn identity_complete(&self) -> bool {
        self.ssn_last4.is_some() && self.dob.is_some() && self.zip.is_some()
    }

    /// Clear the identity trio for a fresh collection cycle.
    pub fn clear_identity(&mut self) {
        self.ssn_last4 = None;
        self.dob = None;
        self.zip = None;
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_some()
    }

    /// Mark activity for TTL accounting.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Seconds since the last dispatched event.
    pub fn idle_seconds(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.last_activity).num_seconds()
    }
}
