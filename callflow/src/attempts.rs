//! Per-field retry budgets.
//!
//! Every bad entry for a field is recorded against the session; hitting the
//! configured cap ends the call. The one sanctioned reset is the
//! verification-failure path, which zeroes the three identity counters for a
//! fresh collection cycle. Cycles themselves are not capped here (see
//! `FlowConfig::max_verify_cycles`).

use crate::session::{AttemptField, Session};

/// Counters cleared together when verification misses.
pub const IDENTITY_FIELDS: [AttemptField; 3] = [
    AttemptField::SsnLast4,
    AttemptField::Dob,
    AttemptField::Zip,
];

/// Outcome of recording a bad entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardResult {
    /// Ask again.
    Retry,
    /// Budget spent; end the call.
    Exceeded,
}

/// Applies the per-field consecutive-failure cap.
#[derive(Debug, Clone, Copy)]
pub struct AttemptGuard {
    max_attempts: u32,
}

impl AttemptGuard {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Record one bad entry for `field`. `Exceeded` means the caller must
    /// hang up with the too-many-attempts message and schedule nothing
    /// further for this field.
    pub fn record(&self, session: &mut Session, field: AttemptField) -> GuardResult {
        let count = session.record_attempt(field);
        if count >= self.max_attempts {
            tracing::warn!(
                call_id = %session.id,
                field = %field,
                count,
                "Attempt budget exhausted"
            );
            GuardResult::Exceeded
        } else {
            tracing::debug!(
                call_id = %session.id,
                field = %field,
                count,
                remaining = self.max_attempts - count,
                "Bad entry recorded"
            );
            GuardResult::Retry
        }
    }

    /// Zero the named counters.
    pub fn reset(&self, session: &mut Session, fields: &[AttemptField]) {
        session.reset_attempts(fields);
        tracing::debug!(call_id = %session.id, ?fields, "Attempt counters reset");
    }

    /// Entries left before `field` exhausts its budget.
    pub fn remaining(&self, session: &Session, field: AttemptField) -> u32 {
        self.max_attempts.saturating_sub(session.attempt_count(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CallId;

    fn session() -> Session {
        Session::new(CallId::from("CA1"), "+15551234567")
    }

    #[test]
    fn test_three_retries_then_exceeded() {
        let guard = AttemptGuard::new(4);
        let mut s = session();

        for _ in 0..3 {
            assert_eq!(guard.record(&mut s, AttemptField::Dob), GuardResult::Retry);
        }
        assert_eq!(
            guard.record(&mut s, AttemptField::Dob),
            GuardResult::Exceeded
        );
    }

    #[test]
    fn test_fields_are_budgeted_independently() {
        let guard = AttemptGuard::new(4);
        let mut s = session();

        for _ in 0..3 {
            guard.record(&mut s, AttemptField::SsnLast4);
        }
        // A different field still has its full budget
        assert_eq!(guard.record(&mut s, AttemptField::Zip), GuardResult::Retry);
        assert_eq!(guard.remaining(&s, AttemptField::Zip), 3);
        assert_eq!(guard.remaining(&s, AttemptField::SsnLast4), 1);
    }

    #[test]
    fn test_reset_restores_full_budget() {
        let guard = AttemptGuard::new(4);
        let mut s = session();

        for _ in 0..3 {
            guard.record(&mut s, AttemptField::Dob);
            guard.record(&mut s, AttemptField::Zip);
        }
        guard.reset(&mut s, &IDENTITY_FIELDS);

        for field in IDENTITY_FIELDS {
            assert_eq!(s.attempt_count(field), 0);
            assert_eq!(guard.remaining(&s, field), 4);
        }
        // Reset is scoped: other counters keep their value
        guard.record(&mut s, AttemptField::Language);
        assert_eq!(s.attempt_count(AttemptField::Language), 1);
    }

    #[test]
    fn test_cap_of_one_exhausts_immediately() {
        let guard = AttemptGuard::new(1);
        let mut s = session();
        assert_eq!(
            guard.record(&mut s, AttemptField::Language),
            GuardResult::Exceeded
        );
    }
}
