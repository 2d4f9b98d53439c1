//! Call steps — explicit dialog states and legal transition guards.
//!
//! Provides a typed step model for the call flow so that:
//! 1. Every step the collaborator can name is a variant; a step with no
//!    handler cannot exist past the parse boundary.
//! 2. Every step change is auditable and logged.
//! 3. A recorded call can be replayed as the exact sequence of steps.
//!
//! Dispatch moves a session between steps with `Session::advance()`, which
//! validates the move against the transition table and records it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// The set of dialog steps.
///
/// Ask/process pairs split each collection point: the ask step emits the
/// prompt, the process step receives the captured input as a callback.
/// Every call starts at `AskLanguage` and terminates at `TransferCall`
/// (or earlier with a hangup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Greeting plus language menu.
    AskLanguage,
    /// Handle the language menu choice.
    ProcessLanguage,
    /// Recorded-line / debt-collection disclosure announcement.
    Disclosure,
    /// Branch on representative availability for the current local time.
    HoursCheck,
    /// One-time after-hours notice before question intake.
    HoursNotice,
    /// Ask what the caller needs.
    AskQuestion,
    /// Classify the caller's answer as general or account-specific.
    ProcessQuestion,
    /// Ask for the last four digits of the SSN.
    AskSsn,
    /// Validate the captured SSN digits.
    ProcessSsn,
    /// Ask for the date of birth.
    AskDob,
    /// Validate the captured date of birth.
    ProcessDob,
    /// Ask for the ZIP code.
    AskZip,
    /// Validate the captured ZIP digits.
    ProcessZip,
    /// Look the collected identity up in the record store.
    Verify,
    /// Compute routing and hand the call off — terminal step.
    TransferCall,
}

impl Step {
    /// The step every new session starts at.
    pub fn entry() -> Self {
        Self::AskLanguage
    }

    /// Whether this is the terminal step (the call leaves the flow here).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TransferCall)
    }

    /// Wire name used by the telephony collaborator.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::AskLanguage => "ask-language",
            Self::ProcessLanguage => "process-language",
            Self::Disclosure => "disclosure",
            Self::HoursCheck => "hours-check",
            Self::HoursNotice => "hours-notice",
            Self::AskQuestion => "ask-question",
            Self::ProcessQuestion => "process-question",
            Self::AskSsn => "ask-ssn",
            Self::ProcessSsn => "process-ssn",
            Self::AskDob => "ask-dob",
            Self::ProcessDob => "process-dob",
            Self::AskZip => "ask-zip",
            Self::ProcessZip => "process-zip",
            Self::Verify => "verify",
            Self::TransferCall => "transfer-call",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Step {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ask-language" => Ok(Self::AskLanguage),
            "process-language" => Ok(Self::ProcessLanguage),
            "disclosure" => Ok(Self::Disclosure),
            "hours-check" => Ok(Self::HoursCheck),
            "hours-notice" => Ok(Self::HoursNotice),
            "ask-question" => Ok(Self::AskQuestion),
            "process-question" => Ok(Self::ProcessQuestion),
            "ask-ssn" => Ok(Self::AskSsn),
            "process-ssn" => Ok(Self::ProcessSsn),
            "ask-dob" => Ok(Self::AskDob),
            "process-dob" => Ok(Self::ProcessDob),
            "ask-zip" => Ok(Self::AskZip),
            "process-zip" => Ok(Self::ProcessZip),
            "verify" => Ok(Self::Verify),
            "transfer-call" => Ok(Self::TransferCall),
            other => Err(FlowError::unknown_step(other)),
        }
    }
}

/// Legal transitions between steps.
///
/// The transition table encodes the valid edges of the dialog graph:
/// ```text
/// AskLanguage → ProcessLanguage
/// ProcessLanguage → AskLanguage | Disclosure | HoursCheck
/// Disclosure → HoursCheck
/// HoursCheck → HoursNotice | AskQuestion
/// HoursNotice → AskQuestion
/// AskQuestion → ProcessQuestion
/// ProcessQuestion → AskQuestion | AskSsn | TransferCall
/// AskSsn → ProcessSsn
/// ProcessSsn → AskSsn | AskDob
/// AskDob → ProcessDob
/// ProcessDob → AskDob | AskZip
/// AskZip → ProcessZip
/// ProcessZip → AskZip | Verify
/// Verify → TransferCall | AskSsn
/// ```
/// The backward process→ask edges are the retry path; Verify → AskSsn is the
/// verification-failure loop.
pub fn is_legal_transition(from: Step, to: Step) -> bool {
    use Step::*;

    matches!(
        (from, to),
        (AskLanguage, ProcessLanguage)
            | (ProcessLanguage, AskLanguage)
            | (ProcessLanguage, Disclosure)
            | (ProcessLanguage, HoursCheck)
            | (Disclosure, HoursCheck)
            | (HoursCheck, HoursNotice)
            | (HoursCheck, AskQuestion)
            | (HoursNotice, AskQuestion)
            | (AskQuestion, ProcessQuestion)
            | (ProcessQuestion, AskQuestion)
            | (ProcessQuestion, AskSsn)
            | (ProcessQuestion, TransferCall)
            | (AskSsn, ProcessSsn)
            | (ProcessSsn, AskSsn)
            | (ProcessSsn, AskDob)
            | (AskDob, ProcessDob)
            | (ProcessDob, AskDob)
            | (ProcessDob, AskZip)
            | (AskZip, ProcessZip)
            | (ProcessZip, AskZip)
            | (ProcessZip, Verify)
            | (Verify, TransferCall)
            | (Verify, AskSsn)
    )
}

/// A single recorded step change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The step transitioned from.
    pub from: Step,
    /// The step transitioned to.
    pub to: Step,
    /// Milliseconds since the session was created.
    pub elapsed_ms: u64,
    /// Optional context about why this transition happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal step change is attempted.
///
/// Handlers only produce edges from the table above, so hitting this means
/// a server-side defect; dispatch logs it and plays the generic error.
#[derive(Debug, Clone)]
pub struct IllegalStepTransition {
    pub from: Step,
    pub to: Step,
}

impl fmt::Display for IllegalStepTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal step transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalStepTransition {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_and_terminal() {
        assert_eq!(Step::entry(), Step::AskLanguage);
        assert!(Step::TransferCall.is_terminal());
        assert!(!Step::Verify.is_terminal());
    }

    #[test]
    fn test_wire_name_round_trip() {
        for step in [
            Step::AskLanguage,
            Step::ProcessLanguage,
            Step::Disclosure,
            Step::HoursCheck,
            Step::HoursNotice,
            Step::AskQuestion,
            Step::ProcessQuestion,
            Step::AskSsn,
            Step::ProcessSsn,
            Step::AskDob,
            Step::ProcessDob,
            Step::AskZip,
            Step::ProcessZip,
            Step::Verify,
            Step::TransferCall,
        ] {
            let parsed: Step = step.wire_name().parse().unwrap();
            assert_eq!(parsed, step);
        }
    }

    #[test]
    fn test_unknown_step_rejected() {
        let err = "process-fax".parse::<Step>().unwrap_err();
        assert!(err.to_string().contains("process-fax"));
    }

    #[test]
    fn test_serde_matches_wire_names() {
        let json = serde_json::to_string(&Step::TransferCall).unwrap();
        assert_eq!(json, "\"transfer-call\"");
        let step: Step = serde_json::from_str("\"ask-ssn\"").unwrap();
        assert_eq!(step, Step::AskSsn);
    }

    #[test]
    fn test_happy_path_edges() {
        let path = [
            Step::AskLanguage,
            Step::ProcessLanguage,
            Step::Disclosure,
            Step::HoursCheck,
            Step::AskQuestion,
            Step::ProcessQuestion,
            Step::AskSsn,
            Step::ProcessSsn,
            Step::AskDob,
            Step::ProcessDob,
            Step::AskZip,
            Step::ProcessZip,
            Step::Verify,
            Step::TransferCall,
        ];
        for pair in path.windows(2) {
            assert!(
                is_legal_transition(pair[0], pair[1]),
                "{} → {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_retry_edges_are_legal() {
        assert!(is_legal_transition(Step::ProcessSsn, Step::AskSsn));
        assert!(is_legal_transition(Step::ProcessDob, Step::AskDob));
        assert!(is_legal_transition(Step::ProcessZip, Step::AskZip));
        assert!(is_legal_transition(Step::ProcessLanguage, Step::AskLanguage));
        assert!(is_legal_transition(Step::ProcessQuestion, Step::AskQuestion));
    }

    #[test]
    fn test_verification_failure_loop_edge() {
        assert!(is_legal_transition(Step::Verify, Step::AskSsn));
    }

    #[test]
    fn test_terminal_has_no_exits() {
        for to in [Step::AskLanguage, Step::Verify, Step::AskSsn] {
            assert!(!is_legal_transition(Step::TransferCall, to));
        }
    }

    #[test]
    fn test_skip_edges_are_illegal() {
        assert!(!is_legal_transition(Step::AskLanguage, Step::Verify));
        assert!(!is_legal_transition(Step::AskSsn, Step::AskZip));
        assert!(!is_legal_transition(Step::ProcessQuestion, Step::Verify));
    }
}
