//! Boundary types: inbound call events and outbound directives.
//!
//! The telephony collaborator drives the flow with `CallEvent`s and acts on
//! exactly one `Directive` per event: it renders `Prompt` as speech plus an
//! optional input capture, follows `Redirect` by posting the named step
//! back, dials out on `Transfer` with the given caller-ID, and speaks then
//! terminates on `Hangup`.

use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::session::CallId;
use crate::step::Step;

/// What a prompt captures from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Keypad entry of up to `max` digits.
    Digits { max: u8 },
    /// A free-form utterance.
    Speech,
}

/// Capture instruction attached to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherSpec {
    pub input: InputKind,
    /// Step the collaborator posts the captured input to.
    pub callback: Step,
}

/// The flow's sole output per inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    /// Speak `text`; optionally capture input for `gather.callback`. With no
    /// gather, or when nothing is captured, the collaborator redirects to
    /// `fallback`.
    Prompt {
        text: String,
        locale: Locale,
        voice: String,
        gather: Option<GatherSpec>,
        fallback: Step,
    },
    /// Re-enter the flow at `step` without speaking.
    Redirect { step: Step },
    /// Dial `target` presenting `caller_id`.
    Transfer { target: String, caller_id: String },
    /// Speak `text`, then terminate the call.
    Hangup { text: String },
}

impl Directive {
    /// Variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prompt { .. } => "prompt",
            Self::Redirect { .. } => "redirect",
            Self::Transfer { .. } => "transfer",
            Self::Hangup { .. } => "hangup",
        }
    }

    /// The step the collaborator will enter next, if the directive names one.
    pub fn continuation(&self) -> Option<Step> {
        match self {
            Self::Prompt {
                gather, fallback, ..
            } => Some(gather.map(|g| g.callback).unwrap_or(*fallback)),
            Self::Redirect { step } => Some(*step),
            Self::Transfer { .. } | Self::Hangup { .. } => None,
        }
    }
}

/// One inbound event from the telephony collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    /// Call this event belongs to.
    pub call_id: CallId,

    /// Caller's number as the collaborator reports it.
    pub caller_number: String,

    /// Captured digits or transcribed utterance, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Overrides the session's resting step for this single dispatch; the
    /// process-X callback path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
}

impl CallEvent {
    pub fn new(call_id: impl Into<CallId>, caller_number: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            caller_number: caller_number.into(),
            input: None,
            step: None,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.step = Some(step);
        self
    }
}
