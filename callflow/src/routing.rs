//! Outbound transfer routing.
//!
//! Every transfer dials the configured target. The caller-ID presented is
//! the caller's own number only for verified account-specific calls with a
//! number on file for the session; everything else shows the service number.

use serde::{Deserialize, Serialize};

use crate::config::FlowConfig;
use crate::session::{QuestionKind, Session};

/// Where a transfer goes and who it claims to be from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub target: String,
    pub caller_id: String,
}

/// Pure function of session state and static configuration.
pub fn route(session: &Session, config: &FlowConfig) -> Route {
    let account_specific = session.question == Some(QuestionKind::AccountSpecific);
    let caller_id = if account_specific && !session.phone_number.trim().is_empty() {
        session.phone_number.clone()
    } else {
        config.service_number.clone()
    };

    Route {
        target: config.target_number.clone(),
        caller_id,
    }
}
