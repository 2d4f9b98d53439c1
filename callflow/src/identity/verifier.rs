//! Identity verification against the record store.

use std::sync::Arc;

use crate::error::FlowResult;

use super::record::{IdentityRecord, RecordKey};
use super::store::IdentityStore;

/// Looks up claimed identities and links verified phone numbers.
pub struct IdentityVerifier {
    store: Arc<dyn IdentityStore>,
}

impl IdentityVerifier {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// First record whose key fields equal the claimed values exactly.
    /// A store failure means verification cannot proceed and propagates.
    pub fn verify(
        &self,
        ssn_last4: &str,
        dob: &str,
        zip: &str,
    ) -> FlowResult<Option<IdentityRecord>> {
        let key = RecordKey::new(ssn_last4, dob, zip);
        let found = self.store.find(&key)?;
        match &found {
            Some(record) => tracing::info!(key = %key, name = %record.name, "Identity verified"),
            None => tracing::info!(key = %key, "No matching record"),
        }
        Ok(found)
    }

    /// Persist the caller's number on their record. Best-effort: a write
    /// failure is logged and the call proceeds on the directive already
    /// decided.
    pub fn link_phone_number(&self, record: &IdentityRecord, phone_number: &str) {
        if phone_number.trim().is_empty() {
            tracing::debug!(name = %record.name, "No caller number to link");
            return;
        }

        let mut linked = record.clone();
        linked.phone_number = Some(phone_number.to_string());

        if let Err(e) = self.store.upsert(linked) {
            tracing::warn!(
                name = %record.name,
                error = %e,
                "Failed to link phone number"
            );
        } else {
            tracing::debug!(name = %record.name, "Linked phone number");
        }
    }
}
