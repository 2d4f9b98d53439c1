//! Enrolled customer records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite lookup key: the three fields a caller proves identity with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub ssn_last4: String,
    pub dob: String,
    pub zip: String,
}

impl RecordKey {
    pub fn new(
        ssn_last4: impl Into<String>,
        dob: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            ssn_last4: ssn_last4.into(),
            dob: dob.into(),
            zip: zip.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SSN digits stay out of logs
        write!(f, "****/{}/{}", self.dob, self.zip)
    }
}

/// One enrolled customer.
///
/// Key uniqueness across the store is assumed, not enforced; lookups take
/// the first match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Last four digits of the Social Security number.
    pub ssn_last4: String,

    /// Date of birth, eight digits, MMDDYYYY.
    pub dob: String,

    /// Five-digit ZIP code.
    pub zip: String,

    /// Name spoken back to the caller on a match.
    pub name: String,

    /// Last phone number the customer verified from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl IdentityRecord {
    pub fn new(
        ssn_last4: impl Into<String>,
        dob: impl Into<String>,
        zip: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            ssn_last4: ssn_last4.into(),
            dob: dob.into(),
            zip: zip.into(),
            name: name.into(),
            phone_number: None,
        }
    }

    /// The record's composite key.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.ssn_last4, &self.dob, &self.zip)
    }

    /// Exact string match against a claimed key. No normalization here; the
    /// flow stores stripped digits, records are enrolled the same way.
    pub fn matches(&self, key: &RecordKey) -> bool {
        self.ssn_last4 == key.ssn_last4 && self.dob == key.dob && self.zip == key.zip
    }
}
