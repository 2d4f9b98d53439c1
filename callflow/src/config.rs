//! Flow configuration.
//!
//! All recognized options with their defaults, overridable from `CALLFLOW_*`
//! environment variables (the binary layers CLI flags on top). Values that
//! fail to parse keep their defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::FlowError;
use crate::locale::Locale;

/// How question intake captures the caller's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeMode {
    /// Binary keypad menu: 1 for account questions, 2 for everything else.
    #[default]
    Keypad,
    /// Free-text utterance sent to the intent classifier.
    Speech,
}

impl fmt::Display for IntakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keypad => write!(f, "keypad"),
            Self::Speech => write!(f, "speech"),
        }
    }
}

impl FromStr for IntakeMode {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keypad" | "dtmf" => Ok(Self::Keypad),
            "speech" => Ok(Self::Speech),
            other => Err(FlowError::config(format!("unknown intake mode '{other}'"))),
        }
    }
}

/// Call flow configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Consecutive bad entries allowed per field before the call ends.
    pub max_attempts: u32,

    /// Destination number every transfer dials.
    pub target_number: String,

    /// Caller-ID presented when the caller's own number is not used.
    pub service_number: String,

    /// Representatives are available strictly before this local hour.
    pub csr_cutoff_hour: u32,

    /// Fixed UTC offset the cutoff hour is evaluated in.
    pub csr_utc_offset: FixedOffset,

    /// Question intake mechanism.
    pub intake: IntakeMode,

    /// Whether the recorded-line disclosure plays after language selection.
    pub play_disclosure: bool,

    /// Cap on full identity-collection cycles after verification misses.
    /// `None` preserves the legacy behavior: per-field entries are capped,
    /// whole cycles are not.
    pub max_verify_cycles: Option<u32>,

    /// Locale used before the caller picks a language.
    pub default_locale: Locale,

    /// Identity record store file.
    pub records_path: PathBuf,

    /// Optional TOML message overlay.
    pub messages_path: Option<PathBuf>,

    /// Remote intent classifier endpoint; unset selects the keyword rules.
    pub classifier_url: Option<String>,

    /// Idle sessions older than this are eligible for eviction.
    pub session_ttl_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            target_number: "+15555550100".to_string(),
            service_number: "+15555550199".to_string(),
            csr_cutoff_hour: 20,
            // US Eastern standard time
            csr_utc_offset: FixedOffset::west_opt(5 * 3600).unwrap_or_else(|| Utc.fix()),
            intake: IntakeMode::Keypad,
            play_disclosure: true,
            max_verify_cycles: None,
            default_locale: Locale::En,
            records_path: PathBuf::from("records.json"),
            messages_path: None,
            classifier_url: None,
            session_ttl_secs: 3600,
        }
    }
}

impl FlowConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(max) = std::env::var("CALLFLOW_MAX_ATTEMPTS") {
            if let Ok(n) = max.parse() {
                config.max_attempts = n;
            }
        }
        if let Ok(number) = std::env::var("CALLFLOW_TARGET_NUMBER") {
            config.target_number = number;
        }
        if let Ok(number) = std::env::var("CALLFLOW_SERVICE_NUMBER") {
            config.service_number = number;
        }
        if let Ok(hour) = std::env::var("CALLFLOW_CSR_CUTOFF_HOUR") {
            if let Ok(n) = hour.parse() {
                config.csr_cutoff_hour = n;
            }
        }
        if let Ok(offset) = std::env::var("CALLFLOW_CSR_UTC_OFFSET") {
            if let Ok(parsed) = offset.parse::<FixedOffset>() {
                config.csr_utc_offset = parsed;
            }
        }
        if let Ok(mode) = std::env::var("CALLFLOW_INTAKE") {
            if let Ok(parsed) = mode.parse() {
                config.intake = parsed;
            }
        }
        if let Ok(val) = std::env::var("CALLFLOW_DISCLOSURE") {
            config.play_disclosure = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(cycles) = std::env::var("CALLFLOW_MAX_VERIFY_CYCLES") {
            if let Ok(n) = cycles.parse() {
                config.max_verify_cycles = Some(n);
            }
        }
        if let Ok(tag) = std::env::var("CALLFLOW_DEFAULT_LOCALE") {
            if let Ok(locale) = tag.parse() {
                config.default_locale = locale;
            }
        }
        if let Ok(path) = std::env::var("CALLFLOW_RECORDS_PATH") {
            config.records_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CALLFLOW_MESSAGES_PATH") {
            config.messages_path = Some(PathBuf::from(path));
        }
        if let Ok(url) = std::env::var("CALLFLOW_CLASSIFIER_URL") {
            config.classifier_url = Some(url);
        }
        if let Ok(ttl) = std::env::var("CALLFLOW_SESSION_TTL_SECS") {
            if let Ok(n) = ttl.parse() {
                config.session_ttl_secs = n;
            }
        }

        config
    }

    /// Sanity-check the configuration. Returns human-readable issues; empty
    /// means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.max_attempts == 0 {
            issues.push("max_attempts must be at least 1".to_string());
        }
        if self.csr_cutoff_hour > 24 {
            issues.push(format!(
                "csr_cutoff_hour {} is not a valid hour",
                self.csr_cutoff_hour
            ));
        }
        if self.target_number.trim().is_empty() {
            issues.push("target_number is empty".to_string());
        }
        if self.service_number.trim().is_empty() {
            issues.push("service_number is empty".to_string());
        }
        if self.max_verify_cycles == Some(0) {
            issues.push("max_verify_cycles of 0 would reject every caller".to_string());
        }
        issues
    }
}
