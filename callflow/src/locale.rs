//! Locales, message templates, and voice selection.
//!
//! Every piece of spoken text the flow produces is looked up here by
//! `MessageKey` and locale, with `{placeholder}` substitution. Built-in
//! English and Spanish catalogs cover every key; an optional TOML overlay
//! file replaces individual templates or voices. A missing template for a
//! resolved locale is a configuration defect and fails the lookup — it is
//! never papered over with another locale's text.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};

/// Supported locale tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Spanish
    Es,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            other => Err(FlowError::config(format!("unsupported locale '{other}'"))),
        }
    }
}

/// Every message the flow can speak.
///
/// A closed set so a handler cannot ask for a key that was never defined;
/// the fatal missing-template path guards overlay files, not this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    AskLanguage,
    RetryLanguage,
    Disclosure,
    HoursNotice,
    AskQuestion,
    RetryQuestion,
    AskSsn,
    RetrySsn,
    AskDob,
    RetryDob,
    AskZip,
    RetryZip,
    VerifyFound,
    VerifyNotFound,
    AttemptsExceeded,
    GenericError,
    Goodbye,
}

impl MessageKey {
    /// All keys, for catalog completeness checks.
    pub const ALL: [MessageKey; 17] = [
        Self::AskLanguage,
        Self::RetryLanguage,
        Self::Disclosure,
        Self::HoursNotice,
        Self::AskQuestion,
        Self::RetryQuestion,
        Self::AskSsn,
        Self::RetrySsn,
        Self::AskDob,
        Self::RetryDob,
        Self::AskZip,
        Self::RetryZip,
        Self::VerifyFound,
        Self::VerifyNotFound,
        Self::AttemptsExceeded,
        Self::GenericError,
        Self::Goodbye,
    ];

    /// Catalog/overlay key name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AskLanguage => "ask_language",
            Self::RetryLanguage => "retry_language",
            Self::Disclosure => "disclosure",
            Self::HoursNotice => "hours_notice",
            Self::AskQuestion => "ask_question",
            Self::RetryQuestion => "retry_question",
            Self::AskSsn => "ask_ssn",
            Self::RetrySsn => "retry_ssn",
            Self::AskDob => "ask_dob",
            Self::RetryDob => "retry_dob",
            Self::AskZip => "ask_zip",
            Self::RetryZip => "retry_zip",
            Self::VerifyFound => "verify_found",
            Self::VerifyNotFound => "verify_not_found",
            Self::AttemptsExceeded => "attempts_exceeded",
            Self::GenericError => "generic_error",
            Self::Goodbye => "goodbye",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EN_TEMPLATES: &[(&str, &str)] = &[
    (
        "ask_language",
        "Thank you for calling. For English, press 1. Para español, oprima el 2.",
    ),
    (
        "retry_language",
        "Sorry, I didn't get that. For English, press 1. Para español, oprima el 2.",
    ),
    (
        "disclosure",
        "Please be advised that this call may be recorded or monitored, and any \
         information obtained will be used for that purpose.",
    ),
    (
        "hours_notice",
        "Please note that our representatives are currently unavailable. You may \
         continue and we will direct your call.",
    ),
    (
        "ask_question",
        "If you are calling about your account, press 1 or say, my account. For \
         all other questions, press 2 or say, general question.",
    ),
    (
        "retry_question",
        "Sorry, I didn't get that. For questions about your account, press 1. For \
         all other questions, press 2.",
    ),
    (
        "ask_ssn",
        "Using your keypad, please enter the last four digits of your Social \
         Security number.",
    ),
    (
        "retry_ssn",
        "That entry wasn't valid. Please enter exactly the last four digits of \
         your Social Security number.",
    ),
    (
        "ask_dob",
        "Please enter your date of birth as a two digit month, two digit day, and \
         four digit year.",
    ),
    (
        "retry_dob",
        "That date wasn't valid. Please enter your date of birth as a two digit \
         month, two digit day, and four digit year.",
    ),
    ("ask_zip", "Please enter your five digit ZIP code."),
    (
        "retry_zip",
        "That entry wasn't valid. Please enter your five digit ZIP code.",
    ),
    (
        "verify_found",
        "Thank you, {name}. We located your account and will connect you now.",
    ),
    (
        "verify_not_found",
        "We could not locate your account with the information provided. Let's \
         try again.",
    ),
    (
        "attempts_exceeded",
        "We were unable to collect the information we need. Please call back \
         later. Goodbye.",
    ),
    (
        "generic_error",
        "We are experiencing technical difficulties. Please call back later. \
         Goodbye.",
    ),
    ("goodbye", "Goodbye."),
];

const ES_TEMPLATES: &[(&str, &str)] = &[
    (
        "ask_language",
        "Gracias por llamar. For English, press 1. Para español, oprima el 2.",
    ),
    (
        "retry_language",
        "Lo sentimos, no recibimos su respuesta. For English, press 1. Para \
         español, oprima el 2.",
    ),
    (
        "disclosure",
        "Le informamos que esta llamada puede ser grabada o monitoreada, y que \
         cualquier información obtenida será utilizada para ese propósito.",
    ),
    (
        "hours_notice",
        "Tenga en cuenta que nuestros representantes no están disponibles en este \
         momento. Puede continuar y dirigiremos su llamada.",
    ),
    (
        "ask_question",
        "Si llama acerca de su cuenta, oprima el 1 o diga, mi cuenta. Para \
         cualquier otra pregunta, oprima el 2 o diga, pregunta general.",
    ),
    (
        "retry_question",
        "Lo sentimos, no recibimos su respuesta. Para preguntas sobre su cuenta, \
         oprima el 1. Para cualquier otra pregunta, oprima el 2.",
    ),
    (
        "ask_ssn",
        "Usando su teclado, ingrese los últimos cuatro dígitos de su número de \
         Seguro Social.",
    ),
    (
        "retry_ssn",
        "La entrada no es válida. Ingrese exactamente los últimos cuatro dígitos \
         de su número de Seguro Social.",
    ),
    (
        "ask_dob",
        "Ingrese su fecha de nacimiento: dos dígitos para el mes, dos para el \
         día, y cuatro para el año.",
    ),
    (
        "retry_dob",
        "La fecha no es válida. Ingrese su fecha de nacimiento: dos dígitos para \
         el mes, dos para el día, y cuatro para el año.",
    ),
    ("ask_zip", "Ingrese su código postal de cinco dígitos."),
    (
        "retry_zip",
        "La entrada no es válida. Ingrese su código postal de cinco dígitos.",
    ),
    (
        "verify_found",
        "Gracias, {name}. Localizamos su cuenta y le conectaremos ahora.",
    ),
    (
        "verify_not_found",
        "No pudimos localizar su cuenta con la información proporcionada. \
         Intentemos de nuevo.",
    ),
    (
        "attempts_exceeded",
        "No pudimos obtener la información necesaria. Por favor llame más tarde. \
         Adiós.",
    ),
    (
        "generic_error",
        "Estamos experimentando dificultades técnicas. Por favor llame más tarde. \
         Adiós.",
    ),
    ("goodbye", "Adiós."),
];

const EN_VOICE: &str = "Polly.Joanna";
const ES_VOICE: &str = "Polly.Lupe";

/// Per-locale message templates and voice identifiers.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<Locale, HashMap<String, String>>,
    voices: HashMap<Locale, String>,
    default_locale: Locale,
}

impl MessageCatalog {
    /// Catalog with the complete built-in template and voice set.
    pub fn builtin(default_locale: Locale) -> Self {
        let mut templates = HashMap::new();
        templates.insert(Locale::En, to_map(EN_TEMPLATES));
        templates.insert(Locale::Es, to_map(ES_TEMPLATES));

        let mut voices = HashMap::new();
        voices.insert(Locale::En, EN_VOICE.to_string());
        voices.insert(Locale::Es, ES_VOICE.to_string());

        Self {
            templates,
            voices,
            default_locale,
        }
    }

    /// Apply a TOML overlay on top of the built-ins.
    ///
    /// Overlay format: one table per locale tag with `key = "template"`
    /// entries, plus an optional `[voices]` table mapping locale tags to
    /// voice identifiers. Unknown locale tags fail loading.
    pub fn load_overlay(&mut self, path: &Path) -> FlowResult<()> {
        let raw = std::fs::read_to_string(path)?;
        let tables: HashMap<String, HashMap<String, String>> = toml::from_str(&raw)
            .map_err(|e| FlowError::config(format!("invalid message overlay: {e}")))?;

        for (table, entries) in tables {
            if table == "voices" {
                for (tag, voice) in entries {
                    let locale: Locale = tag.parse()?;
                    self.voices.insert(locale, voice);
                }
                continue;
            }
            let locale: Locale = table.parse()?;
            let target = self.templates.entry(locale).or_default();
            for (key, template) in entries {
                target.insert(key, template);
            }
        }

        tracing::info!(path = %path.display(), "Loaded message overlay");
        Ok(())
    }

    /// The session's effective locale: its chosen language, or the default.
    pub fn resolve(&self, language: Option<Locale>) -> Locale {
        language.unwrap_or(self.default_locale)
    }

    /// Render the locale's template for `key`, substituting `{name}` style
    /// placeholders. Absence of the key for that locale is a configuration
    /// defect and returns `MissingTemplate`.
    pub fn message(
        &self,
        locale: Locale,
        key: MessageKey,
        substitutions: &[(&str, &str)],
    ) -> FlowResult<String> {
        let template = self
            .templates
            .get(&locale)
            .and_then(|map| map.get(key.as_str()))
            .ok_or_else(|| FlowError::missing_template(locale.as_str(), key.as_str()))?;

        let mut text = template.clone();
        for (name, value) in substitutions {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        Ok(text)
    }

    /// Voice identifier for a locale.
    pub fn voice(&self, locale: Locale) -> &str {
        self.voices
            .get(&locale)
            .map(String::as_str)
            .unwrap_or(EN_VOICE)
    }

    /// Check catalog completeness. Returns a list of human-readable issues;
    /// empty means every locale carries every key and a voice.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for locale in [Locale::En, Locale::Es] {
            match self.templates.get(&locale) {
                Some(map) => {
                    for key in MessageKey::ALL {
                        if !map.contains_key(key.as_str()) {
                            issues.push(format!("locale '{locale}' missing template '{key}'"));
                        }
                    }
                }
                None => issues.push(format!("locale '{locale}' has no templates")),
            }
            if !self.voices.contains_key(&locale) {
                issues.push(format!("locale '{locale}' has no voice"));
            }
        }
        issues
    }
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
