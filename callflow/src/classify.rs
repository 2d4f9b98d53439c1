//! Question intent classification.
//!
//! The flow only ever asks for a `QuestionKind` from an utterance; which
//! engine answers is behind the `IntentClassifier` trait. The keyword rules
//! cover deployments without a model endpoint, the HTTP implementation
//! forwards to one. A classifier failure is an outage, not caller error:
//! the flow terminates with the system-error message.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};
use crate::session::QuestionKind;

/// Maps an utterance to a question label.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> FlowResult<QuestionKind>;
}

/// Rule-based classifier: account vocabulary routes to `AccountSpecific`,
/// everything else is `General`.
pub struct KeywordClassifier {
    account_rule: Regex,
}

impl KeywordClassifier {
    pub fn new() -> FlowResult<Self> {
        // English and Spanish account vocabulary, whole words only
        let account_rule = Regex::new(
            r"(?i)\b(account|balance|bill|billing|payment|pay|owe|debt|statement|card|loan|cuenta|saldo|pago|factura|deuda|tarjeta)\b",
        )
        .map_err(|e| FlowError::config(format!("bad account rule: {e}")))?;
        Ok(Self { account_rule })
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, utterance: &str) -> FlowResult<QuestionKind> {
        let label = if self.account_rule.is_match(utterance) {
            QuestionKind::AccountSpecific
        } else {
            QuestionKind::General
        };
        tracing::debug!(%label, "Keyword classification");
        Ok(label)
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    label: String,
}

/// Remote classifier: POSTs `{"text": …}` and expects
/// `{"label": "general" | "account-specific"}`.
pub struct HttpClassifier {
    http: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl IntentClassifier for HttpClassifier {
    async fn classify(&self, utterance: &str) -> FlowResult<QuestionKind> {
        let response = self
            .http
            .post(&self.url)
            .json(&ClassifyRequest { text: utterance })
            .send()
            .await
            .map_err(|e| FlowError::classifier(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::classifier(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| FlowError::classifier(e.to_string()))?;

        match parsed.label.as_str() {
            "general" => Ok(QuestionKind::General),
            "account-specific" | "account_specific" => Ok(QuestionKind::AccountSpecific),
            other => Err(FlowError::classifier(format!("unknown label '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_account_vocabulary_is_account_specific() {
        let classifier = KeywordClassifier::new().unwrap();
        for utterance in [
            "I have a question about my account",
            "what's my balance",
            "I need to make a payment",
            "how much do I owe",
            "quiero saber mi saldo",
            "una pregunta sobre mi cuenta",
        ] {
            assert_eq!(
                classifier.classify(utterance).await.unwrap(),
                QuestionKind::AccountSpecific,
                "{utterance}"
            );
        }
    }

    #[tokio::test]
    async fn test_everything_else_is_general() {
        let classifier = KeywordClassifier::new().unwrap();
        for utterance in [
            "what are your office hours",
            "I'd like to speak with someone",
            "general question",
            "where are you located",
        ] {
            assert_eq!(
                classifier.classify(utterance).await.unwrap(),
                QuestionKind::General,
                "{utterance}"
            );
        }
    }

    #[tokio::test]
    async fn test_whole_word_matching() {
        let classifier = KeywordClassifier::new().unwrap();
        // "accountability" should not trip the account rule
        assert_eq!(
            classifier.classify("a question about accountability").await.unwrap(),
            QuestionKind::General
        );
    }

    #[tokio::test]
    async fn test_http_classifier_unreachable_is_an_error() {
        // Nothing listens on this port
        let classifier = HttpClassifier::new("http://127.0.0.1:9/classify");
        let err = classifier.classify("my balance").await.unwrap_err();
        assert!(matches!(err, FlowError::Classifier { .. }));
        assert!(err.is_external());
    }
}
