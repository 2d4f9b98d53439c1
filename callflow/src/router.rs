//! Step dispatch.
//!
//! `StepRouter` is the flow's single entry point: one inbound `CallEvent` in,
//! exactly one `Directive` out. It owns the wiring between every other
//! component. The session's per-call lock is held for the whole dispatch, so
//! handlers mutate state without further coordination.
//!
//! Handlers leave the session resting at the step the returned directive
//! sends the collaborator to next. An event naming a different step than the
//! resting one is checked against the transition table first; an illegal
//! move, like an unknown step name, is a server-side defect and ends the
//! call with the generic error message.

use std::sync::Arc;

use chrono::Utc;

use crate::attempts::{AttemptGuard, GuardResult, IDENTITY_FIELDS};
use crate::classify::IntentClassifier;
use crate::config::{FlowConfig, IntakeMode};
use crate::directive::{CallEvent, Directive, GatherSpec, InputKind};
use crate::error::{FlowError, FlowResult};
use crate::hours;
use crate::identity::{IdentityStore, IdentityVerifier};
use crate::locale::{Locale, MessageCatalog, MessageKey};
use crate::routing;
use crate::session::{
    AttemptField, EndReason, QuestionKind, Session, SharedSessionRegistry,
};
use crate::step::Step;
use crate::validate;

/// Spoken when even the generic-error template cannot be rendered.
const GENERIC_ERROR_FALLBACK: &str =
    "We are experiencing technical difficulties. Please call back later. Goodbye.";

/// Routes call events through the step graph.
pub struct StepRouter {
    config: FlowConfig,
    registry: SharedSessionRegistry,
    verifier: IdentityVerifier,
    classifier: Arc<dyn IntentClassifier>,
    catalog: MessageCatalog,
    guard: AttemptGuard,
}

impl StepRouter {
    pub fn new(
        config: FlowConfig,
        registry: SharedSessionRegistry,
        store: Arc<dyn IdentityStore>,
        classifier: Arc<dyn IntentClassifier>,
        catalog: MessageCatalog,
    ) -> Self {
        let guard = AttemptGuard::new(config.max_attempts);
        Self {
            config,
            registry,
            verifier: IdentityVerifier::new(store),
            classifier,
            catalog,
            guard,
        }
    }

    /// Dispatch one event and produce the one directive that answers it.
    ///
    /// Never fails: any error inside a handler is logged and rendered as the
    /// generic-error hangup.
    pub async fn dispatch(&self, event: CallEvent) -> Directive {
        let handle = self
            .registry
            .get_or_create(&event.call_id, &event.caller_number)
            .await;
        let mut session = handle.lock().await;
        session.touch();

        if session.phone_number.is_empty() && !event.caller_number.trim().is_empty() {
            session.phone_number = event.caller_number.clone();
        }

        if session.is_ended() {
            return self.goodbye(&session);
        }

        let effective = event.step.unwrap_or(session.current_step);
        if effective != session.current_step {
            if let Err(e) = session.advance(effective, None) {
                return self.fail_call(&mut session, &FlowError::internal(e.to_string()));
            }
        }

        tracing::debug!(
            call_id = %event.call_id,
            step = %effective,
            has_input = event.input.is_some(),
            "Dispatching event"
        );

        match self.run_step(&mut session, effective, event.input.as_deref()).await {
            Ok(directive) => directive,
            Err(e) => self.fail_call(&mut session, &e),
        }
    }

    /// Dispatch from wire-format fields, parsing the step name. An
    /// unrecognized step name ends the call the same way any other
    /// server-side defect does.
    pub async fn dispatch_wire(
        &self,
        call_id: &str,
        caller_number: &str,
        input: Option<&str>,
        step: Option<&str>,
    ) -> Directive {
        let mut event = CallEvent::new(call_id, caller_number);
        if let Some(input) = input {
            event = event.with_input(input);
        }

        match step {
            None => self.dispatch(event).await,
            Some(name) => match name.parse::<Step>() {
                Ok(step) => self.dispatch(event.with_step(step)).await,
                Err(e) => {
                    let handle = self
                        .registry
                        .get_or_create(&event.call_id, &event.caller_number)
                        .await;
                    let mut session = handle.lock().await;
                    session.touch();
                    self.fail_call(&mut session, &e)
                }
            },
        }
    }

    async fn run_step(
        &self,
        session: &mut Session,
        step: Step,
        input: Option<&str>,
    ) -> FlowResult<Directive> {
        match step {
            Step::AskLanguage => self.ask(
                session,
                MessageKey::AskLanguage,
                InputKind::Digits { max: 1 },
                Step::ProcessLanguage,
            ),
            Step::ProcessLanguage => self.process_language(session, input),
            Step::Disclosure => self.disclosure(session),
            Step::HoursCheck => self.hours_check(session),
            Step::HoursNotice => self.hours_notice(session),
            Step::AskQuestion => self.ask(
                session,
                MessageKey::AskQuestion,
                self.question_input(),
                Step::ProcessQuestion,
            ),
            Step::ProcessQuestion => self.process_question(session, input).await,
            Step::AskSsn => self.ask(
                session,
                MessageKey::AskSsn,
                InputKind::Digits { max: 4 },
                Step::ProcessSsn,
            ),
            Step::ProcessSsn => self.process_ssn(session, input),
            Step::AskDob => self.ask(
                session,
                MessageKey::AskDob,
                InputKind::Digits { max: 8 },
                Step::ProcessDob,
            ),
            Step::ProcessDob => self.process_dob(session, input),
            Step::AskZip => self.ask(
                session,
                MessageKey::AskZip,
                InputKind::Digits { max: 5 },
                Step::ProcessZip,
            ),
            Step::ProcessZip => self.process_zip(session, input),
            Step::Verify => self.verify(session),
            Step::TransferCall => self.transfer(session),
        }
    }

    // ---- Step handlers ----

    fn process_language(
        &self,
        session: &mut Session,
        input: Option<&str>,
    ) -> FlowResult<Directive> {
        let choice = match validate::digits(input.unwrap_or("")).as_str() {
            "1" => Some(Locale::En),
            "2" => Some(Locale::Es),
            _ => None,
        };

        let Some(locale) = choice else {
            return self.retry_or_exceed(
                session,
                AttemptField::Language,
                Step::AskLanguage,
                MessageKey::RetryLanguage,
                InputKind::Digits { max: 1 },
                Step::ProcessLanguage,
            );
        };

        session.choose_language(locale);
        tracing::info!(call_id = %session.id, language = %locale, "Language selected");

        let next = if self.config.play_disclosure {
            Step::Disclosure
        } else {
            Step::HoursCheck
        };
        self.advance(session, next, Some("language selected"))?;
        Ok(Directive::Redirect { step: next })
    }

    fn disclosure(&self, session: &mut Session) -> FlowResult<Directive> {
        self.advance(session, Step::HoursCheck, Some("disclosure played"))?;
        self.announce(session, MessageKey::Disclosure, Step::HoursCheck)
    }

    fn hours_check(&self, session: &mut Session) -> FlowResult<Directive> {
        let open = hours::available(
            Utc::now(),
            self.config.csr_cutoff_hour,
            self.config.csr_utc_offset,
        );
        tracing::debug!(call_id = %session.id, open, "Representative hours gate");

        let next = if open { Step::AskQuestion } else { Step::HoursNotice };
        self.advance(
            session,
            next,
            Some(if open { "within hours" } else { "after hours" }),
        )?;
        Ok(Directive::Redirect { step: next })
    }

    fn hours_notice(&self, session: &mut Session) -> FlowResult<Directive> {
        self.advance(session, Step::AskQuestion, Some("after-hours notice"))?;
        self.announce(session, MessageKey::HoursNotice, Step::AskQuestion)
    }

    async fn process_question(
        &self,
        session: &mut Session,
        input: Option<&str>,
    ) -> FlowResult<Directive> {
        let raw = input.unwrap_or("").trim();
        let kind = if raw.is_empty() {
            None
        } else {
            // Both intake modes accept the keypad shortcut the prompt offers
            match validate::digits(raw).as_str() {
                "1" => Some(QuestionKind::AccountSpecific),
                "2" => Some(QuestionKind::General),
                _ => match self.config.intake {
                    IntakeMode::Keypad => None,
                    IntakeMode::Speech => Some(self.classifier.classify(raw).await?),
                },
            }
        };

        let Some(kind) = kind else {
            return self.retry_or_exceed(
                session,
                AttemptField::Question,
                Step::AskQuestion,
                MessageKey::RetryQuestion,
                self.question_input(),
                Step::ProcessQuestion,
            );
        };

        session.question = Some(kind);
        tracing::info!(call_id = %session.id, question = %kind, "Question classified");

        let next = match kind {
            QuestionKind::General => Step::TransferCall,
            QuestionKind::AccountSpecific => Step::AskSsn,
        };
        self.advance(session, next, Some("question classified"))?;
        Ok(Directive::Redirect { step: next })
    }

    fn process_ssn(&self, session: &mut Session, input: Option<&str>) -> FlowResult<Directive> {
        let raw = input.unwrap_or("");
        if !validate::digits4(raw) {
            return self.retry_or_exceed(
                session,
                AttemptField::SsnLast4,
                Step::AskSsn,
                MessageKey::RetrySsn,
                InputKind::Digits { max: 4 },
                Step::ProcessSsn,
            );
        }

        session.ssn_last4 = Some(validate::digits(raw));
        self.advance(session, Step::AskDob, Some("ssn accepted"))?;
        Ok(Directive::Redirect { step: Step::AskDob })
    }

    fn process_dob(&self, session: &mut Session, input: Option<&str>) -> FlowResult<Directive> {
        let raw = input.unwrap_or("");
        if !validate::date_of_birth(raw, Utc::now().date_naive()) {
            return self.retry_or_exceed(
                session,
                AttemptField::Dob,
                Step::AskDob,
                MessageKey::RetryDob,
                InputKind::Digits { max: 8 },
                Step::ProcessDob,
            );
        }

        session.dob = Some(validate::digits(raw));
        self.advance(session, Step::AskZip, Some("dob accepted"))?;
        Ok(Directive::Redirect { step: Step::AskZip })
    }

    fn process_zip(&self, session: &mut Session, input: Option<&str>) -> FlowResult<Directive> {
        let raw = input.unwrap_or("");
        if !validate::digits5(raw) {
            return self.retry_or_exceed(
                session,
                AttemptField::Zip,
                Step::AskZip,
                MessageKey::RetryZip,
                InputKind::Digits { max: 5 },
                Step::ProcessZip,
            );
        }

        session.zip = Some(validate::digits(raw));
        self.advance(session, Step::Verify, Some("zip accepted"))?;
        Ok(Directive::Redirect { step: Step::Verify })
    }

    fn verify(&self, session: &mut Session) -> FlowResult<Directive> {
        let (Some(ssn), Some(dob), Some(zip)) = (
            session.ssn_last4.clone(),
            session.dob.clone(),
            session.zip.clone(),
        ) else {
            return Err(FlowError::internal("verify reached with incomplete identity"));
        };

        match self.verifier.verify(&ssn, &dob, &zip)? {
            Some(record) => {
                self.verifier.link_phone_number(&record, &session.phone_number);
                self.advance(session, Step::TransferCall, Some("identity verified"))?;
                let locale = self.catalog.resolve(session.language);
                let text =
                    self.catalog
                        .message(locale, MessageKey::VerifyFound, &[("name", &record.name)])?;
                Ok(Directive::Prompt {
                    text,
                    locale,
                    voice: self.catalog.voice(locale).to_string(),
                    gather: None,
                    fallback: Step::TransferCall,
                })
            }
            None => {
                session.verify_cycles += 1;
                if let Some(cap) = self.config.max_verify_cycles {
                    if session.verify_cycles >= cap {
                        tracing::warn!(
                            call_id = %session.id,
                            cycles = session.verify_cycles,
                            "Verification cycle cap reached"
                        );
                        return self.end_call(
                            session,
                            EndReason::AttemptsExceeded,
                            MessageKey::AttemptsExceeded,
                        );
                    }
                }

                // Fresh collection cycle: clear the trio and its counters,
                // then start over at the first identity step
                self.guard.reset(session, &IDENTITY_FIELDS);
                session.clear_identity();
                self.advance(session, Step::AskSsn, Some("verification miss"))?;
                self.announce(session, MessageKey::VerifyNotFound, Step::AskSsn)
            }
        }
    }

    fn transfer(&self, session: &Session) -> FlowResult<Directive> {
        let route = routing::route(session, &self.config);
        tracing::info!(
            call_id = %session.id,
            target = %route.target,
            caller_id = %route.caller_id,
            "Transferring call"
        );
        Ok(Directive::Transfer {
            target: route.target,
            caller_id: route.caller_id,
        })
    }

    // ---- Directive builders ----

    /// Prompt that captures input for `callback`. The session keeps resting
    /// at the ask step; the collaborator's callback drives the process step.
    fn ask(
        &self,
        session: &Session,
        key: MessageKey,
        input: InputKind,
        callback: Step,
    ) -> FlowResult<Directive> {
        let locale = self.catalog.resolve(session.language);
        let text = self.catalog.message(locale, key, &[])?;
        Ok(Directive::Prompt {
            text,
            locale,
            voice: self.catalog.voice(locale).to_string(),
            gather: Some(GatherSpec { input, callback }),
            fallback: callback,
        })
    }

    /// Prompt with no input capture; the collaborator redirects to `next`.
    fn announce(&self, session: &Session, key: MessageKey, next: Step) -> FlowResult<Directive> {
        let locale = self.catalog.resolve(session.language);
        let text = self.catalog.message(locale, key, &[])?;
        Ok(Directive::Prompt {
            text,
            locale,
            voice: self.catalog.voice(locale).to_string(),
            gather: None,
            fallback: next,
        })
    }

    /// Count a bad entry; either step back to the ask step with a retry
    /// prompt, or end the call when the field's budget is spent.
    fn retry_or_exceed(
        &self,
        session: &mut Session,
        field: AttemptField,
        ask_step: Step,
        retry_key: MessageKey,
        input: InputKind,
        callback: Step,
    ) -> FlowResult<Directive> {
        match self.guard.record(session, field) {
            GuardResult::Exceeded => self.end_call(
                session,
                EndReason::AttemptsExceeded,
                MessageKey::AttemptsExceeded,
            ),
            GuardResult::Retry => {
                self.advance(session, ask_step, Some("invalid entry"))?;
                let locale = self.catalog.resolve(session.language);
                let text = self.catalog.message(locale, retry_key, &[])?;
                Ok(Directive::Prompt {
                    text,
                    locale,
                    voice: self.catalog.voice(locale).to_string(),
                    gather: Some(GatherSpec { input, callback }),
                    fallback: callback,
                })
            }
        }
    }

    /// Terminal hangup with the given message; the session answers every
    /// later event with the goodbye hangup.
    fn end_call(
        &self,
        session: &mut Session,
        reason: EndReason,
        key: MessageKey,
    ) -> FlowResult<Directive> {
        let locale = self.catalog.resolve(session.language);
        let text = self.catalog.message(locale, key, &[])?;
        session.ended = Some(reason);
        tracing::info!(call_id = %session.id, ?reason, "Call ended");
        Ok(Directive::Hangup { text })
    }

    /// Render an error as the generic-error hangup. Infallible so the
    /// boundary always has a directive to return.
    fn fail_call(&self, session: &mut Session, error: &FlowError) -> Directive {
        if error.is_external() {
            tracing::error!(call_id = %session.id, %error, "Dependency failure; ending call");
        } else {
            tracing::error!(call_id = %session.id, %error, "Flow defect; ending call");
        }
        session.ended = Some(EndReason::SystemError);

        let locale = self.catalog.resolve(session.language);
        let text = self
            .catalog
            .message(locale, MessageKey::GenericError, &[])
            .unwrap_or_else(|e| {
                tracing::error!(%e, "Generic-error template unavailable");
                GENERIC_ERROR_FALLBACK.to_string()
            });
        Directive::Hangup { text }
    }

    fn goodbye(&self, session: &Session) -> Directive {
        let locale = self.catalog.resolve(session.language);
        let text = self
            .catalog
            .message(locale, MessageKey::Goodbye, &[])
            .unwrap_or_else(|_| "Goodbye.".to_string());
        Directive::Hangup { text }
    }

    // ---- Helpers ----

    fn advance(&self, session: &mut Session, to: Step, reason: Option<&str>) -> FlowResult<()> {
        session
            .advance(to, reason)
            .map_err(|e| FlowError::internal(e.to_string()))
    }

    fn question_input(&self) -> InputKind {
        match self.config.intake {
            IntakeMode::Keypad => InputKind::Digits { max: 1 },
            IntakeMode::Speech => InputKind::Speech,
        }
    }
}
