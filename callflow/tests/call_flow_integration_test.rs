//! End-to-end dialog tests.
//!
//! Drives `StepRouter` the way the telephony collaborator would: each
//! directive's continuation step becomes the next posted event, and scripted
//! caller inputs are consumed whenever a prompt gathers. Verifies the
//! dialog's contracts:
//!
//! - An account question collects SSN last-four, date of birth, and ZIP,
//!   verifies them, and transfers presenting the caller's own number.
//! - A general question transfers immediately with the service number.
//! - A verification miss clears the identity trio and restarts collection.
//! - Four bad entries for one field end the call; silence counts.
//! - After the cutoff hour the notice plays and the flow continues.
//! - A store outage ends the call with the generic error, never a panic.

use std::sync::Arc;

use callflow::{
    CallEvent, Directive, FlowConfig, FlowError, FlowResult, IdentityRecord, IdentityStore,
    IntakeMode, KeywordClassifier, Locale, MemoryStore, MessageCatalog, RecordKey,
    SessionRegistry, SharedSessionRegistry, Step, StepRouter,
};

// ── Fixtures ─────────────────────────────────────────────────────────────────

const CALLER: &str = "+15550001111";

/// Config that never hits the hours gate, so tests are time-independent.
fn open_all_hours() -> FlowConfig {
    FlowConfig {
        csr_cutoff_hour: 24,
        ..Default::default()
    }
}

fn tony() -> IdentityRecord {
    IdentityRecord::new("6789", "01011990", "90210", "Tony")
}

fn build_router(
    config: FlowConfig,
    store: Arc<dyn IdentityStore>,
) -> (StepRouter, SharedSessionRegistry) {
    let registry: SharedSessionRegistry = Arc::new(SessionRegistry::new());
    let router = StepRouter::new(
        config,
        Arc::clone(&registry),
        store,
        Arc::new(KeywordClassifier::new().unwrap()),
        MessageCatalog::builtin(Locale::En),
    );
    (router, registry)
}

fn router_with(config: FlowConfig, records: Vec<IdentityRecord>) -> (StepRouter, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_records(records));
    let (router, _) = build_router(config, Arc::clone(&store) as Arc<dyn IdentityStore>);
    (router, store)
}

/// A store whose backing database is down.
struct BrokenStore;

impl IdentityStore for BrokenStore {
    fn find(&self, _key: &RecordKey) -> FlowResult<Option<IdentityRecord>> {
        Err(FlowError::store("records database unreachable"))
    }

    fn upsert(&self, _record: IdentityRecord) -> FlowResult<()> {
        Err(FlowError::store("records database unreachable"))
    }

    fn len(&self) -> FlowResult<usize> {
        Ok(0)
    }
}

// ── Collaborator driver ──────────────────────────────────────────────────────

/// How a driven call ended.
#[derive(Debug)]
enum Outcome {
    Transferred { target: String, caller_id: String },
    HungUp { text: String },
}

impl Outcome {
    fn transfer(&self) -> (&str, &str) {
        match self {
            Outcome::Transferred { target, caller_id } => (target, caller_id),
            Outcome::HungUp { text } => panic!("expected transfer, call hung up: {text}"),
        }
    }

    fn hangup_text(&self) -> &str {
        match self {
            Outcome::HungUp { text } => text,
            Outcome::Transferred { .. } => panic!("expected hangup, call transferred"),
        }
    }
}

/// Play the collaborator: follow every directive's continuation, feeding the
/// next scripted input whenever a prompt gathers. A script that runs out
/// plays as silence.
async fn drive(router: &StepRouter, call_id: &str, script: &[&str]) -> Outcome {
    let mut inputs = script.iter();
    let mut directive = router.dispatch(CallEvent::new(call_id, CALLER)).await;

    for _ in 0..64 {
        let (next, input) = match &directive {
            Directive::Prompt {
                gather: Some(gather),
                ..
            } => (gather.callback, inputs.next().copied()),
            Directive::Prompt { fallback, .. } => (*fallback, None),
            Directive::Redirect { step } => (*step, None),
            Directive::Transfer { target, caller_id } => {
                return Outcome::Transferred {
                    target: target.clone(),
                    caller_id: caller_id.clone(),
                };
            }
            Directive::Hangup { text } => {
                return Outcome::HungUp { text: text.clone() };
            }
        };

        let mut event = CallEvent::new(call_id, CALLER).with_step(next);
        if let Some(input) = input {
            event = event.with_input(input);
        }
        directive = router.dispatch(event).await;
    }

    panic!("dialog did not terminate within 64 events");
}

// ── Happy paths ──────────────────────────────────────────────────────────────

/// Account question, valid identity: the caller is verified against the
/// enrolled record and transferred presenting their own number.
#[tokio::test]
async fn test_account_question_verifies_and_transfers_with_caller_id() {
    let (router, store) = router_with(open_all_hours(), vec![tony()]);

    let outcome = drive(
        &router,
        "CA-account",
        &["1", "1", "6789", "01011990", "90210"],
    )
    .await;

    let (target, caller_id) = outcome.transfer();
    assert_eq!(target, FlowConfig::default().target_number);
    assert_eq!(caller_id, CALLER);

    // Verification linked the caller's number onto the record
    let linked = store
        .find(&RecordKey::new("6789", "01011990", "90210"))
        .unwrap()
        .unwrap();
    assert_eq!(linked.phone_number.as_deref(), Some(CALLER));
}

/// General question: no identity collection, transfer presents the service
/// number instead of the caller's.
#[tokio::test]
async fn test_general_question_transfers_with_service_number() {
    let (router, _) = router_with(open_all_hours(), vec![tony()]);

    let outcome = drive(&router, "CA-general", &["1", "2"]).await;

    let (target, caller_id) = outcome.transfer();
    assert_eq!(target, FlowConfig::default().target_number);
    assert_eq!(caller_id, FlowConfig::default().service_number);
}

/// Entered digits may carry separators; validation strips them and the
/// stripped digits are what gets matched.
#[tokio::test]
async fn test_separator_laden_entries_still_verify() {
    let (router, _) = router_with(open_all_hours(), vec![tony()]);

    let outcome = drive(
        &router,
        "CA-separators",
        &["1", "1", "67-89", "01/01/1990", "90210 "],
    )
    .await;

    let (_, caller_id) = outcome.transfer();
    assert_eq!(caller_id, CALLER);
}

// ── Verification misses ──────────────────────────────────────────────────────

/// A miss announces not-found, wipes the collected trio, and collects all
/// three fields again; a correct second pass verifies and transfers.
#[tokio::test]
async fn test_verification_miss_restarts_collection() {
    let (router, _) = router_with(open_all_hours(), vec![tony()]);

    let outcome = drive(
        &router,
        "CA-miss",
        &[
            "1", "1", // language, question
            "0000", "01011990", "90210", // wrong SSN digits: miss
            "6789", "01011990", "90210", // second cycle succeeds
        ],
    )
    .await;

    let (_, caller_id) = outcome.transfer();
    assert_eq!(caller_id, CALLER);
}

/// Immediately after the verify handler answers a miss, the session is
/// already resting at the first identity step with the trio and its attempt
/// counters cleared.
#[tokio::test]
async fn test_miss_resets_session_to_first_identity_step() {
    let store = Arc::new(MemoryStore::with_records(vec![tony()]));
    let (router, registry) = build_router(open_all_hours(), store);
    let call_id = "CA-reset";

    router.dispatch(CallEvent::new(call_id, CALLER)).await;
    for (step, input) in [
        (Step::ProcessLanguage, "1"),
        (Step::Disclosure, ""),
        (Step::HoursCheck, ""),
        (Step::AskQuestion, ""),
        (Step::ProcessQuestion, "1"),
        (Step::AskSsn, ""),
        (Step::ProcessSsn, "0000"),
        (Step::AskDob, ""),
        (Step::ProcessDob, "bad"), // one bad date, then a good one
        (Step::ProcessDob, "01011990"),
        (Step::AskZip, ""),
        (Step::ProcessZip, "90210"),
    ] {
        let mut event = CallEvent::new(call_id, CALLER).with_step(step);
        if !input.is_empty() {
            event = event.with_input(input);
        }
        router.dispatch(event).await;
    }

    let directive = router
        .dispatch(CallEvent::new(call_id, CALLER).with_step(Step::Verify))
        .await;
    match &directive {
        Directive::Prompt { text, fallback, .. } => {
            assert!(text.contains("could not locate"));
            assert_eq!(*fallback, Step::AskSsn);
        }
        other => panic!("expected not-found prompt, got {other:?}"),
    }

    let handle = registry.get_or_create(&"CA-reset".into(), CALLER).await;
    let session = handle.lock().await;
    assert_eq!(session.current_step, Step::AskSsn);
    assert!(session.ssn_last4.is_none());
    assert!(session.dob.is_none());
    assert!(session.zip.is_none());
    assert_eq!(session.attempt_count(callflow::AttemptField::Dob), 0);
    assert_eq!(session.verify_cycles, 1);
}

/// With a configured cycle cap, a miss that reaches the cap ends the call
/// instead of restarting collection.
#[tokio::test]
async fn test_verify_cycle_cap_ends_the_call() {
    let config = FlowConfig {
        max_verify_cycles: Some(1),
        ..open_all_hours()
    };
    let (router, _) = router_with(config, vec![tony()]);

    let outcome = drive(&router, "CA-cap", &["1", "1", "0000", "01011990", "90210"]).await;
    assert!(outcome.hangup_text().contains("unable to collect"));
}

// ── Attempt budgets ──────────────────────────────────────────────────────────

/// Four consecutive bad entries for one identity field end the call.
#[tokio::test]
async fn test_four_bad_entries_end_the_call() {
    let (router, _) = router_with(open_all_hours(), vec![tony()]);

    let outcome = drive(
        &router,
        "CA-exhaust",
        &["1", "1", "111", "22", "3", "4444444"],
    )
    .await;

    assert!(outcome.hangup_text().contains("unable to collect"));
}

/// A caller who never answers burns the language budget and is hung up on.
#[tokio::test]
async fn test_silence_consumes_the_attempt_budget() {
    let (router, _) = router_with(open_all_hours(), vec![]);

    let outcome = drive(&router, "CA-silent", &[]).await;
    assert!(outcome.hangup_text().contains("unable to collect"));
}

// ── Hours gate ───────────────────────────────────────────────────────────────

/// With the cutoff at hour zero no call is within hours: the gate redirects
/// through the notice and the dialog continues to question intake.
#[tokio::test]
async fn test_after_hours_notice_plays_then_flow_continues() {
    let config = FlowConfig {
        csr_cutoff_hour: 0,
        ..Default::default()
    };
    let (router, _) = router_with(config, vec![]);
    let call_id = "CA-afterhours";

    router.dispatch(CallEvent::new(call_id, CALLER)).await;
    router
        .dispatch(CallEvent::new(call_id, CALLER).with_step(Step::ProcessLanguage).with_input("1"))
        .await;
    router
        .dispatch(CallEvent::new(call_id, CALLER).with_step(Step::Disclosure))
        .await;

    let directive = router
        .dispatch(CallEvent::new(call_id, CALLER).with_step(Step::HoursCheck))
        .await;
    assert_eq!(
        directive,
        Directive::Redirect {
            step: Step::HoursNotice
        }
    );

    let directive = router
        .dispatch(CallEvent::new(call_id, CALLER).with_step(Step::HoursNotice))
        .await;
    match directive {
        Directive::Prompt { text, fallback, .. } => {
            assert!(text.contains("currently unavailable"));
            assert_eq!(fallback, Step::AskQuestion);
        }
        other => panic!("expected notice prompt, got {other:?}"),
    }
}

// ── Speech intake ────────────────────────────────────────────────────────────

/// Spoken utterances route through the classifier: account vocabulary goes
/// to identity collection, anything else transfers as a general question.
#[tokio::test]
async fn test_speech_intake_classifies_the_question() {
    let config = FlowConfig {
        intake: IntakeMode::Speech,
        ..open_all_hours()
    };
    let (router, _) = router_with(config, vec![tony()]);

    let outcome = drive(
        &router,
        "CA-speech-account",
        &["1", "what's my balance", "6789", "01011990", "90210"],
    )
    .await;
    let (_, caller_id) = outcome.transfer();
    assert_eq!(caller_id, CALLER);

    let outcome = drive(
        &router,
        "CA-speech-general",
        &["1", "where are you located"],
    )
    .await;
    let (_, caller_id) = outcome.transfer();
    assert_eq!(caller_id, FlowConfig::default().service_number);
}

// ── Failure paths ────────────────────────────────────────────────────────────

/// A store outage at verification ends the call with the generic error.
#[tokio::test]
async fn test_store_outage_ends_with_generic_error() {
    let (router, _) = build_router(open_all_hours(), Arc::new(BrokenStore));

    let outcome = drive(
        &router,
        "CA-outage",
        &["1", "1", "6789", "01011990", "90210"],
    )
    .await;

    assert!(outcome.hangup_text().contains("technical difficulties"));
}

/// Replaying the transfer step recomputes the same transfer; an ended call
/// answers with the goodbye instead.
#[tokio::test]
async fn test_transfer_replay_is_idempotent() {
    let (router, _) = router_with(open_all_hours(), vec![tony()]);
    let call_id = "CA-replay";

    let outcome = drive(
        &router,
        call_id,
        &["1", "1", "6789", "01011990", "90210"],
    )
    .await;
    let (first_target, first_caller_id) = outcome.transfer();

    let directive = router
        .dispatch(CallEvent::new(call_id, CALLER).with_step(Step::TransferCall))
        .await;
    assert_eq!(
        directive,
        Directive::Transfer {
            target: first_target.to_string(),
            caller_id: first_caller_id.to_string(),
        }
    );
}
