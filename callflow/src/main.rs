//! Interactive call-flow simulator
//!
//! Plays the telephony collaborator against the flow for one simulated call:
//! prompts print to stdout, responses are read from stdin, redirects are
//! followed silently, and a transfer or hangup ends the run. Logs go to
//! stderr so the dialog stays readable.
//!
//! # Usage
//!
//! ```bash
//! # Keypad intake, demo records
//! callflow --records records.json --seed-demo
//!
//! # Spoken question intake against a remote classifier
//! callflow --intake speech --classifier-url http://localhost:8088/classify
//!
//! # After-hours behavior at any time of day
//! callflow --cutoff-hour 0
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use callflow::{
    CallId, Directive, FlowConfig, HttpClassifier, IdentityRecord, IdentityStore,
    InputKind, IntentClassifier, JsonFileStore, KeywordClassifier, MessageCatalog,
    SessionRegistry, SharedSessionRegistry, Step, StepRouter,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the identity records file (overrides CALLFLOW_RECORDS_PATH)
    #[arg(long)]
    records: Option<PathBuf>,

    /// Path to a TOML message overlay (overrides CALLFLOW_MESSAGES_PATH)
    #[arg(long)]
    messages: Option<PathBuf>,

    /// Question intake mode: keypad or speech (overrides CALLFLOW_INTAKE)
    #[arg(long)]
    intake: Option<String>,

    /// Remote intent classifier endpoint (overrides CALLFLOW_CLASSIFIER_URL)
    #[arg(long)]
    classifier_url: Option<String>,

    /// Transfer destination number (overrides CALLFLOW_TARGET_NUMBER)
    #[arg(long)]
    target_number: Option<String>,

    /// Representative cutoff hour, 0-24 (overrides CALLFLOW_CSR_CUTOFF_HOUR)
    #[arg(long)]
    cutoff_hour: Option<u32>,

    /// Caller number the collaborator reports
    #[arg(long, default_value = "+15555551234")]
    caller: String,

    /// Enroll a few demo records into an empty store
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("callflow=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Build config from env, then layer CLI flags on top
    let mut config = FlowConfig::from_env();
    if let Some(path) = args.records {
        config.records_path = path;
    }
    if let Some(path) = args.messages {
        config.messages_path = Some(path);
    }
    if let Some(mode) = args.intake {
        config.intake = mode.parse()?;
    }
    if let Some(url) = args.classifier_url {
        config.classifier_url = Some(url);
    }
    if let Some(number) = args.target_number {
        config.target_number = number;
    }
    if let Some(hour) = args.cutoff_hour {
        config.csr_cutoff_hour = hour;
    }
    for issue in config.validate() {
        tracing::warn!(%issue, "Configuration issue");
    }

    tracing::info!(
        records = %config.records_path.display(),
        intake = %config.intake,
        target = %config.target_number,
        cutoff_hour = config.csr_cutoff_hour,
        "Call flow starting"
    );

    let mut catalog = MessageCatalog::builtin(config.default_locale);
    if let Some(path) = &config.messages_path {
        catalog.load_overlay(path)?;
    }
    for issue in catalog.validate() {
        tracing::warn!(%issue, "Message catalog issue");
    }

    let store = JsonFileStore::open(&config.records_path)?;
    if args.seed_demo && store.is_empty()? {
        seed_demo_records(&store)?;
    }
    tracing::info!(records = store.len()?, "Identity store ready");
    let store: Arc<dyn IdentityStore> = Arc::new(store);

    let classifier: Arc<dyn IntentClassifier> = match &config.classifier_url {
        Some(url) => {
            tracing::info!(%url, "Using HTTP intent classifier");
            Arc::new(HttpClassifier::new(url))
        }
        None => Arc::new(KeywordClassifier::new()?),
    };

    let registry: SharedSessionRegistry = Arc::new(SessionRegistry::new());
    let ttl = config.session_ttl_secs;
    let router = StepRouter::new(config, Arc::clone(&registry), store, classifier, catalog);

    // Background sweep for abandoned sessions
    let sweeper = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(60));
            loop {
                tick.tick().await;
                registry.evict_idle(ttl).await;
            }
        })
    };

    run_call(&router, &registry, &args.caller).await?;

    sweeper.abort();
    Ok(())
}

/// Drive one call from stdin until the flow transfers or hangs up.
async fn run_call(
    router: &StepRouter,
    registry: &SharedSessionRegistry,
    caller: &str,
) -> Result<()> {
    let call_id = format!("SIM{}", uuid::Uuid::new_v4().simple());
    println!("-- call {call_id} from {caller} --");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    let mut directive = router.dispatch_wire(&call_id, caller, None, None).await;
    loop {
        let next = match render(&directive) {
            Some(step) => step,
            None => break,
        };

        // A prompt that gathers waits for the caller; everything else
        // re-enters the flow immediately
        let input = match &directive {
            Directive::Prompt {
                gather: Some(_), ..
            } => {
                print!("> ");
                std::io::stdout().flush()?;
                match lines.next() {
                    Some(line) => Some(line?),
                    // EOF plays as silence
                    None => None,
                }
            }
            _ => None,
        };

        directive = router
            .dispatch_wire(&call_id, caller, input.as_deref(), Some(next.wire_name()))
            .await;
    }

    registry.remove(&CallId::from(call_id)).await;
    Ok(())
}

/// Print a directive the way the collaborator would act on it. Returns the
/// step the dialog continues at, or `None` when the call is over.
fn render(directive: &Directive) -> Option<Step> {
    match directive {
        Directive::Prompt {
            text,
            locale,
            voice,
            gather,
            ..
        } => {
            println!("[{locale}/{voice}] {text}");
            if let Some(gather) = gather {
                match gather.input {
                    InputKind::Digits { max } => println!("   (enter up to {max} digits)"),
                    InputKind::Speech => println!("   (speak)"),
                }
            }
            directive.continuation()
        }
        Directive::Redirect { .. } => directive.continuation(),
        Directive::Transfer { target, caller_id } => {
            println!("** transferring to {target}, caller-ID {caller_id} **");
            None
        }
        Directive::Hangup { text } => {
            println!("[hangup] {text}");
            None
        }
    }
}

fn seed_demo_records(store: &JsonFileStore) -> Result<()> {
    let records = vec![
        IdentityRecord::new("6789", "01011990", "90210", "Tony"),
        IdentityRecord::new("1234", "07041985", "10001", "Maria"),
        IdentityRecord::new("4242", "12251978", "60601", "Sam"),
    ];
    let count = records.len();
    for record in records {
        store.upsert(record)?;
    }
    tracing::info!(count, "Seeded demo identity records");
    Ok(())
}
