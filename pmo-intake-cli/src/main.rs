use std::io::Write;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use clap::Parser;
use pmo_intake::{
    DialogueEngine, ExtractionOrchestrator, InMemorySessionStore, InboundRequest, IntakeConfig,
    OpenRouterBackend, ReportSink, SubmissionPayload, WebhookClient,
    dialogue::INTRODUCTION_MESSAGE,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Chat with the PMO intake agent from a terminal.
#[derive(Debug, Parser)]
#[command(name = "pmo-intake", version, about)]
struct Args {
    /// User id the conversation is stored under
    #[arg(long, default_value = "local-user")]
    user_id: String,

    /// Model name (overrides PMO_INTAKE_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Webhook URL (overrides PMO_INTAKE_WEBHOOK_URL)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Print the payload instead of posting it
    #[arg(long)]
    dry_run: bool,
}

/// Initialize structured tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pmo_intake=debug,pmo_intake_cli=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Sink used with `--dry-run`: prints the payload and reports success.
struct StdoutSink;

#[async_trait]
impl ReportSink for StdoutSink {
    async fn submit(&self, payload: &SubmissionPayload) -> bool {
        match serde_json::to_string_pretty(payload) {
            Ok(json) => {
                println!("--- payload (dry run) ---\n{json}\n-------------------------");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize payload");
                false
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = IntakeConfig::from_env().context("failed to read configuration")?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(url) = args.webhook_url {
        config.webhook_url = url;
    }

    // Without a key every turn runs on pattern extraction and canned questions
    if config.api_key.is_none() {
        warn!("OPENROUTER_API_KEY not set, model extraction disabled");
    }

    let backend = Arc::new(OpenRouterBackend::new(
        config.api_key.clone(),
        config.model.clone(),
        config.temperature,
    ));
    let sink: Arc<dyn ReportSink> = if args.dry_run {
        Arc::new(StdoutSink)
    } else {
        Arc::new(WebhookClient::new(&config.webhook_url, config.webhook_timeout)?)
    };

    let engine = DialogueEngine::new(
        Arc::new(InMemorySessionStore::new()),
        ExtractionOrchestrator::new(backend, config.model_timeout),
        sink,
    );

    info!(
        user_id = %args.user_id,
        model = %config.model,
        webhook_url = %config.webhook_url,
        dry_run = args.dry_run,
        "Intake agent ready"
    );
    println!("{INTRODUCTION_MESSAGE}\n(type 'quit' to exit)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        match engine.respond(InboundRequest::new(&args.user_id, line)).await {
            Ok(reply) => println!("\n{reply}\n"),
            Err(e) => error!(error = %e, "Turn failed"),
        }
    }

    Ok(())
}
