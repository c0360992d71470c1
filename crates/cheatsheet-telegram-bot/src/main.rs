mod redact;

use cheatsheet_core::config::InferenceSettings;
use cheatsheet_transport_telegram::config::{BotSettings, TelegramSettings};
use cheatsheet_transport_telegram::runner::run_webhook;
use dotenvy::dotenv;
use redact::{RedactingMakeWriter, RedactionPatterns};
use std::io;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "cheatsheet_core=info,cheatsheet_transport_telegram=info,cheatsheet_telegram_bot=info,hyper=warn,h2=error,reqwest=warn,tower_http=info,aws_config=warn,aws_smithy_runtime=warn";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Patterns must exist before the first log line
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting cheatsheet bot...");

    let settings = init_settings();

    if let Err(e) = run_webhook(settings).await {
        error!("Webhook server failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<BotSettings> {
    let inference_settings = match InferenceSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load inference configuration: {}", e);
            std::process::exit(1);
        }
    };
    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(inference_settings, telegram_settings))
}
