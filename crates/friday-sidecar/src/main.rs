//! Friday sidecar - single-shot ingestion process for the Friday desktop app.
//!
//! Reads exactly one JSON request from stdin, writes exactly one JSON response
//! line to stdout and exits. Progress lines and logs go to stderr.
//!
//! # Configuration
//!
//! - `FRIDAY_CONFIG` - Optional config file (`.toml`, `.json` or `.yaml`)
//! - `FRIDAY_LIBRARY_PATH` - Library root, defaults to `library`
//! - `FRIDAY_DATABASE_PATH` - Optional SQLite file for resource records
//! - `FRIDAY_LOG_LEVEL` - Log level, defaults to `info` (`RUST_LOG` wins)
//! - `FRIDAY_DISABLED_PLUGINS` - Comma separated plugin names
//!
//! # Exit codes
//!
//! - `0` - a response was written, including error responses
//! - `1` - the request was not a JSON object
//! - `2` - stdin or stdout failed

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use friday_core::{SidecarConfig, SidecarContext};
use friday_sidecar::{Dispatcher, Outcome, EXIT_FATAL};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            eprintln!("friday-sidecar: {:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    dotenvy::dotenv().ok();

    let config = SidecarConfig::load();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_level.as_str())
            .unwrap_or("info"),
    );

    let mut raw = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut raw)
        .await
        .context("failed to read request from stdin")?;

    let outcome = match config.and_then(SidecarContext::new) {
        Ok(ctx) => {
            tracing::info!(library = %ctx.library_root().display(), "Sidecar started");
            Dispatcher::new(ctx).process(&raw).await
        }
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            Outcome::failure(&e)
        }
    };

    let mut stdout = tokio::io::stdout();
    let mut line = outcome.to_line();
    line.push('\n');
    stdout
        .write_all(line.as_bytes())
        .await
        .context("failed to write response to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;

    Ok(outcome.exit_code)
}

/// Logs go to stderr; stdout carries the response.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}
