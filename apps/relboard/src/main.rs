//! # relboard - Release Tracking Dashboard
//!
//! The main binary for the relboard release tracker.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) backing the dashboard
//! - CLI interface over the same release service
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/relboard (THE BINARY)             │
//! │                                                      │
//! │   ┌─────────────┐          ┌─────────────┐           │
//! │   │   CLI       │          │   HTTP API  │           │
//! │   │  (clap)     │          │   (axum)    │           │
//! │   └──────┬──────┘          └──────┬──────┘           │
//! │          └──────────────┬─────────┘                  │
//! │                         ▼                            │
//! │                 ┌────────────────┐                   │
//! │                 │ relboard-core  │                   │
//! │                 │  (THE LOGIC)   │                   │
//! │                 └────────────────┘                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! relboard serve --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! relboard dashboard
//! relboard releases --project oss
//! relboard step v2.5.0 "Images Published" done
//! relboard advance v3.1.0 "Release Validated"
//! ```

use clap::Parser;
use relboard::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // RELBOARD_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("RELBOARD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "relboard=info,relboard_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the relboard startup banner.
fn print_banner() {
    println!(
        r#"
  relboard v{}

  Releases • Hashreleases • Lifecycle
"#,
        env!("CARGO_PKG_VERSION")
    );
}
