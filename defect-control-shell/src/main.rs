//! # Defect Control
//!
//! Terminal front end for the Defect Control construction defect tracker.
//!
//! ## Usage
//!
//! ```bash
//! DEFECT_API_URL=http://localhost:8080/api/v1 cargo run -p defect-control-shell
//! ```
//!
//! Type `help` at the prompt for the command list. Logs go to stderr and are
//! filtered with `RUST_LOG`.

use std::io::Write;

use defect_control_client::{ApiClient, ClientConfig, Session};
use defect_control_shell::app::{Flow, Shell};
use defect_control_shell::commands;
use defect_control_shell::render::render;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "defect_control_shell=info,defect_control_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Defect Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::load()?;
    tracing::info!(api_url = %config.api_url, token_path = %config.token_path.display(), "Configuration loaded");

    let client = ApiClient::from_config(&config)?;
    let session = Session::start(client).await;
    let mut shell = Shell::start(session, config.search_debounce()).await;

    println!("{}", render(&shell));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, exiting...");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match commands::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                if shell.execute(command).await == Flow::Quit {
                    break;
                }
                println!("{}", render(&shell));
            }
            Err(e) => println!("{}", e),
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}
