mod config;
mod gemini;
mod i18n;
mod query;
mod server;
mod session;
mod staging;
mod store;

pub const USER_AGENT: &str = concat!("pdf-chat/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::Parser;
use config::{Cli, Config};
use gemini::client::GeminiClient;
use i18n::{MessageKey, localize};
use reqwest::Client;
use store::StoreManager;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the real environment still applies.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdf_chat=info".parse()?),
        )
        .init();

    let config = Config::from_cli(Cli::parse());

    let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
    let gemini = GeminiClient::from_env(http).inspect_err(|e| {
        tracing::error!(
            "{} ({e})",
            localize(MessageKey::ErrorApiKey, config.default_language)
        )
    })?;

    info!(
        model = config.default_model.id(),
        poll_interval_secs = config.poll.interval.as_secs(),
        max_wait_secs = config.poll.max_wait.as_secs(),
        "starting pdf-chat"
    );

    let state = server::AppState::new(
        StoreManager::new(gemini, config.poll),
        config.default_language,
        config.default_model,
    )
    .with_session_idle(config.session_idle);
    server::serve(config.listen, state)
        .await
        .inspect_err(|e| tracing::error!("server failed: {e}"))?;

    info!("server stopped");
    Ok(())
}
