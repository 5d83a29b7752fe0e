use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::warn;

use crate::gemini::operation::PollPolicy;
use crate::i18n::Language;
use crate::query::Model;

const MIN_SESSION_IDLE_SECS: u64 = 60;

/// Command-line flags. The API key comes from `GEMINI_API_KEY`.
#[derive(Debug, Parser)]
#[command(name = "pdf-chat", version)]
#[command(about = "Chat with a PDF using Gemini File Search", long_about = None)]
pub struct Cli {
    /// Address the web UI listens on
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub listen: SocketAddr,

    /// Seconds between upload status checks
    #[arg(long, default_value_t = 2)]
    pub poll_interval_secs: u64,

    /// Give up waiting for indexing after this many seconds
    #[arg(long, default_value_t = 300)]
    pub max_wait_secs: u64,

    /// Initial UI language for new sessions ("en" or "ja")
    #[arg(long, default_value = "en")]
    pub language: String,

    /// End sessions (and delete their stores) after this many idle seconds
    #[arg(long, default_value_t = 3600)]
    pub session_idle_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub poll: PollPolicy,
    pub default_language: Language,
    pub default_model: Model,
    pub session_idle: Duration,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            listen: cli.listen,
            poll: PollPolicy {
                interval: Duration::from_secs(cli.poll_interval_secs.max(1)),
                max_wait: Duration::from_secs(cli.max_wait_secs),
            },
            default_language: Language::from_code(&cli.language),
            default_model: default_model(env::var("GEMINI_MODEL").ok().as_deref()),
            session_idle: Duration::from_secs(cli.session_idle_secs.max(MIN_SESSION_IDLE_SECS)),
        }
    }
}

/// `GEMINI_MODEL` selects the initial model when it names a supported one.
fn default_model(raw: Option<&str>) -> Model {
    let Some(raw) = raw.map(str::trim).filter(|m| !m.is_empty()) else {
        return Model::default();
    };
    Model::from_id(raw).unwrap_or_else(|| {
        warn!(model = raw, "unsupported GEMINI_MODEL, using {}", Model::default().id());
        Model::default()
    })
}
