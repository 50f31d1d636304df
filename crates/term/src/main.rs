use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use chatline::{
    ChatController, ChatSurface, HttpBackend, MarkdownRenderer, PlainTextRenderer, WidgetConfig,
};
use chatline_session::{MemorySessionStore, SessionId, SessionIdentity};
use clap::Parser;
use snafu::ResultExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::{
    Command, ConfigSnafu, LineInput, ReadInputSnafu, SessionSnafu, StderrNotifier, TermResult,
    TerminalView,
};

/// Origin used when neither the config nor `--base-url` names one.
const FALLBACK_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_LOG_FILTER: &str = "chatline=info,chatline_session=info";

#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Talk to a chat agent endpoint from the terminal", long_about = None)]
struct Cli {
    /// Origin of the chat service, e.g. http://localhost:8000
    #[arg(long)]
    base_url: Option<String>,
    /// Path of the chat endpoint on that origin
    #[arg(long)]
    endpoint: Option<String>,
    /// Agent that should answer
    #[arg(long)]
    agent: Option<String>,
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Continue an existing xxxx-xxxx-xxxx-xxxx session
    #[arg(long)]
    session_id: Option<SessionId>,
}

impl Cli {
    fn load_config(&self) -> TermResult<WidgetConfig> {
        let loaded = match &self.config {
            Some(path) => WidgetConfig::load_from(path),
            None => WidgetConfig::load(),
        };
        let mut config = loaded.context(ConfigSnafu {
            stage: "load-config",
        })?;

        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(agent) = &self.agent {
            config.agent_name = agent.clone();
        }

        let mut config = config.normalized();
        config
            .base_url
            .get_or_insert_with(|| FALLBACK_BASE_URL.to_string());
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "chatline exited");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> TermResult<()> {
    let config = cli.load_config()?;
    let backend = HttpBackend::from_config(&config).context(ConfigSnafu {
        stage: "build-backend",
    })?;
    tracing::info!(url = %backend.url(), agent = %config.agent_name, "connected chat client");

    let store = Rc::new(MemorySessionStore::new());
    if let Some(session_id) = &cli.session_id {
        SessionIdentity::with_key(Rc::clone(&store), config.session_key.clone())
            .adopt(session_id)
            .context(SessionSnafu {
                stage: "adopt-session-id",
            })?;
    }

    let interactive = std::io::stdin().is_terminal();
    let input = Rc::new(LineInput::default());
    let renderer: Rc<dyn MarkdownRenderer> = Rc::new(PlainTextRenderer);
    let controller = ChatController::new(
        config,
        store,
        ChatSurface {
            input: input.clone(),
            view: Rc::new(TerminalView::new(std::io::stdout(), !interactive)),
            notifier: Rc::new(StderrNotifier),
        },
        Rc::new(backend),
        renderer,
    );
    controller.on_load();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context(ReadInputSnafu {
        stage: "read-line",
    })? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::ShowSession => {
                let id = controller.session_id().context(SessionSnafu {
                    stage: "show-session-id",
                })?;
                println!("{id}");
            }
            Command::ResetSession => {
                controller.reset_session().context(SessionSnafu {
                    stage: "reset-session-id",
                })?;
                tracing::info!("session cleared");
            }
            Command::Send(text) => {
                input.set(&text);
                if let Some(pending) = controller.send_message() {
                    // Failures are already on stderr; keep reading.
                    let _ = pending.run().await;
                }
            }
        }
    }

    Ok(())
}
