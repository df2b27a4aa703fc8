use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use docchat_core::{session, Backend, Config, FileStore, HttpBackend};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const LOG_ENV_VAR: &str = "DOCCHAT_LOG";

#[derive(Parser)]
#[command(name = "docchat", version)]
#[command(about = "Chat with your uploaded documents from the terminal")]
struct Cli {
    /// Backend base URL (overrides DOCCHAT_SERVER and the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Where the session tokens are kept
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Forget the stored session and exit
    #[arg(long)]
    logout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_problem) = load_config(Config::get_config_path());

    init_logging(&config)?;
    if let Some(problem) = config_problem {
        eprintln!("{}", problem);
        warn!("{}", problem);
    }

    let session_path = match cli.session_file {
        Some(path) => path,
        None => FileStore::default_path().context("Could not determine data directory")?,
    };
    let mut store = FileStore::open(&session_path)
        .with_context(|| format!("Could not open session file {}", session_path.display()))?;

    if cli.logout {
        session::logout(&mut store)?;
        println!("Logged out.");
        return Ok(());
    }

    let server_url = config.resolve_server_url(cli.server.as_deref());
    info!(server = %server_url, session = %session_path.display(), "Starting docchat");

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&server_url));
    let mut app = App::new(backend, store, server_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event);
        }

        let now = Instant::now();
        app.poll_pending(now).await;
        app.tick(now);
    }
    Ok(())
}

/// Defaults stand in for a config that can't be read; the reason comes back for reporting
fn load_config(path: Result<PathBuf>) -> (Config, Option<String>) {
    match path.and_then(|path| Config::load_from(&path)) {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(format!("Ignoring unreadable config: {:#}", e))),
    }
}

/// Logs go to a file; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<()> {
    let log_dir = dirs::data_dir()
        .map(|dir| dir.join("docchat"))
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("docchat.log"))?;

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        EnvFilter::new(config.log_filter.as_deref().unwrap_or("warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    Ok(())
}
