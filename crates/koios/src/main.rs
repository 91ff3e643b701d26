use std::io::{self, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};

use koios::app::App;
use koios::config::{self, Keymap};
use koios::connector::ConnectParams;
use koios::logging::{self, LoggingGuard};
use koios::operation::OperationRegistry;
use koios::session::{self, SessionState};
use koios::util::expand_home;

/// Keyboard-first terminal browser for SQLite, PostgreSQL and Athena.
#[derive(Debug, Parser)]
#[command(name = "koios", version, about)]
struct Cli {
    /// Config file to use instead of the default.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Session file to restore from and save to.
    #[arg(long, value_name = "PATH")]
    session: Option<PathBuf>,

    /// Neither restore nor save the session.
    #[arg(long)]
    no_session: bool,

    /// SQLite database files to open on startup.
    #[arg(value_name = "FILE")]
    files: Vec<String>,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("koios: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    let _log_guard = match config::log_dir() {
        Some(dir) => logging::init_logging(dir, cfg.log.filter.as_deref()).unwrap_or_else(|e| {
            eprintln!("Warning: logging disabled: {}", e);
            LoggingGuard::disabled()
        }),
        None => LoggingGuard::disabled(),
    };
    info!(version = env!("CARGO_PKG_VERSION"), "starting koios");

    let operations = OperationRegistry::new();
    let keymap = Keymap::from_config(&cfg.keys);
    let unresolved = keymap.unresolved(&operations);
    if !unresolved.is_empty() {
        for err in &unresolved {
            eprintln!("koios: invalid key binding {}", err);
        }
        return Ok(ExitCode::FAILURE);
    }

    let persist = cfg.session.persist && !cli.no_session;
    let session_file = cli.session.clone().or_else(session::session_path);
    let session = match (&session_file, persist) {
        (Some(path), true) => session::load_session_from_path(path).unwrap_or_else(|e| {
            warn!(error = %format!("{e:#}"), "failed to load session");
            eprintln!("Warning: Failed to load session: {:#}", e);
            SessionState::default()
        }),
        _ => SessionState::default(),
    };

    let rt = Runtime::new().context("failed to initialize tokio runtime")?;
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    let mut terminal =
        init_terminal().context("failed to initialize terminal; are you running in a real TTY?")?;

    let mut app = App::new(
        keymap,
        operations,
        rt.handle().clone(),
        updates_tx,
        updates_rx,
    );
    app.restore_session(session);
    for file in &cli.files {
        let params = ConnectParams::from([(
            "file".to_string(),
            expand_home(file).display().to_string(),
        )]);
        app.open_database("sqlite", params);
    }

    let res = app.run(&mut terminal);

    restore_terminal(terminal)?;
    res?;

    if let (Some(path), true) = (&session_file, persist) {
        if let Err(e) = session::save_session_to_path(&app.session_state(), path) {
            warn!(error = %format!("{e:#}"), "failed to save session");
            eprintln!("Warning: Failed to save session: {:#}", e);
        }
    }

    info!("koios exiting");
    Ok(ExitCode::SUCCESS)
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
