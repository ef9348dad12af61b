use std::fs::{self, OpenOptions};
use std::io::Stdout;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthChar;

mod app;
mod chat;
mod config;
mod format;
mod github;
mod keys;
mod llm;
mod notify;
mod store;

use app::GitHubPanel;
use chat::{ChatSession, JobMode, Services};
use config::{ChatConfig, Cli};
use github::GitHubClient;
use keys::{KeyProvider, KEY_COLLECTION, KEY_DOCUMENT};
use llm::OpenAiClient;
use notify::DesktopNotifier;
use store::SqliteStore;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ChatConfig::from_cli(&cli)?;
    let store = Arc::new(SqliteStore::open(&config.store_path)?);

    if let Some(key) = cli.set_key.as_deref() {
        store.put_secret(KEY_COLLECTION, KEY_DOCUMENT, key.trim())?;
        println!("API key stored in {}", store.path().display());
        return Ok(());
    }

    init_logging(&config.log_path())?;
    tracing::info!(
        store = %store.path().display(),
        identity = ?config.identity,
        "chattograph {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let services = Services {
        store: store.clone(),
        keys: KeyProvider::new(store.clone()),
        model: Arc::new(OpenAiClient::new(&config.model)?),
    };
    let session = ChatSession::new(
        services,
        Box::new(DesktopNotifier::new(config.notifications)),
        config.mention,
        config.poll_interval,
    )
    .with_job_mode(JobMode::Threaded);
    let github = match GitHubClient::new(&config.github.api_base) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "github panel disabled");
            None
        }
    };
    let panel = GitHubPanel::new(config.github.owner.clone(), config.github.repo.clone());

    let mut terminal = setup_terminal()?;
    let result = app::run_app(&mut terminal, session, panel, github, config.identity.clone());
    restore_terminal(&mut terminal)?;
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "chattograph exited with error");
    }
    result
}

/// Stdout belongs to the terminal UI, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    crossterm::execute!(std::io::stdout(), EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    if matches!(supports_keyboard_enhancement(), Ok(true)) {
        crossterm::execute!(
            std::io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .ok();
    }
    crossterm::execute!(std::io::stdout(), EnableBracketedPaste).ok();

    let mut terminal =
        Terminal::new(CrosstermBackend::new(std::io::stdout())).context("create terminal")?;
    terminal.clear().context("clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    crossterm::execute!(std::io::stdout(), DisableBracketedPaste).ok();
    crossterm::execute!(std::io::stdout(), PopKeyboardEnhancementFlags).ok();
    crossterm::execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen).ok();
    disable_raw_mode().context("disable raw mode")?;
    terminal.show_cursor().context("show cursor")?;
    Ok(())
}

fn truncate(s: &str, n: usize) -> String {
    match s.char_indices().nth(n) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn input_cursor_position(input: &str, cursor: usize, width: u16, prompt_width: u16) -> (u16, u16) {
    let width = width.max(1) as usize;
    let mut x = prompt_width as usize;
    let mut y = 0usize;
    let mut consumed = 0usize;

    for ch in input.chars() {
        let len = ch.len_utf8();
        if consumed + len > cursor {
            break;
        }
        consumed += len;
        if ch == '\n' {
            x = prompt_width as usize;
            y += 1;
            continue;
        }
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1).max(1);
        if x + ch_width > width {
            x = 0;
            y += 1;
        }
        x += ch_width;
        if x >= width {
            x = 0;
            y += 1;
        }
    }

    (x as u16, y as u16)
}
