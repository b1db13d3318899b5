//! issuemark: open GitHub issues shown next to the source lines they link to.
//!
//! Entry point for the `issuemark` binary. Wires together configuration,
//! the SQLite-backed cache and settings (`issuemark-core`), the git source
//! worker thread, the unified event bus, and the terminal UI.
//!
//! # Startup sequence
//!
//! 1. Config, tracing, target resolution, the store and the source worker
//!    thread: all before the terminal enters raw mode, so failures print
//!    normally.
//! 2. `install_panic_hook()`, then `register_sigterm()`, then `init_tui()`.
//! 3. Event task, first source request, first fetch.
//!
//! `restore_tui()` runs after the event loop exits on every path: `q`,
//! SIGTERM, channel close, or a draw error. Draw errors are carried out of
//! the loop instead of returned with `?`.

mod app;
mod config;
mod event;
mod source;
mod theme;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use issuemark_core::cache::CacheStore;
use issuemark_core::db::SqliteKv;
use issuemark_core::fetch::{GithubClient, IssueFetcher};
use issuemark_core::kv::{KvStore, MemoryKv};
use issuemark_core::settings::Settings;
use tokio::sync::mpsc::UnboundedSender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::app::AppState;
use crate::event::AppEvent;
use crate::source::types::SourceRequest;
use crate::ui::keybindings::{self, KeyAction};

#[derive(Parser, Debug)]
#[command(name = "issuemark", version, about = "Show open GitHub issues next to the lines they reference")]
struct Cli {
    /// A GitHub URL (repository or blob, optionally with `#L10-L20`), or a
    /// local file or directory inside a clone.
    #[arg(default_value = ".")]
    target: String,

    /// Ignore the cached issue list and fetch from GitHub.
    #[arg(long)]
    refresh: bool,

    /// Cache database path.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Color theme (`dark` or `catppuccin-mocha`).
    #[arg(long, value_name = "NAME")]
    theme: Option<String>,

    /// Open the file scrolled to this line.
    #[arg(long, value_name = "N")]
    line: Option<u32>,
}

/// Logs go to `issuemark.log` next to the database; the terminal belongs to
/// the UI. The filter comes from `ISSUEMARK_LOG`.
fn init_tracing(log_dir: &Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("ISSUEMARK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("issuemark=info,issuemark_core=info,warn"));

    let log_path = log_dir.join("issuemark.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("cannot open log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

/// Opens the SQLite store, falling back to an in-memory one so the viewer
/// still works (uncached, unpersisted) when the database is unusable.
async fn open_store(db_path: &Path) -> Arc<dyn KvStore> {
    match SqliteKv::open(&db_path.to_string_lossy()).await {
        Ok(kv) => Arc::new(kv),
        Err(e) => {
            tracing::warn!(path = %db_path.display(), error = %e, "cannot open cache database, using memory");
            Arc::new(MemoryKv::new())
        }
    }
}

/// Spawns the git source worker for `workdir`, returning its request channel.
fn spawn_source_worker(
    workdir: PathBuf,
    event_tx: UnboundedSender<AppEvent>,
) -> anyhow::Result<crossbeam_channel::Sender<SourceRequest>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("source-worker".into())
        .spawn(move || source::worker::source_worker_loop(workdir, rx, event_tx))
        .context("cannot spawn source worker thread")?;
    Ok(tx)
}

fn start_fetch(
    state: &mut AppState,
    fetcher: &IssueFetcher,
    bypass_cache: bool,
    tx: &UnboundedSender<AppEvent>,
) {
    let generation = state.begin_fetch();
    event::spawn_issue_fetch(
        fetcher.clone(),
        state.target.repo.clone(),
        bypass_cache,
        generation,
        tx.clone(),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load();

    let db_path = config.db_path(cli.db.as_deref());
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        init_tracing(dir)?;
    } else {
        init_tracing(Path::new("."))?;
    }

    let cwd = std::env::current_dir()?;
    let target = source::target::resolve(&cli.target, &cwd)?;
    tracing::info!(repo = %target.repo, file = ?target.file_path, "starting");

    let theme = theme::Theme::from_name(&config.theme_name(cli.theme.as_deref()));

    let kv = open_store(&db_path).await;
    let settings = Settings::new(Arc::clone(&kv));
    let client = GithubClient::new(config.api_base(), config.token(std::env::var("GITHUB_TOKEN").ok()))
        .context("cannot build HTTP client")?;
    let fetcher = IssueFetcher::new(Arc::new(client), CacheStore::new(kv));

    let enabled = settings.is_enabled().await;
    let mut state = AppState::new(target, enabled);
    if let Some(line) = cli.line {
        state.focus_line = Some(line);
    } else if state.focus_line.is_none() {
        if let Some(pointer) = settings.last_clicked().await {
            state.restore_pointer(&pointer);
        }
    }

    let handler = event::EventHandler::new();
    let event_tx = handler.tx;
    let mut rx = handler.rx;

    let source_tx = match state.target.workdir.clone() {
        Some(workdir) => Some(spawn_source_worker(workdir, event_tx.clone())?),
        None => None,
    };

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;
    event::spawn_event_task(event_tx.clone());

    state.request_source(source_tx.as_ref());
    if state.enabled {
        start_fetch(&mut state, &fetcher, cli.refresh, &event_tx);
    }

    let mut result: anyhow::Result<()> = Ok(());

    'event_loop: loop {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                let action = match maybe_event {
                    Some(AppEvent::Render) => {
                        state.sync_annotations(&theme);
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &theme)) {
                            result = Err(e.into());
                            break 'event_loop;
                        }
                        KeyAction::Continue
                    }
                    Some(AppEvent::Key(key)) => keybindings::handle_key(key, &mut state),
                    Some(AppEvent::Mouse(mouse)) => keybindings::handle_mouse(mouse, &mut state),
                    Some(AppEvent::SourceLoaded(payload)) => {
                        state.apply_source(*payload);
                        KeyAction::Continue
                    }
                    Some(AppEvent::IssuesLoaded { generation, result: fetched }) => {
                        state.apply_issues(generation, fetched);
                        KeyAction::Continue
                    }
                    Some(AppEvent::Tick) => {
                        state.on_tick();
                        KeyAction::Continue
                    }
                    Some(AppEvent::Quit) | None => break 'event_loop,
                    Some(_) => KeyAction::Continue,
                };

                match action {
                    KeyAction::Continue => {}
                    KeyAction::Quit => break 'event_loop,
                    KeyAction::Refresh => {
                        if state.enabled {
                            start_fetch(&mut state, &fetcher, true, &event_tx);
                        }
                    }
                    KeyAction::ToggleEnabled => {
                        let enabled = !state.enabled;
                        state.set_enabled(enabled);
                        settings.set_enabled(enabled).await;
                        if enabled {
                            start_fetch(&mut state, &fetcher, false, &event_tx);
                        }
                    }
                    KeyAction::Opened(jump) => {
                        if jump.file_changed {
                            state.request_source(source_tx.as_ref());
                        }
                        settings.set_last_clicked(&jump.pointer).await;
                    }
                }

                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    tui::restore_tui()?;
    result
}
