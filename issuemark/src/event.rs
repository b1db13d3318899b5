//! Event bus for issuemark.
//!
//! Terminal input, timer ticks, and background results (source text from the
//! git thread, issue lists from fetch tasks) are normalised into one `AppEvent`
//! enum and sent over a tokio unbounded MPSC channel. The main loop is the only
//! consumer.
//!
//! Two independent intervals drive the render and logic cycles:
//! - **Render interval** (33 ms ≈ 30 FPS) triggers a `terminal.draw()` call.
//! - **Tick interval** (250 ms = 4 Hz) animates the loading spinner.

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::{FutureExt, StreamExt};
use issuemark_core::fetch::{FetchError, IssueFetcher};
use issuemark_core::types::{Issue, RepoId};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::source::types::SourcePayload;

/// All events the application can receive from any source.
#[derive(Debug)]
#[non_exhaustive]
pub enum AppEvent {
    /// A key press from the terminal (`KeyEventKind::Press` only).
    Key(KeyEvent),
    /// A mouse event from the terminal (click, scroll, move).
    Mouse(MouseEvent),
    /// Terminal was resized to (columns, rows).
    Resize(u16, u16),
    /// Logic tick (4 Hz), handled by `AppState::on_tick`.
    Tick,
    /// Render tick (≈30 FPS).
    Render,
    /// Highlighted text from the source worker thread.
    SourceLoaded(Box<SourcePayload>),
    /// Outcome of one issue fetch, tagged with the generation it was started for.
    IssuesLoaded {
        generation: u64,
        result: Result<Vec<Issue>, FetchError>,
    },
    Quit,
}

/// Holds the sender and receiver ends of the unified event channel.
///
/// The sender (`tx`) is cloned and distributed to background tasks;
/// the receiver (`rx`) is owned by the main event loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<AppEvent>,
    pub rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background tokio task that drives the unified event channel.
///
/// `reader.next().fuse()` keeps `select!` from polling a finished stream, and
/// only `KeyEventKind::Press` is forwarded so Windows does not double-fire.
/// The task exits once the receiver is gone.
pub fn spawn_event_task(tx: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut tick_interval = interval(Duration::from_millis(250));
        let mut render_interval = interval(Duration::from_millis(33));
        let mut reader = EventStream::new();

        loop {
            let tick_tick = tick_interval.tick();
            let render_tick = render_interval.tick();
            let crossterm_event = reader.next().fuse();

            let sent = tokio::select! {
                _ = tick_tick => tx.send(AppEvent::Tick),
                _ = render_tick => tx.send(AppEvent::Render),
                maybe_event = crossterm_event => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        tx.send(AppEvent::Key(key))
                    }
                    Some(Ok(Event::Resize(w, h))) => tx.send(AppEvent::Resize(w, h)),
                    Some(Ok(Event::Mouse(mouse))) => tx.send(AppEvent::Mouse(mouse)),
                    _ => Ok(()),
                },
            };
            if sent.is_err() {
                break;
            }
        }
    });
}

/// Spawns one issue fetch for `repo` and posts the outcome as
/// [`AppEvent::IssuesLoaded`] tagged with `generation`.
///
/// Fetches are never cancelled; the app drops results whose generation is
/// no longer current.
pub fn spawn_issue_fetch(
    fetcher: IssueFetcher,
    repo: RepoId,
    bypass_cache: bool,
    generation: u64,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        let result = fetcher.fetch_issues(&repo.owner, &repo.repo, bypass_cache).await;
        let _ = tx.send(AppEvent::IssuesLoaded { generation, result });
    });
}
