//! Puzzle Clock - demo harness
//!
//! Runs the full timer stack against a simulated host page: a scripted
//! task plays the part of the third-party puzzle site (failing, solving
//! and replacing puzzles), while the presenter logs each rendered frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;

use puzzle_clock::{
    config::Config,
    host::{ForfeitAction, HostPage, LoggingForfeit, SimulatedHostPage},
    presenter,
    shutdown_signal,
    state::PuzzleSession,
    tasks::puzzle_timer_task,
    watcher::{lifecycle_watcher_task, Mutation, MutationBatch, NodeMarkers},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("puzzle_clock={}", config.log_level()))
        .init();

    info!("Starting puzzle-clock v1.0.0");

    let session = Arc::new(PuzzleSession::new(config.backend()));
    session
        .commit(config.settings_patch())
        .map_err(anyhow::Error::msg)?;
    let settings = session.settings().map_err(anyhow::Error::msg)?;
    info!(
        "Session settings: mode={:?}, duration={}ms, autofail={}, enabled={}",
        settings.mode, settings.duration_ms, settings.auto_fail, settings.enabled
    );

    let page = Arc::new(SimulatedHostPage::new());
    let (batch_tx, batch_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);

    // Watcher: host mutations in, lifecycle events out
    tokio::spawn(lifecycle_watcher_task(batch_rx, event_tx));

    // Driver: owns every timer transition
    tokio::spawn(puzzle_timer_task(
        Arc::clone(&session),
        event_rx,
        Arc::clone(&page) as Arc<dyn HostPage>,
        Arc::new(LoggingForfeit) as Arc<dyn ForfeitAction>,
    ));

    // Presenter: log each distinct rendered frame
    let mut snapshot_rx = session.snapshot_rx();
    let epoch = session.epoch();
    tokio::spawn(async move {
        let mut last_frame = String::new();
        while snapshot_rx.changed().await.is_ok() {
            let snapshot = *snapshot_rx.borrow_and_update();
            let frame = presenter::render_text(&snapshot, Instant::now(), epoch);
            if frame != last_frame {
                info!("{}", frame);
                last_frame = frame;
            }
        }
    });

    // Scripted host page activity
    tokio::spawn(host_script(Arc::clone(&page), batch_tx));

    shutdown_signal().await;
    info!("Session ended");
    Ok(())
}

/// Plays the host page: a failed attempt, then a solve, then a wholesale
/// puzzle replacement, forever.
async fn host_script(page: Arc<SimulatedHostPage>, batch_tx: mpsc::Sender<MutationBatch>) {
    loop {
        sleep(Duration::from_secs(6)).await;
        info!("Host: attempt failed");
        let failed = MutationBatch::single(Mutation {
            added: vec![NodeMarkers::feedback_fail()],
            removed: vec![],
        });
        if batch_tx.send(failed).await.is_err() {
            break;
        }

        sleep(Duration::from_secs(3)).await;
        info!("Host: puzzle solved");
        let solved = MutationBatch::single(Mutation {
            added: vec![NodeMarkers::feedback_after()],
            removed: vec![NodeMarkers::feedback_fail()],
        });
        if batch_tx.send(solved).await.is_err() {
            break;
        }

        sleep(Duration::from_secs(2)).await;
        info!("Host: next puzzle");
        page.replace_board();
        let replaced = MutationBatch::single(Mutation {
            added: vec![],
            removed: vec![NodeMarkers::feedback_after()],
        });
        if batch_tx.send(replaced).await.is_err() {
            break;
        }
    }
}
