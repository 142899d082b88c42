//! End-to-end flow: host mutations through the watcher and driver down to
//! presenter snapshots.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use puzzle_clock::host::{ForfeitAction, HostPage, SimulatedHostPage};
use puzzle_clock::persistence::MemoryBackend;
use puzzle_clock::presenter::{board_cue, BoardCue};
use puzzle_clock::state::{PuzzleSession, SettingsPatch};
use puzzle_clock::watcher::{Mutation, MutationBatch, NodeMarkers};
use puzzle_clock::{lifecycle_watcher_task, puzzle_timer_task, HostPageError, Mode};

struct CountingForfeit(AtomicUsize);

impl ForfeitAction for CountingForfeit {
    fn forfeit(&self) -> Result<(), HostPageError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Stack {
    session: Arc<PuzzleSession>,
    page: Arc<SimulatedHostPage>,
    forfeit: Arc<CountingForfeit>,
    batch_tx: mpsc::Sender<MutationBatch>,
}

fn spawn_stack(patch: SettingsPatch) -> Stack {
    let session = Arc::new(PuzzleSession::new(Arc::new(MemoryBackend::new())));
    session.commit(patch).unwrap();

    let page = Arc::new(SimulatedHostPage::new());
    let forfeit = Arc::new(CountingForfeit(AtomicUsize::new(0)));
    let (batch_tx, batch_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);

    tokio::spawn(lifecycle_watcher_task(batch_rx, event_tx));
    tokio::spawn(puzzle_timer_task(
        Arc::clone(&session),
        event_rx,
        Arc::clone(&page) as Arc<dyn HostPage>,
        Arc::clone(&forfeit) as Arc<dyn ForfeitAction>,
    ));

    Stack {
        session,
        page,
        forfeit,
        batch_tx,
    }
}

fn added(node: NodeMarkers) -> MutationBatch {
    MutationBatch::single(Mutation {
        added: vec![node],
        removed: vec![],
    })
}

fn removed(node: NodeMarkers) -> MutationBatch {
    MutationBatch::single(Mutation {
        added: vec![],
        removed: vec![node],
    })
}

#[tokio::test(start_paused = true)]
async fn full_blitz_session_flows_from_mutations_to_forfeit() {
    let stack = spawn_stack(SettingsPatch {
        duration_ms: Some(3_000),
        ..SettingsPatch::default()
    });

    // clock is running as soon as the overlay loads
    sleep(Duration::from_millis(500)).await;
    let snap = stack.session.snapshot(std::time::Instant::now()).unwrap();
    assert!(snap.running);
    assert_eq!(board_cue(&snap), BoardCue::SteadyGreen);

    // a failed attempt changes nothing
    stack
        .batch_tx
        .send(added(NodeMarkers::feedback_fail()))
        .await
        .unwrap();
    sleep(Duration::from_millis(500)).await;
    assert!(stack.session.timer_state().unwrap().is_running());

    // solving pauses the clock
    stack
        .batch_tx
        .send(added(NodeMarkers::feedback_after()))
        .await
        .unwrap();
    sleep(Duration::from_millis(10)).await;
    let paused = stack.session.timer_state().unwrap();
    assert!(!paused.is_running());
    let frozen = paused.remaining_ms;
    assert!(frozen < 3_000);

    // the stopped blitz board shows red
    let snap = stack.session.snapshot(std::time::Instant::now()).unwrap();
    assert_eq!(board_cue(&snap), BoardCue::SteadyRed);

    // a wholesale replacement starts the next puzzle on a full clock
    stack.page.replace_board();
    stack
        .batch_tx
        .send(removed(NodeMarkers::feedback_after()))
        .await
        .unwrap();
    sleep(Duration::from_millis(10)).await;
    let fresh = stack.session.timer_state().unwrap();
    assert!(fresh.is_running());
    assert!(fresh.remaining_ms > frozen);

    // left alone it expires and forfeits once
    sleep(Duration::from_millis(3_500)).await;
    let state = stack.session.timer_state().unwrap();
    assert!(state.is_expired());
    assert_eq!(state.remaining_ms, 0);
    assert_eq!(stack.forfeit.0.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn thinking_session_locks_the_board_and_never_forfeits() {
    let stack = spawn_stack(SettingsPatch {
        mode: Some(Mode::Thinking),
        duration_ms: Some(2_000),
        ..SettingsPatch::default()
    });

    sleep(Duration::from_millis(200)).await;
    let now = std::time::Instant::now();
    let snap = stack.session.snapshot(now).unwrap();
    assert!(matches!(board_cue(&snap), BoardCue::PulsingRed { .. }));

    // interactions are swallowed while the clock runs
    let outcome = stack.session.handle_board_interaction(now).unwrap();
    assert_eq!(outcome, puzzle_clock::state::InteractionOutcome::Blocked);
    assert!(stack.session.snapshot(now).unwrap().blocked);

    // expiry without blitz never invokes the forfeit action
    sleep(Duration::from_millis(2_500)).await;
    assert!(stack.session.timer_state().unwrap().is_expired());
    assert_eq!(stack.forfeit.0.load(Ordering::SeqCst), 0);

    // once expired the board unlocks
    let now = std::time::Instant::now();
    assert_eq!(
        stack.session.handle_board_interaction(now).unwrap(),
        puzzle_clock::state::InteractionOutcome::Allowed
    );
}
