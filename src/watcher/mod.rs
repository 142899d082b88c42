//! Lifecycle watcher
//!
//! The host page rebuilds its feedback subtree between puzzles; this module
//! turns those raw structural changes into discrete lifecycle events. The
//! fragile part - which marker combinations mean what - lives entirely in
//! [`classify`], a pure function over one batch of mutations. The state
//! machine downstream only ever sees `PuzzleStarted`, `PuzzleSucceeded`
//! and `PuzzleFailed`.

use tokio::sync::mpsc;
use tracing::{debug, info};

/// Marker carried by feedback nodes
pub const MARKER_FEEDBACK: &str = "feedback";
/// Marker carried by the post-puzzle feedback node
pub const MARKER_AFTER: &str = "after";
/// Marker carried by the failed-attempt feedback node
pub const MARKER_FAIL: &str = "fail";

/// The marker set one node in the host tree bears
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMarkers(Vec<String>);

impl NodeMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(markers.into_iter().map(Into::into).collect())
    }

    /// Node shown when a puzzle concludes (success summary)
    pub fn feedback_after() -> Self {
        Self::new([MARKER_FEEDBACK, MARKER_AFTER])
    }

    /// Node shown on a failed attempt
    pub fn feedback_fail() -> Self {
        Self::new([MARKER_FEEDBACK, MARKER_FAIL])
    }

    pub fn has_all(&self, wanted: &[&str]) -> bool {
        wanted.iter().all(|w| self.0.iter().any(|m| m == w))
    }
}

/// One structural change observed on the host container
#[derive(Debug, Clone, Default)]
pub struct Mutation {
    pub added: Vec<NodeMarkers>,
    pub removed: Vec<NodeMarkers>,
}

/// All changes delivered by the host in one notification
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    pub mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn single(mutation: Mutation) -> Self {
        Self {
            mutations: vec![mutation],
        }
    }

    fn any_removed(&self, wanted: &[&str]) -> bool {
        self.mutations
            .iter()
            .flat_map(|m| m.removed.iter())
            .any(|n| n.has_all(wanted))
    }

    fn any_added(&self, wanted: &[&str]) -> bool {
        self.mutations
            .iter()
            .flat_map(|m| m.added.iter())
            .any(|n| n.has_all(wanted))
    }
}

/// Abstract puzzle lifecycle event, mode-independent by design
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    PuzzleStarted,
    PuzzleSucceeded,
    PuzzleFailed,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::PuzzleStarted => "puzzle-started",
            LifecycleEvent::PuzzleSucceeded => "puzzle-succeeded",
            LifecycleEvent::PuzzleFailed => "puzzle-failed",
        }
    }
}

/// Classify one batch of structural changes into at most one lifecycle
/// event.
///
/// Rules are evaluated in priority order over the whole batch and only the
/// first match fires:
///
/// 1. a {feedback, after} node was removed - a new puzzle replaced the old
///    one, any other signal in the batch is stale
/// 2. a {feedback, fail} node was added - a failed attempt
/// 3. a {feedback, after} node was added - the puzzle concluded
pub fn classify(batch: &MutationBatch) -> Option<LifecycleEvent> {
    if batch.any_removed(&[MARKER_FEEDBACK, MARKER_AFTER]) {
        return Some(LifecycleEvent::PuzzleStarted);
    }
    if batch.any_added(&[MARKER_FEEDBACK, MARKER_FAIL]) {
        return Some(LifecycleEvent::PuzzleFailed);
    }
    if batch.any_added(&[MARKER_FEEDBACK, MARKER_AFTER]) {
        return Some(LifecycleEvent::PuzzleSucceeded);
    }
    None
}

/// Background task that consumes mutation batches from the host surface
/// and forwards classified lifecycle events to the timer driver.
///
/// Runs until either channel closes.
pub async fn lifecycle_watcher_task(
    mut batch_rx: mpsc::Receiver<MutationBatch>,
    event_tx: mpsc::Sender<LifecycleEvent>,
) {
    info!("Starting lifecycle watcher task");

    while let Some(batch) = batch_rx.recv().await {
        match classify(&batch) {
            Some(event) => {
                debug!(
                    "Classified batch of {} mutations as {}",
                    batch.mutations.len(),
                    event.as_str()
                );
                if event_tx.send(event).await.is_err() {
                    debug!("Timer driver gone, stopping lifecycle watcher");
                    break;
                }
            }
            None => {
                debug!(
                    "Batch of {} mutations matched no rule, ignoring",
                    batch.mutations.len()
                );
            }
        }
    }

    info!("Lifecycle watcher task finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(added: Vec<NodeMarkers>, removed: Vec<NodeMarkers>) -> MutationBatch {
        MutationBatch::single(Mutation { added, removed })
    }

    #[test]
    fn removal_of_after_feedback_means_new_puzzle() {
        let b = batch(vec![], vec![NodeMarkers::feedback_after()]);
        assert_eq!(classify(&b), Some(LifecycleEvent::PuzzleStarted));
    }

    #[test]
    fn added_fail_feedback_means_failed_attempt() {
        let b = batch(vec![NodeMarkers::feedback_fail()], vec![]);
        assert_eq!(classify(&b), Some(LifecycleEvent::PuzzleFailed));
    }

    #[test]
    fn added_after_feedback_means_success() {
        let b = batch(vec![NodeMarkers::feedback_after()], vec![]);
        assert_eq!(classify(&b), Some(LifecycleEvent::PuzzleSucceeded));
    }

    #[test]
    fn removal_outranks_additions_in_the_same_batch() {
        // Wholesale subtree replacement: the stale success node goes away
        // while a fresh fail node appears. Only "new puzzle" may fire.
        let b = MutationBatch {
            mutations: vec![
                Mutation {
                    added: vec![NodeMarkers::feedback_fail()],
                    removed: vec![],
                },
                Mutation {
                    added: vec![],
                    removed: vec![NodeMarkers::feedback_after()],
                },
            ],
        };
        assert_eq!(classify(&b), Some(LifecycleEvent::PuzzleStarted));
    }

    #[test]
    fn fail_outranks_success_in_the_same_batch() {
        let b = batch(
            vec![NodeMarkers::feedback_after(), NodeMarkers::feedback_fail()],
            vec![],
        );
        assert_eq!(classify(&b), Some(LifecycleEvent::PuzzleFailed));
    }

    #[test]
    fn at_most_one_event_per_batch() {
        let b = MutationBatch {
            mutations: vec![
                Mutation {
                    added: vec![NodeMarkers::feedback_fail()],
                    removed: vec![],
                },
                Mutation {
                    added: vec![NodeMarkers::feedback_fail()],
                    removed: vec![],
                },
            ],
        };
        // classify returns a single Option, both fail nodes collapse
        assert_eq!(classify(&b), Some(LifecycleEvent::PuzzleFailed));
    }

    #[test]
    fn nodes_missing_a_marker_do_not_match() {
        let b = batch(
            vec![NodeMarkers::new([MARKER_AFTER])],
            vec![NodeMarkers::new([MARKER_FEEDBACK])],
        );
        assert_eq!(classify(&b), None);
    }

    #[test]
    fn unrelated_churn_emits_nothing() {
        let b = batch(
            vec![NodeMarkers::new(["move-list"])],
            vec![NodeMarkers::new(["hint"])],
        );
        assert_eq!(classify(&b), None);
    }

    #[tokio::test]
    async fn watcher_task_forwards_classified_events_in_order() {
        let (batch_tx, batch_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let task = tokio::spawn(lifecycle_watcher_task(batch_rx, event_tx));

        batch_tx
            .send(batch(vec![], vec![NodeMarkers::feedback_after()]))
            .await
            .unwrap();
        batch_tx
            .send(batch(vec![NodeMarkers::new(["noise"])], vec![]))
            .await
            .unwrap();
        batch_tx
            .send(batch(vec![NodeMarkers::feedback_fail()], vec![]))
            .await
            .unwrap();
        drop(batch_tx);

        assert_eq!(event_rx.recv().await, Some(LifecycleEvent::PuzzleStarted));
        assert_eq!(event_rx.recv().await, Some(LifecycleEvent::PuzzleFailed));
        assert_eq!(event_rx.recv().await, None);
        task.await.unwrap();
    }
}
