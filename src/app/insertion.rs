use tracing::{debug, info, warn};

use crate::events::{Completion, InsertionRequest};
use crate::graph::AddOutcome;
use crate::rag::NodeInsertionPayload;

/// What the coordinator needs from the live view.
pub(in crate::app) trait InsertionHost {
    /// Token of the layout instance currently on screen.
    fn generation(&self) -> u64;
    fn insert(&mut self, payload: NodeInsertionPayload) -> AddOutcome;
    fn focus_node(&mut self, id: &str) -> bool;
    fn mark_new(&mut self, id: &str);
    /// Drops the new-node highlight if it still belongs to `id`.
    fn clear_new(&mut self, id: &str);
    fn select(&mut self, id: &str);
}

/// Timings for the insert-then-focus protocol, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct RetryPolicy {
    pub(in crate::app) initial_delay: f64,
    pub(in crate::app) base_delay: f64,
    pub(in crate::app) delay_step: f64,
    pub(in crate::app) max_attempts: u32,
    pub(in crate::app) highlight_clear: f64,
    pub(in crate::app) completion_delay: f64,
    pub(in crate::app) unfocused_completion: f64,
    pub(in crate::app) duplicate_completion: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: 1.0,
            base_delay: 0.3,
            delay_step: 0.3,
            max_attempts: 20,
            highlight_clear: 2.0,
            completion_delay: 0.5,
            unfocused_completion: 0.3,
            duplicate_completion: 1.0,
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> f64 {
        self.base_delay + self.delay_step * f64::from(attempt)
    }
}

enum Phase {
    Focusing { attempt: u32, due: f64 },
    Settled { clear_at: Option<f64>, complete_at: Option<f64> },
    Completing { due: f64 },
}

struct Task {
    node_id: String,
    generation: u64,
    phase: Phase,
    on_complete: Option<Completion>,
}

impl Task {
    fn complete(&mut self) {
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
    }

    fn next_deadline(&self) -> Option<f64> {
        match self.phase {
            Phase::Focusing { due, .. } | Phase::Completing { due } => Some(due),
            Phase::Settled {
                clear_at,
                complete_at,
            } => match (clear_at, complete_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

/// Drives every in-flight insertion through focus retries, highlight clearing and
/// completion callbacks. Time only advances through `poll`.
pub(in crate::app) struct InsertionCoordinator {
    policy: RetryPolicy,
    tasks: Vec<Task>,
}

impl InsertionCoordinator {
    pub(in crate::app) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            tasks: Vec::new(),
        }
    }

    pub(in crate::app) fn submit(
        &mut self,
        host: &mut impl InsertionHost,
        request: InsertionRequest,
        now: f64,
    ) -> AddOutcome {
        let InsertionRequest {
            payload,
            focus,
            on_complete,
        } = request;
        let node_id = payload.node.id.clone();
        let outcome = host.insert(payload);

        let phase = match outcome {
            AddOutcome::AlreadyPresent => {
                debug!(node = %node_id, focus, "node already present");
                if focus {
                    host.select(&node_id);
                    host.focus_node(&node_id);
                }
                Phase::Completing {
                    due: now + self.policy.duplicate_completion,
                }
            }
            AddOutcome::Added { edges_added } => {
                info!(node = %node_id, edges_added, focus, "node inserted");
                host.mark_new(&node_id);
                if focus {
                    host.select(&node_id);
                    Phase::Focusing {
                        attempt: 0,
                        due: now + self.policy.initial_delay + self.policy.delay_before(0),
                    }
                } else {
                    Phase::Completing {
                        due: now + self.policy.unfocused_completion,
                    }
                }
            }
        };

        self.tasks.push(Task {
            node_id,
            generation: host.generation(),
            phase,
            on_complete,
        });
        outcome
    }

    /// Runs every step that is due at `now`.
    pub(in crate::app) fn poll(&mut self, host: &mut impl InsertionHost, now: f64) {
        let policy = self.policy;
        let generation = host.generation();

        self.tasks.retain_mut(|task| {
            if task.generation != generation {
                debug!(node = %task.node_id, "dropping insertion from a replaced layout");
                task.complete();
                return false;
            }

            match &mut task.phase {
                Phase::Focusing { attempt, due } => {
                    if now < *due {
                        return true;
                    }
                    if host.focus_node(&task.node_id) {
                        debug!(node = %task.node_id, attempt = *attempt + 1, "focused new node");
                        task.phase = Phase::Settled {
                            clear_at: Some(now + policy.highlight_clear),
                            complete_at: Some(now + policy.completion_delay),
                        };
                        return true;
                    }

                    let next = *attempt + 1;
                    if next >= policy.max_attempts {
                        warn!(
                            node = %task.node_id,
                            attempts = next,
                            "giving up on focusing new node"
                        );
                        task.complete();
                        return false;
                    }
                    debug!(node = %task.node_id, attempt = next, "node has no position yet");
                    *attempt = next;
                    *due = now + policy.delay_before(next);
                    true
                }
                Phase::Settled {
                    clear_at,
                    complete_at,
                } => {
                    if clear_at.is_some_and(|at| now >= at) {
                        host.clear_new(&task.node_id);
                        *clear_at = None;
                    }
                    if complete_at.is_some_and(|at| now >= at) {
                        *complete_at = None;
                        task.complete();
                    }
                    task.next_deadline().is_some()
                }
                Phase::Completing { due } => {
                    if now < *due {
                        return true;
                    }
                    task.complete();
                    false
                }
            }
        });
    }

    /// Cancels everything in flight. Completion callbacks still run so callers are
    /// never left waiting on a view that no longer exists.
    pub(in crate::app) fn cancel_all(&mut self) {
        if !self.tasks.is_empty() {
            debug!(count = self.tasks.len(), "cancelling pending insertions");
        }
        for mut task in self.tasks.drain(..) {
            task.complete();
        }
    }

    pub(in crate::app) fn next_deadline(&self) -> Option<f64> {
        self.tasks
            .iter()
            .filter_map(Task::next_deadline)
            .min_by(f64::total_cmp)
    }

    pub(in crate::app) fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::graph::tests::node;
    use crate::graph::{CategoryPalette, GraphEdge, GraphSnapshot};

    struct MockHost {
        generation: u64,
        snapshot: GraphSnapshot,
        palette: CategoryPalette,
        focus_succeeds_on: Option<usize>,
        focus_calls: usize,
        new_node: Option<String>,
        selected: Option<String>,
    }

    impl MockHost {
        fn new(focus_succeeds_on: Option<usize>) -> Self {
            Self {
                generation: 1,
                snapshot: GraphSnapshot::new(vec![node("A"), node("B")], Vec::new()),
                palette: CategoryPalette::default(),
                focus_succeeds_on,
                focus_calls: 0,
                new_node: None,
                selected: None,
            }
        }
    }

    impl InsertionHost for MockHost {
        fn generation(&self) -> u64 {
            self.generation
        }

        fn insert(&mut self, payload: NodeInsertionPayload) -> AddOutcome {
            let node = payload.node.into_node(&mut self.palette);
            let edges = payload.edges.into_iter().map(GraphEdge::from).collect();
            self.snapshot.add_node(node, edges)
        }

        fn focus_node(&mut self, _id: &str) -> bool {
            self.focus_calls += 1;
            self.focus_succeeds_on
                .is_some_and(|attempt| self.focus_calls >= attempt)
        }

        fn mark_new(&mut self, id: &str) {
            self.new_node = Some(id.to_owned());
        }

        fn clear_new(&mut self, id: &str) {
            if self.new_node.as_deref() == Some(id) {
                self.new_node = None;
            }
        }

        fn select(&mut self, id: &str) {
            self.selected = Some(id.to_owned());
        }
    }

    fn request(id: &str, focus: bool, calls: &Arc<AtomicUsize>) -> InsertionRequest {
        let counter = Arc::clone(calls);
        let payload = serde_json::from_value(serde_json::json!({
            "node": {"id": id, "label": "fresh note"},
            "edges": [{"source": id, "target": "A", "weight": 0.9}],
        }))
        .unwrap();
        InsertionRequest {
            payload,
            focus,
            on_complete: Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        }
    }

    fn run_until(
        coordinator: &mut InsertionCoordinator,
        host: &mut MockHost,
        from: f64,
        until: f64,
    ) {
        let mut now = from;
        while now <= until {
            coordinator.poll(host, now);
            now += 0.05;
        }
    }

    #[test]
    fn focus_is_retried_until_the_node_has_a_position() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = MockHost::new(Some(3));
        let mut coordinator = InsertionCoordinator::new(RetryPolicy::default());

        let outcome = coordinator.submit(&mut host, request("N1", true, &calls), 0.0);
        assert_eq!(outcome, AddOutcome::Added { edges_added: 1 });
        assert_eq!(host.new_node.as_deref(), Some("N1"));
        assert_eq!(host.selected.as_deref(), Some("N1"));

        coordinator.poll(&mut host, 1.25);
        assert_eq!(host.focus_calls, 0);
        coordinator.poll(&mut host, 1.31);
        assert_eq!(host.focus_calls, 1);
        coordinator.poll(&mut host, 1.85);
        assert_eq!(host.focus_calls, 1);
        coordinator.poll(&mut host, 1.92);
        assert_eq!(host.focus_calls, 2);
        coordinator.poll(&mut host, 2.83);
        assert_eq!(host.focus_calls, 3);

        coordinator.poll(&mut host, 3.30);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        coordinator.poll(&mut host, 3.34);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.new_node.as_deref(), Some("N1"));

        coordinator.poll(&mut host, 4.84);
        assert_eq!(host.new_node, None);
        assert_eq!(host.selected.as_deref(), Some("N1"));
        assert!(coordinator.is_idle());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exhausting_the_retry_budget_still_completes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = MockHost::new(None);
        let mut coordinator = InsertionCoordinator::new(RetryPolicy::default());

        coordinator.submit(&mut host, request("N1", true, &calls), 0.0);
        run_until(&mut coordinator, &mut host, 0.0, 120.0);

        assert_eq!(host.focus_calls, 20);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(coordinator.is_idle());
    }

    #[test]
    fn duplicates_focus_once_and_complete_later() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = MockHost::new(Some(1));
        let mut coordinator = InsertionCoordinator::new(RetryPolicy::default());

        let outcome = coordinator.submit(&mut host, request("A", true, &calls), 0.0);

        assert_eq!(outcome, AddOutcome::AlreadyPresent);
        assert_eq!(host.focus_calls, 1);
        assert_eq!(host.selected.as_deref(), Some("A"));
        assert_eq!(host.new_node, None);
        assert_eq!(host.snapshot.edge_count(), 0);

        coordinator.poll(&mut host, 0.95);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        coordinator.poll(&mut host, 1.05);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(host.focus_calls, 1);
    }

    #[test]
    fn unfocused_insertions_complete_without_touching_the_camera() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = MockHost::new(Some(1));
        let mut coordinator = InsertionCoordinator::new(RetryPolicy::default());

        coordinator.submit(&mut host, request("N2", false, &calls), 10.0);
        assert!((coordinator.next_deadline().unwrap() - 10.3).abs() < 1e-9);
        run_until(&mut coordinator, &mut host, 10.0, 12.0);

        assert_eq!(host.focus_calls, 0);
        assert_eq!(host.selected, None);
        assert_eq!(host.new_node.as_deref(), Some("N2"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reload_cancels_pending_focus_and_releases_callers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = MockHost::new(Some(1));
        let mut coordinator = InsertionCoordinator::new(RetryPolicy::default());

        coordinator.submit(&mut host, request("N1", true, &calls), 0.0);
        coordinator.cancel_all();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        run_until(&mut coordinator, &mut host, 0.0, 5.0);
        assert_eq!(host.focus_calls, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tasks_from_a_replaced_layout_never_fire_focus() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut host = MockHost::new(Some(1));
        let mut coordinator = InsertionCoordinator::new(RetryPolicy::default());

        coordinator.submit(&mut host, request("N1", true, &calls), 0.0);
        host.generation = 2;
        run_until(&mut coordinator, &mut host, 0.0, 5.0);

        assert_eq!(host.focus_calls, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(coordinator.is_idle());
    }
}
