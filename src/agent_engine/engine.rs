use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::agent_engine::event_bus::{EventBus, NavigatorEvent};
use crate::agent_engine::history::{HistoryEntry, NavigationHistory};
use crate::agent_engine::loop_control::StepGuard;
use crate::agent_engine::state::{NavigatorState, StepPhase};
use crate::config::{AgentConfig, AppConfig, MessagesConfig};
use crate::errors::{NavigatorError, NavigatorResult};
use crate::executor::actions::ActionExecutor;
use crate::perception::scanner::ElementScanner;
use crate::perception::traits::Page;
use crate::planner::provider::Planner;
use crate::planner::types::{AgentAction, PlanRequest};

/// Fragments removed from queries before they reach the planner.
const BLOCKED_FRAGMENTS: [&str; 4] = ["<script", "javascript:", "data:", "vbscript:"];

/// Drives one natural-language command to completion: scan, plan, validate,
/// execute, repeat until the planner says `DONE` or something fails.
///
/// One command at a time. A second `execute_command` while one is running is
/// rejected, not queued.
pub struct NavigationController {
    scanner: Arc<ElementScanner>,
    executor: ActionExecutor,
    planner: Arc<dyn Planner>,
    agent: AgentConfig,
    messages: MessagesConfig,
    state: Mutex<NavigatorState>,
    history: Mutex<NavigationHistory>,
    cancel: Mutex<Option<watch::Sender<bool>>>,
    bus: EventBus,
}

impl NavigationController {
    pub fn new(page: Arc<dyn Page>, planner: Arc<dyn Planner>, config: &AppConfig) -> NavigatorResult<Self> {
        let scanner = Arc::new(ElementScanner::new(page, &config.scanner)?);
        let executor = ActionExecutor::new(scanner.clone(), &config.agent, config.scanner.highlight_duration());
        tracing::info!(
            planner = planner.name(),
            max_steps = config.agent.max_steps,
            "navigation controller ready"
        );
        Ok(Self {
            scanner,
            executor,
            planner,
            agent: config.agent.clone(),
            messages: config.messages.clone(),
            state: Mutex::new(NavigatorState::Idle),
            history: Mutex::new(NavigationHistory::new()),
            cancel: Mutex::new(None),
            bus: EventBus::new(),
        })
    }

    /// Run `query` to completion and return the planner's summary.
    ///
    /// On failure the controller ends in `Failed` with the configured user
    /// message; the returned error keeps the underlying cause. Empty and
    /// concurrent commands are rejected without touching state or history.
    pub async fn execute_command(&self, query: &str) -> NavigatorResult<String> {
        let query = sanitize_query(query, self.agent.max_query_length);
        let mut cancel_rx = {
            let mut state = lock(&self.state);
            if state.is_processing() {
                tracing::warn!(query = %query, "rejected: a command is already running");
                return Err(NavigatorError::AlreadyProcessing);
            }
            if query.is_empty() {
                tracing::warn!("rejected: empty command");
                return Err(NavigatorError::EmptyCommand);
            }
            *state = NavigatorState::Processing {
                query: query.clone(),
                step: 0,
                phase: StepPhase::Scanning,
            };
            let (tx, rx) = watch::channel(false);
            *lock(&self.cancel) = Some(tx);
            rx
        };
        tracing::info!(query = %query, "command started");
        self.bus.send(NavigatorEvent::StateChanged { state: self.state() });

        let result = self.run_steps(&query, &mut cancel_rx).await;
        *lock(&self.cancel) = None;

        match &result {
            Ok(summary) => {
                tracing::info!(query = %query, summary = %summary, "command completed");
                self.set_state(NavigatorState::Done {
                    summary: summary.clone(),
                });
                self.bus.send(NavigatorEvent::Completed {
                    summary: summary.clone(),
                });
            }
            Err(e) => {
                let message = e.user_message(&self.messages);
                tracing::error!(query = %query, error = %e, "command failed");
                self.set_state(NavigatorState::Failed {
                    message: message.clone(),
                });
                self.bus.send(NavigatorEvent::Failed { message });
            }
        }
        result
    }

    async fn run_steps(&self, query: &str, cancel_rx: &mut watch::Receiver<bool>) -> NavigatorResult<String> {
        let mut guard = StepGuard::new(self.agent.max_steps);
        loop {
            if *cancel_rx.borrow() {
                return Err(NavigatorError::Cancelled);
            }
            let step = guard.advance()?;

            self.set_phase(query, step, StepPhase::Scanning);
            let elements = self.scanner.scan();
            if elements.is_empty() {
                return Err(NavigatorError::NoInteractiveElements);
            }

            self.set_phase(query, step, StepPhase::Planning);
            let request = PlanRequest {
                query: query.to_string(),
                dom_snapshot: elements,
                history: lock(&self.history).actions(),
            };
            tracing::debug!(step, elements = request.dom_snapshot.len(), "planning");
            let action = tokio::select! {
                result = self.planner.next_action(&request) => result?,
                _ = wait_cancelled(cancel_rx) => return Err(NavigatorError::Cancelled),
            };

            if let AgentAction::Done { summary } = &action {
                lock(&self.history).push(query, action.clone());
                return Ok(summary.clone());
            }

            self.set_phase(query, step, StepPhase::Validating);
            if !self.executor.validate(&action) {
                return Err(NavigatorError::ElementNotFound(action.element_id().unwrap_or_default()));
            }

            self.set_phase(query, step, StepPhase::Executing);
            self.executor.apply(&action).await?;
            lock(&self.history).push(query, action.clone());
            tracing::info!(step, action = action.name(), element = ?action.element_id(), "step executed");
            self.bus.send(NavigatorEvent::StepExecuted {
                step,
                action,
                timestamp: chrono::Utc::now(),
            });

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(self.agent.step_delay_ms)) => {}
                _ = wait_cancelled(cancel_rx) => return Err(NavigatorError::Cancelled),
            }
        }
    }

    /// Abort the running command, if any. Drops a pending planner request.
    pub fn cancel(&self) -> bool {
        match lock(&self.cancel).as_ref() {
            Some(tx) => {
                tracing::info!("cancelling running command");
                tx.send(true).is_ok()
            }
            None => false,
        }
    }

    pub fn state(&self) -> NavigatorState {
        lock(&self.state).clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.history).entries().to_vec()
    }

    pub fn session_id(&self) -> String {
        lock(&self.history).session_id.clone()
    }

    pub fn clear_history(&self) {
        lock(&self.history).clear();
        tracing::debug!("history cleared");
    }

    /// Leave `Failed` for `Idle`. Any other state is left alone.
    pub fn reset_error(&self) {
        let reset = {
            let mut state = lock(&self.state);
            if matches!(*state, NavigatorState::Failed { .. }) {
                *state = NavigatorState::Idle;
                true
            } else {
                false
            }
        };
        if reset {
            self.bus.send(NavigatorEvent::StateChanged {
                state: NavigatorState::Idle,
            });
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigatorEvent> {
        self.bus.subscribe()
    }

    pub fn messages(&self) -> &MessagesConfig {
        &self.messages
    }

    pub fn scanner(&self) -> &Arc<ElementScanner> {
        &self.scanner
    }

    fn set_phase(&self, query: &str, step: u32, phase: StepPhase) {
        tracing::debug!(step, phase = ?phase, "phase");
        self.set_state(NavigatorState::Processing {
            query: query.to_string(),
            step,
            phase,
        });
    }

    fn set_state(&self, next: NavigatorState) {
        *lock(&self.state) = next.clone();
        self.bus.send(NavigatorEvent::StateChanged { state: next });
    }
}

/// Drop the planner service's blocked fragments (exact case, one pass each,
/// same as the service does), collapse whitespace runs and cap the length
/// in characters.
pub fn sanitize_query(raw: &str, max_len: usize) -> String {
    let text = BLOCKED_FRAGMENTS
        .iter()
        .fold(raw.to_string(), |text, fragment| text.replace(fragment, ""));
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_len).collect();
    truncated.trim_end().to_string()
}

/// Resolves once cancellation is requested; never if the sender goes away.
async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::perception::dom::{ElementSpec, MemoryPage};

    /// Replays scripted replies, then repeats `fallback` forever.
    struct ScriptedPlanner {
        replies: Mutex<VecDeque<NavigatorResult<AgentAction>>>,
        fallback: AgentAction,
        requests: Mutex<Vec<PlanRequest>>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl ScriptedPlanner {
        fn new(replies: Vec<NavigatorResult<AgentAction>>, fallback: AgentAction) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                fallback,
                requests: Mutex::new(Vec::new()),
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn always(action: AgentAction) -> Self {
            Self::new(Vec::new(), action)
        }

        fn slow(self, delay: Duration) -> Self {
            Self { delay, ..self }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn next_action(&self, request: &PlanRequest) -> NavigatorResult<AgentAction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            tokio::time::sleep(self.delay).await;
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn config(max_steps: u32) -> AppConfig {
        let mut config = AppConfig::default();
        config.agent = AgentConfig {
            max_steps,
            ..AgentConfig::default()
        }
        .without_delays();
        config.scanner.highlight_duration_ms = 60_000;
        config
    }

    fn shop_page() -> Arc<MemoryPage> {
        Arc::new(MemoryPage::from_specs(vec![
            ElementSpec::new("form").child(
                ElementSpec::new("input")
                    .attr("type", "search")
                    .attr("placeholder", "Search products"),
            ),
            ElementSpec::new("button").text("Add to cart"),
        ]))
    }

    fn controller(page: Arc<MemoryPage>, planner: Arc<ScriptedPlanner>, max_steps: u32) -> NavigationController {
        NavigationController::new(page, planner, &config(max_steps)).unwrap()
    }

    #[tokio::test]
    async fn stops_after_exactly_max_steps() {
        let planner = Arc::new(ScriptedPlanner::always(AgentAction::Click { element_id: 1 }));
        let nav = controller(shop_page(), planner.clone(), 3);

        let err = nav.execute_command("add it").await.unwrap_err();

        assert!(matches!(err, NavigatorError::MaxStepsExceeded(3)));
        assert_eq!(planner.calls(), 3);
        assert_eq!(nav.history().len(), 3);
        assert_eq!(
            nav.state(),
            NavigatorState::Failed {
                message: MessagesConfig::default().max_steps_exceeded
            }
        );
    }

    #[tokio::test]
    async fn empty_page_never_calls_the_planner() {
        let planner = Arc::new(ScriptedPlanner::always(AgentAction::Done { summary: "x".into() }));
        let nav = controller(Arc::new(MemoryPage::new()), planner.clone(), 10);

        let err = nav.execute_command("find a lamp").await.unwrap_err();

        assert!(matches!(err, NavigatorError::NoInteractiveElements));
        assert_eq!(planner.calls(), 0);
        assert_eq!(
            nav.state(),
            NavigatorState::Failed {
                message: MessagesConfig::default().no_interactive_elements
            }
        );
    }

    #[tokio::test]
    async fn completes_when_planner_says_done() {
        let page = shop_page();
        let planner = Arc::new(ScriptedPlanner::new(
            vec![
                Ok(AgentAction::Type {
                    element_id: 0,
                    text: "lamp".into(),
                }),
                Ok(AgentAction::Done {
                    summary: "Showing lamps".into(),
                }),
            ],
            AgentAction::Click { element_id: 1 },
        ));
        let nav = controller(page.clone(), planner.clone(), 10);

        let summary = nav.execute_command("  find   a lamp ").await.unwrap();

        assert_eq!(summary, "Showing lamps");
        assert_eq!(
            nav.state(),
            NavigatorState::Done {
                summary: "Showing lamps".into()
            }
        );
        let actions: Vec<AgentAction> = nav.history().into_iter().map(|e| e.action).collect();
        assert_eq!(actions.len(), 2);
        assert!(actions[1].is_done());

        let requests = planner.requests.lock().unwrap();
        assert_eq!(requests[0].query, "find a lamp");
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[1].history, vec![actions[0].clone()]);
        let input = nav.scanner().resolve(0).unwrap().handle;
        assert_eq!(page.value_of(input).as_deref(), Some("lamp"));
    }

    #[tokio::test]
    async fn unknown_element_aborts_the_command() {
        let planner = Arc::new(ScriptedPlanner::always(AgentAction::Click { element_id: 7 }));
        let nav = controller(shop_page(), planner.clone(), 10);

        let err = nav.execute_command("add it").await.unwrap_err();

        assert!(matches!(err, NavigatorError::ElementNotFound(7)));
        assert_eq!(planner.calls(), 1);
        assert!(nav.history().is_empty());
    }

    #[tokio::test]
    async fn planner_failures_surface_the_generic_message() {
        let planner = Arc::new(ScriptedPlanner::new(
            vec![Err(NavigatorError::Planner("500: stack trace".into()))],
            AgentAction::Done { summary: String::new() },
        ));
        let nav = controller(shop_page(), planner, 10);

        assert!(nav.execute_command("add it").await.is_err());
        let NavigatorState::Failed { message } = nav.state() else {
            panic!("expected Failed, got {:?}", nav.state());
        };
        assert_eq!(message, MessagesConfig::default().api_error);
        assert!(!message.contains("stack trace"));
    }

    #[tokio::test]
    async fn empty_command_changes_nothing() {
        let planner = Arc::new(ScriptedPlanner::always(AgentAction::Done { summary: "x".into() }));
        let nav = controller(shop_page(), planner.clone(), 10);

        let err = nav.execute_command(" \t javascript: ").await.unwrap_err();

        assert!(matches!(err, NavigatorError::EmptyCommand));
        assert_eq!(nav.state(), NavigatorState::Idle);
        assert_eq!(planner.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_command_is_rejected_and_cancel_stops_the_first() {
        let planner = Arc::new(
            ScriptedPlanner::always(AgentAction::Done { summary: "late".into() }).slow(Duration::from_secs(30)),
        );
        let nav = Arc::new(controller(shop_page(), planner.clone(), 10));

        let running = {
            let nav = nav.clone();
            tokio::spawn(async move { nav.execute_command("find a lamp").await })
        };
        while planner.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(
            nav.state(),
            NavigatorState::Processing {
                phase: StepPhase::Planning,
                step: 1,
                ..
            }
        ));

        let err = nav.execute_command("go to cart").await.unwrap_err();
        assert!(matches!(err, NavigatorError::AlreadyProcessing));

        assert!(nav.cancel());
        let err = running.await.unwrap().unwrap_err();
        assert!(matches!(err, NavigatorError::Cancelled));
        assert_eq!(
            nav.state(),
            NavigatorState::Failed {
                message: MessagesConfig::default().cancelled
            }
        );
        assert!(nav.history().is_empty());
        assert!(!nav.cancel());
    }

    #[tokio::test]
    async fn reset_and_clear_are_idempotent() {
        let planner = Arc::new(ScriptedPlanner::always(AgentAction::Click { element_id: 1 }));
        let nav = controller(shop_page(), planner, 2);
        let _ = nav.execute_command("add it").await;
        assert_eq!(nav.history().len(), 2);

        nav.reset_error();
        nav.reset_error();
        assert_eq!(nav.state(), NavigatorState::Idle);

        nav.clear_history();
        nav.clear_history();
        assert!(nav.history().is_empty());
    }

    #[tokio::test]
    async fn history_survives_across_commands() {
        let planner = Arc::new(ScriptedPlanner::always(AgentAction::Done {
            summary: "ok".into(),
        }));
        let nav = controller(shop_page(), planner.clone(), 10);

        nav.execute_command("first").await.unwrap();
        nav.execute_command("second").await.unwrap();

        let history = nav.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].query, "second");
        assert_eq!(planner.requests.lock().unwrap()[1].history.len(), 1);
    }

    #[tokio::test]
    async fn events_follow_the_command() {
        let planner = Arc::new(ScriptedPlanner::new(
            vec![
                Ok(AgentAction::Click { element_id: 1 }),
                Ok(AgentAction::Done { summary: "added".into() }),
            ],
            AgentAction::Done { summary: String::new() },
        ));
        let nav = controller(shop_page(), planner, 10);
        let mut rx = nav.subscribe();

        nav.execute_command("add it").await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(
            events.first(),
            Some(NavigatorEvent::StateChanged {
                state: NavigatorState::Processing { .. }
            })
        ));
        let executed: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                NavigatorEvent::StepExecuted { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(executed, vec![1]);
        assert_eq!(
            events.last(),
            Some(&NavigatorEvent::Completed {
                summary: "added".into()
            })
        );
    }

    #[test]
    fn sanitize_trims_strips_and_truncates() {
        assert_eq!(sanitize_query("  go   to\n\tcart ", 500), "go to cart");
        assert_eq!(sanitize_query("find <script>alert(1)", 500), "find >alert(1)");
        assert_eq!(sanitize_query("open javascript:void(0) page", 500), "open void(0) page");
        // One pass per fragment, like the service.
        assert_eq!(sanitize_query("<scr<scriptipt", 500), "<script");
        assert_eq!(sanitize_query("a data: b", 500), "a b");
        assert_eq!(sanitize_query("héllo wörld", 4), "héll");
        assert_eq!(sanitize_query("ab cd", 3), "ab");
    }

    #[test]
    fn sanitize_keeps_other_casings() {
        assert_eq!(sanitize_query("find usb DATA: cable", 500), "find usb DATA: cable");
        assert_eq!(sanitize_query("open JavaScript:void(0)", 500), "open JavaScript:void(0)");
    }
}
