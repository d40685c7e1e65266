use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::agent_engine::state::NavigatorState;
use crate::planner::types::AgentAction;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavigatorEvent {
    StateChanged {
        state: NavigatorState,
    },
    StepExecuted {
        step: u32,
        action: AgentAction,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Completed {
        summary: String,
    },
    Failed {
        message: String,
    },
}

/// Fan-out of controller events. Sending with no subscribers is fine.
pub struct EventBus {
    tx: broadcast::Sender<NavigatorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NavigatorEvent> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: NavigatorEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
