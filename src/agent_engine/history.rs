use serde::{Deserialize, Serialize};

use crate::planner::types::AgentAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unix millis at which the step completed.
    pub ts: i64,
    pub query: String,
    pub action: AgentAction,
}

/// Actions completed in this session, oldest first.
///
/// Survives completed and failed commands; only `clear` empties it.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    pub session_id: String,
    entries: Vec<HistoryEntry>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, query: &str, action: AgentAction) {
        self.entries.push(HistoryEntry {
            ts: chrono::Utc::now().timestamp_millis(),
            query: query.to_string(),
            action,
        });
        tracing::debug!(session = %self.session_id, len = self.entries.len(), "history appended");
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Actions in the shape the planner expects.
    pub fn actions(&self) -> Vec<AgentAction> {
        self.entries.iter().map(|e| e.action.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}
