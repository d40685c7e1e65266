use serde::{Deserialize, Serialize};

use crate::errors::NavigatorError;
use crate::perception::types::ElementDescriptor;

/// One step chosen by the planner.
///
/// Serialised in the planner's wire shape, e.g.
/// `{"action":"TYPE","elementId":3,"text":"lamp"}`, which is also how
/// prior steps travel back to it in the request history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum AgentAction {
    Click {
        #[serde(rename = "elementId")]
        element_id: u32,
    },
    Type {
        #[serde(rename = "elementId")]
        element_id: u32,
        text: String,
    },
    Done {
        summary: String,
    },
}

impl AgentAction {
    pub fn element_id(&self) -> Option<u32> {
        match self {
            AgentAction::Click { element_id } | AgentAction::Type { element_id, .. } => Some(*element_id),
            AgentAction::Done { .. } => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, AgentAction::Done { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentAction::Click { .. } => "CLICK",
            AgentAction::Type { .. } => "TYPE",
            AgentAction::Done { .. } => "DONE",
        }
    }
}

/// Request body for the planning endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub query: String,
    pub dom_snapshot: Vec<ElementDescriptor>,
    pub history: Vec<AgentAction>,
}

/// Raw planner reply, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanResponse {
    pub action: String,
    #[serde(rename = "elementId", default)]
    pub element_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl PlanResponse {
    fn element_id(&self) -> Result<u32, NavigatorError> {
        let raw = self
            .element_id
            .ok_or_else(|| NavigatorError::InvalidAction(format!("{} without elementId", self.action)))?;
        u32::try_from(raw).map_err(|_| NavigatorError::InvalidAction(format!("elementId {raw} out of range")))
    }
}

impl TryFrom<PlanResponse> for AgentAction {
    type Error = NavigatorError;

    fn try_from(response: PlanResponse) -> Result<Self, Self::Error> {
        match response.action.as_str() {
            "CLICK" => Ok(AgentAction::Click {
                element_id: response.element_id()?,
            }),
            "TYPE" => {
                let element_id = response.element_id()?;
                let text = response
                    .text
                    .ok_or_else(|| NavigatorError::InvalidAction("TYPE without text".into()))?;
                Ok(AgentAction::Type { element_id, text })
            }
            "DONE" => Ok(AgentAction::Done {
                summary: response.summary.unwrap_or_default(),
            }),
            other => Err(NavigatorError::InvalidAction(format!("unknown action '{other}'"))),
        }
    }
}

/// Planner service health, as reported by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub ai_model: String,
}

/// Service counters, as reported by `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    #[serde(default)]
    pub service: String,
    /// Cached plan responses.
    #[serde(default)]
    pub cache_size: u64,
    /// Learned navigation patterns.
    #[serde(default)]
    pub patterns_count: u64,
    /// Recorded actions.
    #[serde(default)]
    pub actions_count: u64,
    #[serde(default)]
    pub ai_model: String,
    #[serde(default)]
    pub environment: String,
}

/// Outcome report for a finished command, used by the service to learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub query: String,
    pub success: bool,
    pub actions: Vec<AgentAction>,
    pub dom_snapshot: Vec<ElementDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub status: String,
    #[serde(default)]
    pub message: String,
}
