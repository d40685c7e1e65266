/// Lifecycle states of the navigation controller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NavigatorState {
    Idle,
    Processing { query: String, step: u32, phase: StepPhase },
    Done { summary: String },
    Failed { message: String },
}

impl NavigatorState {
    pub fn is_processing(&self) -> bool {
        matches!(self, NavigatorState::Processing { .. })
    }
}

/// Where inside a step the controller currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    Scanning,
    Planning,
    Validating,
    Executing,
}
