use async_trait::async_trait;

use crate::errors::NavigatorResult;
use crate::planner::types::{AgentAction, PlanRequest};

/// Decides the next step of a navigation command.
///
/// Implementations must return only validated actions; a reply that does not
/// name one of the three known actions is an error, never coerced.
#[async_trait]
pub trait Planner: Send + Sync {
    fn name(&self) -> &str;

    async fn next_action(&self, request: &PlanRequest) -> NavigatorResult<AgentAction>;
}
