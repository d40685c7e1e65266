pub mod http;
pub mod provider;
pub mod types;

pub use http::HttpPlanner;
pub use provider::Planner;
pub use types::{AgentAction, Feedback, HealthStatus, PlanRequest, PlanResponse, ServiceStats};
