use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;

use crate::config::PlannerConfig;
use crate::errors::{NavigatorError, NavigatorResult};
use crate::planner::provider::Planner;
use crate::planner::types::{
    AgentAction, Feedback, FeedbackReceipt, HealthStatus, PlanRequest, PlanResponse, ServiceStats,
};

const PLAN_PATH: &str = "plan";

/// Planner backed by the remote planning service.
///
/// One request per call, no retries. The configured timeout bounds the whole
/// exchange, body included.
pub struct HttpPlanner {
    endpoint: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpPlanner {
    pub fn new(config: &PlannerConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &PlannerConfig, client: reqwest::Client) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            base_url: service_base(&config.endpoint),
            timeout: config.request_timeout(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn health(&self) -> NavigatorResult<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        tracing::debug!(url = %url, "checking planner health");
        let status: HealthStatus = self.send_json(self.client.get(&url)).await?;
        tracing::info!(status = %status.status, model = %status.ai_model, "planner health");
        Ok(status)
    }

    pub async fn stats(&self) -> NavigatorResult<ServiceStats> {
        let url = format!("{}/stats", self.base_url);
        tracing::debug!(url = %url, "fetching planner stats");
        let stats: ServiceStats = self.send_json(self.client.get(&url)).await?;
        tracing::info!(
            cache_size = stats.cache_size,
            patterns = stats.patterns_count,
            actions = stats.actions_count,
            "planner stats"
        );
        Ok(stats)
    }

    /// Report how a finished command went so the service can learn from it.
    pub async fn submit_feedback(&self, feedback: &Feedback) -> NavigatorResult<FeedbackReceipt> {
        let url = format!("{}/feedback", self.base_url);
        tracing::debug!(
            url = %url,
            success = feedback.success,
            actions = feedback.actions.len(),
            "submitting feedback"
        );
        self.send_json(self.client.post(&url).json(feedback)).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> NavigatorResult<T> {
        let exchange = async {
            let response = request.header(ACCEPT, "application/json").send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NavigatorError::Planner(format!("{status}: {body}")));
            }
            let body = response.text().await?;
            Ok(serde_json::from_str::<T>(&body)?)
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                let millis = self.timeout.as_millis() as u64;
                tracing::warn!(timeout_ms = millis, "planner request timed out");
                Err(NavigatorError::Timeout(millis))
            }
        }
    }
}

#[async_trait]
impl Planner for HttpPlanner {
    fn name(&self) -> &str {
        "http"
    }

    async fn next_action(&self, request: &PlanRequest) -> NavigatorResult<AgentAction> {
        tracing::debug!(
            endpoint = %self.endpoint,
            elements = request.dom_snapshot.len(),
            history = request.history.len(),
            "requesting next action"
        );
        let response: PlanResponse = self.send_json(self.client.post(&self.endpoint).json(request)).await?;
        if let Some(reasoning) = &response.reasoning {
            tracing::debug!(reasoning = %reasoning, confidence = ?response.confidence, "planner reasoning");
        }
        let action = AgentAction::try_from(response)?;
        tracing::info!(action = action.name(), element = ?action.element_id(), "planner chose action");
        Ok(action)
    }
}

/// Service root derived from the plan endpoint: `http://h:8000/plan` → `http://h:8000`.
fn service_base(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((base, PLAN_PATH)) => base.to_string(),
        _ => trimmed.to_string(),
    }
}
