use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{NavigatorError, NavigatorResult};

const CONFIG_FILE: &str = "config.toml";
const ENDPOINT_ENV: &str = "STOREFRONT_PLANNER_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Full URL of the plan endpoint, e.g. `http://localhost:8000/plan`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl PlannerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000/plan".into()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Loop and executor timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Pause between loop iterations so the user can follow along.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Pause after scroll + highlight before interacting.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_post_click_delay_ms")]
    pub post_click_delay_ms: u64,
    #[serde(default = "default_type_clear_delay_ms")]
    pub type_clear_delay_ms: u64,
    #[serde(default = "default_type_submit_delay_ms")]
    pub type_submit_delay_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_query_length: default_max_query_length(),
            step_delay_ms: default_step_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            post_click_delay_ms: default_post_click_delay_ms(),
            type_clear_delay_ms: default_type_clear_delay_ms(),
            type_submit_delay_ms: default_type_submit_delay_ms(),
        }
    }
}

impl AgentConfig {
    /// Same limits with every delay set to zero. Handy for headless runs.
    pub fn without_delays(self) -> Self {
        Self {
            step_delay_ms: 0,
            settle_delay_ms: 0,
            post_click_delay_ms: 0,
            type_clear_delay_ms: 0,
            type_submit_delay_ms: 0,
            ..self
        }
    }
}

fn default_max_steps() -> u32 {
    10
}

fn default_max_query_length() -> usize {
    500
}

fn default_step_delay_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_post_click_delay_ms() -> u64 {
    500
}

fn default_type_clear_delay_ms() -> u64 {
    50
}

fn default_type_submit_delay_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_highlight_duration_ms")]
    pub highlight_duration_ms: u64,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// CSS-like selectors whose union defines "interactive".
    #[serde(default = "default_selectors")]
    pub selectors: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            highlight_duration_ms: default_highlight_duration_ms(),
            max_text_length: default_max_text_length(),
            selectors: default_selectors(),
        }
    }
}

impl ScannerConfig {
    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }
}

fn default_highlight_duration_ms() -> u64 {
    2000
}

fn default_max_text_length() -> usize {
    100
}

pub fn default_selectors() -> Vec<String> {
    [
        "button",
        "a[href]",
        "[role=\"button\"]",
        "input[type=\"text\"]",
        "input[type=\"search\"]",
        "input[type=\"email\"]",
        "input[type=\"password\"]",
        "input[type=\"number\"]",
        "input[type=\"tel\"]",
        "input[type=\"url\"]",
        "input[type=\"submit\"]",
        "textarea",
        "select",
        "[onclick]",
        "[data-testid]",
        "[tabindex=\"0\"]",
        ".clickable",
        "[contenteditable=\"true\"]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// How `navigate --url` reaches Chrome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// DevTools endpoint of an already running Chrome. Tried first.
    #[serde(default = "default_debug_url")]
    pub debug_url: String,
    /// Launch settings used when nothing answers on `debug_url`.
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_url: default_debug_url(),
            headless: default_headless(),
            chrome_path: None,
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

fn default_debug_url() -> String {
    "http://127.0.0.1:9222".into()
}

fn default_headless() -> bool {
    true
}

fn default_idle_timeout_secs() -> u64 {
    60
}

/// User-facing text for each named failure condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub no_interactive_elements: String,
    pub element_not_found: String,
    pub invalid_action: String,
    pub api_error: String,
    pub max_steps_exceeded: String,
    pub empty_command: String,
    pub already_processing: String,
    pub cancelled: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            no_interactive_elements: "No interactive elements found on this page.".into(),
            element_not_found: "Could not find the element to interact with. The page may have changed.".into(),
            invalid_action: "Received an invalid action from the assistant.".into(),
            api_error: "Failed to communicate with the assistant. Please try again.".into(),
            max_steps_exceeded: "The task took too many steps and was stopped.".into(),
            empty_command: "Please enter a command.".into(),
            already_processing: "Already processing a command. Please wait.".into(),
            cancelled: "The command was cancelled.".into(),
        }
    }
}

fn resolve_config_path() -> NavigatorResult<Option<PathBuf>> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(Some(candidate));
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(Some(candidate));
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("storefront-navigator").join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Load `config.toml` from the usual locations, falling back to defaults.
/// The planner endpoint can be overridden with `STOREFRONT_PLANNER_ENDPOINT`.
pub fn load_config() -> NavigatorResult<AppConfig> {
    let mut config = match resolve_config_path()? {
        Some(path) => load_config_from(&path)?,
        None => {
            tracing::info!("no config.toml found; using defaults");
            AppConfig::default()
        }
    };
    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        tracing::info!(endpoint = %endpoint, "planner endpoint overridden from environment");
        config.planner.endpoint = endpoint;
    }
    Ok(config)
}

pub fn load_config_from(path: &Path) -> NavigatorResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    if config.agent.max_steps == 0 {
        return Err(NavigatorError::Config("agent.max_steps must be at least 1".into()));
    }
    tracing::info!(
        path = %path.display(),
        endpoint = %config.planner.endpoint,
        max_steps = config.agent.max_steps,
        "config loaded"
    );
    Ok(config)
}

/// Write `config` as TOML, used by the CLI to scaffold a config file.
pub fn save_config(config: &AppConfig, path: &Path) -> NavigatorResult<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| NavigatorError::Config(format!("cannot serialize config: {e}")))?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
