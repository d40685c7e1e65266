use thiserror::Error;

use crate::config::MessagesConfig;

#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Planner error: {0}")]
    Planner(String),

    #[error("Planner request timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid planner action: {0}")]
    InvalidAction(String),

    #[error("No interactive elements found on the page")]
    NoInteractiveElements,

    #[error("Element {0} not found in the current scan")]
    ElementNotFound(u32),

    #[error("Element {0} cannot receive text")]
    NotTypeable(u32),

    #[error("Exceeded the maximum of {0} steps")]
    MaxStepsExceeded(u32),

    #[error("Command is empty")]
    EmptyCommand,

    #[error("A command is already being processed")]
    AlreadyProcessing,

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Command cancelled")]
    Cancelled,
}

impl NavigatorError {
    /// User-facing text for this failure. Transport and planner internals
    /// collapse into the generic `api_error` message.
    pub fn user_message(&self, messages: &MessagesConfig) -> String {
        match self {
            NavigatorError::NoInteractiveElements => messages.no_interactive_elements.clone(),
            NavigatorError::ElementNotFound(_) => messages.element_not_found.clone(),
            NavigatorError::InvalidAction(_) | NavigatorError::NotTypeable(_) => {
                messages.invalid_action.clone()
            }
            NavigatorError::MaxStepsExceeded(_) => messages.max_steps_exceeded.clone(),
            NavigatorError::EmptyCommand => messages.empty_command.clone(),
            NavigatorError::AlreadyProcessing => messages.already_processing.clone(),
            NavigatorError::Cancelled => messages.cancelled.clone(),
            NavigatorError::Planner(_)
            | NavigatorError::Timeout(_)
            | NavigatorError::Http(_)
            | NavigatorError::Json(_)
            | NavigatorError::Config(_)
            | NavigatorError::Dispatch(_)
            | NavigatorError::Page(_)
            | NavigatorError::Io(_)
            | NavigatorError::TomlDe(_)
            | NavigatorError::Pattern(_) => messages.api_error.clone(),
        }
    }
}

impl serde::Serialize for NavigatorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type NavigatorResult<T> = Result<T, NavigatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_failures_share_the_api_message() {
        let messages = MessagesConfig::default();
        let timeout = NavigatorError::Timeout(30_000).user_message(&messages);
        let planner = NavigatorError::Planner("500: boom".into()).user_message(&messages);
        assert_eq!(timeout, messages.api_error);
        assert_eq!(planner, messages.api_error);
        assert!(!timeout.contains("boom"));
    }

    #[test]
    fn named_failures_use_their_own_message() {
        let messages = MessagesConfig::default();
        assert_eq!(
            NavigatorError::MaxStepsExceeded(10).user_message(&messages),
            messages.max_steps_exceeded
        );
        assert_eq!(
            NavigatorError::ElementNotFound(4).user_message(&messages),
            messages.element_not_found
        );
    }

    #[test]
    fn typing_into_a_non_field_is_an_invalid_action() {
        let messages = MessagesConfig::default();
        assert_eq!(
            NavigatorError::NotTypeable(1).user_message(&messages),
            messages.invalid_action
        );
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_string(&NavigatorError::EmptyCommand).unwrap();
        assert_eq!(json, "\"Command is empty\"");
    }
}
