use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Navigation,
    Search,
    Cart,
    Category,
    Help,
    Product,
    General,
}

/// A classified utterance. `confidence` is rule strength, not a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    pub action: String,
    pub parameters: BTreeMap<String, String>,
    pub confidence: f32,
}

impl Command {
    pub fn new(command_type: CommandType, action: &str, confidence: f32) -> Self {
        Self {
            command_type,
            action: action.to_string(),
            parameters: BTreeMap::new(),
            confidence,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Parser output: either a command or, when nothing matched, suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    pub text: String,
    pub command: Option<Command>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ParsedCommand {
    pub fn matched(text: &str, command: Command) -> Self {
        Self {
            text: text.to_string(),
            command: Some(command),
            suggestions: None,
        }
    }

    pub fn unmatched(text: &str, suggestions: Vec<String>) -> Self {
        Self {
            text: text.to_string(),
            command: None,
            suggestions: Some(suggestions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serializes_with_type_field() {
        let cmd = Command::new(CommandType::Navigation, "navigate", 0.9).with_param("path", "/products");
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "navigation");
        assert_eq!(json["action"], "navigate");
        assert_eq!(json["parameters"]["path"], "/products");
    }

    #[test]
    fn unmatched_has_no_command() {
        let parsed = ParsedCommand::unmatched("zzz", vec!["Try \"help\"".into()]);
        assert!(parsed.command.is_none());
        assert_eq!(parsed.suggestions.as_deref().map(<[String]>::len), Some(1));
    }
}
