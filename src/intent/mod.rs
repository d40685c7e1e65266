//! Offline, rule-based intent classification for typed or transcribed utterances.
pub mod parser;
pub mod rules;
pub mod types;

pub use parser::IntentParser;
pub use types::{Command, CommandType, ParsedCommand};
