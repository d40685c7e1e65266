//! Applies parsed commands to the storefront's external collaborators.
pub mod collaborators;
pub mod dispatcher;

pub use collaborators::{MemoryRouter, MemoryStore, Router, ShopStore, Speaker, TranscriptSpeaker};
pub use dispatcher::CommandDispatcher;
