//! The multi-step navigation loop and its supporting state.
pub mod engine;
pub mod event_bus;
pub mod history;
pub mod loop_control;
pub mod state;

pub use engine::{sanitize_query, NavigationController};
pub use event_bus::NavigatorEvent;
pub use history::{HistoryEntry, NavigationHistory};
pub use state::{NavigatorState, StepPhase};
