pub mod actions;
pub mod text_input;

pub use actions::ActionExecutor;
