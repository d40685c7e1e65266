use crate::errors::{NavigatorError, NavigatorResult};

/// Bounds the number of plan/execute iterations of one command.
pub struct StepGuard {
    max_steps: u32,
    step: u32,
}

impl StepGuard {
    pub fn new(max_steps: u32) -> Self {
        Self { max_steps, step: 0 }
    }

    /// Start the next step, returning its 1-based number, or fail once the
    /// limit has been used up.
    pub fn advance(&mut self) -> NavigatorResult<u32> {
        if self.step >= self.max_steps {
            tracing::warn!(max_steps = self.max_steps, "step limit reached");
            return Err(NavigatorError::MaxStepsExceeded(self.max_steps));
        }
        self.step += 1;
        Ok(self.step)
    }

    pub fn step(&self) -> u32 {
        self.step
    }
}
