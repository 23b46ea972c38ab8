use thiserror::Error;

use crate::coordinator::CoordinatorId;
use crate::presenter::WindowLevel;

#[derive(Debug, Error)]
pub enum FlowError {
    /// Content was routed into a window that was never opened
    #[error("No {0} window to present into")]
    NoWindow(WindowLevel),

    /// The target coordinator was released; its stepper is stale
    #[error("Coordinator {flow} {id} is no longer active")]
    CoordinatorGone { id: CoordinatorId, flow: &'static str },

    #[error("Navigation did not settle after {rounds} rounds")]
    Unsettled { rounds: usize },
}
