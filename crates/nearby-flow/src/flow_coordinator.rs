use crate::coordinator::{Coordinated, Coordinator, Flow, Lifecycle};
use crate::error::FlowError;
use crate::presenter::Presenter;
use crate::step::Stepper;

/// Upper bound on drain rounds per `process` call
pub const MAX_ROUNDS: usize = 64;

/// Drives a tree of coordinators rooted at one flow.
///
/// Routing is synchronous: `process` returns once every queued step in the
/// tree has been handled, including steps queued while routing.
pub struct FlowCoordinator<F: Flow, P: Presenter> {
    root: Coordinator<F>,
    presenter: P,
    finished: bool,
}

impl<F: Flow, P: Presenter> FlowCoordinator<F, P> {
    /// Create the root coordinator and route its initial step
    pub fn coordinate(flow: F, mut presenter: P) -> Result<Self, FlowError> {
        let mut root = Coordinator::new(flow);
        tracing::info!("Coordinating {} {}", root.name(), root.id());
        let finished = root.start(&mut presenter)? == Lifecycle::Finished;

        Ok(Self {
            root,
            presenter,
            finished,
        })
    }

    /// Route queued steps until the tree is quiet. Returns the number of
    /// steps routed.
    pub fn process(&mut self) -> Result<usize, FlowError> {
        let mut routed = 0;

        for _ in 0..MAX_ROUNDS {
            if self.finished {
                return Ok(routed);
            }

            let pumped = self.root.pump(&mut self.presenter)?;
            routed += pumped.steps;

            if pumped.lifecycle == Lifecycle::Finished {
                tracing::info!("Root flow {} finished", self.root.name());
                self.finished = true;
            } else if pumped.steps == 0 {
                return Ok(routed);
            }
        }

        Err(FlowError::Unsettled { rounds: MAX_ROUNDS })
    }

    pub fn stepper(&self) -> Stepper<F::Step> {
        self.root.stepper()
    }

    pub fn root(&self) -> &Coordinator<F> {
        &self.root
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
