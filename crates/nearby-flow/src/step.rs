//! Typed step channels.
//!
//! Every coordinator owns the receiving end of a channel for its own step
//! type. Producers hold a [`Stepper`] for the coordinator they address, so a
//! step can only ever reach a flow that understands it.

use std::fmt;
use std::sync::mpsc;

use crate::coordinator::CoordinatorId;
use crate::error::FlowError;

pub struct Stepper<S> {
    target: CoordinatorId,
    flow: &'static str,
    tx: mpsc::Sender<S>,
}

pub(crate) fn channel<S>(target: CoordinatorId, flow: &'static str) -> (Stepper<S>, mpsc::Receiver<S>) {
    let (tx, rx) = mpsc::channel();
    (Stepper { target, flow, tx }, rx)
}

impl<S: fmt::Debug> Stepper<S> {
    /// Queue a step for the target coordinator.
    ///
    /// Routing happens on the next `FlowCoordinator::process`; emitting never
    /// blocks.
    pub fn emit(&self, step: S) -> Result<(), FlowError> {
        tracing::trace!("Emitting {:?} to {} {}", step, self.flow, self.target);
        self.tx.send(step).map_err(|_| FlowError::CoordinatorGone {
            id: self.target,
            flow: self.flow,
        })
    }
}

impl<S> Stepper<S> {
    pub fn target(&self) -> CoordinatorId {
        self.target
    }

    pub fn flow_name(&self) -> &'static str {
        self.flow
    }
}

impl<S> Clone for Stepper<S> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            flow: self.flow,
            tx: self.tx.clone(),
        }
    }
}

impl<S> fmt::Debug for Stepper<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stepper")
            .field("target", &self.target)
            .field("flow", &self.flow)
            .finish()
    }
}
