//! Coordinator state machine.
//!
//! A [`Flow`] maps its own step type to a [`NextCoordinator`] action. A
//! [`Coordinator`] wraps a flow with an inbox, a registry of strongly owned
//! children, and the id of its parent. Children never point back at their
//! parent; finishing is reported upward through [`Lifecycle::Finished`] and the
//! parent removes the child from its registry by id.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;

use crate::error::FlowError;
use crate::presenter::Presenter;
use crate::step::{self, Stepper};

static NEXT_COORDINATOR_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoordinatorId(u64);

impl CoordinatorId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COORDINATOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CoordinatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a coordinator does after routing a step
pub enum NextCoordinator {
    /// Routing was handled in place (or ignored); no child involved
    None,
    /// Register and start a new child coordinator
    Spawn(Box<dyn Coordinated>),
    /// This coordinator is done and must be released by its parent
    Destroy,
}

impl fmt::Debug for NextCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Spawn(child) => write!(f, "Spawn({} {})", child.name(), child.id()),
            Self::Destroy => write!(f, "Destroy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Finished,
}

/// Result of draining a coordinator subtree once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pumped {
    /// Steps routed anywhere in the subtree
    pub steps: usize,
    pub lifecycle: Lifecycle,
}

/// Handed to a flow while it routes a step
pub struct FlowContext<'a> {
    id: CoordinatorId,
    presenter: &'a mut dyn Presenter,
}

impl<'a> FlowContext<'a> {
    pub fn id(&self) -> CoordinatorId {
        self.id
    }

    pub fn presenter(&mut self) -> &mut dyn Presenter {
        &mut *self.presenter
    }

    /// Build a child coordinator owned by the routing coordinator.
    ///
    /// Take its stepper before boxing it into [`NextCoordinator::Spawn`].
    pub fn child<G: Flow>(&self, flow: G) -> Coordinator<G> {
        Coordinator::with_parent(flow, Some(self.id))
    }
}

pub trait Flow: 'static {
    /// Closed set of steps this flow understands
    type Step: fmt::Debug + Send + 'static;

    fn name(&self) -> &'static str;

    /// Step routed as soon as the coordinator starts
    fn initial_step(&self) -> Self::Step;

    /// Route one step. Steps that do not apply in the current state are
    /// answered with [`NextCoordinator::None`] and change nothing.
    fn navigate(
        &mut self,
        step: Self::Step,
        ctx: &mut FlowContext<'_>,
    ) -> Result<NextCoordinator, FlowError>;

    /// A child of this coordinator finished and has been released
    fn child_did_finish(
        &mut self,
        _child: CoordinatorId,
        _ctx: &mut FlowContext<'_>,
    ) -> Result<(), FlowError> {
        Ok(())
    }
}

/// Type-erased view of a coordinator so parents can own children of any flow
pub trait Coordinated {
    fn id(&self) -> CoordinatorId;

    fn name(&self) -> &'static str;

    fn parent_id(&self) -> Option<CoordinatorId>;

    fn child_ids(&self) -> Vec<CoordinatorId>;

    /// Route the flow's initial step
    fn start(&mut self, presenter: &mut dyn Presenter) -> Result<Lifecycle, FlowError>;

    /// Route every queued step, then pump children and release finished ones
    fn pump(&mut self, presenter: &mut dyn Presenter) -> Result<Pumped, FlowError>;
}

pub struct Coordinator<F: Flow> {
    id: CoordinatorId,
    parent: Option<CoordinatorId>,
    flow: F,
    stepper: Stepper<F::Step>,
    inbox: Receiver<F::Step>,
    children: Vec<Box<dyn Coordinated>>,
}

impl<F: Flow> Coordinator<F> {
    /// A root coordinator with no parent
    pub fn new(flow: F) -> Self {
        Self::with_parent(flow, None)
    }

    fn with_parent(flow: F, parent: Option<CoordinatorId>) -> Self {
        let id = CoordinatorId::next();
        let (stepper, inbox) = step::channel(id, flow.name());
        Self {
            id,
            parent,
            flow,
            stepper,
            inbox,
            children: Vec::new(),
        }
    }

    pub fn stepper(&self) -> Stepper<F::Step> {
        self.stepper.clone()
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn children(&self) -> &[Box<dyn Coordinated>] {
        &self.children
    }

    /// Route a single step and apply the resulting action
    pub fn execute_routing_step(
        &mut self,
        step: F::Step,
        presenter: &mut dyn Presenter,
    ) -> Result<Lifecycle, FlowError> {
        tracing::debug!("{} {} routing {:?}", self.flow.name(), self.id, step);

        let next = {
            let mut ctx = FlowContext {
                id: self.id,
                presenter: &mut *presenter,
            };
            self.flow.navigate(step, &mut ctx)?
        };

        match next {
            NextCoordinator::None => Ok(Lifecycle::Active),
            NextCoordinator::Spawn(mut child) => {
                // The flow already knows this child; it hears back even when the
                // child never makes it into the registry
                match child.start(&mut *presenter) {
                    Ok(Lifecycle::Active) => {}
                    Ok(Lifecycle::Finished) => {
                        tracing::debug!("{} {} finished while starting", child.name(), child.id());
                        self.notify_child_finished(child.id(), presenter)?;
                        return Ok(Lifecycle::Active);
                    }
                    Err(e) => {
                        tracing::warn!("{} {} failed to start: {}", child.name(), child.id(), e);
                        self.notify_child_finished(child.id(), presenter)?;
                        return Err(e);
                    }
                }
                tracing::info!(
                    "{} {} spawned {} {}",
                    self.flow.name(),
                    self.id,
                    child.name(),
                    child.id()
                );
                self.children.push(child);
                Ok(Lifecycle::Active)
            }
            NextCoordinator::Destroy => {
                tracing::info!("{} {} finished", self.flow.name(), self.id);
                Ok(Lifecycle::Finished)
            }
        }
    }

    fn release_child(&mut self, child: CoordinatorId, presenter: &mut dyn Presenter) -> Result<(), FlowError> {
        self.children.retain(|c| c.id() != child);
        tracing::debug!("{} {} released child {}", self.flow.name(), self.id, child);
        self.notify_child_finished(child, presenter)
    }

    fn notify_child_finished(&mut self, child: CoordinatorId, presenter: &mut dyn Presenter) -> Result<(), FlowError> {
        let mut ctx = FlowContext {
            id: self.id,
            presenter,
        };
        self.flow.child_did_finish(child, &mut ctx)
    }
}

impl<F: Flow> Coordinated for Coordinator<F> {
    fn id(&self) -> CoordinatorId {
        self.id
    }

    fn name(&self) -> &'static str {
        self.flow.name()
    }

    fn parent_id(&self) -> Option<CoordinatorId> {
        self.parent
    }

    fn child_ids(&self) -> Vec<CoordinatorId> {
        self.children.iter().map(|c| c.id()).collect()
    }

    fn start(&mut self, presenter: &mut dyn Presenter) -> Result<Lifecycle, FlowError> {
        let initial = self.flow.initial_step();
        self.execute_routing_step(initial, presenter)
    }

    fn pump(&mut self, presenter: &mut dyn Presenter) -> Result<Pumped, FlowError> {
        // Only steps queued before this pump; anything emitted while routing
        // waits for the next round
        let queued: Vec<F::Step> = self.inbox.try_iter().collect();
        let mut steps = 0;

        // Steps still queued behind a finishing step go down with the coordinator
        for step in queued {
            steps += 1;
            if self.execute_routing_step(step, &mut *presenter)? == Lifecycle::Finished {
                return Ok(Pumped {
                    steps,
                    lifecycle: Lifecycle::Finished,
                });
            }
        }

        let mut finished = Vec::new();
        let mut first_error = None;
        for child in &mut self.children {
            match child.pump(&mut *presenter) {
                Ok(pumped) => {
                    steps += pumped.steps;
                    if pumped.lifecycle == Lifecycle::Finished {
                        finished.push(child.id());
                    }
                }
                Err(e) => {
                    tracing::warn!("{} {} failed to route: {}", child.name(), child.id(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        // A child reports Finished only once, so release before surfacing errors
        for child in finished {
            if let Err(e) = self.release_child(child, &mut *presenter) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Pumped {
                steps,
                lifecycle: Lifecycle::Active,
            }),
        }
    }
}

impl<F: Flow> fmt::Debug for Coordinator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("id", &self.id)
            .field("flow", &self.flow.name())
            .field("parent", &self.parent)
            .field("children", &self.child_ids())
            .finish()
    }
}
