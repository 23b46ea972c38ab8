use crate::coordinator::{CoordinatorId, Flow, FlowContext, NextCoordinator};
use crate::error::FlowError;
use crate::flows::{MainFlow, MainStep, WelcomeFlow, WelcomeStep};
use crate::presenter::WindowLevel;
use crate::step::Stepper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStep {
    /// Open the main window and start the main flow
    Main,
    /// Start onboarding above the main window
    Welcome,
    None,
}

/// Owns the main window and the top-level children.
///
/// Keeps steppers for its live children so the host can hand them to the
/// screens it builds.
#[derive(Debug, Default)]
pub struct RootFlow {
    main: Option<Stepper<MainStep>>,
    welcome: Option<Stepper<WelcomeStep>>,
}

impl RootFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_stepper(&self) -> Option<&Stepper<MainStep>> {
        self.main.as_ref()
    }

    pub fn welcome_stepper(&self) -> Option<&Stepper<WelcomeStep>> {
        self.welcome.as_ref()
    }
}

impl Flow for RootFlow {
    type Step = RootStep;

    fn name(&self) -> &'static str {
        "root"
    }

    fn initial_step(&self) -> RootStep {
        RootStep::Main
    }

    fn navigate(&mut self, step: RootStep, ctx: &mut FlowContext<'_>) -> Result<NextCoordinator, FlowError> {
        match step {
            RootStep::Main => {
                if self.main.is_some() {
                    return Ok(NextCoordinator::None);
                }
                ctx.presenter().open_window(WindowLevel::Normal);
                let child = ctx.child(MainFlow);
                self.main = Some(child.stepper());
                Ok(NextCoordinator::Spawn(Box::new(child)))
            }
            RootStep::Welcome => {
                if self.welcome.is_some() {
                    tracing::debug!("Welcome flow already active");
                    return Ok(NextCoordinator::None);
                }
                let child = ctx.child(WelcomeFlow);
                self.welcome = Some(child.stepper());
                Ok(NextCoordinator::Spawn(Box::new(child)))
            }
            RootStep::None => Ok(NextCoordinator::None),
        }
    }

    fn child_did_finish(&mut self, child: CoordinatorId, _ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
        if self.welcome.as_ref().is_some_and(|s| s.target() == child) {
            self.welcome = None;
        }
        if self.main.as_ref().is_some_and(|s| s.target() == child) {
            self.main = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Coordinated;
    use crate::flow_coordinator::FlowCoordinator;
    use crate::presenter::{Presenter, Screen, WindowManager};

    #[test]
    fn test_welcome_can_be_shown_again_after_dismiss() {
        let mut flow = FlowCoordinator::coordinate(RootFlow::new(), WindowManager::new()).unwrap();

        flow.stepper().emit(RootStep::Welcome).unwrap();
        flow.process().unwrap();
        let first = flow.root().flow().welcome_stepper().cloned().unwrap();
        first.emit(WelcomeStep::Dismiss).unwrap();
        flow.process().unwrap();

        flow.stepper().emit(RootStep::Welcome).unwrap();
        flow.process().unwrap();

        let second = flow.root().flow().welcome_stepper().unwrap();
        assert_ne!(second.target(), first.target());
        assert_eq!(flow.root().children().len(), 2);
        assert_eq!(flow.presenter().visible_screen(), Some(&Screen::Welcome));
    }

    #[test]
    fn test_repeated_main_step_keeps_one_main_flow() {
        let mut flow = FlowCoordinator::coordinate(RootFlow::new(), WindowManager::new()).unwrap();
        let main = flow.root().flow().main_stepper().map(Stepper::target);

        flow.stepper().emit(RootStep::Main).unwrap();
        flow.process().unwrap();

        assert_eq!(flow.root().flow().main_stepper().map(Stepper::target), main);
        assert_eq!(flow.root().child_ids().len(), 1);
    }
}
