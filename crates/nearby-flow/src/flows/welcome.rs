use crate::coordinator::{Flow, FlowContext, NextCoordinator};
use crate::error::FlowError;
use crate::presenter::{Screen, WindowLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeStep {
    Initial,
    Dismiss,
    None,
}

/// Onboarding shown in its own alert-level window above the main window
#[derive(Debug, Default)]
pub struct WelcomeFlow;

impl Flow for WelcomeFlow {
    type Step = WelcomeStep;

    fn name(&self) -> &'static str {
        "welcome"
    }

    fn initial_step(&self) -> WelcomeStep {
        WelcomeStep::Initial
    }

    fn navigate(&mut self, step: WelcomeStep, ctx: &mut FlowContext<'_>) -> Result<NextCoordinator, FlowError> {
        match step {
            WelcomeStep::Initial => {
                let presenter = ctx.presenter();
                presenter.open_window(WindowLevel::Alert);
                presenter.set_screens(WindowLevel::Alert, vec![Screen::Welcome])?;
                Ok(NextCoordinator::None)
            }
            WelcomeStep::Dismiss => {
                let presenter = ctx.presenter();
                if presenter.has_window(WindowLevel::Alert) {
                    presenter.close_window(WindowLevel::Alert)?;
                }
                Ok(NextCoordinator::Destroy)
            }
            WelcomeStep::None => Ok(NextCoordinator::None),
        }
    }
}
