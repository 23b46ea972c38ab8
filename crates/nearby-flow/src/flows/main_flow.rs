use crate::coordinator::{Flow, FlowContext, NextCoordinator};
use crate::error::FlowError;
use crate::presenter::{Screen, WindowLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainStep {
    Initial,
    List,
    Map,
    Settings,
    WeatherDetails { station_id: u64 },
    /// Leave the screen on top of the navigation stack
    Back,
    None,
}

/// Weather list, map, settings and details inside the normal window.
///
/// The window itself is opened by the parent; routing before that is a
/// `FlowError::NoWindow`.
#[derive(Debug, Default)]
pub struct MainFlow;

impl Flow for MainFlow {
    type Step = MainStep;

    fn name(&self) -> &'static str {
        "main"
    }

    fn initial_step(&self) -> MainStep {
        MainStep::Initial
    }

    fn navigate(&mut self, step: MainStep, ctx: &mut FlowContext<'_>) -> Result<NextCoordinator, FlowError> {
        let presenter = ctx.presenter();
        match step {
            MainStep::Initial | MainStep::List => {
                presenter.set_screens(WindowLevel::Normal, vec![Screen::WeatherList])?;
            }
            MainStep::Map => {
                presenter.set_screens(WindowLevel::Normal, vec![Screen::WeatherMap])?;
            }
            MainStep::Settings => {
                presenter.push(WindowLevel::Normal, Screen::Settings)?;
            }
            MainStep::WeatherDetails { station_id } => {
                presenter.push(WindowLevel::Normal, Screen::WeatherDetails { station_id })?;
            }
            MainStep::Back => {
                if presenter.pop(WindowLevel::Normal)?.is_none() {
                    tracing::debug!("Back on root screen ignored");
                }
            }
            MainStep::None => {}
        }
        Ok(NextCoordinator::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Coordinated, Coordinator};
    use crate::presenter::{Presenter, WindowManager};

    fn started(windows: &mut WindowManager) -> Coordinator<MainFlow> {
        windows.open_window(WindowLevel::Normal);
        let mut main = Coordinator::new(MainFlow);
        main.start(windows).unwrap();
        main
    }

    #[test]
    fn test_back_on_root_screen_is_ignored() {
        let mut windows = WindowManager::new();
        let mut main = started(&mut windows);
        let revision = windows.revision();

        main.execute_routing_step(MainStep::Back, &mut windows).unwrap();

        assert_eq!(windows.revision(), revision);
        assert_eq!(windows.visible_screen(), Some(&Screen::WeatherList));
    }

    #[test]
    fn test_list_resets_the_stack() {
        let mut windows = WindowManager::new();
        let mut main = started(&mut windows);

        main.execute_routing_step(MainStep::Settings, &mut windows).unwrap();
        main.execute_routing_step(MainStep::WeatherDetails { station_id: 7 }, &mut windows)
            .unwrap();
        main.execute_routing_step(MainStep::List, &mut windows).unwrap();

        assert_eq!(windows.screens(WindowLevel::Normal), Some(&[Screen::WeatherList][..]));
    }

    #[test]
    fn test_start_without_window_fails() {
        let mut windows = WindowManager::new();
        let mut main = Coordinator::new(MainFlow);

        let err = main.start(&mut windows).unwrap_err();
        assert!(matches!(err, FlowError::NoWindow(WindowLevel::Normal)));
    }
}
