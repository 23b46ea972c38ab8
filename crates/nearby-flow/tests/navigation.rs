//! End-to-end routing through the root, main and welcome flows.

use nearby_flow::{
    Coordinated, FlowCoordinator, FlowError, MainStep, Presenter, RootFlow, RootStep, Screen,
    WelcomeStep, WindowLevel, WindowManager,
};

fn launch() -> FlowCoordinator<RootFlow, WindowManager> {
    FlowCoordinator::coordinate(RootFlow::new(), WindowManager::new()).unwrap()
}

#[test]
fn test_launch_shows_weather_list() {
    let flow = launch();

    assert_eq!(flow.presenter().visible_screen(), Some(&Screen::WeatherList));
    assert_eq!(flow.presenter().key_window(), Some(WindowLevel::Normal));
    assert_eq!(flow.root().children().len(), 1);
    assert!(flow.root().flow().main_stepper().is_some());
}

#[test]
fn test_main_flow_navigation() {
    let mut flow = launch();
    let main = flow.root().flow().main_stepper().cloned().unwrap();

    main.emit(MainStep::WeatherDetails { station_id: 42 }).unwrap();
    flow.process().unwrap();
    assert_eq!(
        flow.presenter().visible_screen(),
        Some(&Screen::WeatherDetails { station_id: 42 })
    );

    main.emit(MainStep::Back).unwrap();
    main.emit(MainStep::Map).unwrap();
    main.emit(MainStep::Settings).unwrap();
    assert_eq!(flow.process().unwrap(), 3);
    assert_eq!(
        flow.presenter().screens(WindowLevel::Normal),
        Some(&[Screen::WeatherMap, Screen::Settings][..])
    );
}

#[test]
fn test_welcome_covers_and_dismiss_restores_main() {
    let mut flow = launch();
    flow.stepper().emit(RootStep::Welcome).unwrap();
    flow.process().unwrap();

    assert_eq!(flow.presenter().visible_screen(), Some(&Screen::Welcome));
    assert_eq!(flow.presenter().key_window(), Some(WindowLevel::Alert));
    assert_eq!(flow.root().children().len(), 2);

    let welcome = flow.root().flow().welcome_stepper().cloned().unwrap();
    let welcome_id = welcome.target();
    welcome.emit(WelcomeStep::Dismiss).unwrap();
    flow.process().unwrap();

    assert!(!flow.root().child_ids().contains(&welcome_id));
    assert_eq!(flow.root().children().len(), 1);
    assert!(flow.root().flow().welcome_stepper().is_none());
    assert!(!flow.presenter().has_window(WindowLevel::Alert));
    assert_eq!(flow.presenter().visible_screen(), Some(&Screen::WeatherList));
    assert_eq!(flow.presenter().key_window(), Some(WindowLevel::Normal));

    assert!(matches!(
        welcome.emit(WelcomeStep::None),
        Err(FlowError::CoordinatorGone { .. })
    ));
}

#[test]
fn test_none_steps_route_nothing() {
    let mut flow = launch();
    flow.stepper().emit(RootStep::Welcome).unwrap();
    flow.process().unwrap();

    let revision = flow.presenter().revision();
    let children = flow.root().child_ids();

    flow.stepper().emit(RootStep::None).unwrap();
    flow.root()
        .flow()
        .welcome_stepper()
        .unwrap()
        .emit(WelcomeStep::None)
        .unwrap();
    flow.root()
        .flow()
        .main_stepper()
        .unwrap()
        .emit(MainStep::None)
        .unwrap();

    assert_eq!(flow.process().unwrap(), 3);
    assert_eq!(flow.presenter().revision(), revision);
    assert_eq!(flow.root().child_ids(), children);
}

#[test]
fn test_repeated_welcome_does_not_stack() {
    let mut flow = launch();
    flow.stepper().emit(RootStep::Welcome).unwrap();
    flow.stepper().emit(RootStep::Welcome).unwrap();
    flow.process().unwrap();

    assert_eq!(flow.root().children().len(), 2);
}

#[test]
fn test_process_when_idle_routes_nothing() {
    let mut flow = launch();
    assert_eq!(flow.process().unwrap(), 0);
    assert!(!flow.is_finished());
}
