//! Navigation flows for NearbyWeather
//!
//! Each flow owns a closed set of steps. Screens hold a typed [`Stepper`] for
//! the coordinator they talk to, and a [`FlowCoordinator`] drives the tree of
//! coordinators until every emitted step has been routed.

pub mod coordinator;
pub mod error;
pub mod flow_coordinator;
pub mod flows;
pub mod presenter;
pub mod step;

pub use coordinator::{Coordinated, Coordinator, CoordinatorId, Flow, FlowContext, Lifecycle, NextCoordinator, Pumped};
pub use error::FlowError;
pub use flow_coordinator::FlowCoordinator;
pub use flows::{MainFlow, MainStep, RootFlow, RootStep, WelcomeFlow, WelcomeStep};
pub use presenter::{Presenter, Screen, WindowLevel, WindowManager};
pub use step::Stepper;
