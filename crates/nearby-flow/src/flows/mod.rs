//! The application's flows: root, main and onboarding.

mod main_flow;
mod root;
mod welcome;

pub use main_flow::{MainFlow, MainStep};
pub use root::{RootFlow, RootStep};
pub use welcome::{WelcomeFlow, WelcomeStep};
