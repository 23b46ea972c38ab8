//! Presentation interface the flows drive.
//!
//! The host platform renders windows and screens; flows only describe which
//! screens sit in which window. [`WindowManager`] keeps that description in
//! memory and is what the headless binary and the tests use.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::FlowError;

/// Window stacking level; higher levels draw above lower ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WindowLevel {
    Normal,
    Alert,
}

impl fmt::Display for WindowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Alert => write!(f, "alert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    WeatherList,
    WeatherMap,
    Settings,
    WeatherDetails { station_id: u64 },
    Welcome,
}

pub trait Presenter {
    /// Create the window at `level` if needed and make it key
    fn open_window(&mut self, level: WindowLevel);

    /// Tear down the window at `level`; the highest remaining window becomes key
    fn close_window(&mut self, level: WindowLevel) -> Result<(), FlowError>;

    /// Replace the whole screen stack of a window
    fn set_screens(&mut self, level: WindowLevel, screens: Vec<Screen>) -> Result<(), FlowError>;

    fn push(&mut self, level: WindowLevel, screen: Screen) -> Result<(), FlowError>;

    /// Pop the top screen; the root screen of a window is never popped
    fn pop(&mut self, level: WindowLevel) -> Result<Option<Screen>, FlowError>;

    fn has_window(&self, level: WindowLevel) -> bool;

    fn key_window(&self) -> Option<WindowLevel>;

    /// Top screen of the highest open window
    fn visible_screen(&self) -> Option<&Screen>;
}

#[derive(Debug, Default)]
pub struct WindowManager {
    windows: BTreeMap<WindowLevel, Vec<Screen>>,
    key: Option<WindowLevel>,
    revision: u64,
}

impl WindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screens of one window, bottom first
    pub fn screens(&self, level: WindowLevel) -> Option<&[Screen]> {
        self.windows.get(&level).map(Vec::as_slice)
    }

    /// Incremented on every change; lets callers detect that nothing moved
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn window_mut(&mut self, level: WindowLevel) -> Result<&mut Vec<Screen>, FlowError> {
        self.windows.get_mut(&level).ok_or(FlowError::NoWindow(level))
    }
}

impl Presenter for WindowManager {
    fn open_window(&mut self, level: WindowLevel) {
        self.windows.entry(level).or_default();
        self.key = Some(level);
        self.revision += 1;
        tracing::debug!("Opened {} window", level);
    }

    fn close_window(&mut self, level: WindowLevel) -> Result<(), FlowError> {
        self.windows.remove(&level).ok_or(FlowError::NoWindow(level))?;
        self.key = self.windows.keys().next_back().copied();
        self.revision += 1;
        tracing::debug!("Closed {} window", level);
        Ok(())
    }

    fn set_screens(&mut self, level: WindowLevel, screens: Vec<Screen>) -> Result<(), FlowError> {
        *self.window_mut(level)? = screens;
        self.revision += 1;
        Ok(())
    }

    fn push(&mut self, level: WindowLevel, screen: Screen) -> Result<(), FlowError> {
        self.window_mut(level)?.push(screen);
        self.revision += 1;
        Ok(())
    }

    fn pop(&mut self, level: WindowLevel) -> Result<Option<Screen>, FlowError> {
        let stack = self.window_mut(level)?;
        if stack.len() <= 1 {
            return Ok(None);
        }
        let popped = stack.pop();
        self.revision += 1;
        Ok(popped)
    }

    fn has_window(&self, level: WindowLevel) -> bool {
        self.windows.contains_key(&level)
    }

    fn key_window(&self) -> Option<WindowLevel> {
        self.key
    }

    fn visible_screen(&self) -> Option<&Screen> {
        self.windows.values().next_back().and_then(|stack| stack.last())
    }
}
