//! Last known device location.
//!
//! The host platform owns the location hardware and permission prompts; it
//! pushes fixes in here and the weather service reads them back.

use crate::types::{Coordinates, LocationError};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Authorization {
    Undetermined,
    Granted,
    Denied,
}

#[derive(Debug)]
pub struct UserLocationService {
    authorization: RwLock<Authorization>,
    last_fix: RwLock<Option<Coordinates>>,
}

impl Default for UserLocationService {
    fn default() -> Self {
        Self::new()
    }
}

impl UserLocationService {
    pub fn new() -> Self {
        Self {
            authorization: RwLock::new(Authorization::Undetermined),
            last_fix: RwLock::new(None),
        }
    }

    /// Record a new fix from the platform; implies location access
    pub fn update(&self, coordinates: Coordinates) {
        *self.authorization.write() = Authorization::Granted;
        *self.last_fix.write() = Some(coordinates);
    }

    /// The user revoked location access; forget the last fix
    pub fn revoke(&self) {
        *self.authorization.write() = Authorization::Denied;
        *self.last_fix.write() = None;
    }

    pub fn current(&self) -> Result<Coordinates, LocationError> {
        if *self.authorization.read() == Authorization::Denied {
            return Err(LocationError::PermissionDenied);
        }
        (*self.last_fix.read()).ok_or(LocationError::ServiceUnavailable)
    }

    pub fn is_available(&self) -> bool {
        self.current().is_ok()
    }
}
