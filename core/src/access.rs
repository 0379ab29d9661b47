//! Controller capability check.

use crate::error::{LedgerError, LedgerResult};
use crate::types::Identity;
use serde::{Deserialize, Serialize};

/// Gates privileged commands to the single controller recorded at initialization.
///
/// There is no transfer of control: the controller is fixed for the lifetime
/// of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGuard {
    controller: Identity,
}

impl AccessGuard {
    /// Creates a guard for the given controller
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `controller` is the null identity.
    pub fn new(controller: Identity) -> LedgerResult<Self> {
        if controller.is_null() {
            return Err(LedgerError::InvalidArgument(
                "controller cannot be the null identity".to_string(),
            ));
        }
        Ok(Self { controller })
    }

    /// Returns the controller identity
    #[must_use]
    pub const fn controller(&self) -> &Identity {
        &self.controller
    }

    /// Fails unless `caller` is the controller
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] for any other identity.
    pub fn require_controller(&self, caller: &Identity) -> LedgerResult<()> {
        if caller == &self.controller {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "{caller} is not the ledger controller"
            )))
        }
    }
}
