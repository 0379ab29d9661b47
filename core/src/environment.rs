//! Injected dependencies of the ledger.
//!
//! The ledger consumes two collaborators from its execution substrate: a clock
//! for token issuance times and a rail that moves native value out of the
//! system. Both are traits so tests can substitute deterministic versions.

use crate::types::{Amount, EventId, Identity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An outbound movement of value owed by the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Sale the value was escrowed under
    pub event_id: EventId,
    /// Recipient of the value
    pub recipient: Identity,
    /// Amount to move
    pub amount: Amount,
}

/// Failure reported by the payout rail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The recipient refused or could not accept the value
    #[error("Recipient rejected transfer: {0}")]
    Rejected(String),

    /// The rail could not be reached
    #[error("Payout rail unavailable: {0}")]
    Unavailable(String),
}

/// Future returned by [`ValueTransfer::send_value`]
pub type TransferFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>>;

/// The value-transfer primitive of the execution substrate.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the rail can be held as
/// `Arc<dyn ValueTransfer>`. Implementations may call back into the ledger;
/// the ledger applies its own bookkeeping before the rail is invoked.
pub trait ValueTransfer: Send + Sync {
    /// Move `payout.amount` to `payout.recipient`
    fn send_value(&self, payout: Payout) -> TransferFuture<'_>;
}

/// Environment dependencies for the ledger reducer
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Clock for issuance timestamps
    pub clock: Arc<dyn Clock>,
    /// Rail for refunds leaving the system
    pub payouts: Arc<dyn ValueTransfer>,
}

impl LedgerEnvironment {
    /// Creates a new `LedgerEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, payouts: Arc<dyn ValueTransfer>) -> Self {
        Self { clock, payouts }
    }
}

impl std::fmt::Debug for LedgerEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEnvironment").finish_non_exhaustive()
    }
}
