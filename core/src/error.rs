//! Ledger error type.
//!
//! Every failure aborts the triggering command with no partial effect and is
//! surfaced to the caller unchanged. There is no retry inside the ledger.

use crate::types::{Amount, EventId, Identity};
use thiserror::Error;

/// Errors returned by ledger commands and lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller lacks the capability for this command
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The referenced token or sale does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bad amount, count or identity was supplied
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The command is not allowed in the current lifecycle phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The participant already entered this sale
    #[error("{participant} has already entered {event_id}")]
    AlreadyEntered {
        /// Sale identifier
        event_id: EventId,
        /// Repeat entrant
        participant: Identity,
    },

    /// The participant was not selected by the draw
    #[error("{participant} is not a winner of {event_id}")]
    NotWinner {
        /// Sale identifier
        event_id: EventId,
        /// Claimant
        participant: Identity,
    },

    /// The winner already claimed their token
    #[error("{participant} has already claimed a token for {event_id}")]
    AlreadyClaimed {
        /// Sale identifier
        event_id: EventId,
        /// Claimant
        participant: Identity,
    },

    /// Every token of the sale has been issued
    #[error("Ticket supply of {event_id} exhausted ({supply} issued)")]
    SupplyExhausted {
        /// Sale identifier
        event_id: EventId,
        /// Configured supply
        supply: u32,
    },

    /// The participant has no refund balance
    #[error("Nothing to withdraw for {participant} in {event_id}")]
    NothingToWithdraw {
        /// Sale identifier
        event_id: EventId,
        /// Withdrawing participant
        participant: Identity,
    },

    /// Outbound value movement failed; the balance was reinstated
    #[error("Transfer of {amount} to {recipient} failed: {reason}")]
    TransferFailed {
        /// Intended recipient
        recipient: Identity,
        /// Amount that was not delivered
        amount: Amount,
        /// Failure reported by the payout rail
        reason: String,
    },
}

impl LedgerError {
    /// Stable label of the error kind, used for metrics and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidState(_) => "invalid_state",
            Self::AlreadyEntered { .. } => "already_entered",
            Self::NotWinner { .. } => "not_winner",
            Self::AlreadyClaimed { .. } => "already_claimed",
            Self::SupplyExhausted { .. } => "supply_exhausted",
            Self::NothingToWithdraw { .. } => "nothing_to_withdraw",
            Self::TransferFailed { .. } => "transfer_failed",
        }
    }
}

/// Result alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
