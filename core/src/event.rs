//! Domain events emitted by committed ledger commands.
//!
//! Events are facts about mutations that already happened. The runtime
//! publishes them to observers after the command commits and appends them to
//! the audit journal.
//!
//! Events are serialized using `bincode` for compact audit records.
//!
//! # Example
//!
//! ```
//! use fairdraw_core::event::{Event, LedgerEvent};
//! use fairdraw_core::types::{EventId, Identity, TokenId};
//!
//! let event = LedgerEvent::TokenTransferred {
//!     token_id: TokenId::new(0),
//!     event_id: EventId::new(1),
//!     from: Identity::new("alice"),
//!     to: Identity::new("bob"),
//! };
//!
//! assert_eq!(Event::event_type(&event), "TokenTransferred.v1");
//! let bytes = event.to_bytes().expect("serialization should succeed");
//! assert_eq!(LedgerEvent::from_bytes(&bytes).expect("decodes"), event);
//! ```

use crate::types::{Amount, EventId, Identity, Seed, TokenId};
use chrono::{DateTime, Utc};
use fairdraw_macros::DomainEvent;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An immutable fact that can be journaled and replayed by observers.
///
/// `event_type()` returns a stable identifier that includes a schema version,
/// e.g. `"LotteryDrawn.v1"`.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to a different schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// Everything the ledger announces to external observers
#[derive(DomainEvent, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A sale was opened for entries
    SaleConfigured {
        /// Sale identifier
        event_id: EventId,
        /// Stake per entry
        stake: Amount,
        /// Maximum tokens issuable
        ticket_supply: u32,
    },

    /// A participant committed the stake
    Entered {
        /// Sale identifier
        event_id: EventId,
        /// New entrant
        participant: Identity,
        /// Value locked in escrow
        stake: Amount,
    },

    /// The draw selected its winners and credited refunds
    LotteryDrawn {
        /// Sale identifier
        event_id: EventId,
        /// Public seed the draw was derived from
        seed: Seed,
        /// Winners in selection order
        winners: Vec<Identity>,
        /// Number of non-winners credited with a refund
        refunds_credited: u32,
    },

    /// A winner claimed their token
    TicketClaimed {
        /// Sale identifier
        event_id: EventId,
        /// Winner
        participant: Identity,
        /// Issued token
        token_id: TokenId,
    },

    /// A token was created
    TokenIssued {
        /// New token
        token_id: TokenId,
        /// Sale the token belongs to
        event_id: EventId,
        /// First holder
        owner: Identity,
        /// Issuance time
        issued_at: DateTime<Utc>,
    },

    /// A token was used for entry
    TokenCheckedIn {
        /// Token
        token_id: TokenId,
        /// Sale the token belongs to
        event_id: EventId,
    },

    /// A token changed hands
    TokenTransferred {
        /// Token
        token_id: TokenId,
        /// Sale the token belongs to
        event_id: EventId,
        /// Previous holder
        from: Identity,
        /// New holder
        to: Identity,
    },

    /// A refund left the system
    RefundWithdrawn {
        /// Sale identifier
        event_id: EventId,
        /// Refunded participant
        participant: Identity,
        /// Amount released
        amount: Amount,
    },

    /// A failed payout was compensated by restoring the balance
    RefundReinstated {
        /// Sale identifier
        event_id: EventId,
        /// Participant whose balance was restored
        participant: Identity,
        /// Restored amount
        amount: Amount,
    },
}

impl LedgerEvent {
    /// The sale this event concerns
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::SaleConfigured { event_id, .. }
            | Self::Entered { event_id, .. }
            | Self::LotteryDrawn { event_id, .. }
            | Self::TicketClaimed { event_id, .. }
            | Self::TokenIssued { event_id, .. }
            | Self::TokenCheckedIn { event_id, .. }
            | Self::TokenTransferred { event_id, .. }
            | Self::RefundWithdrawn { event_id, .. }
            | Self::RefundReinstated { event_id, .. } => *event_id,
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        Self::event_type(self)
    }
}

/// A serialized event ready for the audit journal.
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "LotteryDrawn.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata (caller identity, command name).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Decode the payload back into a typed event.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not decode.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
