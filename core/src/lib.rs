//! # Fairdraw Core
//!
//! Core ledger for lottery-based admission sales.
//!
//! A controller opens a sale with a fixed stake and ticket supply. Participants
//! enter by committing the stake, a seeded draw selects winners, winners claim
//! transferable admission tokens, and non-winners withdraw their stake.
//!
//! ## Core Concepts
//!
//! - **State**: [`LedgerState`] groups the [`AccessGuard`], [`TokenRegistry`],
//!   [`EscrowLedger`] and [`SaleManager`]
//! - **Command**: [`LedgerCommand`], submitted together with the caller identity
//! - **Reducer**: `(State, Caller, Command, Environment) → (State, Receipt, Effects)`
//! - **Effect**: published events and refund payouts, executed by the runtime
//! - **Environment**: the [`Clock`] and the [`ValueTransfer`] payout rail
//!
//! ## Example
//!
//! ```
//! use fairdraw_core::*;
//! use std::sync::Arc;
//!
//! struct Noop;
//! impl ValueTransfer for Noop {
//!     fn send_value(&self, _payout: Payout) -> TransferFuture<'_> {
//!         Box::pin(async { Ok(()) })
//!     }
//! }
//!
//! let env = LedgerEnvironment::new(Arc::new(SystemClock), Arc::new(Noop));
//! let admin = Identity::new("admin");
//! let mut state = LedgerState::new(admin.clone()).unwrap();
//!
//! let configure = LedgerCommand::Configure {
//!     event_id: EventId::new(1),
//!     stake: Amount::new(10),
//!     ticket_supply: 2,
//! };
//! LedgerReducer::new().reduce(&mut state, &admin, configure, &env).unwrap();
//!
//! assert!(state.summary(EventId::new(1)).unwrap().is_open);
//! ```

pub mod access;
pub mod command;
pub mod draw;
pub mod effect;
pub mod environment;
pub mod error;
pub mod escrow;
pub mod event;
pub mod reducer;
pub mod registry;
pub mod sale;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub use access::AccessGuard;
pub use command::LedgerCommand;
pub use effect::{Effect, Effects};
pub use environment::{
    Clock, LedgerEnvironment, Payout, SystemClock, TransferError, TransferFuture, ValueTransfer,
};
pub use error::{LedgerError, LedgerResult};
pub use escrow::EscrowLedger;
pub use event::{Event, EventError, LedgerEvent, SerializedEvent};
pub use reducer::{LedgerReducer, LedgerState, Receipt, Reducer, Reduction};
pub use registry::TokenRegistry;
pub use sale::SaleManager;
pub use types::{
    Amount, EscrowTotals, EventId, Identity, Participation, Sale, SalePhase, SaleSummary, Seed,
    Token, TokenDetails, TokenId, TokenState,
};
