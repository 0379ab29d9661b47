//! Commands accepted by the ledger.
//!
//! Every command is submitted together with the caller identity supplied by
//! the execution substrate. Variants marked `#[privileged]` are accepted only
//! from the controller.

use crate::types::{Amount, EventId, Identity, Seed, TokenId};
use fairdraw_macros::Command;
use serde::{Deserialize, Serialize};

/// All state-changing operations of the ledger
#[derive(Command, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    /// Issue a token directly, outside any sale
    #[privileged]
    Issue {
        /// Recipient of the token
        to: Identity,
        /// Event the token admits to
        event_id: EventId,
    },

    /// Mark a token as used for entry
    #[privileged]
    CheckIn {
        /// Token to check in
        token_id: TokenId,
    },

    /// Open a sale with a fixed stake and ticket supply
    #[privileged]
    Configure {
        /// Sale to configure
        event_id: EventId,
        /// Exact value each entrant attaches
        stake: Amount,
        /// Maximum number of tokens the sale can issue
        ticket_supply: u32,
    },

    /// Close the sale and select winners from `seed`
    #[privileged]
    RunLottery {
        /// Sale to draw
        event_id: EventId,
        /// Number of winners to select
        winners: u32,
        /// Public draw seed
        seed: Seed,
    },

    /// Enter a sale, attaching `value` as the stake
    Enter {
        /// Sale to enter
        event_id: EventId,
        /// Value attached to the entry
        value: Amount,
    },

    /// Claim the token won in a draw
    Claim {
        /// Sale that was drawn
        event_id: EventId,
    },

    /// Withdraw the caller's refund balance
    Withdraw {
        /// Sale the refund was credited under
        event_id: EventId,
    },

    /// Transfer a token held by the caller
    Transfer {
        /// Token to move
        token_id: TokenId,
        /// New holder
        to: Identity,
    },
}
