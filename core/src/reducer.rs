//! The ledger reducer: validates a command against the state, applies it and
//! describes the effects the runtime must execute.
//!
//! Reducers are pure with respect to I/O: `(State, Caller, Command, Env) →
//! (State, Output, Effects)`. The clock is the only environment dependency a
//! reducer reads; value transfers are returned as [`Effect::Payout`] and run
//! by the runtime once the state change is committed.

use crate::access::AccessGuard;
use crate::command::LedgerCommand;
use crate::effect::{publish_all, Effect, Effects};
use crate::environment::{LedgerEnvironment, Payout};
use crate::error::{LedgerError, LedgerResult};
use crate::escrow::EscrowLedger;
use crate::event::LedgerEvent;
use crate::registry::TokenRegistry;
use crate::sale::SaleManager;
use crate::types::{Amount, EscrowTotals, EventId, Identity, Participation, SaleSummary, TokenDetails, TokenId};
use serde::{Deserialize, Serialize};

/// The Reducer trait - core abstraction for ledger logic
///
/// # Type Parameters
///
/// - `State`: The state this reducer operates on
/// - `Command`: The command type this reducer processes
/// - `Environment`: The injected dependencies this reducer needs
/// - `Output`: What a successful command returns to its caller
/// - `Error`: Why a command was rejected
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The command type this reducer processes
    type Command;

    /// The environment type with injected dependencies
    type Environment;

    /// Returned to the caller on success
    type Output;

    /// Returned to the caller on rejection
    type Error;

    /// Reduce a command into state changes and effects
    ///
    /// A rejected command must leave `state` untouched.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` when the command is rejected.
    fn reduce(
        &self,
        state: &mut Self::State,
        caller: &Identity,
        command: Self::Command,
        env: &Self::Environment,
    ) -> Result<Reduction<Self::Output>, Self::Error>;
}

/// Result of an accepted command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reduction<O> {
    /// Returned to the caller
    pub output: O,
    /// Executed by the runtime, in order
    pub effects: Effects,
}

impl<O> Reduction<O> {
    /// Creates a reduction
    #[must_use]
    pub const fn new(output: O, effects: Effects) -> Self {
        Self { output, effects }
    }

    /// Iterates over the events this reduction publishes
    pub fn events(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.effects.iter().filter_map(Effect::as_event)
    }
}

/// What a successful command hands back
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receipt {
    /// Nothing to report
    None,
    /// A token was issued
    Token(TokenId),
    /// A refund was released
    Refund(Amount),
}

/// The whole ledger: access guard plus the three components it protects
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    guard: AccessGuard,
    registry: TokenRegistry,
    escrow: EscrowLedger,
    sales: SaleManager,
}

impl LedgerState {
    /// Creates an empty ledger controlled by `controller`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `controller` is the null identity.
    pub fn new(controller: Identity) -> LedgerResult<Self> {
        Ok(Self {
            guard: AccessGuard::new(controller)?,
            registry: TokenRegistry::new(),
            escrow: EscrowLedger::new(),
            sales: SaleManager::new(),
        })
    }

    /// The controller identity
    #[must_use]
    pub const fn controller(&self) -> &Identity {
        self.guard.controller()
    }

    /// Token registry
    #[must_use]
    pub const fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Escrow ledger
    #[must_use]
    pub const fn escrow(&self) -> &EscrowLedger {
        &self.escrow
    }

    /// Sale manager
    #[must_use]
    pub const fn sales(&self) -> &SaleManager {
        &self.sales
    }

    /// Admission check for `holder`
    #[must_use]
    pub fn verify(&self, token_id: TokenId, event_id: EventId, holder: &Identity) -> bool {
        self.registry.verify(token_id, event_id, holder)
    }

    /// Token record with its holder
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for unknown tokens.
    pub fn token(&self, token_id: TokenId) -> LedgerResult<TokenDetails> {
        self.registry.get(token_id)
    }

    /// Sale counters
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for sales that were never configured.
    pub fn summary(&self, event_id: EventId) -> LedgerResult<SaleSummary> {
        self.sales.summary(event_id)
    }

    /// Participant flags in a sale
    #[must_use]
    pub fn participation(&self, event_id: EventId, participant: &Identity) -> Participation {
        self.sales.participation(event_id, participant)
    }

    /// Refund balance of a participant
    #[must_use]
    pub fn balance_of(&self, event_id: EventId, participant: &Identity) -> Amount {
        self.escrow.balance_of(event_id, participant)
    }

    /// Value accounting of a sale
    #[must_use]
    pub fn totals(&self, event_id: EventId) -> EscrowTotals {
        self.escrow.totals(event_id)
    }
}

/// Reducer for [`LedgerCommand`]
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerReducer;

impl LedgerReducer {
    /// Creates the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Undoes the bookkeeping of a payout that never reached its recipient.
    ///
    /// Returns the effect announcing the restored balance.
    pub fn compensate(&self, state: &mut LedgerState, payout: &Payout) -> Effect {
        state.escrow.reinstate(payout);
        Effect::Publish(LedgerEvent::RefundReinstated {
            event_id: payout.event_id,
            participant: payout.recipient.clone(),
            amount: payout.amount,
        })
    }
}

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Command = LedgerCommand;
    type Environment = LedgerEnvironment;
    type Output = Receipt;
    type Error = LedgerError;

    fn reduce(
        &self,
        state: &mut LedgerState,
        caller: &Identity,
        command: LedgerCommand,
        env: &LedgerEnvironment,
    ) -> LedgerResult<Reduction<Receipt>> {
        if command.is_privileged() {
            state.guard.require_controller(caller)?;
        }

        let mut emitted = Vec::new();
        let output = match command {
            LedgerCommand::Issue { to, event_id } => {
                let token_id = state
                    .registry
                    .issue(&to, event_id, env.clock.now(), &mut emitted)?;
                Receipt::Token(token_id)
            },
            LedgerCommand::CheckIn { token_id } => {
                state.registry.check_in(token_id, &mut emitted)?;
                Receipt::None
            },
            LedgerCommand::Configure {
                event_id,
                stake,
                ticket_supply,
            } => {
                state
                    .sales
                    .configure(event_id, stake, ticket_supply, &mut emitted)?;
                Receipt::None
            },
            LedgerCommand::RunLottery {
                event_id,
                winners,
                seed,
            } => {
                state
                    .sales
                    .run_lottery(&mut state.escrow, event_id, winners, seed, &mut emitted)?;
                Receipt::None
            },
            LedgerCommand::Enter { event_id, value } => {
                state
                    .sales
                    .enter(&mut state.escrow, event_id, value, caller, &mut emitted)?;
                Receipt::None
            },
            LedgerCommand::Claim { event_id } => {
                let token_id = state.sales.claim(
                    &mut state.registry,
                    event_id,
                    caller,
                    env.clock.now(),
                    &mut emitted,
                )?;
                Receipt::Token(token_id)
            },
            LedgerCommand::Withdraw { event_id } => {
                let payout = state.escrow.withdraw(event_id, caller)?;
                let amount = payout.amount;
                let mut effects = publish_all([LedgerEvent::RefundWithdrawn {
                    event_id,
                    participant: caller.clone(),
                    amount,
                }]);
                effects.push(Effect::Payout(payout));
                return Ok(Reduction::new(Receipt::Refund(amount), effects));
            },
            LedgerCommand::Transfer { token_id, to } => {
                state
                    .registry
                    .transfer(caller, token_id, caller, &to, &mut emitted)?;
                Receipt::None
            },
        };

        Ok(Reduction::new(output, publish_all(emitted)))
    }
}
