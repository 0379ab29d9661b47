//! # Fairdraw Runtime
//!
//! Runtime for the Fairdraw admission ledger.
//!
//! The [`Ledger`] owns the ledger state behind a single write lock, runs the
//! reducer for each command, publishes committed events and executes refund
//! payouts once the lock is released.
//!
//! ## Core Components
//!
//! - **Ledger**: serializes commands and executes their effects
//! - **Audit journal**: append-only record of every committed event
//! - **Metrics**: Prometheus counters and histograms for commands and payouts
//! - **Config**: environment-driven runtime configuration
//!
//! ## Example
//!
//! ```ignore
//! use fairdraw_runtime::Ledger;
//!
//! let ledger = Ledger::new(LedgerState::new(controller.clone())?, environment);
//!
//! ledger
//!     .send(&controller, LedgerCommand::Configure { event_id, stake, ticket_supply: 2 })
//!     .await?;
//!
//! let summary = ledger.summary(event_id).await?;
//! ```

/// Environment-driven configuration
pub mod config;

/// Audit journal of committed events
pub mod journal;

/// Prometheus metrics for observability
pub mod metrics;

pub use config::{ConfigError, LedgerConfig};
pub use journal::{AuditJournal, JournalEntry};
pub use store::Ledger;

/// The ledger store
pub mod store {
    use crate::config::{DEFAULT_EVENT_CAPACITY, LedgerConfig};
    use crate::journal::AuditJournal;
    use crate::metrics::{
        COMMAND_DURATION, COMMANDS_REJECTED, COMMANDS_TOTAL, EVENTS_PUBLISHED, PAYOUTS_FAILED,
        PAYOUTS_TOTAL,
    };
    use fairdraw_core::{
        Amount, Effect, EscrowTotals, EventId, Identity, LedgerCommand, LedgerEnvironment,
        LedgerError, LedgerEvent, LedgerReducer, LedgerResult, LedgerState, Participation,
        Payout, Receipt, Reducer, SaleSummary, TokenDetails, TokenId,
    };
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::sync::{RwLock, broadcast};

    /// The Ledger - runtime coordinator for the ledger reducer
    ///
    /// The Ledger manages:
    /// 1. State (behind one `RwLock`; every command runs under the write lock)
    /// 2. Reducer (validation and mutation)
    /// 3. Environment (clock and payout rail)
    /// 4. Effect execution (event publication, then payouts outside the lock)
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ledger = Ledger::new(state, environment);
    /// let mut events = ledger.subscribe();
    ///
    /// ledger.send(&alice, LedgerCommand::Enter { event_id, value }).await?;
    /// assert!(matches!(events.recv().await?, LedgerEvent::Entered { .. }));
    /// ```
    pub struct Ledger {
        state: Arc<RwLock<LedgerState>>,
        shared: Arc<Shared>,
    }

    /// Everything a payout needs to settle after the caller has gone away.
    struct Shared {
        reducer: LedgerReducer,
        environment: LedgerEnvironment,
        journal: AuditJournal,
        /// Committed events, in commit order.
        events: broadcast::Sender<LedgerEvent>,
    }

    impl Ledger {
        /// Create a ledger with the default event channel capacity
        #[must_use]
        pub fn new(state: LedgerState, environment: LedgerEnvironment) -> Self {
            Self::with_capacity(state, environment, DEFAULT_EVENT_CAPACITY)
        }

        /// Create a ledger whose event channel buffers `capacity` events
        ///
        /// Slow subscribers that fall more than `capacity` events behind see
        /// `RecvError::Lagged`; the audit journal keeps the full history.
        #[must_use]
        pub fn with_capacity(
            state: LedgerState,
            environment: LedgerEnvironment,
            capacity: usize,
        ) -> Self {
            let (events, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(state)),
                shared: Arc::new(Shared {
                    reducer: LedgerReducer::new(),
                    environment,
                    journal: AuditJournal::new(),
                    events,
                }),
            }
        }

        /// Create an empty ledger from runtime configuration
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::InvalidArgument`] if the configured
        /// controller is the null identity.
        pub fn from_config(
            config: &LedgerConfig,
            environment: LedgerEnvironment,
        ) -> LedgerResult<Self> {
            let state = LedgerState::new(config.controller.clone())?;
            Ok(Self::with_capacity(state, environment, config.event_capacity))
        }

        /// Submit a command on behalf of `caller`
        ///
        /// The command is validated and applied under the write lock, so it
        /// either commits completely or not at all. Committed events are
        /// journaled and broadcast before the lock is released. Payouts run
        /// afterwards; a failed payout re-acquires the lock and reinstates
        /// the balance.
        ///
        /// # Errors
        ///
        /// Returns the [`LedgerError`] the command was rejected with, or
        /// [`LedgerError::TransferFailed`] if a refund could not be paid out.
        #[tracing::instrument(
            skip_all,
            name = "ledger_send",
            fields(caller = %caller, command = command.name())
        )]
        pub async fn send(&self, caller: &Identity, command: LedgerCommand) -> LedgerResult<Receipt> {
            let name = command.name();
            metrics::counter!(COMMANDS_TOTAL, "command" => name).increment(1);

            let reduction = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let start = Instant::now();
                let result =
                    self.shared
                        .reducer
                        .reduce(&mut *state, caller, command, &self.shared.environment);
                metrics::histogram!(COMMAND_DURATION, "command" => name)
                    .record(start.elapsed().as_secs_f64());

                let reduction = match result {
                    Ok(reduction) => reduction,
                    Err(error) => {
                        tracing::warn!(kind = error.kind(), %error, "Command rejected");
                        metrics::counter!(COMMANDS_REJECTED, "command" => name, "kind" => error.kind())
                            .increment(1);
                        return Err(error);
                    },
                };

                for event in reduction.events() {
                    self.shared.publish(event, caller, name);
                }
                reduction
            };

            tracing::info!(
                events = reduction.events().count(),
                receipt = ?reduction.output,
                "Command committed"
            );

            for effect in reduction.effects {
                match effect {
                    Effect::Payout(payout) => self.pay_out(caller, name, payout).await?,
                    Effect::Publish(_) | Effect::None => {},
                }
            }

            Ok(reduction.output)
        }

        /// Subscribe to committed events
        ///
        /// Only events committed after the call are received.
        #[must_use]
        pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
            self.shared.events.subscribe()
        }

        /// The audit journal
        #[must_use]
        pub fn journal(&self) -> &AuditJournal {
            &self.shared.journal
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let issued = ledger.state(|s| s.registry().total_issued()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&LedgerState) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// The controller identity
        pub async fn controller(&self) -> Identity {
            self.state(|s| s.controller().clone()).await
        }

        /// Admission check: `holder` owns an `Active` token of `event_id`
        pub async fn verify(&self, token_id: TokenId, event_id: EventId, holder: &Identity) -> bool {
            self.state(|s| s.verify(token_id, event_id, holder)).await
        }

        /// Token record with its current holder
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::NotFound`] for unknown tokens.
        pub async fn token(&self, token_id: TokenId) -> LedgerResult<TokenDetails> {
            self.state(|s| s.token(token_id)).await
        }

        /// Current holder of a token
        pub async fn owner_of(&self, token_id: TokenId) -> Option<Identity> {
            self.state(|s| s.registry().owner_of(token_id).cloned()).await
        }

        /// Tokens held by `owner`, ascending
        pub async fn tokens_of(&self, owner: &Identity) -> Vec<TokenId> {
            self.state(|s| s.registry().tokens_of(owner)).await
        }

        /// Number of tokens ever issued
        pub async fn total_issued(&self) -> u64 {
            self.state(|s| s.registry().total_issued()).await
        }

        /// Sale counters
        ///
        /// # Errors
        ///
        /// Returns [`LedgerError::NotFound`] for sales that were never configured.
        pub async fn summary(&self, event_id: EventId) -> LedgerResult<SaleSummary> {
            self.state(|s| s.summary(event_id)).await
        }

        /// Participant flags in a sale
        pub async fn participation(&self, event_id: EventId, participant: &Identity) -> Participation {
            self.state(|s| s.participation(event_id, participant)).await
        }

        /// Whether `participant` entered the sale
        pub async fn has_entered(&self, event_id: EventId, participant: &Identity) -> bool {
            self.participation(event_id, participant).await.entered
        }

        /// Whether `participant` won the draw
        pub async fn is_winner(&self, event_id: EventId, participant: &Identity) -> bool {
            self.participation(event_id, participant).await.winner
        }

        /// Whether `participant` claimed their token
        pub async fn has_claimed(&self, event_id: EventId, participant: &Identity) -> bool {
            self.participation(event_id, participant).await.claimed
        }

        /// Entrants in entry order
        pub async fn entrants(&self, event_id: EventId) -> Vec<Identity> {
            self.state(|s| s.sales().entrants(event_id).to_vec()).await
        }

        /// Winners in selection order
        pub async fn winners(&self, event_id: EventId) -> Vec<Identity> {
            self.state(|s| s.sales().winners(event_id).to_vec()).await
        }

        /// Refund balance of a participant
        pub async fn balance_of(&self, event_id: EventId, participant: &Identity) -> Amount {
            self.state(|s| s.balance_of(event_id, participant)).await
        }

        /// Value accounting of a sale
        pub async fn totals(&self, event_id: EventId) -> EscrowTotals {
            self.state(|s| s.totals(event_id)).await
        }
    }

    impl Ledger {
        /// Moves a refund out of the system, compensating on failure.
        ///
        /// Runs without the state lock: the balance is already zero, so a
        /// rail that calls back into `withdraw` is rejected. If this future is
        /// dropped before the rail answers, the refund is reinstated.
        async fn pay_out(
            &self,
            caller: &Identity,
            command: &'static str,
            payout: Payout,
        ) -> LedgerResult<()> {
            metrics::counter!(PAYOUTS_TOTAL).increment(1);
            let mut pending = PendingPayout {
                state: Arc::clone(&self.state),
                shared: Arc::clone(&self.shared),
                caller: caller.clone(),
                command,
                payout: Some(payout.clone()),
            };

            match self.shared.environment.payouts.send_value(payout.clone()).await {
                Ok(()) => {
                    pending.settle();
                    tracing::info!(
                        recipient = %payout.recipient,
                        amount = %payout.amount,
                        "Refund paid out"
                    );
                    Ok(())
                },
                Err(error) => {
                    metrics::counter!(PAYOUTS_FAILED).increment(1);
                    tracing::error!(
                        %error,
                        recipient = %payout.recipient,
                        amount = %payout.amount,
                        "Refund payout failed, reinstating balance"
                    );

                    let mut state = self.state.write().await;
                    pending.settle();
                    self.shared.reinstate(&mut state, caller, command, &payout);
                    drop(state);

                    let error = LedgerError::TransferFailed {
                        recipient: payout.recipient,
                        amount: payout.amount,
                        reason: error.to_string(),
                    };
                    metrics::counter!(COMMANDS_REJECTED, "command" => command, "kind" => error.kind())
                        .increment(1);
                    Err(error)
                },
            }
        }
    }

    impl Shared {
        /// Journal and broadcast one committed event. Called with the write lock held.
        fn publish(&self, event: &LedgerEvent, caller: &Identity, command: &'static str) {
            let recorded_at = self.environment.clock.now();
            if let Err(error) = self.journal.append(event, caller, command, recorded_at) {
                tracing::error!(%error, event_type = event.event_type(), "Failed to journal event");
            }

            metrics::counter!(EVENTS_PUBLISHED, "event_type" => event.event_type()).increment(1);
            // No subscribers is not an error
            let _ = self.events.send(event.clone());
        }

        /// Give an undelivered refund back to its participant. Called with the write lock held.
        fn reinstate(
            &self,
            state: &mut LedgerState,
            caller: &Identity,
            command: &'static str,
            payout: &Payout,
        ) {
            let effect = self.reducer.compensate(state, payout);
            if let Some(event) = effect.as_event() {
                self.publish(event, caller, command);
            }
        }
    }

    /// A refund that left the escrow but has not been confirmed by the rail.
    ///
    /// Dropping it unsettled (the caller's future was cancelled mid-payout)
    /// reinstates the balance.
    struct PendingPayout {
        state: Arc<RwLock<LedgerState>>,
        shared: Arc<Shared>,
        caller: Identity,
        command: &'static str,
        payout: Option<Payout>,
    }

    impl PendingPayout {
        fn settle(&mut self) {
            self.payout = None;
        }
    }

    impl Drop for PendingPayout {
        fn drop(&mut self) {
            let Some(payout) = self.payout.take() else {
                return;
            };

            metrics::counter!(PAYOUTS_FAILED).increment(1);
            tracing::warn!(
                recipient = %payout.recipient,
                amount = %payout.amount,
                "Refund payout abandoned, reinstating balance"
            );

            if let Ok(mut state) = self.state.try_write() {
                self.shared
                    .reinstate(&mut state, &self.caller, self.command, &payout);
                return;
            }

            // Lock is busy; finish once it frees up.
            let state = Arc::clone(&self.state);
            let shared = Arc::clone(&self.shared);
            let caller = self.caller.clone();
            let command = self.command;
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        let mut state = state.write().await;
                        shared.reinstate(&mut state, &caller, command, &payout);
                    });
                },
                Err(_) => tracing::error!(
                    recipient = %payout.recipient,
                    amount = %payout.amount,
                    "No runtime left to reinstate abandoned refund"
                ),
            }
        }
    }

    impl std::fmt::Debug for Ledger {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Ledger")
                .field("journal_len", &self.shared.journal.len())
                .field("subscribers", &self.shared.events.receiver_count())
                .finish_non_exhaustive()
        }
    }
}
