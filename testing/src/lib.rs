//! # Fairdraw Testing
//!
//! Testing utilities and helpers for the Fairdraw admission ledger.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//! - A Given-When-Then builder for the ledger reducer
//! - Identity fixtures and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use fairdraw_testing::{fixtures, test_environment};
//! use fairdraw_runtime::Ledger;
//!
//! #[tokio::test]
//! async fn entrants_are_recorded() {
//!     let ledger = Ledger::new(fixtures::ledger_state(), test_environment());
//!     ledger.send(&fixtures::controller(), fixtures::configure(1, 10, 2)).await.unwrap();
//!     ledger.send(&fixtures::alice(), fixtures::enter(1, 10)).await.unwrap();
//!
//!     assert!(ledger.has_entered(EventId::new(1), &fixtures::alice()).await);
//! }
//! ```

use chrono::{DateTime, Utc};
use fairdraw_core::environment::Clock;


/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use fairdraw_core::{
        LedgerEnvironment, Payout, TransferError, TransferFuture, ValueTransfer,
    };
    use futures::FutureExt;
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use fairdraw_testing::mocks::FixedClock;
    /// use fairdraw_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Payout rail that accepts everything and remembers it
    #[derive(Debug, Default)]
    pub struct RecordingPayouts {
        sent: Mutex<Vec<Payout>>,
    }

    impl RecordingPayouts {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Payouts delivered so far, in order
        #[must_use]
        pub fn payouts(&self) -> Vec<Payout> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl ValueTransfer for RecordingPayouts {
        fn send_value(&self, payout: Payout) -> TransferFuture<'_> {
            async move {
                self.sent
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(payout);
                Ok(())
            }
            .boxed()
        }
    }

    /// Payout rail whose recipient always refuses the value
    #[derive(Debug)]
    pub struct FailingPayouts {
        reason: String,
        attempts: Mutex<Vec<Payout>>,
    }

    impl FailingPayouts {
        /// Create a rail that fails with `reason`
        #[must_use]
        pub fn new(reason: impl Into<String>) -> Self {
            Self {
                reason: reason.into(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        /// Payouts that were attempted
        #[must_use]
        pub fn attempts(&self) -> Vec<Payout> {
            self.attempts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Default for FailingPayouts {
        fn default() -> Self {
            Self::new("recipient refused the transfer")
        }
    }

    impl ValueTransfer for FailingPayouts {
        fn send_value(&self, payout: Payout) -> TransferFuture<'_> {
            async move {
                self.attempts
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(payout);
                Err(TransferError::Rejected(self.reason.clone()))
            }
            .boxed()
        }
    }

    /// Environment with the test clock and the given payout rail
    #[must_use]
    pub fn environment_with(payouts: Arc<dyn ValueTransfer>) -> LedgerEnvironment {
        LedgerEnvironment::new(Arc::new(test_clock()), payouts)
    }

    /// Environment with the test clock and a fresh [`RecordingPayouts`]
    #[must_use]
    pub fn test_environment() -> LedgerEnvironment {
        environment_with(Arc::new(RecordingPayouts::new()))
    }
}

/// Identity and command fixtures
pub mod fixtures {
    use fairdraw_core::{Amount, EventId, Identity, LedgerCommand, LedgerState, Seed, TokenId};

    /// The controller used by fixtures
    #[must_use]
    pub fn controller() -> Identity {
        Identity::new("venue")
    }

    /// A participant
    #[must_use]
    pub fn alice() -> Identity {
        Identity::new("alice")
    }

    /// A participant
    #[must_use]
    pub fn bob() -> Identity {
        Identity::new("bob")
    }

    /// A participant
    #[must_use]
    pub fn carol() -> Identity {
        Identity::new("carol")
    }

    /// `count` distinct participants named `entrant-0`, `entrant-1`, ...
    #[must_use]
    pub fn entrants(count: usize) -> Vec<Identity> {
        (0..count)
            .map(|i| Identity::new(format!("entrant-{i}")))
            .collect()
    }

    /// Empty ledger state controlled by [`controller`]
    ///
    /// # Panics
    ///
    /// Never: the fixture controller is not the null identity.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn ledger_state() -> LedgerState {
        LedgerState::new(controller()).expect("fixture controller is valid")
    }

    /// `Configure` command
    #[must_use]
    pub const fn configure(event_id: u64, stake: u64, ticket_supply: u32) -> LedgerCommand {
        LedgerCommand::Configure {
            event_id: EventId::new(event_id),
            stake: Amount::new(stake),
            ticket_supply,
        }
    }

    /// `Enter` command
    #[must_use]
    pub const fn enter(event_id: u64, value: u64) -> LedgerCommand {
        LedgerCommand::Enter {
            event_id: EventId::new(event_id),
            value: Amount::new(value),
        }
    }

    /// `RunLottery` command
    #[must_use]
    pub fn run_lottery(event_id: u64, winners: u32, seed: u64) -> LedgerCommand {
        LedgerCommand::RunLottery {
            event_id: EventId::new(event_id),
            winners,
            seed: Seed::from_u64(seed),
        }
    }

    /// `Claim` command
    #[must_use]
    pub const fn claim(event_id: u64) -> LedgerCommand {
        LedgerCommand::Claim {
            event_id: EventId::new(event_id),
        }
    }

    /// `Withdraw` command
    #[must_use]
    pub const fn withdraw(event_id: u64) -> LedgerCommand {
        LedgerCommand::Withdraw {
            event_id: EventId::new(event_id),
        }
    }

    /// `Transfer` command
    #[must_use]
    pub const fn transfer(token_id: u64, to: Identity) -> LedgerCommand {
        LedgerCommand::Transfer {
            token_id: TokenId::new(token_id),
            to,
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use fairdraw_core::{Identity, Seed};
    use proptest::prelude::*;

    /// Any 32-byte seed
    pub fn arb_seed() -> impl Strategy<Value = Seed> {
        any::<[u8; 32]>().prop_map(Seed::from_bytes)
    }

    /// Between `min` and `max` distinct entrant identities, in entry order
    pub fn arb_entrants(min: usize, max: usize) -> impl Strategy<Value = Vec<Identity>> {
        proptest::collection::btree_set("[a-z]{3,10}", min..=max)
            .prop_map(|names| names.into_iter().map(Identity::new).collect::<Vec<_>>())
            .prop_shuffle()
    }
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{
    FailingPayouts, FixedClock, RecordingPayouts, environment_with, test_clock, test_environment,
};
pub use reducer_test::{LedgerTest, ReducerTest};
