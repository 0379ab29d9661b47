//! Domain types for the admission ledger.
//!
//! Identifiers, amounts, tokens, sales and the per-participant record that
//! groups a participant's monotone flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An identity that can submit commands, hold tokens and receive refunds.
///
/// The caller identity of every command is supplied by the execution
/// substrate. The empty (or blank) identity is the null identity and can never
/// own a token or enter a sale.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Creates an identity from any string-like value
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The null identity
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// Returns true for the null identity
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the identity as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "<null>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a sale (one admission event)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Creates an `EventId`
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the inner value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Sequential token identifier, assigned at issuance and never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// Creates a `TokenId`
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the inner value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token-{}", self.0)
    }
}

/// Native value in the smallest indivisible unit
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// Creates an amount
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the amount in units
    #[must_use]
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at the numeric bound
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts an amount, saturating at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies by a count, saturating at the numeric bound
    #[must_use]
    pub const fn saturating_mul(self, count: u64) -> Self {
        Self(self.0.saturating_mul(count))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 256-bit public seed for a lottery draw
///
/// The draw is only as unpredictable as the seed. A seed picked after the
/// entrant list is known can steer the outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed([u8; 32]);

impl Seed {
    /// Creates a seed from raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a seed from an integer, laid out as a big-endian 256-bit word
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0_u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Returns the raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Lifecycle state of an admission token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenState {
    /// Valid for admission
    Active,
    /// Used for entry at the venue
    CheckedIn,
    /// Declared for completeness; no operation moves a token here
    Retired,
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::CheckedIn => write!(f, "checked-in"),
            Self::Retired => write!(f, "retired"),
        }
    }
}

/// Stored token record. The owner lives in the registry's ownership map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token identifier
    pub id: TokenId,
    /// Sale the token was issued under
    pub event_id: EventId,
    /// Current lifecycle state
    pub state: TokenState,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
}

/// A token together with its current holder, as returned by lookups
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDetails {
    /// Token identifier
    pub id: TokenId,
    /// Sale the token was issued under
    pub event_id: EventId,
    /// Current lifecycle state
    pub state: TokenState,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// Current holder
    pub owner: Identity,
}

/// Per-participant facts of one sale. Every flag only moves from false to true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// The participant committed the stake
    pub entered: bool,
    /// The participant was selected by the draw
    pub winner: bool,
    /// The participant claimed their token
    pub claimed: bool,
}

/// Lifecycle phase of a sale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalePhase {
    /// Never configured
    Unconfigured,
    /// Accepting entries
    Open,
    /// Draw executed; entries closed, claims and refunds possible
    LotteryDone,
}

impl fmt::Display for SalePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::Open => write!(f, "open"),
            Self::LotteryDone => write!(f, "lottery-done"),
        }
    }
}

/// A configured lottery round for one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Sale identifier
    pub event_id: EventId,
    /// Required contribution to enter, fixed for the sale's lifetime
    pub stake: Amount,
    /// Maximum tokens issuable under this sale
    pub ticket_supply: u32,
    /// Tokens issued by claims so far
    pub tickets_issued: u32,
    /// Accepting entries
    pub is_open: bool,
    /// One-shot draw flag
    pub lottery_executed: bool,
    /// Winners selected by the draw (0 before it runs)
    pub winners_count: u32,
    /// Entrants in entry order
    pub entrants: Vec<Identity>,
    /// Winners in selection order
    pub winners: Vec<Identity>,
    /// Seed the draw was executed with
    pub seed: Option<Seed>,
    /// Per-participant flags
    pub participants: HashMap<Identity, Participation>,
}

impl Sale {
    /// Creates a freshly opened sale
    #[must_use]
    pub fn open(event_id: EventId, stake: Amount, ticket_supply: u32) -> Self {
        Self {
            event_id,
            stake,
            ticket_supply,
            tickets_issued: 0,
            is_open: true,
            lottery_executed: false,
            winners_count: 0,
            entrants: Vec::new(),
            winners: Vec::new(),
            seed: None,
            participants: HashMap::new(),
        }
    }

    /// Returns the lifecycle phase
    #[must_use]
    pub const fn phase(&self) -> SalePhase {
        if self.lottery_executed {
            SalePhase::LotteryDone
        } else if self.is_open {
            SalePhase::Open
        } else {
            SalePhase::Unconfigured
        }
    }

    /// Returns the participant record, or an empty one
    #[must_use]
    pub fn participation(&self, participant: &Identity) -> Participation {
        self.participants
            .get(participant)
            .copied()
            .unwrap_or_default()
    }

    /// Returns the read-only counters
    #[must_use]
    pub fn summary(&self) -> SaleSummary {
        SaleSummary {
            event_id: self.event_id,
            phase: self.phase(),
            stake: self.stake,
            ticket_supply: self.ticket_supply,
            tickets_issued: self.tickets_issued,
            is_open: self.is_open,
            lottery_executed: self.lottery_executed,
            winners_count: self.winners_count,
            entrant_count: self.entrants.len(),
        }
    }
}

/// Read-only view of a sale's counters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSummary {
    /// Sale identifier
    pub event_id: EventId,
    /// Lifecycle phase
    pub phase: SalePhase,
    /// Stake per entry
    pub stake: Amount,
    /// Maximum tokens issuable
    pub ticket_supply: u32,
    /// Tokens issued by claims
    pub tickets_issued: u32,
    /// Accepting entries
    pub is_open: bool,
    /// Draw executed
    pub lottery_executed: bool,
    /// Number of winners
    pub winners_count: u32,
    /// Number of entrants
    pub entrant_count: usize,
}

/// Value accounting for one sale's escrow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTotals {
    /// Stakes currently held by the system
    pub held: Amount,
    /// Winner stakes kept as ticket payment
    pub forfeited: Amount,
    /// Refunds released to non-winners
    pub paid_out: Amount,
}
