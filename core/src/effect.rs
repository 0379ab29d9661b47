//! Side effect descriptions returned by the reducer.
//!
//! Effects are NOT executed by the reducer. The runtime executes them in order
//! after the state mutation has been committed.

use crate::environment::Payout;
use crate::event::LedgerEvent;
use smallvec::SmallVec;

/// Describes a side effect to be executed by the runtime
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// No-op effect
    None,

    /// Announce a committed fact to observers and the audit journal
    Publish(LedgerEvent),

    /// Move value out of the system through the payout rail
    Payout(Payout),
}

impl Effect {
    /// Returns the published event, if this is a `Publish` effect
    #[must_use]
    pub const fn as_event(&self) -> Option<&LedgerEvent> {
        match self {
            Self::Publish(event) => Some(event),
            Self::None | Self::Payout(_) => None,
        }
    }
}

/// Effects produced by one command
pub type Effects = SmallVec<[Effect; 4]>;

/// Wraps emitted events as `Publish` effects, preserving order
#[must_use]
pub fn publish_all(events: impl IntoIterator<Item = LedgerEvent>) -> Effects {
    events.into_iter().map(Effect::Publish).collect()
}
