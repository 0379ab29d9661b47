//! Escrow ledger: stakes held per sale and refunds owed to non-winners.
//!
//! Refund balances are partitioned per `(event, participant)` and are only
//! credited by the draw. A withdrawal zeroes the balance before any value
//! leaves the system.

use crate::environment::Payout;
use crate::error::{LedgerError, LedgerResult};
use crate::types::{Amount, EscrowTotals, EventId, Identity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owns refund balances and per-sale value accounting
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EscrowLedger {
    refunds: HashMap<EventId, HashMap<Identity, Amount>>,
    totals: HashMap<EventId, EscrowTotals>,
}

impl EscrowLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks an entrant's stake in the system
    pub(crate) fn hold(&mut self, event_id: EventId, amount: Amount) {
        let totals = self.totals.entry(event_id).or_default();
        totals.held = totals.held.saturating_add(amount);
    }

    /// Adds to a participant's refund balance
    pub(crate) fn credit(&mut self, event_id: EventId, participant: &Identity, amount: Amount) {
        let balance = self
            .refunds
            .entry(event_id)
            .or_default()
            .entry(participant.clone())
            .or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Records winner stakes kept as ticket payment
    pub(crate) fn forfeit(&mut self, event_id: EventId, amount: Amount) {
        let totals = self.totals.entry(event_id).or_default();
        totals.forfeited = totals.forfeited.saturating_add(amount);
    }

    /// Zeroes the participant's balance and returns the payout owed.
    ///
    /// The balance is zero once this returns; the caller moves the value
    /// afterwards and calls [`EscrowLedger::reinstate`] if that fails.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NothingToWithdraw`] if the balance is zero.
    pub fn withdraw(&mut self, event_id: EventId, participant: &Identity) -> LedgerResult<Payout> {
        let amount = self.balance_of(event_id, participant);
        if amount.is_zero() {
            return Err(LedgerError::NothingToWithdraw {
                event_id,
                participant: participant.clone(),
            });
        }

        if let Some(balance) = self
            .refunds
            .get_mut(&event_id)
            .and_then(|balances| balances.get_mut(participant))
        {
            *balance = Amount::ZERO;
        }
        let totals = self.totals.entry(event_id).or_default();
        totals.held = totals.held.saturating_sub(amount);
        totals.paid_out = totals.paid_out.saturating_add(amount);

        Ok(Payout {
            event_id,
            recipient: participant.clone(),
            amount,
        })
    }

    /// Restores a balance after its payout failed to leave the system
    pub fn reinstate(&mut self, payout: &Payout) {
        self.credit(payout.event_id, &payout.recipient, payout.amount);
        let totals = self.totals.entry(payout.event_id).or_default();
        totals.held = totals.held.saturating_add(payout.amount);
        totals.paid_out = totals.paid_out.saturating_sub(payout.amount);
    }

    /// Withdrawable balance of a participant
    #[must_use]
    pub fn balance_of(&self, event_id: EventId, participant: &Identity) -> Amount {
        self.refunds
            .get(&event_id)
            .and_then(|balances| balances.get(participant))
            .copied()
            .unwrap_or_default()
    }

    /// Sum of all outstanding refunds of a sale
    #[must_use]
    pub fn outstanding(&self, event_id: EventId) -> Amount {
        self.refunds.get(&event_id).map_or(Amount::ZERO, |balances| {
            balances
                .values()
                .fold(Amount::ZERO, |acc, amount| acc.saturating_add(*amount))
        })
    }

    /// Value accounting of a sale
    #[must_use]
    pub fn totals(&self, event_id: EventId) -> EscrowTotals {
        self.totals.get(&event_id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn carol() -> Identity {
        Identity::new("carol")
    }

    #[test]
    fn withdraw_zeroes_then_reports_payout() {
        let mut escrow = EscrowLedger::new();
        let event_id = EventId::new(1);
        escrow.hold(event_id, Amount::new(10));
        escrow.credit(event_id, &carol(), Amount::new(10));

        let payout = escrow.withdraw(event_id, &carol()).unwrap();
        assert_eq!(payout.amount, Amount::new(10));
        assert_eq!(escrow.balance_of(event_id, &carol()), Amount::ZERO);
        assert_eq!(escrow.totals(event_id).paid_out, Amount::new(10));
        assert_eq!(escrow.totals(event_id).held, Amount::ZERO);

        assert!(matches!(
            escrow.withdraw(event_id, &carol()),
            Err(LedgerError::NothingToWithdraw { .. })
        ));
    }

    #[test]
    fn reinstate_restores_balance_and_totals() {
        let mut escrow = EscrowLedger::new();
        let event_id = EventId::new(1);
        escrow.hold(event_id, Amount::new(10));
        escrow.credit(event_id, &carol(), Amount::new(10));
        let before = escrow.totals(event_id);

        let payout = escrow.withdraw(event_id, &carol()).unwrap();
        escrow.reinstate(&payout);

        assert_eq!(escrow.balance_of(event_id, &carol()), Amount::new(10));
        assert_eq!(escrow.totals(event_id), before);
    }

    #[test]
    fn balances_are_partitioned_per_sale() {
        let mut escrow = EscrowLedger::new();
        escrow.credit(EventId::new(1), &carol(), Amount::new(5));
        escrow.credit(EventId::new(2), &carol(), Amount::new(7));

        assert_eq!(escrow.balance_of(EventId::new(1), &carol()), Amount::new(5));
        assert_eq!(escrow.outstanding(EventId::new(2)), Amount::new(7));
    }
}
