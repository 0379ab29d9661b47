//! Sale manager: the per-event lifecycle `Unconfigured → Open → LotteryDone`.
//!
//! The manager owns every sale record. It reaches the token registry and the
//! escrow ledger only through their operations. Each operation validates all
//! of its preconditions before it mutates anything, so a rejected operation
//! leaves no trace.

use crate::draw;
use crate::error::{LedgerError, LedgerResult};
use crate::escrow::EscrowLedger;
use crate::event::LedgerEvent;
use crate::registry::TokenRegistry;
use crate::types::{Amount, EventId, Identity, Participation, Sale, SaleSummary, Seed, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owns sale records keyed by event
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SaleManager {
    sales: HashMap<EventId, Sale>,
}

impl SaleManager {
    /// Creates a manager without sales
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a sale for entries.
    ///
    /// A sale with any history (open, or with entrants) cannot be configured
    /// again, so the stake can never change after funds were committed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] if `stake` or `ticket_supply` is zero
    /// - [`LedgerError::InvalidState`] if the sale is open or has entrants
    pub fn configure(
        &mut self,
        event_id: EventId,
        stake: Amount,
        ticket_supply: u32,
        emitted: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        if stake.is_zero() {
            return Err(LedgerError::InvalidArgument(
                "stake must be greater than zero".to_string(),
            ));
        }
        if ticket_supply == 0 {
            return Err(LedgerError::InvalidArgument(
                "ticket supply must be greater than zero".to_string(),
            ));
        }
        if let Some(existing) = self.sales.get(&event_id) {
            if existing.is_open || !existing.entrants.is_empty() {
                return Err(LedgerError::InvalidState(format!(
                    "{event_id} is {} with {} entrants and cannot be reconfigured",
                    existing.phase(),
                    existing.entrants.len()
                )));
            }
        }

        self.sales
            .insert(event_id, Sale::open(event_id, stake, ticket_supply));
        emitted.push(LedgerEvent::SaleConfigured {
            event_id,
            stake,
            ticket_supply,
        });
        Ok(())
    }

    /// Registers `participant` with the attached `contributed` value.
    ///
    /// The value is locked in escrow; it belongs to no one until the draw
    /// either forfeits it or credits it back as a refund.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidState`] if the sale is not open
    /// - [`LedgerError::InvalidArgument`] if the value differs from the stake,
    ///   or the participant is the null identity
    /// - [`LedgerError::AlreadyEntered`] on a repeat entry
    pub fn enter(
        &mut self,
        escrow: &mut EscrowLedger,
        event_id: EventId,
        contributed: Amount,
        participant: &Identity,
        emitted: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<()> {
        let sale = self.open_sale_mut(event_id)?;

        if contributed != sale.stake {
            return Err(LedgerError::InvalidArgument(format!(
                "{event_id} requires a stake of exactly {}, got {contributed}",
                sale.stake
            )));
        }
        if participant.is_null() {
            return Err(LedgerError::InvalidArgument(
                "the null identity cannot enter a sale".to_string(),
            ));
        }
        if sale.participation(participant).entered {
            return Err(LedgerError::AlreadyEntered {
                event_id,
                participant: participant.clone(),
            });
        }

        sale.participants
            .entry(participant.clone())
            .or_default()
            .entered = true;
        sale.entrants.push(participant.clone());
        escrow.hold(event_id, contributed);

        emitted.push(LedgerEvent::Entered {
            event_id,
            participant: participant.clone(),
            stake: contributed,
        });
        Ok(())
    }

    /// Executes the one-shot draw, closes the sale and credits refunds.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidState`] if the sale is not open (including a
    ///   second call)
    /// - [`LedgerError::InvalidArgument`] if `winners_count` is zero or exceeds
    ///   the supply or the number of entrants
    pub fn run_lottery(
        &mut self,
        escrow: &mut EscrowLedger,
        event_id: EventId,
        winners_count: u32,
        seed: Seed,
        emitted: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<Vec<Identity>> {
        let sale = self.open_sale_mut(event_id)?;

        if winners_count == 0 {
            return Err(LedgerError::InvalidArgument(
                "a draw needs at least one winner".to_string(),
            ));
        }
        if winners_count > sale.ticket_supply {
            return Err(LedgerError::InvalidArgument(format!(
                "{winners_count} winners exceed the ticket supply of {}",
                sale.ticket_supply
            )));
        }
        let entrant_count = sale.entrants.len();
        if winners_count as usize > entrant_count {
            return Err(LedgerError::InvalidArgument(format!(
                "{winners_count} winners exceed the {entrant_count} entrants"
            )));
        }

        let selected = draw::select_winners(&seed, entrant_count, winners_count as usize);
        let winners: Vec<Identity> = selected
            .iter()
            .map(|index| sale.entrants[*index].clone())
            .collect();

        for winner in &winners {
            sale.participants.entry(winner.clone()).or_default().winner = true;
        }

        let stake = sale.stake;
        let mut refunds_credited = 0_u32;
        for entrant in &sale.entrants {
            if !sale.participation(entrant).winner {
                escrow.credit(event_id, entrant, stake);
                refunds_credited += 1;
            }
        }
        escrow.forfeit(event_id, stake.saturating_mul(u64::from(winners_count)));

        sale.lottery_executed = true;
        sale.is_open = false;
        sale.winners_count = winners_count;
        sale.winners.clone_from(&winners);
        sale.seed = Some(seed);

        tracing::debug!(
            %event_id,
            %seed,
            winners = winners_count,
            refunds = refunds_credited,
            "lottery drawn"
        );

        emitted.push(LedgerEvent::LotteryDrawn {
            event_id,
            seed,
            winners: winners.clone(),
            refunds_credited,
        });
        Ok(winners)
    }

    /// Issues a winner's token. The winner's stake stays forfeited as payment.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidState`] if the sale is unknown or the draw has
    ///   not run
    /// - [`LedgerError::NotWinner`] if `participant` was not selected
    /// - [`LedgerError::AlreadyClaimed`] on a repeat claim
    /// - [`LedgerError::SupplyExhausted`] if every token was issued
    pub fn claim(
        &mut self,
        registry: &mut TokenRegistry,
        event_id: EventId,
        participant: &Identity,
        issued_at: DateTime<Utc>,
        emitted: &mut Vec<LedgerEvent>,
    ) -> LedgerResult<TokenId> {
        let sale = self
            .sales
            .get_mut(&event_id)
            .ok_or_else(|| LedgerError::InvalidState(format!("{event_id} is not configured")))?;

        if !sale.lottery_executed {
            return Err(LedgerError::InvalidState(format!(
                "the draw for {event_id} has not run"
            )));
        }
        let participation = sale.participation(participant);
        if !participation.winner {
            return Err(LedgerError::NotWinner {
                event_id,
                participant: participant.clone(),
            });
        }
        if participation.claimed {
            return Err(LedgerError::AlreadyClaimed {
                event_id,
                participant: participant.clone(),
            });
        }
        if sale.tickets_issued >= sale.ticket_supply {
            return Err(LedgerError::SupplyExhausted {
                event_id,
                supply: sale.ticket_supply,
            });
        }

        let token_id = registry.issue(participant, event_id, issued_at, emitted)?;
        sale.participants.entry(participant.clone()).or_default().claimed = true;
        sale.tickets_issued += 1;

        emitted.push(LedgerEvent::TicketClaimed {
            event_id,
            participant: participant.clone(),
            token_id,
        });
        Ok(token_id)
    }

    /// Returns a sale's counters
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for a sale that was never configured.
    pub fn summary(&self, event_id: EventId) -> LedgerResult<SaleSummary> {
        self.sales
            .get(&event_id)
            .map(Sale::summary)
            .ok_or_else(|| LedgerError::NotFound(format!("{event_id} was never configured")))
    }

    /// Returns a sale record
    #[must_use]
    pub fn get(&self, event_id: EventId) -> Option<&Sale> {
        self.sales.get(&event_id)
    }

    /// Participant flags for a sale (all false for unknown sales)
    #[must_use]
    pub fn participation(&self, event_id: EventId, participant: &Identity) -> Participation {
        self.sales
            .get(&event_id)
            .map(|sale| sale.participation(participant))
            .unwrap_or_default()
    }

    /// Entrants in entry order
    #[must_use]
    pub fn entrants(&self, event_id: EventId) -> &[Identity] {
        self.sales
            .get(&event_id)
            .map_or(&[], |sale| sale.entrants.as_slice())
    }

    /// Winners in selection order
    #[must_use]
    pub fn winners(&self, event_id: EventId) -> &[Identity] {
        self.sales
            .get(&event_id)
            .map_or(&[], |sale| sale.winners.as_slice())
    }

    /// Iterates over every sale
    pub fn iter(&self) -> impl Iterator<Item = &Sale> {
        self.sales.values()
    }

    fn open_sale_mut(&mut self, event_id: EventId) -> LedgerResult<&mut Sale> {
        let sale = self
            .sales
            .get_mut(&event_id)
            .ok_or_else(|| LedgerError::InvalidState(format!("{event_id} is not open")))?;
        if sale.lottery_executed || !sale.is_open {
            return Err(LedgerError::InvalidState(format!(
                "{event_id} is {} and not accepting this operation",
                sale.phase()
            )));
        }
        Ok(sale)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn id(name: &str) -> Identity {
        Identity::new(name)
    }

    struct Fixture {
        sales: SaleManager,
        escrow: EscrowLedger,
        registry: TokenRegistry,
        events: Vec<LedgerEvent>,
    }

    impl Fixture {
        fn with_entrants(stake: u64, supply: u32, entrants: &[&str]) -> Self {
            let mut fixture = Self {
                sales: SaleManager::new(),
                escrow: EscrowLedger::new(),
                registry: TokenRegistry::new(),
                events: Vec::new(),
            };
            fixture
                .sales
                .configure(EventId::new(1), Amount::new(stake), supply, &mut fixture.events)
                .unwrap();
            for name in entrants {
                fixture
                    .sales
                    .enter(
                        &mut fixture.escrow,
                        EventId::new(1),
                        Amount::new(stake),
                        &id(name),
                        &mut fixture.events,
                    )
                    .unwrap();
            }
            fixture
        }

        fn draw(&mut self, winners: u32, seed: u64) -> LedgerResult<Vec<Identity>> {
            self.sales.run_lottery(
                &mut self.escrow,
                EventId::new(1),
                winners,
                Seed::from_u64(seed),
                &mut self.events,
            )
        }
    }

    #[test]
    fn configure_rejects_zero_values() {
        let mut sales = SaleManager::new();
        let mut events = Vec::new();
        assert!(matches!(
            sales.configure(EventId::new(1), Amount::ZERO, 2, &mut events),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            sales.configure(EventId::new(1), Amount::new(10), 0, &mut events),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn configure_rejects_open_sale() {
        let mut fixture = Fixture::with_entrants(10, 2, &[]);
        assert!(matches!(
            fixture
                .sales
                .configure(EventId::new(1), Amount::new(20), 2, &mut fixture.events),
            Err(LedgerError::InvalidState(_))
        ));
        assert_eq!(fixture.sales.summary(EventId::new(1)).unwrap().stake, Amount::new(10));
    }

    #[test]
    fn enter_validates_amount_and_repeats() {
        let mut fixture = Fixture::with_entrants(10, 2, &["alice"]);

        assert!(matches!(
            fixture.sales.enter(
                &mut fixture.escrow,
                EventId::new(1),
                Amount::new(9),
                &id("bob"),
                &mut fixture.events
            ),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            fixture.sales.enter(
                &mut fixture.escrow,
                EventId::new(1),
                Amount::new(10),
                &id("alice"),
                &mut fixture.events
            ),
            Err(LedgerError::AlreadyEntered { .. })
        ));
        assert_eq!(fixture.sales.entrants(EventId::new(1)), &[id("alice")]);
        assert_eq!(fixture.escrow.totals(EventId::new(1)).held, Amount::new(10));
    }

    #[test]
    fn enter_unconfigured_sale_is_invalid_state() {
        let mut sales = SaleManager::new();
        let mut escrow = EscrowLedger::new();
        let mut events = Vec::new();
        assert!(matches!(
            sales.enter(&mut escrow, EventId::new(5), Amount::new(10), &id("alice"), &mut events),
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[test]
    fn draw_validates_winner_count() {
        let mut fixture = Fixture::with_entrants(10, 2, &["alice", "bob", "carol"]);
        assert!(matches!(fixture.draw(0, 1), Err(LedgerError::InvalidArgument(_))));
        assert!(matches!(fixture.draw(3, 1), Err(LedgerError::InvalidArgument(_))));

        let mut small = Fixture::with_entrants(10, 5, &["alice"]);
        assert!(matches!(small.draw(2, 1), Err(LedgerError::InvalidArgument(_))));
    }

    #[test]
    fn draw_with_seed_0xab_picks_carol_then_bob() {
        let mut fixture = Fixture::with_entrants(10, 2, &["alice", "bob", "carol"]);
        let winners = fixture.draw(2, 0xAB).unwrap();

        assert_eq!(winners, vec![id("carol"), id("bob")]);
        assert_eq!(fixture.escrow.balance_of(EventId::new(1), &id("alice")), Amount::new(10));
        assert_eq!(fixture.escrow.balance_of(EventId::new(1), &id("bob")), Amount::ZERO);

        let totals = fixture.escrow.totals(EventId::new(1));
        assert_eq!(totals.held, Amount::new(30));
        assert_eq!(totals.forfeited, Amount::new(20));
    }

    #[test]
    fn draw_is_one_shot_and_closes_sale() {
        let mut fixture = Fixture::with_entrants(10, 2, &["alice", "bob"]);
        fixture.draw(1, 9).unwrap();

        assert!(matches!(fixture.draw(1, 9), Err(LedgerError::InvalidState(_))));
        let summary = fixture.sales.summary(EventId::new(1)).unwrap();
        assert!(!summary.is_open);
        assert!(summary.lottery_executed);
        assert_eq!(summary.winners_count, 1);

        assert!(matches!(
            fixture.sales.enter(
                &mut fixture.escrow,
                EventId::new(1),
                Amount::new(10),
                &id("dave"),
                &mut fixture.events
            ),
            Err(LedgerError::InvalidState(_))
        ));
        assert!(matches!(
            fixture
                .sales
                .configure(EventId::new(1), Amount::new(10), 2, &mut fixture.events),
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[test]
    fn claim_lifecycle() {
        let mut fixture = Fixture::with_entrants(10, 2, &["alice", "bob", "carol"]);
        let event_id = EventId::new(1);

        assert!(matches!(
            fixture
                .sales
                .claim(&mut fixture.registry, event_id, &id("carol"), at(), &mut fixture.events),
            Err(LedgerError::InvalidState(_))
        ));

        fixture.draw(2, 0xAB).unwrap();

        let first = fixture
            .sales
            .claim(&mut fixture.registry, event_id, &id("carol"), at(), &mut fixture.events)
            .unwrap();
        assert_eq!(first, TokenId::new(0));
        assert!(matches!(
            fixture
                .sales
                .claim(&mut fixture.registry, event_id, &id("carol"), at(), &mut fixture.events),
            Err(LedgerError::AlreadyClaimed { .. })
        ));
        assert!(matches!(
            fixture
                .sales
                .claim(&mut fixture.registry, event_id, &id("alice"), at(), &mut fixture.events),
            Err(LedgerError::NotWinner { .. })
        ));

        let summary = fixture.sales.summary(event_id).unwrap();
        assert_eq!(summary.tickets_issued, 1);
        assert!(fixture.sales.participation(event_id, &id("carol")).claimed);
    }

    #[test]
    fn claim_on_unconfigured_sale_is_invalid_state() {
        let mut sales = SaleManager::new();
        let mut registry = TokenRegistry::new();
        let mut events = Vec::new();

        assert!(matches!(
            sales.claim(&mut registry, EventId::new(404), &id("alice"), at(), &mut events),
            Err(LedgerError::InvalidState(_))
        ));
        assert_eq!(registry.total_issued(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn summary_of_unknown_sale_is_not_found() {
        let sales = SaleManager::new();
        assert!(matches!(
            sales.summary(EventId::new(404)),
            Err(LedgerError::NotFound(_))
        ));
    }
}
