//! Integration tests for the Ledger runtime
//!
//! Drives full sale lifecycles through `Ledger::send` and checks committed
//! state, the broadcast channel and the audit journal.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use fairdraw_core::{
    Amount, EventId, Identity, LedgerCommand, LedgerError, LedgerEvent, Receipt, SalePhase,
    TokenId, TokenState,
};
use fairdraw_runtime::{Ledger, LedgerConfig};
use fairdraw_testing::fixtures::{self, alice, bob, carol, controller};
use fairdraw_testing::{RecordingPayouts, environment_with, test_environment};
use std::sync::Arc;

const SALE: EventId = EventId::new(1);

fn ledger() -> Ledger {
    Ledger::new(fixtures::ledger_state(), test_environment())
}

async fn drawn_sale(ledger: &Ledger) {
    ledger
        .send(&controller(), fixtures::configure(1, 10, 2))
        .await
        .unwrap();
    for who in [alice(), bob(), carol()] {
        ledger.send(&who, fixtures::enter(1, 10)).await.unwrap();
    }
    ledger
        .send(&controller(), fixtures::run_lottery(1, 2, 0xAB))
        .await
        .unwrap();
}

#[tokio::test]
async fn full_sale_lifecycle() {
    let payouts = Arc::new(RecordingPayouts::new());
    let ledger = Ledger::new(fixtures::ledger_state(), environment_with(payouts.clone()));

    drawn_sale(&ledger).await;

    assert_eq!(ledger.winners(SALE).await, vec![carol(), bob()]);
    assert!(ledger.is_winner(SALE, &carol()).await);
    assert!(!ledger.is_winner(SALE, &alice()).await);
    assert_eq!(ledger.balance_of(SALE, &alice()).await, Amount::new(10));

    assert_eq!(
        ledger.send(&carol(), fixtures::claim(1)).await,
        Ok(Receipt::Token(TokenId::new(0)))
    );
    assert_eq!(
        ledger.send(&bob(), fixtures::claim(1)).await,
        Ok(Receipt::Token(TokenId::new(1)))
    );
    assert!(matches!(
        ledger.send(&bob(), fixtures::claim(1)).await,
        Err(LedgerError::AlreadyClaimed { .. })
    ));

    assert_eq!(
        ledger.send(&alice(), fixtures::withdraw(1)).await,
        Ok(Receipt::Refund(Amount::new(10)))
    );
    assert!(matches!(
        ledger.send(&alice(), fixtures::withdraw(1)).await,
        Err(LedgerError::NothingToWithdraw { .. })
    ));
    assert_eq!(payouts.payouts().len(), 1);
    assert_eq!(payouts.payouts()[0].recipient, alice());

    let summary = ledger.summary(SALE).await.unwrap();
    assert_eq!(summary.phase, SalePhase::LotteryDone);
    assert_eq!(summary.tickets_issued, 2);
    assert_eq!(summary.winners_count, 2);

    let totals = ledger.totals(SALE).await;
    assert_eq!(totals.held, Amount::new(20));
    assert_eq!(totals.forfeited, Amount::new(20));
    assert_eq!(totals.paid_out, Amount::new(10));
}

#[tokio::test]
async fn tokens_move_and_check_in() {
    let ledger = ledger();
    drawn_sale(&ledger).await;
    ledger.send(&carol(), fixtures::claim(1)).await.unwrap();

    ledger
        .send(&carol(), fixtures::transfer(0, alice()))
        .await
        .unwrap();
    assert!(ledger.verify(TokenId::new(0), SALE, &alice()).await);
    assert!(!ledger.verify(TokenId::new(0), SALE, &carol()).await);
    assert_eq!(ledger.tokens_of(&alice()).await, vec![TokenId::new(0)]);

    assert!(matches!(
        ledger
            .send(&alice(), LedgerCommand::CheckIn { token_id: TokenId::new(0) })
            .await,
        Err(LedgerError::Unauthorized(_))
    ));
    ledger
        .send(&controller(), LedgerCommand::CheckIn { token_id: TokenId::new(0) })
        .await
        .unwrap();

    let token = ledger.token(TokenId::new(0)).await.unwrap();
    assert_eq!(token.state, TokenState::CheckedIn);
    assert_eq!(token.owner, alice());
    assert!(!ledger.verify(TokenId::new(0), SALE, &alice()).await);
}

#[tokio::test]
async fn subscribers_see_events_in_commit_order() {
    let ledger = ledger();
    let mut events = ledger.subscribe();

    drawn_sale(&ledger).await;
    ledger.send(&carol(), fixtures::claim(1)).await.unwrap();

    let mut types = Vec::new();
    while let Ok(event) = events.try_recv() {
        types.push(event.event_type());
    }
    assert_eq!(
        types,
        vec![
            "SaleConfigured.v1",
            "Entered.v1",
            "Entered.v1",
            "Entered.v1",
            "LotteryDrawn.v1",
            "TokenIssued.v1",
            "TicketClaimed.v1",
        ]
    );
}

#[tokio::test]
async fn journal_records_caller_and_command() {
    let ledger = ledger();
    drawn_sale(&ledger).await;

    let rejected = ledger.send(&alice(), fixtures::enter(1, 10)).await;
    assert!(rejected.is_err());

    let entries = ledger.journal().entries();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[1].caller(), Some("alice"));
    assert_eq!(entries[1].command(), Some("enter"));
    assert_eq!(entries[4].command(), Some("run_lottery"));
    assert!(entries.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));

    let replayed = ledger.journal().replay().unwrap();
    assert!(matches!(
        &replayed[4],
        LedgerEvent::LotteryDrawn { winners, refunds_credited: 1, .. } if winners == &vec![carol(), bob()]
    ));
}

#[tokio::test]
async fn direct_issue_is_privileged_and_outside_sales() {
    let ledger = ledger();
    ledger
        .send(&controller(), fixtures::configure(1, 10, 1))
        .await
        .unwrap();

    let issue = LedgerCommand::Issue {
        to: bob(),
        event_id: SALE,
    };
    assert!(matches!(
        ledger.send(&bob(), issue.clone()).await,
        Err(LedgerError::Unauthorized(_))
    ));
    assert_eq!(
        ledger.send(&controller(), issue).await,
        Ok(Receipt::Token(TokenId::new(0)))
    );

    assert_eq!(ledger.total_issued().await, 1);
    assert_eq!(ledger.summary(SALE).await.unwrap().tickets_issued, 0);
    assert_eq!(ledger.owner_of(TokenId::new(0)).await, Some(bob()));
}

#[tokio::test]
async fn concurrent_entries_are_serialized() {
    let ledger = Arc::new(ledger());
    ledger
        .send(&controller(), fixtures::configure(1, 5, 10))
        .await
        .unwrap();

    let entrants = fixtures::entrants(50);
    let mut handles = Vec::new();
    for who in entrants.iter().cloned() {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            // Every identity tries twice; exactly one attempt may succeed.
            let first = ledger.send(&who, fixtures::enter(1, 5)).await;
            let second = ledger.send(&who, fixtures::enter(1, 5)).await;
            (first.is_ok(), second.is_ok())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), (true, false));
    }

    let recorded = ledger.entrants(SALE).await;
    assert_eq!(recorded.len(), 50);
    assert_eq!(ledger.totals(SALE).await.held, Amount::new(250));
    for who in &entrants {
        assert!(ledger.has_entered(SALE, who).await);
    }
}

#[tokio::test]
async fn built_from_config() {
    let config = LedgerConfig::new(Identity::new("box-office"));
    let ledger = Ledger::from_config(&config, test_environment()).unwrap();
    assert_eq!(ledger.controller().await, Identity::new("box-office"));

    let blank = LedgerConfig::new(Identity::null());
    assert!(matches!(
        Ledger::from_config(&blank, test_environment()),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn summary_of_unknown_sale_is_not_found() {
    let ledger = ledger();
    assert!(matches!(
        ledger.summary(EventId::new(99)).await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(!ledger.has_claimed(EventId::new(99), &alice()).await);
}
