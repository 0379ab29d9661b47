//! Runs one complete admission sale against an in-memory ledger.
//!
//! Configuration comes from the environment (see `LedgerConfig::from_env`);
//! without `FAIRDRAW_CONTROLLER` the demo runs as controller `venue`.

use anyhow::{Context, Result};
use fairdraw_core::{
    Amount, EventId, Identity, LedgerCommand, LedgerEnvironment, LedgerState, Payout, Seed,
    SystemClock, TransferFuture, ValueTransfer,
};
use fairdraw_runtime::metrics::MetricsServer;
use fairdraw_runtime::{ConfigError, Ledger, LedgerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Payout rail that only logs; the demo has no real value to move.
struct LoggingPayouts;

impl ValueTransfer for LoggingPayouts {
    fn send_value(&self, payout: Payout) -> TransferFuture<'_> {
        Box::pin(async move {
            info!(
                recipient = %payout.recipient,
                amount = %payout.amount,
                sale = %payout.event_id,
                "Payout delivered"
            );
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match LedgerConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::Missing(_)) => LedgerConfig::new(Identity::new("venue")),
        Err(error) => return Err(error).context("invalid configuration"),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = config.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics.as_mut() {
        server.start().context("failed to start metrics exporter")?;
    }

    let controller = config.controller.clone();
    let environment = LedgerEnvironment::new(Arc::new(SystemClock), Arc::new(LoggingPayouts));
    let ledger = Arc::new(Ledger::with_capacity(
        LedgerState::new(controller.clone())?,
        environment,
        config.event_capacity,
    ));

    let mut events = ledger.subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event_type = event.event_type(), sale = %event.event_id(), "Observed event");
        }
    });

    let sale = EventId::new(1);
    let stake = Amount::new(10);
    let entrants: Vec<Identity> = ["ada", "grace", "alan", "edsger", "barbara"]
        .into_iter()
        .map(Identity::new)
        .collect();

    ledger
        .send(
            &controller,
            LedgerCommand::Configure {
                event_id: sale,
                stake,
                ticket_supply: 2,
            },
        )
        .await?;

    for entrant in &entrants {
        ledger
            .send(entrant, LedgerCommand::Enter { event_id: sale, value: stake })
            .await?;
    }

    let seed = Seed::from_bytes(rand::random());
    info!(%seed, "Drawing winners");
    ledger
        .send(
            &controller,
            LedgerCommand::RunLottery {
                event_id: sale,
                winners: 2,
                seed,
            },
        )
        .await?;

    for entrant in &entrants {
        if ledger.is_winner(sale, entrant).await {
            let receipt = ledger
                .send(entrant, LedgerCommand::Claim { event_id: sale })
                .await?;
            info!(%entrant, ?receipt, "Ticket claimed");
        } else {
            let receipt = ledger
                .send(entrant, LedgerCommand::Withdraw { event_id: sale })
                .await?;
            info!(%entrant, ?receipt, "Stake refunded");
        }
    }

    let summary = ledger.summary(sale).await?;
    let totals = ledger.totals(sale).await;
    info!(?summary, ?totals, journal = ledger.journal().len(), "Sale complete");

    if let Some(rendered) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("{rendered}");
    }

    drop(ledger);
    if observer.await.is_err() {
        warn!("Event observer stopped unexpectedly");
    }

    Ok(())
}
