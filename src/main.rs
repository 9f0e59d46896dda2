//! Aviator Server
//!
//! Runs the round engine as a perpetual service. The transport layer
//! (HTTP/WebSocket fan-out) is out of scope here; in its place a logging
//! subscriber prints every broadcast payload, and a pair of demo players
//! exercises the bet/cashout operations so a bare `cargo run` shows full
//! rounds end to end.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aviator::core::money::amount;
use aviator::engine::round::{EngineConfig, RoundEngine};
use aviator::game::events::RoundEventData;
use aviator::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::default();
    info!("Aviator Server v{}", VERSION);
    info!(
        countdown_secs = config.countdown_secs,
        ramp_interval_ms = config.ramp_interval.as_millis() as u64,
        restart_delay_ms = config.restart_delay.as_millis() as u64,
        house_seed = config.house_seed,
        house_floor = config.house_floor,
        "engine configuration"
    );

    let engine = Arc::new(RoundEngine::new(config));

    // Broadcast subscriber standing in for the transport fan-out
    tokio::spawn(log_broadcasts(Arc::clone(&engine)));

    // Demo players exercising bets and cashouts
    tokio::spawn(run_demo_player(
        Arc::clone(&engine),
        "User1",
        amount(100),
        150, // cash out at 1.50x
    ));
    tokio::spawn(run_demo_player(
        Arc::clone(&engine),
        "User2",
        amount(50),
        220, // greedier: 2.20x, loses most rounds
    ));

    engine.run().await;
    Ok(())
}

/// Print every broadcast payload as JSON, the way a transport would relay it.
async fn log_broadcasts(engine: Arc<RoundEngine>) {
    let mut rx = engine.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => {
                // Multiplier ticks are too chatty for info level
                let chatty = matches!(event.data, RoundEventData::MultiplierUpdate { .. });
                match serde_json::to_string(&event) {
                    Ok(json) if chatty => tracing::debug!(payload = %json, "broadcast"),
                    Ok(json) => info!(payload = %json, "broadcast"),
                    Err(e) => warn!(error = %e, "failed to serialize event"),
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "broadcast subscriber lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// A scripted player: bets every round, cashes out at a target multiplier.
async fn run_demo_player(
    engine: Arc<RoundEngine>,
    name: &'static str,
    stake: aviator::Amount,
    target: aviator::Multiplier,
) {
    let mut rx = engine.subscribe();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        };
        match event.data {
            RoundEventData::BettingStarted { .. } => {
                if let Err(e) = engine.place_bet(name, stake).await {
                    warn!(player = name, error = %e, "demo bet rejected");
                }
            }
            RoundEventData::MultiplierUpdate { multiplier } => {
                if multiplier >= aviator::core::money::multiplier_to_float(target) {
                    // Racing the crash is part of the game; losing the race
                    // is a normal rejection, not an error
                    let _ = engine.cash_out(name).await;
                }
            }
            _ => {}
        }
    }
}
