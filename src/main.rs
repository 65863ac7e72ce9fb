// src/main.rs
use anyhow::Context;
use clap::Parser;
use forex_arb_engine::{
    arbitrage::DetectionLoop,
    config::{self, EnvConfigSource},
    market::ForexDataSimulator,
    utils::setup_logging,
};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Forex arbitrage detection over a simulated multi-broker feed
#[derive(Debug, Parser)]
#[command(name = "forex-arb-engine", version)]
struct Args {
    /// Seed for the rate simulator (overrides SIMULATOR_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many cycles instead of running until Ctrl-C
    #[arg(long)]
    cycles: Option<u64>,

    /// Print every published list as an `opportunities_update` JSON message
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app_config = config::load_config().context("Invalid configuration")?;
    setup_logging(&app_config.log_level).context("Failed to initialize logging")?;
    info!("🚀 Forex arbitrage engine starting...");
    app_config.log_settings();

    let seed = args.seed.or(app_config.simulator_seed);
    match seed {
        Some(seed) => info!("Simulator seeded with {}", seed),
        None => info!("Simulator seeded from entropy"),
    }
    let simulator = Arc::new(ForexDataSimulator::new(seed));

    let detection = DetectionLoop::new(simulator, Arc::new(EnvConfigSource::default()));

    let printer = args.json.then(|| {
        let mut updates = detection.subscribe();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => match update.to_json() {
                        Ok(json) => println!("{}", json),
                        Err(e) => error!("Failed to serialize update: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("JSON printer lagged, skipped {} updates", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // dropping the sender would stop the loop; hold it instead
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    detection.run(args.cycles, shutdown_rx).await?;

    // closes the update channel so the printer drains what is left and exits
    drop(detection);
    if let Some(printer) = printer {
        printer.await.context("JSON printer task failed")?;
    }

    info!("✅ Forex arbitrage engine stopped");
    Ok(())
}
