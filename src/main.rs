//! Synthvault scenario runner.
//!
//! Builds an in-memory deployment (collateral tokens, price feeds, the
//! synthetic asset and the engine) and replays a scenario of position
//! operations against it, logging every engine event.
//!
//! Usage: `synthvault [scenario.toml]`
//! - `DEPLOYMENT_CONFIG`: deployment file (default `config/deployment.toml`)
//! - `SCENARIO`: scenario file when no argument is given
//! - `ENGINE_PROFILE`: `default`, `legacy` or an engine config path
//! - `LOG_FORMAT=json`: structured log output

mod scenario;
mod world;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use synthvault_core::{load_deployment_from_env, EngineEvent};

use crate::scenario::Scenario;
use crate::world::World;

/// Environment variable names.
mod env {
    pub const SCENARIO: &str = "SCENARIO";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

const DEFAULT_SCENARIO: &str = "scenarios/liquidation.toml";

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let deployment = load_deployment_from_env().context("Failed to load deployment")?;
    deployment.engine.log_config();

    let scenario_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(env::SCENARIO).ok())
        .unwrap_or_else(|| DEFAULT_SCENARIO.to_string());
    let scenario = Scenario::from_file(&scenario_path)?;

    let world = World::build(&deployment)?;
    let event_logger = spawn_event_logger(world.engine.subscribe());

    let result = scenario::run(&world, &scenario);

    // Closing the engine ends the event stream once it is drained
    drop(world);
    event_logger.await.context("Event logger panicked")?;

    let summary = result?;
    info!(
        scenario = %scenario.name,
        steps = summary.steps,
        expected_failures = summary.expected_failures,
        "Scenario complete"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,synthvault_core=debug"));
    let json = std::env::var(env::LOG_FORMAT).is_ok_and(|format| format == "json");

    let layer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };
    tracing_subscriber::registry().with(layer).with(filter).init();
}

/// Log every engine event as JSON until the engine goes away.
fn spawn_event_logger(mut events: broadcast::Receiver<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "synthvault::events", event = %json, "Engine event"),
                    Err(e) => warn!(error = %e, "Failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ┌─┐┬ ┬┌┐┌┌┬┐┬ ┬┬  ┬┌─┐┬ ┬┬ ┌┬┐
    └─┐└┬┘│││ │ ├─┤└┐┌┘├─┤│ ││  │
    └─┘ ┴ ┘└┘ ┴ ┴ ┴ └┘ ┴ ┴└─┘┴─┘┴
    Synthetic Asset Engine v0.1.0
    "#
    );
}
