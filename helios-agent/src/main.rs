//! `helios-agent` process entry point.
//!
//! CLI front-ends, Rich/TUI rendering, and the other external collaborators
//! around `original_source/agent/src/helios_agent/cli.py` are explicitly out
//! of scope; this binary just runs the collection loop described in
//! `agent.py`'s `run` command, taking an optional config path as its sole
//! argument.

mod agent;
mod buffer;
mod client;
mod config;
mod error;
mod logging;
mod signal;
mod source;

use std::path::PathBuf;

use agent::Agent;
use config::load_config;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match load_config(explicit_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    config.logging.init();

    info!(
        endpoint = %config.endpoint.url,
        sources = config.sources.len(),
        "starting helios-agent"
    );

    let mut agent = Agent::new(config);
    if let Err(e) = agent.setup() {
        error!(error = %e, "failed to build HTTP client");
        std::process::exit(1);
    }
    agent.initialize_sources().await;
    agent.run().await;
}
