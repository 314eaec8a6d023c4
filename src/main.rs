//! Interbank gateway
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Config  │───▶│ AppState │───▶│   Gateway    │◀──▶│ Partner banks│
//! │  (YAML)  │    │ (wiring) │    │   (axum)     │    │  (JWT claims)│
//! └──────────┘    └──────────┘    └──────────────┘    └──────────────┘
//! ```

use std::sync::Arc;

use tracing::info;

use interbank::config::AppConfig;
use interbank::gateway;
use interbank::gateway::state::AppState;
use interbank::logging::init_logging;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config);

    info!(
        env = %env,
        bank = %config.bank.name,
        prefix = %config.bank.prefix,
        "Starting interbank gateway"
    );

    let state = Arc::new(AppState::build(&config).await?);
    gateway::run_server(&config.gateway, state).await
}
