use anyhow::Result;
use comed_dashboard::config::Config;
use comed_dashboard::dashboard::DashboardRefresher;
use comed_dashboard::pricing::ComedClient;
use comed_dashboard::web::{self, AppState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    comed_dashboard::logging::init_logging(&config.logging)?;
    info!("ComEd pricing dashboard starting up");

    let timezone = config.timezone()?;
    let client = ComedClient::new(&config.feed, timezone)?;
    let (refresher, handle) = DashboardRefresher::new(&config, Arc::new(client))?;

    let refresh_task = tokio::spawn(refresher.run());

    let state = AppState {
        dashboard: handle,
        config: Arc::new(config),
    };

    let outcome = tokio::select! {
        res = web::serve(state) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };

    refresh_task.abort();
    if let Err(e) = &outcome {
        error!("Web server error: {}", e);
    }
    outcome
}
