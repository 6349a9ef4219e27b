//! # MeshFlow Hub
//!
//! Binary entry point: builds the tokio runtime from configuration, starts
//! the hub, and runs until interrupted.
//!
//! ## Startup Sequence
//!
//! 1. Initialize structured logging (`RUST_LOG` controls the filter)
//! 2. Load configuration from `MESHFLOW_*` environment overrides
//! 3. Construct the hub (validates every bound)
//! 4. Bind the coordination socket and spawn the sweeps
//! 5. Run until Ctrl+C, then shut down cooperatively

use anyhow::{Context, Result};
use meshflow_runtime::{HubConfig, MeshHub};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = HubConfig::from_env();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if config.worker_threads > 0 {
        builder.worker_threads(config.worker_threads);
    }
    let runtime = builder.build().context("failed to build runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: HubConfig) -> Result<()> {
    info!(build = %MeshHub::build_info(), "starting");

    let hub = MeshHub::with_config(config).context("hub construction failed")?;
    hub.start().await.context("hub start failed")?;

    // Log status transitions while we run.
    let _status_log = hub.on_status_change(|event| {
        info!(
            component = %event.component_id,
            old = %event.old,
            new = %event.new,
            "component status changed"
        );
    });

    info!("hub is running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("signal wait failed")?;

    hub.stop().await.context("hub stop failed")?;
    Ok(())
}
