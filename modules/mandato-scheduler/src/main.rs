use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mandato_common::Config;
use mandato_scheduler::{App, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mandato=info".parse()?))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let app = App::init(config).await?;
    let scheduler = Scheduler::new(app)?;

    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    scheduler.run().await;
    Ok(())
}
