use dotenv::dotenv;
use hannibal::Actor;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use std::env;

use attendance_server::{
    config::Config,
    server::AttendanceServer,
    web_server::{Listen, WebServer},
};

const LOG_VAR: &str = "ATTENDANCE_LOG";
const DEFAULT_LOG: &str = "attendance_server=debug,warp=info";

#[async_std::main]
async fn main() -> anyhow::Result<()> {
    color_backtrace::install();
    dotenv().ok();

    let config = Config::from_env()?;

    let filter = env::var(LOG_VAR)
        .ok()
        .or_else(|| config.log_config.clone())
        .unwrap_or_else(|| DEFAULT_LOG.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
    debug!("{:#?}", config);

    let socket = config.server.socket()?;
    let server = AttendanceServer::open(&config.storage).await?;

    let web_server = WebServer::new(server).start().await?;
    web_server.call(Listen { socket }).await??;

    info!("shutting down");
    Ok(())
}
