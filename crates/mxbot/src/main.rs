use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mxbot_core::{bot, config::Config};
use mxbot_matrix::MatrixClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mxbot_core::logging::init("mxbot")?;

    let cfg = Config::load().context("loading configuration")?;
    info!(
        homeserver = %cfg.homeserver_url,
        username = %cfg.username,
        "starting demo bot"
    );

    let transport = Arc::new(MatrixClient::new(&cfg.homeserver_url)?);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received, stopping after the current poll");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "ctrl-c handler unavailable"),
            }
        }
    });

    if let Err(e) = bot::run(&cfg, transport, cancel).await {
        error!(error = %e, "authentication failed");
        return Err(e).context("bot startup failed");
    }

    Ok(())
}
