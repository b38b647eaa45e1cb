//! Serve command implementation.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use colored::Colorize;
use covcast_core::{Config, server};

pub async fn execute(mut config: Config, address: Option<SocketAddr>) -> Result<()> {
    if let Some(address) = address {
        config.server.address = address;
    }

    println!(
        "{} {}",
        "Serving forecasts on".bold().cyan(),
        format!("http://{}", config.server.address).cyan()
    );

    server::run(&config).await.context("REST server failed")
}
