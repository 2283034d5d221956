//! Lightwire - Art-Net lighting control daemon
//!
//! Usage: `lightwire [config.toml]`
//!
//! Without a config file the node listens on the default port and sends to
//! the primary Art-Net broadcast network.

#![warn(missing_docs)]

mod logging_setup;

use anyhow::{Context, Result};
use chrono::Local;
use lightwire_artnet::{ArtNetNode, NodeConfig};
use std::path::PathBuf;
use tracing::{info, warn};

fn load_config() -> Result<NodeConfig> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => NodeConfig::load(&path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(NodeConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = logging_setup::init(&config.logging)?;

    let started = Local::now();
    info!("==========================================");
    info!("===     Lightwire Session Started      ===");
    info!("==========================================");
    info!("Started at {}", started.format("%Y-%m-%d %H:%M:%S"));

    let node = ArtNetNode::bind(&config).context("Failed to bind Art-Net node")?;
    info!(
        "{} universe(s) configured, rate limit {}ms, keepalive {}s",
        config.universes.len(),
        config.scheduler.rate_limit_ms,
        config.scheduler.keepalive_secs
    );

    if let Err(e) = node.broadcast_poll() {
        warn!("Initial ArtPoll failed: {}", e);
    }

    node.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
    })
    .await?;

    let registry = node.registry();
    let stats = node.stats();
    info!(
        "Received {} datagrams, dropped {}",
        stats.datagrams(),
        stats.dropped()
    );
    for snapshot in registry.snapshots() {
        info!(
            "Universe {}: rx {} fwd {} superseded {}, tx {} (keepalive {}) failed {}, seq {}",
            snapshot.address,
            snapshot.frames_received,
            snapshot.frames_forwarded,
            snapshot.frames_superseded,
            snapshot.packets_sent,
            snapshot.keepalive_resends,
            snapshot.send_failures,
            snapshot.sequence
        );
    }
    registry.shutdown();

    let uptime = Local::now() - started;
    info!("Session ended after {}s", uptime.num_seconds());

    Ok(())
}
