//! 'main' for the Obelisk node process

use anyhow::Result;
use caryatid_process::Process;
use config::{Config, Environment, File};
use obelisk_common::messages::Message;
use std::sync::Arc;
use tracing::info;

// External modules
use obelisk_module_chain_tree::ChainTree;

use caryatid_module_clock::Clock;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Standard main
#[tokio::main]
pub async fn main() -> Result<()> {
    // Standard logging using RUST_LOG for log levels, default INFO
    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());
    Registry::default().with(fmt_layer).init();

    info!("Obelisk node process");

    // Read the config
    let config = Arc::new(
        Config::builder()
            .add_source(File::with_name("node"))
            .add_source(Environment::with_prefix("OBELISK"))
            .build()
            .unwrap(),
    );

    // Create the process
    let mut process = Process::<Message>::create(config).await;

    // Register modules
    ChainTree::register(&mut process);

    Clock::<Message>::register(&mut process);

    // Run it
    process.run().await?;

    // Bye!
    info!("Exiting");
    Ok(())
}
