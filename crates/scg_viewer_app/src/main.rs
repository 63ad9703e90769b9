// SPDX-License-Identifier: MIT OR Apache-2.0
//! `scg_viewer` - headless SCg diagram viewer
//!
//! Loads a GWF document, optionally lays it out with the force-directed
//! layout and prints a JSON snapshot of every object as a renderer would
//! see it. Logs go to stderr so the snapshot can be piped.

mod app;

use app::{Cli, ViewerApp};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scg_viewer_app=info,scg_viewer_graph=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting SCg viewer v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = ViewerApp::new(cli).run() {
        tracing::error!("Viewer failed: {e}");
        std::process::exit(1);
    }
}
