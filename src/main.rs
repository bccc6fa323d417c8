// src/main.rs

//! qldebugger
//!
//! Entry point for the qldebugger CLI.
//!
//! This binary runs SQS event source mappings locally: it receives a batch
//! from a queue, invokes an in-process handler with it, and deletes the
//! batch when the handler succeeds. It delegates all real work to the
//! `runner` module.

mod aws;
mod cli;
mod config;
mod error;
mod event;
mod infra;
mod lambda;
mod mapping;
mod message;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; handler output owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = cli::Cli::parse();

    runner::run(cli).await
}
