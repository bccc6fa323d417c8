// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILENAME;

/// Local SQS to Lambda event source mapping runner.
///
/// `qldebugger.yaml` declares the queues, topics, secrets, lambdas and
/// mappings. Every command reads it first, except `init`, which writes it.
#[derive(Parser, Debug)]
#[command(name = "qldebugger", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter config file.
    ///
    /// An existing file is left untouched.
    Init,

    /// Run an event source mapping once.
    ///
    /// Receives one batch, invokes the lambda with it, and deletes the batch
    /// only if the lambda succeeded.
    Run {
        /// Mapping name under `event_source_mapping`
        mapping: String,
    },

    /// Provision the resources declared in the config.
    #[command(subcommand)]
    Infra(InfraCommand),

    /// Send, publish or purge messages.
    #[command(subcommand)]
    Msg(MsgCommand),
}

#[derive(Subcommand, Debug)]
pub enum InfraCommand {
    /// Create secrets, or update their value when they exist.
    CreateSecrets,

    /// Create topics.
    CreateTopics,

    /// Create queues, dead letter queues first.
    CreateQueues,

    /// Secrets, topics, queues, then subscriptions.
    CreateAll,

    /// Drop every subscription, then subscribe queues to topics.
    SubscribeTopics,
}

#[derive(Subcommand, Debug)]
pub enum MsgCommand {
    /// Publish a message to a topic.
    Publish {
        topic: String,

        message: String,

        /// Message attributes as JSON
        ///
        /// Example:
        /// '{"kind": {"DataType": "String", "StringValue": "created"}}'
        #[arg(default_value = "{}")]
        attributes: String,
    },

    /// Send a message to a queue.
    Send { queue: String, message: String },

    /// Delete every message in a queue.
    Purge { queue: String },
}
