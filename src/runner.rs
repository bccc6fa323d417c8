// src/runner.rs

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::aws::{ClientAccessor, MessageAttribute};
use crate::cli::{Cli, Command, InfraCommand, MsgCommand};
use crate::config::Config;
use crate::infra;
use crate::lambda::{HandlerRegistry, LambdaInvoker};
use crate::mapping;
use crate::message;

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    let load = || Config::load(&cli.config);

    match cli.command {
        Command::Init => init_scaffold(&cli.config),
        Command::Run { mapping } => run_mapping(&load()?, &mapping).await,
        Command::Infra(cmd) => provision(&load()?, cmd).await,
        Command::Msg(cmd) => send_messages(&load()?, cmd).await,
    }
}

async fn run_mapping(cfg: &Config, name: &str) -> Result<()> {
    let cloud = ClientAccessor::new(cfg.aws.clone());
    let invoker = LambdaInvoker::new(cfg, HandlerRegistry::builtin());

    match mapping::run(&cloud, &invoker, cfg, name).await {
        Ok(_) => Ok(()),
        // an empty queue is a no-op run, not a failure
        Err(err) if err.is_no_messages() => {
            tracing::warn!("{}", err);
            Ok(())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to run {:?} mapping", name)),
    }
}

async fn provision(cfg: &Config, cmd: InfraCommand) -> Result<()> {
    let cloud = ClientAccessor::new(cfg.aws.clone());

    let result = match cmd {
        InfraCommand::CreateSecrets => infra::create_secrets(&cloud, cfg).await,
        InfraCommand::CreateTopics => infra::create_topics(&cloud, cfg).await,
        InfraCommand::CreateQueues => infra::create_queues(&cloud, cfg).await,
        InfraCommand::CreateAll => infra::create_all(&cloud, cfg).await,
        InfraCommand::SubscribeTopics => infra::subscribe_topics(&cloud, cfg).await,
    };
    result.context("Provisioning failed")
}

async fn send_messages(cfg: &Config, cmd: MsgCommand) -> Result<()> {
    let cloud = ClientAccessor::new(cfg.aws.clone());

    match cmd {
        MsgCommand::Publish {
            topic,
            message: body,
            attributes,
        } => {
            let attributes = parse_attributes(&attributes)?;
            message::publish(&cloud, &topic, &body, &attributes)
                .await
                .with_context(|| format!("Failed to publish to {:?} topic", topic))
        }
        MsgCommand::Send {
            queue,
            message: body,
        } => message::send(&cloud, &queue, &body)
            .await
            .with_context(|| format!("Failed to send to {:?} queue", queue)),
        MsgCommand::Purge { queue } => message::purge(&cloud, &queue)
            .await
            .with_context(|| format!("Failed to purge {:?} queue", queue)),
    }
}

fn parse_attributes(raw: &str) -> Result<BTreeMap<String, MessageAttribute>> {
    serde_json::from_str(raw).with_context(|| format!("Invalid message attributes: {}", raw))
}

/* ---------------- init ---------------- */

fn init_scaffold(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!("Configuration file already exists");
        return Ok(());
    }

    std::fs::write(path, default_config_yaml())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    eprintln!("Configuration file created");

    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"aws:
  profile: ""
  access_key_id: secret
  secret_access_key: secret
  session_token: ""
  region: us-east-1
  endpoint_url: http://localhost:4566/

queues:
  myqueue: {}
  forwarded: {}

lambdas:
  print:
    handler: qldebugger.example.lambdas.print_messages
  fail:
    handler: qldebugger.example.lambdas.exec_fail
    environment:
      VARIABLE: VALUE
  forward:
    handler: qldebugger.example.lambdas.forward_messages
    environment:
      FORWARD_QUEUE: forwarded

event_source_mapping:
  a:
    queue: myqueue
    function_name: print
  b:
    queue: myqueue
    function_name: fail
    batch_size: 1
    maximum_batching_window: 20
  c:
    queue: myqueue
    function_name: forward
"#
}
