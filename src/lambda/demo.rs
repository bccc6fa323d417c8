// src/lambda/demo.rs

//! Demo handlers, referenced by the `init` scaffold.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::sync::Mutex;

use crate::event::SqsEvent;
use crate::lambda::{Handler, InvocationContext};

pub const DEMO_MODULE: &str = "qldebugger.example.lambdas";

/// Environment variable naming the queue `ForwardMessages` sends to.
pub const FORWARD_QUEUE_VAR: &str = "FORWARD_QUEUE";

/// Prints each record body, then the record count.
pub struct PrintMessages<W = io::Stdout> {
    out: Mutex<W>,
}

impl PrintMessages<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> PrintMessages<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl<W: Write + Send> Handler for PrintMessages<W> {
    async fn call(&self, event: SqsEvent, _ctx: &InvocationContext) -> anyhow::Result<Value> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("output writer poisoned"))?;

        for record in &event.records {
            writeln!(out, "{}", record.body).context("Failed to write message body")?;
        }
        writeln!(out, "Total: {} messages", event.records.len())
            .context("Failed to write message total")?;
        out.flush().context("Failed to flush output")?;

        Ok(Value::Null)
    }
}

/// Always fails.
pub struct ExecFail;

#[async_trait]
impl Handler for ExecFail {
    async fn call(&self, _event: SqsEvent, _ctx: &InvocationContext) -> anyhow::Result<Value> {
        Err(anyhow!("Lambda execution fail"))
    }
}

/// Sends every record body on to the queue named by `FORWARD_QUEUE`.
///
/// The SQS client comes from the invocation context, so the handler talks
/// to whatever endpoint the config points at.
pub struct ForwardMessages;

#[async_trait]
impl Handler for ForwardMessages {
    async fn call(&self, event: SqsEvent, ctx: &InvocationContext) -> anyhow::Result<Value> {
        let queue = ctx
            .env()
            .get(FORWARD_QUEUE_VAR)
            .filter(|q| !q.is_empty())
            .with_context(|| {
                format!(
                    "{} is not set for lambda {}",
                    FORWARD_QUEUE_VAR,
                    ctx.function_name()
                )
            })?;

        tracing::info!(
            request_id = ctx.request_id(),
            "Forwarding {} messages to {:?} queue...",
            event.records.len(),
            queue
        );

        let sqs = ctx.clients().sqs().await;
        let output = sqs
            .get_queue_url()
            .queue_name(queue)
            .send()
            .await
            .with_context(|| format!("Failed to resolve {:?} queue", queue))?;
        let queue_url = output
            .queue_url()
            .context("GetQueueUrl response has no QueueUrl")?;

        for record in &event.records {
            sqs.send_message()
                .queue_url(queue_url)
                .message_body(&record.body)
                .send()
                .await
                .with_context(|| format!("Failed to forward message {}", record.message_id))?;
        }

        Ok(json!({ "forwarded": event.records.len() }))
    }
}
