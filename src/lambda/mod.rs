// src/lambda/mod.rs

//! Handler resolution and invocation.
//!
//! A lambda definition names its handler by dotted path. The path is looked
//! up in a `HandlerRegistry`, and the handler runs with the lambda's
//! environment applied to the process for the duration of the call.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::aws::ClientFactory;
use crate::config::{Config, LambdaDefinition};
use crate::error::{ConfigError, InvokeError};
use crate::event::SqsEvent;

pub mod demo;
pub mod env;
pub mod registry;

pub use env::ScopedEnv;
pub use registry::HandlerRegistry;

/// User code invoked with an SQS event.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, event: SqsEvent, ctx: &InvocationContext) -> anyhow::Result<Value>;
}

/// What a handler gets besides the event.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    function_name: String,
    request_id: String,
    env: BTreeMap<String, String>,
    clients: ClientFactory,
}

impl InvocationContext {
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The lambda's configured environment, also set on the process.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Builds AWS clients with the configured connection settings applied.
    pub fn clients(&self) -> &ClientFactory {
        &self.clients
    }
}

/// Serializes invocations, since each one rewrites the process environment.
fn invocation_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub struct LambdaInvoker {
    lambdas: BTreeMap<String, LambdaDefinition>,
    registry: HandlerRegistry,
    clients: ClientFactory,
}

impl LambdaInvoker {
    pub fn new(config: &Config, registry: HandlerRegistry) -> Self {
        Self {
            lambdas: config.lambdas.clone(),
            registry,
            clients: ClientFactory::new(config.aws.clone()),
        }
    }

    fn definition(&self, lambda_name: &str) -> Result<&LambdaDefinition, ConfigError> {
        self.lambdas
            .get(lambda_name)
            .ok_or_else(|| ConfigError::UnknownLambda(lambda_name.to_string()))
    }

    pub fn resolve(&self, lambda_name: &str) -> Result<Arc<dyn Handler>, InvokeError> {
        let definition = self.definition(lambda_name)?;
        tracing::debug!("Loading handler {} for {:?} lambda...", definition.handler, lambda_name);
        self.registry.resolve(&definition.handler)
    }

    pub async fn invoke(&self, lambda_name: &str, event: SqsEvent) -> Result<Value, InvokeError> {
        let definition = self.definition(lambda_name)?;

        let _lock = invocation_lock().lock().await;
        let handler = self.resolve(lambda_name)?;
        let _env = ScopedEnv::apply(&definition.environment)?;

        let ctx = InvocationContext {
            function_name: lambda_name.to_string(),
            request_id: Uuid::new_v4().to_string(),
            env: definition.environment.clone(),
            clients: self.clients.clone(),
        };

        tracing::info!(
            request_id = %ctx.request_id,
            "Invoking {:?} lambda with {} records...",
            lambda_name,
            event.records.len()
        );

        match handler.call(event, &ctx).await {
            Ok(result) => {
                tracing::info!("Lambda {:?} result: {}", lambda_name, result);
                Ok(result)
            }
            Err(source) => {
                tracing::error!("Lambda {:?} failed: {:?}", lambda_name, source);
                Err(InvokeError::Handler {
                    lambda: lambda_name.to_string(),
                    source,
                })
            }
        }
    }
}
