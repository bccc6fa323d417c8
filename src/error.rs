// src/error.rs

//! Error types for the core.
//!
//! The CLI edge works with `anyhow`, but everything below it reports
//! typed errors so callers can tell an empty queue from a broken
//! endpoint, or a missing resource from a denied request.

use thiserror::Error;

/// Errors reported by the cloud capability (SQS, SNS, Secrets Manager, STS).
#[derive(Error, Debug)]
pub enum CloudError {
    /// The named resource does not exist.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Any other failure reported by the service or the transport.
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    /// No region could be resolved from settings or the SDK provider chain.
    #[error("No AWS region configured")]
    MissingRegion,

    /// The caller identity did not include an account id.
    #[error("Caller identity has no account id")]
    MissingAccount,
}

impl CloudError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Lookup and validation errors against the loaded configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Event source mapping not found: {0}")]
    UnknownMapping(String),

    #[error("Lambda not found: {0}")]
    UnknownLambda(String),

    #[error("Invalid handler {handler:?}: {reason}")]
    InvalidHandler { handler: String, reason: &'static str },
}

/// Errors from the message gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The receive call returned zero messages. Expected, not a fault.
    #[error("No messages received from {queue}")]
    NoMessages { queue: String },

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl GatewayError {
    pub fn is_no_messages(&self) -> bool {
        matches!(self, Self::NoMessages { .. })
    }
}

/// Errors from resolving or running a handler.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Handler module not found: {module}")]
    ModuleNotFound { module: String },

    #[error("Handler {function} not found in module {module}")]
    FunctionNotFound { module: String, function: String },

    /// An environment variable the OS would refuse to set.
    #[error("Invalid environment variable {key:?}")]
    InvalidEnvironment { key: String },

    /// The handler itself failed. The source is passed through untouched.
    #[error("Lambda {lambda} failed")]
    Handler {
        lambda: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors from one event source mapping run.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl MappingError {
    pub fn is_no_messages(&self) -> bool {
        matches!(self, Self::Gateway(err) if err.is_no_messages())
    }
}

/// Errors from provisioning.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Redrive policies reference each other in a loop.
    #[error("Dead letter queue cycle between queues: {}", queues.join(", "))]
    RedriveCycle { queues: Vec<String> },

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

pub type CloudResult<T> = Result<T, CloudError>;
