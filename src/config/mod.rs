// src/config/mod.rs

use anyhow::{bail, Context, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, fs, path::Path, str::FromStr};

use crate::aws::SecretPayload;
use crate::error::ConfigError;

pub mod validate;

pub use validate::validate_config;

/// Default config file, relative to the working directory.
pub const CONFIG_FILENAME: &str = "qldebugger.yaml";

/// Root configuration loaded from `qldebugger.yaml`.
///
/// Every map is keyed by resource name, so names are unique per section
/// (the YAML parser rejects duplicate keys).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Connection settings for every AWS client the tool builds
    #[serde(default)]
    pub aws: ConnectionSettings,

    #[serde(default)]
    pub secrets: BTreeMap<String, SecretDefinition>,

    #[serde(default)]
    pub topics: BTreeMap<String, TopicDefinition>,

    pub queues: BTreeMap<String, QueueDefinition>,

    pub lambdas: BTreeMap<String, LambdaDefinition>,

    pub event_source_mapping: BTreeMap<String, EventSourceMappingDefinition>,
}

/// AWS connection settings.
///
/// Example in qldebugger.yaml:
///
/// aws:
///   access_key_id: secret
///   secret_access_key: secret
///   region: us-east-1
///   endpoint_url: http://localhost:4566/
///
/// Anything left out (or left empty) falls back to the SDK default chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl ConnectionSettings {
    pub fn profile(&self) -> Option<&str> {
        non_empty(&self.profile)
    }

    pub fn access_key_id(&self) -> Option<&str> {
        non_empty(&self.access_key_id)
    }

    pub fn secret_access_key(&self) -> Option<&str> {
        non_empty(&self.secret_access_key)
    }

    pub fn session_token(&self) -> Option<&str> {
        non_empty(&self.session_token)
    }

    pub fn region(&self) -> Option<&str> {
        non_empty(&self.region)
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        non_empty(&self.endpoint_url)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A secret value, either text or raw bytes.
///
/// secrets:
///   api_token: {string: abc}
///   signing_key: {binary: "raw bytes"}
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretDefinition {
    String(StringSecret),
    Binary(BinarySecret),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringSecret {
    pub string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinarySecret {
    pub binary: String,
}

impl SecretDefinition {
    pub fn payload(&self) -> SecretPayload {
        match self {
            Self::String(secret) => SecretPayload::String(secret.string.clone()),
            Self::Binary(secret) => SecretPayload::Binary(secret.binary.clone().into_bytes()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TopicDefinition {
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscriber {
    pub queue: String,

    #[serde(default)]
    pub raw_message_delivery: bool,

    /// JSON filter policy, passed to SNS as-is
    #[serde(default)]
    pub filter_policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueueDefinition {
    #[serde(default)]
    pub redrive_policy: Option<RedrivePolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedrivePolicy {
    /// Name of another queue
    pub dead_letter_queue: String,
    pub max_receive_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LambdaDefinition {
    pub handler: HandlerRef,

    /// Environment variables set for the duration of each invocation
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// A handler path such as `qldebugger.example.lambdas.print_messages`,
/// split on the last `.` into module and function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    pub module: String,
    pub function: String,
}

impl FromStr for HandlerRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ConfigError::InvalidHandler {
            handler: s.to_string(),
            reason,
        };

        let (module, function) = s
            .rsplit_once('.')
            .ok_or_else(|| invalid("should have a module and function names"))?;

        if module.is_empty() || function.is_empty() {
            return Err(invalid("module and function names must not be empty"));
        }

        Ok(Self {
            module: module.to_string(),
            function: function.to_string(),
        })
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

impl<'de> Deserialize<'de> for HandlerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HandlerVisitor;

        impl<'de> Visitor<'de> for HandlerVisitor {
            type Value = HandlerRef;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dotted handler path as a string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<HandlerRef, E> {
                v.parse().map_err(E::custom)
            }
        }

        // deserialize_any so plain YAML numbers are rejected instead of
        // being read back as strings
        deserializer.deserialize_any(HandlerVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventSourceMappingDefinition {
    pub queue: String,

    pub function_name: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Long-poll wait in seconds
    #[serde(default)]
    pub maximum_batching_window: u32,
}

fn default_batch_size() -> u32 {
    10
}

impl Config {
    /// Load and parse `qldebugger.yaml` from disk.
    ///
    /// This performs:
    /// - File read
    /// - YAML deserialization
    /// - Structural validation
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading {:?} config...", path);

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;

        let validation = validate_config(&cfg);
        if !validation.is_valid() {
            let details = validation
                .errors
                .iter()
                .map(|e| format!("  [{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("\n");
            bail!("Invalid config:\n{}", details);
        }

        Ok(cfg)
    }

    pub fn mapping(&self, name: &str) -> Result<&EventSourceMappingDefinition, ConfigError> {
        self.event_source_mapping
            .get(name)
            .ok_or_else(|| ConfigError::UnknownMapping(name.to_string()))
    }
}
