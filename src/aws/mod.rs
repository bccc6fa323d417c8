// src/aws/mod.rs

//! The narrow cloud capability the core talks to.
//!
//! Every AWS call the core makes goes through one of the traits below.
//! `ClientAccessor` implements them over the AWS SDK. Tests implement them
//! in memory.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CloudResult;

pub mod accessor;
pub mod inject;
mod sdk;

#[cfg(test)]
pub(crate) mod testing;

pub use accessor::ClientAccessor;
pub use inject::ClientFactory;

/// AWS services the tool builds clients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceName {
    Sqs,
    Sns,
    SecretsManager,
    Sts,
}

impl ServiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqs => "sqs",
            Self::Sns => "sns",
            Self::SecretsManager => "secretsmanager",
            Self::Sts => "sts",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ---------------- shapes ---------------- */

/// One message as returned by ReceiveMessage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub md5_of_body: String,
}

/// One entry of a DeleteMessageBatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_arn: String,
    pub topic_arn: String,
    pub endpoint: String,
}

/// SNS message attribute, in the JSON shape the CLI accepts:
/// `{"DataType": "String", "StringValue": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageAttribute {
    pub data_type: String,
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub binary_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPayload {
    String(String),
    Binary(Vec<u8>),
}

/* ---------------- capability ---------------- */

#[async_trait]
pub trait QueueApi: Send + Sync {
    /// Fails with `CloudError::NotFound` when the queue does not exist.
    async fn queue_url(&self, queue_name: &str) -> CloudResult<String>;

    async fn queue_arn(&self, queue_url: &str) -> CloudResult<String>;

    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<String>;

    async fn set_queue_attributes(
        &self,
        queue_url: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<()>;

    async fn send_message(&self, queue_url: &str, body: &str) -> CloudResult<()>;

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: u32,
        wait_seconds: u32,
    ) -> CloudResult<Vec<QueueMessage>>;

    async fn delete_messages(&self, queue_url: &str, entries: &[DeleteEntry]) -> CloudResult<()>;

    async fn purge_queue(&self, queue_url: &str) -> CloudResult<()>;
}

#[async_trait]
pub trait TopicApi: Send + Sync {
    async fn create_topic(&self, topic_name: &str) -> CloudResult<String>;

    /// Every subscription on the account, across all topics.
    async fn list_subscriptions(&self) -> CloudResult<Vec<Subscription>>;

    async fn unsubscribe(&self, subscription_arn: &str) -> CloudResult<()>;

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<()>;

    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: &BTreeMap<String, MessageAttribute>,
    ) -> CloudResult<()>;
}

#[async_trait]
pub trait SecretApi: Send + Sync {
    /// Fails with `CloudError::NotFound` when the secret does not exist.
    async fn describe_secret(&self, name: &str) -> CloudResult<()>;

    async fn put_secret_value(&self, name: &str, value: &SecretPayload) -> CloudResult<()>;

    async fn create_secret(&self, name: &str, value: &SecretPayload) -> CloudResult<()>;
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn account_id(&self) -> CloudResult<String>;

    async fn region(&self) -> CloudResult<String>;
}

/// Everything the core needs from the cloud.
pub trait Cloud: QueueApi + TopicApi + SecretApi + IdentityApi {}

impl<T: QueueApi + TopicApi + SecretApi + IdentityApi + ?Sized> Cloud for T {}

/* ---------------- identifiers ---------------- */

/// ARN partition for a region.
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else {
        "aws"
    }
}

/// `arn:<partition>:<service>:<region>:<account>:<name>`
pub fn resource_arn(service: ServiceName, region: &str, account_id: &str, name: &str) -> String {
    format!(
        "arn:{}:{}:{}:{}:{}",
        partition_for_region(region),
        service,
        region,
        account_id,
        name
    )
}

/// The `eventSource` tag Lambda puts on records, e.g. `aws:sqs`.
pub fn event_source(service: ServiceName, region: &str) -> String {
    format!("{}:{}", partition_for_region(region), service)
}
