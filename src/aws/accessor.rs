// src/aws/accessor.rs

//! Process-scoped AWS client cache.
//!
//! The runner creates one `ClientAccessor` at startup from the configured
//! connection settings and drops it on exit. The SDK config is loaded on
//! first use through the same `ClientFactory` handlers get, and one client
//! per service is built and reused after that.

use async_trait::async_trait;
use aws_config::SdkConfig;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{Mutex, OnceCell};

use crate::aws::inject::{ClientFactory, ClientRequest};
use crate::aws::{
    sdk, DeleteEntry, IdentityApi, MessageAttribute, QueueApi, QueueMessage, SecretApi,
    SecretPayload, ServiceName, Subscription, TopicApi,
};
use crate::config::ConnectionSettings;
use crate::error::{CloudError, CloudResult};

/// An SDK client the accessor knows how to build.
pub trait ServiceClient: Clone + Send + Sync + 'static {
    const SERVICE: ServiceName;

    fn from_conf(config: &SdkConfig) -> Self;
}

impl ServiceClient for aws_sdk_sqs::Client {
    const SERVICE: ServiceName = ServiceName::Sqs;

    fn from_conf(config: &SdkConfig) -> Self {
        Self::new(config)
    }
}

impl ServiceClient for aws_sdk_sns::Client {
    const SERVICE: ServiceName = ServiceName::Sns;

    fn from_conf(config: &SdkConfig) -> Self {
        Self::new(config)
    }
}

impl ServiceClient for aws_sdk_secretsmanager::Client {
    const SERVICE: ServiceName = ServiceName::SecretsManager;

    fn from_conf(config: &SdkConfig) -> Self {
        Self::new(config)
    }
}

impl ServiceClient for aws_sdk_sts::Client {
    const SERVICE: ServiceName = ServiceName::Sts;

    fn from_conf(config: &SdkConfig) -> Self {
        Self::new(config)
    }
}

pub struct ClientAccessor {
    factory: ClientFactory,
    sdk_config: OnceCell<SdkConfig>,
    // keyed by service name only; settings never change after load
    clients: Mutex<HashMap<ServiceName, Box<dyn Any + Send + Sync>>>,
}

impl ClientAccessor {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            factory: ClientFactory::new(settings),
            sdk_config: OnceCell::new(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn sdk_config(&self) -> &SdkConfig {
        self.sdk_config
            .get_or_init(|| self.factory.sdk_config(ClientRequest::default()))
            .await
    }

    /// The cached client for `C`, built on first request.
    pub async fn client<C: ServiceClient>(&self) -> C {
        let mut clients = self.clients.lock().await;

        if let Some(client) = clients
            .get(&C::SERVICE)
            .and_then(|c| c.downcast_ref::<C>())
        {
            return client.clone();
        }

        tracing::debug!("Connecting to {} service...", C::SERVICE);
        let client = C::from_conf(self.sdk_config().await);
        clients.insert(C::SERVICE, Box::new(client.clone()));
        client
    }

    #[cfg(test)]
    pub async fn cached_services(&self) -> Vec<ServiceName> {
        let mut services: Vec<_> = self.clients.lock().await.keys().copied().collect();
        services.sort();
        services
    }

    async fn sqs(&self) -> aws_sdk_sqs::Client {
        self.client().await
    }

    async fn sns(&self) -> aws_sdk_sns::Client {
        self.client().await
    }

    async fn secretsmanager(&self) -> aws_sdk_secretsmanager::Client {
        self.client().await
    }

    async fn sts(&self) -> aws_sdk_sts::Client {
        self.client().await
    }
}

#[async_trait]
impl QueueApi for ClientAccessor {
    async fn queue_url(&self, queue_name: &str) -> CloudResult<String> {
        sdk::queue_url(&self.sqs().await, queue_name).await
    }

    async fn queue_arn(&self, queue_url: &str) -> CloudResult<String> {
        sdk::queue_arn(&self.sqs().await, queue_url).await
    }

    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<String> {
        sdk::create_queue(&self.sqs().await, queue_name, attributes).await
    }

    async fn set_queue_attributes(
        &self,
        queue_url: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<()> {
        sdk::set_queue_attributes(&self.sqs().await, queue_url, attributes).await
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> CloudResult<()> {
        sdk::send_message(&self.sqs().await, queue_url, body).await
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: u32,
        wait_seconds: u32,
    ) -> CloudResult<Vec<QueueMessage>> {
        sdk::receive_messages(&self.sqs().await, queue_url, max_messages, wait_seconds).await
    }

    async fn delete_messages(&self, queue_url: &str, entries: &[DeleteEntry]) -> CloudResult<()> {
        sdk::delete_messages(&self.sqs().await, queue_url, entries).await
    }

    async fn purge_queue(&self, queue_url: &str) -> CloudResult<()> {
        sdk::purge_queue(&self.sqs().await, queue_url).await
    }
}

#[async_trait]
impl TopicApi for ClientAccessor {
    async fn create_topic(&self, topic_name: &str) -> CloudResult<String> {
        sdk::create_topic(&self.sns().await, topic_name).await
    }

    async fn list_subscriptions(&self) -> CloudResult<Vec<Subscription>> {
        sdk::list_subscriptions(&self.sns().await).await
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> CloudResult<()> {
        sdk::unsubscribe(&self.sns().await, subscription_arn).await
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<()> {
        sdk::subscribe(&self.sns().await, topic_arn, protocol, endpoint, attributes).await
    }

    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: &BTreeMap<String, MessageAttribute>,
    ) -> CloudResult<()> {
        sdk::publish(&self.sns().await, topic_arn, message, attributes).await
    }
}

#[async_trait]
impl SecretApi for ClientAccessor {
    async fn describe_secret(&self, name: &str) -> CloudResult<()> {
        sdk::describe_secret(&self.secretsmanager().await, name).await
    }

    async fn put_secret_value(&self, name: &str, value: &SecretPayload) -> CloudResult<()> {
        sdk::put_secret_value(&self.secretsmanager().await, name, value).await
    }

    async fn create_secret(&self, name: &str, value: &SecretPayload) -> CloudResult<()> {
        sdk::create_secret(&self.secretsmanager().await, name, value).await
    }
}

#[async_trait]
impl IdentityApi for ClientAccessor {
    async fn account_id(&self) -> CloudResult<String> {
        sdk::account_id(&self.sts().await).await
    }

    async fn region(&self) -> CloudResult<String> {
        if let Some(region) = self.factory.settings().region() {
            return Ok(region.to_string());
        }

        self.sdk_config()
            .await
            .region()
            .map(|r| r.to_string())
            .ok_or(CloudError::MissingRegion)
    }
}
