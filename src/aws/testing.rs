// src/aws/testing.rs

//! In-memory cloud used by unit tests.
//!
//! Queues keep their messages until they are deleted, so a failed run
//! leaves the batch in place the way SQS does once the visibility timeout
//! expires. Every call is appended to `calls()` as `operation:target`.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::aws::{
    DeleteEntry, IdentityApi, MessageAttribute, QueueApi, QueueMessage, SecretApi, SecretPayload,
    Subscription, TopicApi,
};
use crate::error::{CloudError, CloudResult};

pub const REGION: &str = "us-east-1";
pub const ACCOUNT: &str = "000000000000";

#[derive(Debug, Default)]
pub struct FakeQueue {
    pub attributes: BTreeMap<String, String>,
    pub messages: Vec<QueueMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic_arn: String,
    pub message: String,
    pub attributes: BTreeMap<String, MessageAttribute>,
}

#[derive(Debug, Default)]
struct State {
    queues: BTreeMap<String, FakeQueue>,
    topics: BTreeSet<String>,
    subscriptions: Vec<Subscription>,
    secrets: BTreeMap<String, SecretPayload>,
    published: Vec<Published>,
    calls: Vec<String>,
    failing: BTreeSet<&'static str>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

fn url_for(queue_name: &str) -> String {
    format!("http://localhost:4566/{}/{}", ACCOUNT, queue_name)
}

fn name_from_url(queue_url: &str) -> String {
    queue_url.rsplit('/').next().unwrap_or_default().to_string()
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .queues
            .insert(name.to_string(), FakeQueue::default());
        self
    }

    pub fn with_secret(self, name: &str, value: SecretPayload) -> Self {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert(name.to_string(), value);
        self
    }

    pub fn with_subscription(self, topic: &str, queue: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let n = state.subscriptions.len();
            state.subscriptions.push(Subscription {
                subscription_arn: format!("arn:aws:sns:{REGION}:{ACCOUNT}:{topic}:sub-{n}"),
                topic_arn: format!("arn:aws:sns:{REGION}:{ACCOUNT}:{topic}"),
                endpoint: format!("arn:aws:sqs:{REGION}:{ACCOUNT}:{queue}"),
            });
        }
        self
    }

    /// Make every call of `operation` fail with a service error.
    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(operation);
        self
    }

    pub fn enqueue(&self, queue_name: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state
            .queues
            .get_mut(queue_name)
            .expect("queue must exist before enqueueing")
            .messages
            .push(QueueMessage {
                message_id: format!("msg-{id}"),
                receipt_handle: format!("rh-{id}"),
                body: body.to_string(),
                md5_of_body: format!("md5-{id}"),
            });
    }

    pub fn messages(&self, queue_name: &str) -> Vec<QueueMessage> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue_name)
            .map(|q| q.messages.clone())
            .unwrap_or_default()
    }

    pub fn queue_attributes(&self, queue_name: &str) -> Option<BTreeMap<String, String>> {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue_name)
            .map(|q| q.attributes.clone())
    }

    pub fn secret(&self, name: &str) -> Option<SecretPayload> {
        self.state.lock().unwrap().secrets.get(name).cloned()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls whose operation part equals `operation`.
    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(':').next() == Some(operation))
            .collect()
    }

    fn record(&self, operation: &'static str, target: &str) -> CloudResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation}:{target}"));
        if state.failing.contains(operation) {
            return Err(CloudError::service(operation, "injected failure"));
        }
        Ok(state)
    }
}

#[async_trait]
impl QueueApi for FakeCloud {
    async fn queue_url(&self, queue_name: &str) -> CloudResult<String> {
        let state = self.record("get_queue_url", queue_name)?;
        if state.queues.contains_key(queue_name) {
            Ok(url_for(queue_name))
        } else {
            Err(CloudError::not_found("Queue", queue_name))
        }
    }

    async fn queue_arn(&self, queue_url: &str) -> CloudResult<String> {
        let name = name_from_url(queue_url);
        let _state = self.record("get_queue_arn", &name)?;
        Ok(format!("arn:aws:sqs:{REGION}:{ACCOUNT}:{name}"))
    }

    async fn create_queue(
        &self,
        queue_name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<String> {
        let mut state = self.record("create_queue", queue_name)?;
        state.queues.insert(
            queue_name.to_string(),
            FakeQueue {
                attributes: attributes.clone(),
                messages: Vec::new(),
            },
        );
        Ok(url_for(queue_name))
    }

    async fn set_queue_attributes(
        &self,
        queue_url: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<()> {
        let name = name_from_url(queue_url);
        let mut state = self.record("set_queue_attributes", &name)?;
        let queue = state
            .queues
            .get_mut(&name)
            .ok_or_else(|| CloudError::not_found("Queue", &name))?;
        queue.attributes.extend(attributes.clone());
        Ok(())
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> CloudResult<()> {
        let name = name_from_url(queue_url);
        drop(self.record("send_message", &name)?);
        self.enqueue(&name, body);
        Ok(())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: u32,
        _wait_seconds: u32,
    ) -> CloudResult<Vec<QueueMessage>> {
        let name = name_from_url(queue_url);
        let state = self.record("receive_message", &name)?;
        let queue = state
            .queues
            .get(&name)
            .ok_or_else(|| CloudError::not_found("Queue", &name))?;
        Ok(queue
            .messages
            .iter()
            .take(max_messages as usize)
            .cloned()
            .collect())
    }

    async fn delete_messages(&self, queue_url: &str, entries: &[DeleteEntry]) -> CloudResult<()> {
        let name = name_from_url(queue_url);
        let mut state = self.record("delete_message_batch", &name)?;
        let queue = state
            .queues
            .get_mut(&name)
            .ok_or_else(|| CloudError::not_found("Queue", &name))?;
        queue.messages.retain(|m| {
            !entries
                .iter()
                .any(|e| e.id == m.message_id && e.receipt_handle == m.receipt_handle)
        });
        Ok(())
    }

    async fn purge_queue(&self, queue_url: &str) -> CloudResult<()> {
        let name = name_from_url(queue_url);
        let mut state = self.record("purge_queue", &name)?;
        if let Some(queue) = state.queues.get_mut(&name) {
            queue.messages.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl TopicApi for FakeCloud {
    async fn create_topic(&self, topic_name: &str) -> CloudResult<String> {
        let mut state = self.record("create_topic", topic_name)?;
        state.topics.insert(topic_name.to_string());
        Ok(format!("arn:aws:sns:{REGION}:{ACCOUNT}:{topic_name}"))
    }

    async fn list_subscriptions(&self) -> CloudResult<Vec<Subscription>> {
        let state = self.record("list_subscriptions", "*")?;
        Ok(state.subscriptions.clone())
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> CloudResult<()> {
        let mut state = self.record("unsubscribe", subscription_arn)?;
        state
            .subscriptions
            .retain(|s| s.subscription_arn != subscription_arn);
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
        attributes: &BTreeMap<String, String>,
    ) -> CloudResult<()> {
        let mut state = self.record("subscribe", topic_arn)?;
        let n = state.subscriptions.len();
        state.subscriptions.push(Subscription {
            subscription_arn: format!("{topic_arn}:{protocol}-{n}"),
            topic_arn: topic_arn.to_string(),
            endpoint: endpoint.to_string(),
        });
        // attributes are checked through the call log
        let rendered = serde_json::to_string(attributes).unwrap();
        state.calls.push(format!("subscribe_attributes:{endpoint}={rendered}"));
        Ok(())
    }

    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: &BTreeMap<String, MessageAttribute>,
    ) -> CloudResult<()> {
        let mut state = self.record("publish", topic_arn)?;
        state.published.push(Published {
            topic_arn: topic_arn.to_string(),
            message: message.to_string(),
            attributes: attributes.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl SecretApi for FakeCloud {
    async fn describe_secret(&self, name: &str) -> CloudResult<()> {
        let state = self.record("describe_secret", name)?;
        if state.secrets.contains_key(name) {
            Ok(())
        } else {
            Err(CloudError::not_found("Secret", name))
        }
    }

    async fn put_secret_value(&self, name: &str, value: &SecretPayload) -> CloudResult<()> {
        let mut state = self.record("put_secret_value", name)?;
        state.secrets.insert(name.to_string(), value.clone());
        Ok(())
    }

    async fn create_secret(&self, name: &str, value: &SecretPayload) -> CloudResult<()> {
        let mut state = self.record("create_secret", name)?;
        state.secrets.insert(name.to_string(), value.clone());
        Ok(())
    }
}

#[async_trait]
impl IdentityApi for FakeCloud {
    async fn account_id(&self) -> CloudResult<String> {
        let _state = self.record("get_caller_identity", "*")?;
        Ok(ACCOUNT.to_string())
    }

    async fn region(&self) -> CloudResult<String> {
        Ok(REGION.to_string())
    }
}
