// src/message.rs

//! Message gateway: send, receive, delete and purge on queues, publish on
//! topics.
//!
//! Queue URLs and topic ARNs are resolved on every call.

use std::collections::BTreeMap;

use crate::aws::{
    resource_arn, DeleteEntry, IdentityApi, MessageAttribute, QueueApi, QueueMessage,
    ServiceName, TopicApi,
};
use crate::error::GatewayError;

/// The messages returned by one receive call. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessageBatch {
    messages: Vec<QueueMessage>,
}

impl ReceivedMessageBatch {
    pub fn messages(&self) -> &[QueueMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    fn delete_entries(&self) -> Vec<DeleteEntry> {
        self.messages
            .iter()
            .map(|m| DeleteEntry {
                id: m.message_id.clone(),
                receipt_handle: m.receipt_handle.clone(),
            })
            .collect()
    }
}

impl From<Vec<QueueMessage>> for ReceivedMessageBatch {
    fn from(messages: Vec<QueueMessage>) -> Self {
        Self { messages }
    }
}

pub async fn send<C>(cloud: &C, queue_name: &str, body: &str) -> Result<(), GatewayError>
where
    C: QueueApi + ?Sized,
{
    tracing::info!("Sending message to {:?} queue...", queue_name);
    let queue_url = cloud.queue_url(queue_name).await?;
    cloud.send_message(&queue_url, body).await?;
    Ok(())
}

/// Long-poll up to `batch_size` messages.
///
/// An empty result is `GatewayError::NoMessages`, not an empty batch.
pub async fn receive<C>(
    cloud: &C,
    queue_name: &str,
    batch_size: u32,
    max_wait_seconds: u32,
) -> Result<ReceivedMessageBatch, GatewayError>
where
    C: QueueApi + ?Sized,
{
    tracing::debug!(
        batch_size,
        max_wait_seconds,
        "Receiving messages from {:?} queue...",
        queue_name
    );
    let queue_url = cloud.queue_url(queue_name).await?;
    let messages = cloud
        .receive_messages(&queue_url, batch_size, max_wait_seconds)
        .await?;

    if messages.is_empty() {
        return Err(GatewayError::NoMessages {
            queue: queue_name.to_string(),
        });
    }

    tracing::info!("Received {} messages from {:?} queue", messages.len(), queue_name);
    Ok(messages.into())
}

pub async fn delete<C>(
    cloud: &C,
    queue_name: &str,
    batch: &ReceivedMessageBatch,
) -> Result<(), GatewayError>
where
    C: QueueApi + ?Sized,
{
    tracing::info!("Deleting {} messages from {:?} queue...", batch.len(), queue_name);
    let queue_url = cloud.queue_url(queue_name).await?;
    cloud
        .delete_messages(&queue_url, &batch.delete_entries())
        .await?;
    Ok(())
}

pub async fn purge<C>(cloud: &C, queue_name: &str) -> Result<(), GatewayError>
where
    C: QueueApi + ?Sized,
{
    tracing::info!("Purging {:?} queue...", queue_name);
    let queue_url = cloud.queue_url(queue_name).await?;
    cloud.purge_queue(&queue_url).await?;
    Ok(())
}

pub async fn publish<C>(
    cloud: &C,
    topic_name: &str,
    message: &str,
    attributes: &BTreeMap<String, MessageAttribute>,
) -> Result<(), GatewayError>
where
    C: TopicApi + IdentityApi + ?Sized,
{
    tracing::info!("Publishing message to {:?} topic...", topic_name);
    let region = cloud.region().await?;
    let account_id = cloud.account_id().await?;
    let topic_arn = resource_arn(ServiceName::Sns, &region, &account_id, topic_name);
    cloud.publish(&topic_arn, message, attributes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::{FakeCloud, ACCOUNT, REGION};
    use crate::error::CloudError;

    #[tokio::test]
    async fn send_resolves_url_then_enqueues() {
        let cloud = FakeCloud::new().with_queue("myqueue");

        send(&cloud, "myqueue", "hello").await.unwrap();

        assert_eq!(
            cloud.calls(),
            vec!["get_queue_url:myqueue", "send_message:myqueue"]
        );
        assert_eq!(cloud.messages("myqueue")[0].body, "hello");
    }

    #[tokio::test]
    async fn receive_returns_messages_up_to_batch_size() {
        let cloud = FakeCloud::new().with_queue("myqueue");
        for i in 0..5 {
            cloud.enqueue("myqueue", &format!("m{i}"));
        }

        let batch = receive(&cloud, "myqueue", 3, 0).await.unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.messages()[0].body, "m0");
        assert_eq!(batch.messages()[2].body, "m2");
    }

    #[tokio::test]
    async fn empty_receive_is_no_messages() {
        let cloud = FakeCloud::new().with_queue("myqueue");

        for (batch_size, wait) in [(1, 0), (10, 20)] {
            let err = receive(&cloud, "myqueue", batch_size, wait)
                .await
                .unwrap_err();
            assert!(err.is_no_messages());
            assert!(matches!(err, GatewayError::NoMessages { ref queue } if queue == "myqueue"));
        }
    }

    #[tokio::test]
    async fn transport_failure_is_not_no_messages() {
        let cloud = FakeCloud::new()
            .with_queue("myqueue")
            .failing("receive_message");

        let err = receive(&cloud, "myqueue", 10, 0).await.unwrap_err();

        assert!(!err.is_no_messages());
        assert!(matches!(err, GatewayError::Cloud(CloudError::Service { .. })));
    }

    #[tokio::test]
    async fn unknown_queue_is_not_found() {
        let cloud = FakeCloud::new();

        let err = receive(&cloud, "missing", 10, 0).await.unwrap_err();

        assert!(matches!(err, GatewayError::Cloud(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn delete_removes_exactly_the_batch() {
        let cloud = FakeCloud::new().with_queue("myqueue");
        for i in 0..3 {
            cloud.enqueue("myqueue", &format!("m{i}"));
        }

        let batch = receive(&cloud, "myqueue", 2, 0).await.unwrap();
        delete(&cloud, "myqueue", &batch).await.unwrap();

        let left = cloud.messages("myqueue");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].body, "m2");
        assert_eq!(cloud.calls_to("delete_message_batch").len(), 1);
    }

    #[tokio::test]
    async fn purge_clears_queue() {
        let cloud = FakeCloud::new().with_queue("myqueue");
        cloud.enqueue("myqueue", "a");
        cloud.enqueue("myqueue", "b");

        purge(&cloud, "myqueue").await.unwrap();

        assert!(cloud.messages("myqueue").is_empty());
        assert_eq!(
            cloud.calls(),
            vec!["get_queue_url:myqueue", "purge_queue:myqueue"]
        );
    }

    #[tokio::test]
    async fn publish_targets_topic_arn() {
        let cloud = FakeCloud::new();
        let attributes: BTreeMap<String, MessageAttribute> = serde_json::from_str(
            r#"{"kind": {"DataType": "String", "StringValue": "created"}}"#,
        )
        .unwrap();

        publish(&cloud, "mytopic", "payload", &BTreeMap::new())
            .await
            .unwrap();
        publish(&cloud, "mytopic", "payload", &attributes)
            .await
            .unwrap();

        let published = cloud.published();
        assert_eq!(published.len(), 2);
        assert_eq!(
            published[0].topic_arn,
            format!("arn:aws:sns:{REGION}:{ACCOUNT}:mytopic")
        );
        assert!(published[0].attributes.is_empty());
        assert_eq!(published[1].attributes, attributes);
    }
}
