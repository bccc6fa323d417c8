// src/infra.rs

//! Provisioning of the resources declared in the config: secrets, topics,
//! queues and topic subscriptions.
//!
//! Every step is an upsert, so running it twice leaves the same state.

use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

use crate::aws::{resource_arn, Cloud, IdentityApi, QueueApi, SecretApi, ServiceName, TopicApi};
use crate::config::{Config, QueueDefinition};
use crate::error::ProvisionError;

pub async fn create_secrets<C>(cloud: &C, config: &Config) -> Result<(), ProvisionError>
where
    C: SecretApi + ?Sized,
{
    for (name, secret) in &config.secrets {
        let payload = secret.payload();

        match cloud.describe_secret(name).await {
            Ok(()) => {
                tracing::info!("Updating {:?} secret...", name);
                cloud.put_secret_value(name, &payload).await?;
            }
            Err(err) if err.is_not_found() => {
                tracing::info!("Creating {:?} secret...", name);
                cloud.create_secret(name, &payload).await?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

pub async fn create_topics<C>(cloud: &C, config: &Config) -> Result<(), ProvisionError>
where
    C: TopicApi + ?Sized,
{
    for name in config.topics.keys() {
        tracing::info!("Creating {:?} topic...", name);
        cloud.create_topic(name).await?;
    }

    Ok(())
}

/// Order queues so every dead letter queue comes before the queues that
/// redrive into it.
///
/// Dead letter queues referenced but not defined are included. Ties are
/// broken by name.
pub fn queue_creation_order(
    queues: &BTreeMap<String, QueueDefinition>,
) -> Result<Vec<String>, ProvisionError> {
    // queue -> its dead letter queue
    let mut depends_on: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    for (name, queue) in queues {
        let dlq = queue
            .redrive_policy
            .as_ref()
            .map(|p| p.dead_letter_queue.as_str());
        depends_on.insert(name.as_str(), dlq);
        if let Some(dlq) = dlq {
            depends_on.entry(dlq).or_insert(None);
        }
    }

    let mut ready: BTreeSet<&str> = depends_on
        .iter()
        .filter(|(_, dlq)| dlq.is_none())
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(depends_on.len());

    while let Some(name) = ready.pop_first() {
        depends_on.remove(name);
        order.push(name.to_string());

        for (queue, dlq) in depends_on.iter_mut() {
            if *dlq == Some(name) {
                *dlq = None;
                ready.insert(*queue);
            }
        }
    }

    if !depends_on.is_empty() {
        return Err(ProvisionError::RedriveCycle {
            queues: depends_on.keys().map(|q| q.to_string()).collect(),
        });
    }

    Ok(order)
}

pub async fn create_queues<C>(cloud: &C, config: &Config) -> Result<(), ProvisionError>
where
    C: QueueApi + ?Sized,
{
    let order = queue_creation_order(&config.queues)?;

    for name in &order {
        let mut attributes = BTreeMap::new();

        if let Some(policy) = config
            .queues
            .get(name)
            .and_then(|q| q.redrive_policy.as_ref())
        {
            let dlq_url = cloud.queue_url(&policy.dead_letter_queue).await?;
            let dlq_arn = cloud.queue_arn(&dlq_url).await?;
            attributes.insert(
                "RedrivePolicy".to_string(),
                json!({
                    "deadLetterTargetArn": dlq_arn,
                    "maxReceiveCount": policy.max_receive_count,
                })
                .to_string(),
            );
        }

        match cloud.queue_url(name).await {
            Ok(url) => {
                tracing::info!("Updating {:?} queue...", name);
                cloud.set_queue_attributes(&url, &attributes).await?;
            }
            Err(err) if err.is_not_found() => {
                tracing::info!("Creating {:?} queue...", name);
                cloud.create_queue(name, &attributes).await?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

/// Replace every subscription on the account with the configured ones.
pub async fn subscribe_topics<C>(cloud: &C, config: &Config) -> Result<(), ProvisionError>
where
    C: TopicApi + IdentityApi + ?Sized,
{
    let region = cloud.region().await?;
    let account_id = cloud.account_id().await?;

    for subscription in cloud.list_subscriptions().await? {
        tracing::info!("Unsubscribing {:?}...", subscription.subscription_arn);
        cloud.unsubscribe(&subscription.subscription_arn).await?;
    }

    for (topic_name, topic) in &config.topics {
        let topic_arn = resource_arn(ServiceName::Sns, &region, &account_id, topic_name);

        for subscriber in &topic.subscribers {
            tracing::info!(
                "Subscribing {:?} topic to {:?} queue...",
                topic_name,
                subscriber.queue
            );

            let mut attributes = BTreeMap::new();
            attributes.insert(
                "RawMessageDelivery".to_string(),
                subscriber.raw_message_delivery.to_string(),
            );
            if let Some(policy) = &subscriber.filter_policy {
                attributes.insert("FilterPolicy".to_string(), policy.clone());
            }

            let endpoint = resource_arn(ServiceName::Sqs, &region, &account_id, &subscriber.queue);
            cloud
                .subscribe(&topic_arn, "sqs", &endpoint, &attributes)
                .await?;
        }
    }

    Ok(())
}

/// Secrets, topics, queues, then subscriptions.
pub async fn create_all<C>(cloud: &C, config: &Config) -> Result<(), ProvisionError>
where
    C: Cloud + ?Sized,
{
    create_secrets(cloud, config).await?;
    create_topics(cloud, config).await?;
    create_queues(cloud, config).await?;
    subscribe_topics(cloud, config).await
}
