// src/aws/sdk.rs

//! Thin wrappers over the AWS SDK clients.
//!
//! Each function is one API call. SDK errors are folded into `CloudError`,
//! and only the service's own "does not exist" error becomes `NotFound`.

use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, QueueAttributeName};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::aws::{DeleteEntry, MessageAttribute, QueueMessage, SecretPayload, Subscription};
use crate::error::{CloudError, CloudResult};

fn sdk_failure<E, R>(operation: &'static str, err: SdkError<E, R>) -> CloudError
where
    E: std::error::Error + Send + Sync + 'static,
    R: fmt::Debug,
{
    CloudError::service(operation, DisplayErrorContext(&err).to_string())
}

fn queue_attributes(attributes: &BTreeMap<String, String>) -> HashMap<QueueAttributeName, String> {
    attributes
        .iter()
        .map(|(k, v)| (QueueAttributeName::from(k.as_str()), v.clone()))
        .collect()
}

/* ---------------- sqs ---------------- */

pub(super) async fn queue_url(client: &aws_sdk_sqs::Client, queue_name: &str) -> CloudResult<String> {
    let output = match client.get_queue_url().queue_name(queue_name).send().await {
        Ok(output) => output,
        Err(err) => {
            let missing = err.as_service_error().is_some_and(|e| {
                e.is_queue_does_not_exist()
                    || e.code().is_some_and(|code| code.contains("NonExistentQueue"))
            });
            if missing {
                return Err(CloudError::not_found("Queue", queue_name));
            }
            return Err(sdk_failure("GetQueueUrl", err));
        }
    };

    output
        .queue_url()
        .map(str::to_string)
        .ok_or_else(|| CloudError::service("GetQueueUrl", "response has no QueueUrl"))
}

pub(super) async fn queue_arn(client: &aws_sdk_sqs::Client, queue_url: &str) -> CloudResult<String> {
    let output = client
        .get_queue_attributes()
        .queue_url(queue_url)
        .attribute_names(QueueAttributeName::QueueArn)
        .send()
        .await
        .map_err(|err| sdk_failure("GetQueueAttributes", err))?;

    output
        .attributes()
        .and_then(|attrs| attrs.get(&QueueAttributeName::QueueArn))
        .cloned()
        .ok_or_else(|| CloudError::service("GetQueueAttributes", "response has no QueueArn"))
}

pub(super) async fn create_queue(
    client: &aws_sdk_sqs::Client,
    queue_name: &str,
    attributes: &BTreeMap<String, String>,
) -> CloudResult<String> {
    let output = client
        .create_queue()
        .queue_name(queue_name)
        .set_attributes(Some(queue_attributes(attributes)))
        .send()
        .await
        .map_err(|err| sdk_failure("CreateQueue", err))?;

    Ok(output.queue_url().unwrap_or_default().to_string())
}

pub(super) async fn set_queue_attributes(
    client: &aws_sdk_sqs::Client,
    queue_url: &str,
    attributes: &BTreeMap<String, String>,
) -> CloudResult<()> {
    client
        .set_queue_attributes()
        .queue_url(queue_url)
        .set_attributes(Some(queue_attributes(attributes)))
        .send()
        .await
        .map_err(|err| sdk_failure("SetQueueAttributes", err))?;
    Ok(())
}

pub(super) async fn send_message(
    client: &aws_sdk_sqs::Client,
    queue_url: &str,
    body: &str,
) -> CloudResult<()> {
    client
        .send_message()
        .queue_url(queue_url)
        .message_body(body)
        .send()
        .await
        .map_err(|err| sdk_failure("SendMessage", err))?;
    Ok(())
}

pub(super) async fn receive_messages(
    client: &aws_sdk_sqs::Client,
    queue_url: &str,
    max_messages: u32,
    wait_seconds: u32,
) -> CloudResult<Vec<QueueMessage>> {
    let output = client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(i32::try_from(max_messages).unwrap_or(i32::MAX))
        .wait_time_seconds(i32::try_from(wait_seconds).unwrap_or(i32::MAX))
        .send()
        .await
        .map_err(|err| sdk_failure("ReceiveMessage", err))?;

    Ok(output
        .messages()
        .iter()
        .map(|m| QueueMessage {
            message_id: m.message_id().unwrap_or_default().to_string(),
            receipt_handle: m.receipt_handle().unwrap_or_default().to_string(),
            body: m.body().unwrap_or_default().to_string(),
            md5_of_body: m.md5_of_body().unwrap_or_default().to_string(),
        })
        .collect())
}

pub(super) async fn delete_messages(
    client: &aws_sdk_sqs::Client,
    queue_url: &str,
    entries: &[DeleteEntry],
) -> CloudResult<()> {
    let entries = entries
        .iter()
        .map(|e| {
            DeleteMessageBatchRequestEntry::builder()
                .id(&e.id)
                .receipt_handle(&e.receipt_handle)
                .build()
                .map_err(|err| CloudError::service("DeleteMessageBatch", err.to_string()))
        })
        .collect::<CloudResult<Vec<_>>>()?;

    let output = client
        .delete_message_batch()
        .queue_url(queue_url)
        .set_entries(Some(entries))
        .send()
        .await
        .map_err(|err| sdk_failure("DeleteMessageBatch", err))?;

    if let Some(failed) = output.failed().first() {
        return Err(CloudError::service(
            "DeleteMessageBatch",
            format!(
                "entry {} not deleted: {}",
                failed.id(),
                failed.message().unwrap_or(failed.code())
            ),
        ));
    }
    Ok(())
}

pub(super) async fn purge_queue(client: &aws_sdk_sqs::Client, queue_url: &str) -> CloudResult<()> {
    client
        .purge_queue()
        .queue_url(queue_url)
        .send()
        .await
        .map_err(|err| sdk_failure("PurgeQueue", err))?;
    Ok(())
}

/* ---------------- sns ---------------- */

pub(super) async fn create_topic(client: &aws_sdk_sns::Client, topic_name: &str) -> CloudResult<String> {
    let output = client
        .create_topic()
        .name(topic_name)
        .send()
        .await
        .map_err(|err| sdk_failure("CreateTopic", err))?;

    Ok(output.topic_arn().unwrap_or_default().to_string())
}

pub(super) async fn list_subscriptions(client: &aws_sdk_sns::Client) -> CloudResult<Vec<Subscription>> {
    let mut subscriptions = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let output = client
            .list_subscriptions()
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|err| sdk_failure("ListSubscriptions", err))?;

        subscriptions.extend(output.subscriptions().iter().map(|s| Subscription {
            subscription_arn: s.subscription_arn().unwrap_or_default().to_string(),
            topic_arn: s.topic_arn().unwrap_or_default().to_string(),
            endpoint: s.endpoint().unwrap_or_default().to_string(),
        }));

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }

    Ok(subscriptions)
}

pub(super) async fn unsubscribe(client: &aws_sdk_sns::Client, subscription_arn: &str) -> CloudResult<()> {
    client
        .unsubscribe()
        .subscription_arn(subscription_arn)
        .send()
        .await
        .map_err(|err| sdk_failure("Unsubscribe", err))?;
    Ok(())
}

pub(super) async fn subscribe(
    client: &aws_sdk_sns::Client,
    topic_arn: &str,
    protocol: &str,
    endpoint: &str,
    attributes: &BTreeMap<String, String>,
) -> CloudResult<()> {
    client
        .subscribe()
        .topic_arn(topic_arn)
        .protocol(protocol)
        .endpoint(endpoint)
        .set_attributes(Some(attributes.clone().into_iter().collect()))
        .send()
        .await
        .map_err(|err| sdk_failure("Subscribe", err))?;
    Ok(())
}

pub(super) async fn publish(
    client: &aws_sdk_sns::Client,
    topic_arn: &str,
    message: &str,
    attributes: &BTreeMap<String, MessageAttribute>,
) -> CloudResult<()> {
    use aws_sdk_sns::primitives::Blob;
    use aws_sdk_sns::types::MessageAttributeValue;

    let mut message_attributes = HashMap::with_capacity(attributes.len());
    for (name, attr) in attributes {
        let value = MessageAttributeValue::builder()
            .data_type(&attr.data_type)
            .set_string_value(attr.string_value.clone())
            .set_binary_value(attr.binary_value.as_ref().map(|b| Blob::new(b.as_bytes())))
            .build()
            .map_err(|err| CloudError::service("Publish", err.to_string()))?;
        message_attributes.insert(name.clone(), value);
    }

    client
        .publish()
        .topic_arn(topic_arn)
        .message(message)
        .set_message_attributes(Some(message_attributes))
        .send()
        .await
        .map_err(|err| sdk_failure("Publish", err))?;
    Ok(())
}

/* ---------------- secrets manager ---------------- */

pub(super) async fn describe_secret(
    client: &aws_sdk_secretsmanager::Client,
    name: &str,
) -> CloudResult<()> {
    match client.describe_secret().secret_id(name).send().await {
        Ok(_) => Ok(()),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception()) =>
        {
            Err(CloudError::not_found("Secret", name))
        }
        Err(err) => Err(sdk_failure("DescribeSecret", err)),
    }
}

pub(super) async fn put_secret_value(
    client: &aws_sdk_secretsmanager::Client,
    name: &str,
    value: &SecretPayload,
) -> CloudResult<()> {
    use aws_sdk_secretsmanager::primitives::Blob;

    let request = client.put_secret_value().secret_id(name);
    let request = match value {
        SecretPayload::String(s) => request.secret_string(s),
        SecretPayload::Binary(b) => request.secret_binary(Blob::new(b.clone())),
    };
    request
        .send()
        .await
        .map_err(|err| sdk_failure("PutSecretValue", err))?;
    Ok(())
}

pub(super) async fn create_secret(
    client: &aws_sdk_secretsmanager::Client,
    name: &str,
    value: &SecretPayload,
) -> CloudResult<()> {
    use aws_sdk_secretsmanager::primitives::Blob;

    let request = client.create_secret().name(name);
    let request = match value {
        SecretPayload::String(s) => request.secret_string(s),
        SecretPayload::Binary(b) => request.secret_binary(Blob::new(b.clone())),
    };
    request
        .send()
        .await
        .map_err(|err| sdk_failure("CreateSecret", err))?;
    Ok(())
}

/* ---------------- sts ---------------- */

pub(super) async fn account_id(client: &aws_sdk_sts::Client) -> CloudResult<String> {
    let output = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|err| sdk_failure("GetCallerIdentity", err))?;

    output
        .account()
        .map(str::to_string)
        .ok_or(CloudError::MissingAccount)
}
