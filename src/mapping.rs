// src/mapping.rs

//! One pass of an event source mapping: receive a batch, hand it to the
//! lambda, delete the batch if the lambda succeeded.

use serde_json::Value;

use crate::aws::{event_source, resource_arn, IdentityApi, QueueApi, ServiceName};
use crate::config::Config;
use crate::error::MappingError;
use crate::event::build_event;
use crate::lambda::LambdaInvoker;
use crate::message;

/// Run the named mapping once.
///
/// Nothing is deleted unless the handler returns successfully, so a failed
/// batch becomes visible again on the queue after its visibility timeout.
pub async fn run<C>(
    cloud: &C,
    invoker: &LambdaInvoker,
    config: &Config,
    mapping_name: &str,
) -> Result<Value, MappingError>
where
    C: QueueApi + IdentityApi + ?Sized,
{
    let mapping = config.mapping(mapping_name)?;

    let region = cloud.region().await?;
    let account_id = cloud.account_id().await?;
    let source_arn = resource_arn(ServiceName::Sqs, &region, &account_id, &mapping.queue);
    let source = event_source(ServiceName::Sqs, &region);

    tracing::info!(
        "Running {:?} mapping ({} -> {})...",
        mapping_name,
        mapping.queue,
        mapping.function_name
    );

    let batch = message::receive(
        cloud,
        &mapping.queue,
        mapping.batch_size,
        mapping.maximum_batching_window,
    )
    .await?;

    let event = build_event(&region, &source, &source_arn, &batch);
    let result = invoker.invoke(&mapping.function_name, event).await?;

    message::delete(cloud, &mapping.queue, &batch).await?;

    Ok(result)
}
