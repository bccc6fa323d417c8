// src/event.rs

//! The SQS event envelope Lambda hands to a handler.
//!
//! Field names follow the wire format exactly (`Records`, `messageId`,
//! `eventSourceARN`, ...), so handlers that deserialize the JSON form see
//! what they would see on AWS.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::message::ReceivedMessageBatch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
    pub message_attributes: BTreeMap<String, Value>,
    pub md5_of_body: String,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

/// Wrap a received batch into an event, one record per message, in order.
pub fn build_event(
    aws_region: &str,
    event_source: &str,
    event_source_arn: &str,
    batch: &ReceivedMessageBatch,
) -> SqsEvent {
    SqsEvent {
        records: batch
            .messages()
            .iter()
            .map(|m| SqsRecord {
                message_id: m.message_id.clone(),
                receipt_handle: m.receipt_handle.clone(),
                body: m.body.clone(),
                attributes: BTreeMap::new(),
                message_attributes: BTreeMap::new(),
                md5_of_body: m.md5_of_body.clone(),
                event_source: event_source.to_string(),
                event_source_arn: event_source_arn.to_string(),
                aws_region: aws_region.to_string(),
            })
            .collect(),
    }
}
