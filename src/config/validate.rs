// src/config/validate.rs

//! Structural checks run once after parsing.
//!
//! Errors are collected rather than returned on the first hit so a broken
//! config file can be fixed in one pass.

use crate::config::Config;
use crate::lambda::env::{is_valid_key, is_valid_value};

/// SQS limits for ReceiveMessage.
const MAX_BATCH_SIZE: u32 = 10;
const MAX_BATCHING_WINDOW: u32 = 20;

#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn push_error(&mut self, code: &'static str, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            code,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.errors.is_empty()
    }
}

pub fn validate_config(cfg: &Config) -> ValidationResult {
    let mut result = ValidationResult::ok();

    validate_mappings(cfg, &mut result);
    validate_lambdas(cfg, &mut result);
    validate_queues(cfg, &mut result);
    validate_topics(cfg, &mut result);

    result
}

/* ---------------- event source mappings ---------------- */

fn validate_mappings(cfg: &Config, result: &mut ValidationResult) {
    for (name, mapping) in &cfg.event_source_mapping {
        if !cfg.lambdas.contains_key(&mapping.function_name) {
            result.push_error(
                "MAPPING_LAMBDA_NOT_FOUND",
                format!(
                    "Event source mapping {} targets unknown lambda {}",
                    name, mapping.function_name
                ),
            );
        }

        if mapping.batch_size == 0 || mapping.batch_size > MAX_BATCH_SIZE {
            result.push_error(
                "MAPPING_BATCH_SIZE_INVALID",
                format!(
                    "Event source mapping {}: batch_size must be between 1 and {}",
                    name, MAX_BATCH_SIZE
                ),
            );
        }

        if mapping.maximum_batching_window > MAX_BATCHING_WINDOW {
            result.push_error(
                "MAPPING_BATCHING_WINDOW_INVALID",
                format!(
                    "Event source mapping {}: maximum_batching_window must be at most {}",
                    name, MAX_BATCHING_WINDOW
                ),
            );
        }
    }
}

/* ---------------- lambdas ---------------- */

fn validate_lambdas(cfg: &Config, result: &mut ValidationResult) {
    for (name, lambda) in &cfg.lambdas {
        for (key, value) in &lambda.environment {
            if !is_valid_key(key) {
                result.push_error(
                    "LAMBDA_ENV_KEY_INVALID",
                    format!(
                        "Lambda {}: environment key {:?} must be non-empty without '=' or NUL",
                        name, key
                    ),
                );
            }

            if !is_valid_value(value) {
                result.push_error(
                    "LAMBDA_ENV_VALUE_INVALID",
                    format!("Lambda {}: environment value for {:?} contains NUL", name, key),
                );
            }
        }
    }
}

/* ---------------- queues ---------------- */

fn validate_queues(cfg: &Config, result: &mut ValidationResult) {
    for (name, queue) in &cfg.queues {
        if let Some(policy) = &queue.redrive_policy {
            if policy.max_receive_count == 0 {
                result.push_error(
                    "QUEUE_MAX_RECEIVE_COUNT_INVALID",
                    format!("Queue {}: max_receive_count must be greater than zero", name),
                );
            }
        }
    }
}

/* ---------------- topics ---------------- */

fn validate_topics(cfg: &Config, result: &mut ValidationResult) {
    for (name, topic) in &cfg.topics {
        for subscriber in &topic.subscribers {
            let Some(policy) = &subscriber.filter_policy else {
                continue;
            };

            if serde_json::from_str::<serde_json::Value>(policy).is_err() {
                result.push_error(
                    "TOPIC_FILTER_POLICY_INVALID_JSON",
                    format!(
                        "Topic {} subscriber {}: filter_policy is not valid JSON",
                        name, subscriber.queue
                    ),
                );
            }
        }
    }
}
