// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Publisher
//!
//! Thin publishing side used by handlers that re-emit events and by the
//! integration tests' publish-then-observe scenarios. Payloads are JSON,
//! stamped with a message id, and carry the current trace context in their
//! headers.

use crate::{errors::AmqpError, otel};
use lapin::{
    options::BasicPublishOptions,
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel,
};
use opentelemetry::Context;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use tracing::error;
use uuid::Uuid;

/// Content type stamped on every published message
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub struct AmqpPublisher {
    channel: Arc<Channel>,
}

impl AmqpPublisher {
    pub fn new(channel: Arc<Channel>) -> Arc<AmqpPublisher> {
        Arc::new(AmqpPublisher { channel })
    }

    /// Serializes the payload as JSON and publishes it to the exchange with
    /// the given routing key, propagating the current trace context through
    /// the message headers.
    pub async fn publish<T>(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &T,
    ) -> Result<(), AmqpError>
    where
        T: Serialize + Send + Sync,
    {
        let body = serde_json::to_vec(payload).map_err(|err| {
            error!(error = err.to_string(), "error serializing payload");
            AmqpError::SerializePayloadError
        })?;

        let mut headers = BTreeMap::<ShortString, AMQPValue>::default();
        otel::inject_context(&Context::current(), &mut headers);

        match self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &body,
                BasicProperties::default()
                    .with_content_type(ShortString::from(JSON_CONTENT_TYPE))
                    .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
                    .with_headers(FieldTable::from(headers)),
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    exchange,
                    routing_key,
                    "error publishing message"
                );
                Err(AmqpError::PublishingError)
            }
            _ => Ok(()),
        }
    }
}
