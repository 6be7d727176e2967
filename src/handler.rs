// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscriber Handlers
//!
//! This module defines the contract between the consumption loop and the
//! application: the [`SubscriberHandler`] trait implemented by service
//! methods, and the [`InboundMessage`] each handler receives.
//!
//! Payload decoding is best-effort: a body that is not valid JSON reaches the
//! handler with a `None` payload and intact delivery metadata, since some
//! handlers only need the routing key.

use crate::errors::AmqpError;
use async_trait::async_trait;
use lapin::{message::Delivery, Channel};
use opentelemetry::Context;
use tracing::debug;

/// A message delivered to a handler: raw bytes, delivery metadata, and the
/// best-effort decoded payload.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Decoded JSON body, or `None` when the body is not valid JSON.
    pub payload: Option<serde_json::Value>,
    /// Raw body bytes as delivered by the broker.
    pub data: Vec<u8>,
    pub exchange: String,
    pub routing_key: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
}

impl InboundMessage {
    pub(crate) fn from_delivery(delivery: &Delivery) -> InboundMessage {
        let payload = decode_payload(&delivery.data);
        if payload.is_none() {
            debug!(
                routing_key = delivery.routing_key.as_str(),
                "payload is not valid json, passing through as null"
            );
        }

        InboundMessage {
            payload,
            data: delivery.data.clone(),
            exchange: delivery.exchange.to_string(),
            routing_key: delivery.routing_key.to_string(),
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
        }
    }
}

pub(crate) fn decode_payload(data: &[u8]) -> Option<serde_json::Value> {
    serde_json::from_slice(data).ok()
}

/// Handler bound to a queue by a subscription.
///
/// A successful return acknowledges the message; an error leaves it
/// unacknowledged, deferring to the broker's redelivery policy. Handlers must
/// not share mutable state across invocations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        message: &InboundMessage,
        channel: &Channel,
    ) -> Result<(), AmqpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_json() {
        let payload = decode_payload(br#"{"id":"1","name":"Books"}"#).unwrap();
        assert_eq!(payload["name"], "Books");
    }

    #[test]
    fn invalid_json_decodes_to_none() {
        assert!(decode_payload(b"not json at all").is_none());
    }

    #[test]
    fn empty_body_decodes_to_none() {
        assert!(decode_payload(b"").is_none());
    }

    #[test]
    fn message_keeps_raw_bytes_alongside_null_payload() {
        let message = InboundMessage {
            payload: decode_payload(b"\xff\xfe"),
            data: vec![0xff, 0xfe],
            exchange: "catalog.events".to_owned(),
            routing_key: "category.created".to_owned(),
            delivery_tag: 7,
            redelivered: false,
        };

        assert!(message.payload.is_none());
        assert_eq!(message.data, vec![0xff, 0xfe]);
        assert_eq!(message.routing_key, "category.created");
    }
}
