// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Consumption
//!
//! Per-delivery processing for a bound queue: decode the body, invoke the
//! bound handler under a consumer span, and ack on success. A handler
//! failure leaves the message unacknowledged so the broker's redelivery
//! policy decides what happens next; nothing here may crash the loop.

use crate::{errors::AmqpError, handler::InboundMessage, otel, subscription::HandlerBinding};
use lapin::{message::Delivery, options::BasicAckOptions, Channel};
use opentelemetry::{
    global::BoxedTracer,
    trace::{Span, Status},
};
use std::borrow::Cow;
use tracing::{debug, error};

pub(crate) async fn process_delivery(
    tracer: &BoxedTracer,
    delivery: &Delivery,
    binding: &HandlerBinding,
    channel: &Channel,
) -> Result<(), AmqpError> {
    let message = InboundMessage::from_delivery(delivery);

    let (ctx, mut span) = otel::consumer_span(&delivery.properties, tracer, &message.routing_key);

    debug!(
        exchange = message.exchange.as_str(),
        routing_key = message.routing_key.as_str(),
        service = binding.service(),
        method = binding.method(),
        "delivery received"
    );

    match binding.handler.handle(&ctx, &message, channel).await {
        Ok(()) => match delivery.ack(BasicAckOptions { multiple: false }).await {
            Ok(()) => {
                span.set_status(Status::Ok);
                Ok(())
            }
            Err(err) => {
                error!(
                    error = err.to_string(),
                    routing_key = message.routing_key.as_str(),
                    "error to ack msg"
                );
                span.record_error(&err);
                span.set_status(Status::Error {
                    description: Cow::from("error to ack msg"),
                });
                Err(AmqpError::AckMessageError)
            }
        },
        Err(err) => {
            // Left unacked on purpose: redelivery/DLQ policy is the broker's.
            error!(
                error = err.to_string(),
                routing_key = message.routing_key.as_str(),
                service = binding.service(),
                method = binding.method(),
                "handler failed, message left unacknowledged"
            );
            span.record_error(&err);
            span.set_status(Status::Error {
                description: Cow::from("handler failure"),
            });
            Ok(())
        }
    }
}
