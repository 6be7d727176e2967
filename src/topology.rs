// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Topology Management
//!
//! This module asserts the broker-side topology the subscriptions require:
//! exchanges first, then one queue per subscription, then the bindings
//! between them. Every operation is safe to replay on reconnect; asserting a
//! resource with identical parameters converges the broker state without
//! duplicating bindings.
//!
//! Queue names are resolved at bind time: a subscription with an empty queue
//! name gets a broker-generated one, which changes on every reconnect, so
//! [`ResolvedQueue`]s are rebuilt each cycle while the handler bindings
//! themselves are not.

use crate::{errors::AmqpError, exchange::ExchangeSpec, subscription::HandlerBinding};
use lapin::{options::QueueBindOptions, types::FieldTable, Channel};
use tracing::{debug, error};

/// A broker-confirmed queue name paired with the index of the handler binding
/// that consumes it. Exactly one binding consumes each resolved queue.
#[derive(Debug, Clone)]
pub struct ResolvedQueue {
    pub(crate) name: String,
    pub(crate) binding: usize,
}

impl ResolvedQueue {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Replays the declared topology against a freshly created channel.
pub struct AmqpTopology {
    exchanges: Vec<ExchangeSpec>,
}

impl AmqpTopology {
    pub fn new(exchanges: Vec<ExchangeSpec>) -> AmqpTopology {
        AmqpTopology { exchanges }
    }

    /// Asserts every declared exchange.
    ///
    /// Idempotent: re-asserting an exchange with identical parameters never
    /// errors.
    pub async fn setup_exchanges(&self, channel: &Channel) -> Result<(), AmqpError> {
        for exchange in &self.exchanges {
            debug!(name = exchange.name(), "declaring exchange");

            channel
                .exchange_declare(
                    exchange.name(),
                    exchange.kind.into(),
                    exchange.declare_options(),
                    FieldTable::default(),
                )
                .await
                .map_err(|err| {
                    error!(
                        error = err.to_string(),
                        name = exchange.name(),
                        "error to declare the exchange"
                    );
                    AmqpError::DeclareExchangeError(exchange.name().to_owned())
                })?;
        }

        Ok(())
    }

    /// Asserts the binding's queue and binds it to its exchange once per
    /// routing-key pattern, returning the broker-confirmed queue name.
    ///
    /// Each bind attempt is independent: a failing pattern does not abandon
    /// the remaining ones, and the first failure surfaces after all patterns
    /// were attempted.
    pub async fn bind_subscriber(
        &self,
        channel: &Channel,
        binding: &HandlerBinding,
    ) -> Result<String, AmqpError> {
        let spec = &binding.metadata.queue;

        let queue = channel
            .queue_declare(spec.name(), spec.declare_options(), spec.arguments())
            .await
            .map_err(|err| {
                error!(
                    error = err.to_string(),
                    queue = spec.name(),
                    "error to declare the queue"
                );
                AmqpError::DeclareQueueError(spec.name().to_owned())
            })?;

        let queue_name = queue.name().as_str().to_owned();
        debug!(queue = queue_name.as_str(), "queue declared");

        let mut failed = None;
        for routing_key in &binding.metadata.routing_keys {
            debug!(
                queue = queue_name.as_str(),
                exchange = binding.metadata.exchange.as_str(),
                routing_key = routing_key.as_str(),
                "binding queue"
            );

            if let Err(err) = channel
                .queue_bind(
                    &queue_name,
                    &binding.metadata.exchange,
                    routing_key,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
            {
                error!(
                    error = err.to_string(),
                    queue = queue_name.as_str(),
                    exchange = binding.metadata.exchange.as_str(),
                    routing_key = routing_key.as_str(),
                    "error to bind queue to exchange"
                );
                failed = Some(AmqpError::BindQueueError(
                    queue_name.clone(),
                    binding.metadata.exchange.clone(),
                ));
            }
        }

        if let Some(err) = failed {
            return Err(err);
        }

        Ok(queue_name)
    }
}
