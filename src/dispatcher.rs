// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consume Dispatcher
//!
//! Attaches one consumption loop per resolved queue, all multiplexed over
//! the shared channel. Each loop is an independent task: a failing or
//! stalled handler on one queue never blocks another queue's loop, and
//! within a queue deliveries are processed sequentially so broker delivery
//! order is preserved.

use crate::{
    consumer::process_delivery,
    errors::AmqpError,
    subscription::HandlerBinding,
    topology::ResolvedQueue,
};
use futures_util::StreamExt;
use lapin::{options::BasicConsumeOptions, types::FieldTable, Channel};
use opentelemetry::global;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

pub(crate) struct AmqpDispatcher {
    channel: Arc<Channel>,
    bindings: Arc<Vec<HandlerBinding>>,
}

impl AmqpDispatcher {
    pub(crate) fn new(channel: Arc<Channel>, bindings: Arc<Vec<HandlerBinding>>) -> AmqpDispatcher {
        AmqpDispatcher { channel, bindings }
    }

    /// Attaches a consumer to every resolved queue and spawns its loop.
    ///
    /// The returned handles are aborted by the server on stop or reconnect;
    /// the loops also end on their own when the channel dies and the
    /// consumer streams close.
    pub(crate) async fn attach(
        &self,
        resolved: Vec<ResolvedQueue>,
    ) -> Result<Vec<JoinHandle<()>>, AmqpError> {
        let mut tasks: Vec<JoinHandle<()>> = vec![];

        for queue in resolved {
            let consumer_tag = format!("{}-{}", queue.name(), Uuid::new_v4());

            let mut consumer = match self
                .channel
                .basic_consume(
                    queue.name(),
                    &consumer_tag,
                    BasicConsumeOptions {
                        no_local: false,
                        no_ack: false,
                        exclusive: false,
                        nowait: false,
                    },
                    FieldTable::default(),
                )
                .await
            {
                Ok(consumer) => consumer,
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        queue = queue.name(),
                        "error to create the consumer"
                    );
                    for task in &tasks {
                        task.abort();
                    }
                    return Err(AmqpError::CreateConsumerError(queue.name().to_owned()));
                }
            };

            let channel = self.channel.clone();
            let bindings = self.bindings.clone();
            let binding_index = queue.binding;
            let queue_name = queue.name().to_owned();

            tasks.push(tokio::spawn(async move {
                let tracer = global::tracer("amqp-subscriber");
                let binding = &bindings[binding_index];

                while let Some(result) = consumer.next().await {
                    match result {
                        Ok(delivery) => {
                            if let Err(err) =
                                process_delivery(&tracer, &delivery, binding, &channel).await
                            {
                                error!(
                                    error = err.to_string(),
                                    queue = queue_name.as_str(),
                                    "error consuming delivery"
                                );
                            }
                        }
                        // Stream-level noise (consumer cancel, channel churn)
                        // is not fatal to the loop.
                        Err(err) => {
                            warn!(
                                error = err.to_string(),
                                queue = queue_name.as_str(),
                                "consumer stream error"
                            );
                        }
                    }
                }

                debug!(queue = queue_name.as_str(), "consumer stream closed");
            }));
        }

        Ok(tasks)
    }
}
