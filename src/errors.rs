// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the AMQP Subscriber
//!
//! This module provides the error taxonomy for the subscriber subsystem:
//! connection and channel failures, topology assertion failures (named by the
//! offending resource), consumer attachment failures, and the fatal startup
//! errors raised for malformed subscription metadata.

use thiserror::Error;

/// Represents errors that can occur while supervising the broker connection,
/// asserting topology, or consuming messages.
///
/// Topology variants carry the name of the resource whose assertion failed so
/// the failure can be reported against that resource. The only variants that
/// are fatal to the process are the startup configuration errors
/// (`InvalidSubscription`, `DuplicateQueueError`, `ConfigError`); everything
/// else is retried or isolated at runtime.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// Error loading or parsing the broker configuration
    #[error("failure to load broker configuration `{0}`")]
    ConfigError(String),

    /// Error establishing a connection to the broker
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error asserting an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error asserting a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to bind queue `{0}` to exchange `{1}`")]
    BindQueueError(String, String),

    /// Error attaching a consumer to a queue
    #[error("failure to attach a consumer to queue `{0}`")]
    CreateConsumerError(String),

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// Error serializing an outbound payload
    #[error("failure to serialize payload")]
    SerializePayloadError,

    /// A handler rejected or failed to process a message
    #[error("handler failure `{0}`")]
    HandlerError(String),

    /// A subscription declared by a service is malformed; fatal at startup
    #[error("invalid subscription `{0}`")]
    InvalidSubscription(String),

    /// Two subscriptions claim the same queue; fatal at startup
    #[error("queue `{0}` is claimed by more than one subscription")]
    DuplicateQueueError(String),

    /// The server was already stopped and cannot be restarted
    #[error("server already stopped")]
    ServerStoppedError,
}

impl AmqpError {
    /// Name of the broker resource or setup step this error belongs to, used
    /// when reporting setup failures against the resource that caused them.
    pub(crate) fn resource(&self) -> &str {
        match self {
            AmqpError::DeclareExchangeError(name)
            | AmqpError::DeclareQueueError(name)
            | AmqpError::CreateConsumerError(name)
            | AmqpError::BindQueueError(name, _) => name,
            AmqpError::ChannelError => "channel",
            _ => "connection",
        }
    }
}
