// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Declarations
//!
//! This module provides the [`QueueSpec`] builder used by subscriptions to
//! describe the queue they consume from. A spec with an empty name asks the
//! broker to generate one; the confirmed name is resolved at bind time and
//! changes across reconnects.

use lapin::{
    options::QueueDeclareOptions,
    types::{AMQPValue, FieldTable, LongInt, ShortString},
};
use std::collections::BTreeMap;

/// Header field used to specify message TTL
pub const AMQP_HEADERS_MESSAGE_TTL: &str = "x-message-ttl";
/// Header field used to specify maximum queue length
pub const AMQP_HEADERS_MAX_LENGTH: &str = "x-max-length";

/// Declaration of a queue with its assertion options.
#[derive(Debug, Clone, Default)]
pub struct QueueSpec {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) exclusive: bool,
    pub(crate) auto_delete: bool,
    pub(crate) passive: bool,
    pub(crate) no_wait: bool,
    pub(crate) ttl: Option<i32>,
    pub(crate) max_length: Option<i32>,
}

impl QueueSpec {
    /// Creates a declaration for a queue with the given name.
    pub fn named(name: &str) -> QueueSpec {
        QueueSpec {
            name: name.to_owned(),
            ..QueueSpec::default()
        }
    }

    /// Creates a declaration for a broker-named queue.
    ///
    /// The broker assigns a fresh name on every assertion, so the resolved
    /// name is only valid for the lifetime of the current connection.
    pub fn server_named() -> QueueSpec {
        QueueSpec::default()
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Makes the queue exclusive to the connection.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Sets the queue to auto-delete when the last consumer detaches.
    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Makes the assertion passive, checking for existence without creating.
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    /// Sets the no-wait flag, making the assertion non-blocking.
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    /// Sets the message Time-To-Live for the queue, in milliseconds.
    pub fn ttl(mut self, ttl: i32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the maximum number of messages the queue can hold.
    pub fn max_length(mut self, max: i32) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: self.passive,
            durable: self.durable,
            exclusive: self.exclusive,
            auto_delete: self.auto_delete,
            nowait: self.no_wait,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        let mut args = BTreeMap::new();

        if let Some(ttl) = self.ttl {
            args.insert(
                ShortString::from(AMQP_HEADERS_MESSAGE_TTL),
                AMQPValue::LongInt(LongInt::from(ttl)),
            );
        }

        if let Some(max) = self.max_length {
            args.insert(
                ShortString::from(AMQP_HEADERS_MAX_LENGTH),
                AMQPValue::LongInt(LongInt::from(max)),
            );
        }

        FieldTable::from(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_named_spec_has_empty_name() {
        let spec = QueueSpec::server_named().exclusive().auto_delete();
        assert_eq!(spec.name(), "");
        assert!(spec.declare_options().exclusive);
        assert!(spec.declare_options().auto_delete);
    }

    #[test]
    fn arguments_carry_ttl_and_max_length() {
        let spec = QueueSpec::named("svc.catalog.sync")
            .durable()
            .ttl(60_000)
            .max_length(1_000);

        let args = spec.arguments();
        assert!(args
            .inner()
            .contains_key(&ShortString::from(AMQP_HEADERS_MESSAGE_TTL)));
        assert!(args
            .inner()
            .contains_key(&ShortString::from(AMQP_HEADERS_MAX_LENGTH)));
    }

    #[test]
    fn arguments_empty_without_limits() {
        let spec = QueueSpec::named("svc.catalog.sync");
        assert!(spec.arguments().inner().is_empty());
    }
}
