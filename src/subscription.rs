// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscription Registry
//!
//! This module holds the declarative side of the subscriber: the
//! [`SubscriptionMetadata`] each handler method attaches to, the
//! [`AmqpService`] trait application services implement to expose their
//! subscriptions, and the [`ServiceRegistry`] that walks registered services
//! at startup to produce the ordered list of [`HandlerBinding`]s.
//!
//! Registration order is preserved so the resulting binding list is
//! deterministic within a run. Malformed metadata (missing exchange or
//! routing key) and two subscriptions claiming the same queue are fatal
//! startup errors; failing fast is preferred over silently dropping a
//! subscription.

use crate::{errors::AmqpError, handler::SubscriberHandler, queue::QueueSpec};
use std::{collections::HashSet, sync::Arc};

/// Topic-binding metadata attached to exactly one handler method.
#[derive(Debug, Clone)]
pub struct SubscriptionMetadata {
    pub(crate) exchange: String,
    pub(crate) routing_keys: Vec<String>,
    pub(crate) queue: QueueSpec,
}

impl SubscriptionMetadata {
    /// Creates metadata binding against the given exchange, with a
    /// broker-named queue until one is set.
    pub fn new(exchange: &str) -> SubscriptionMetadata {
        SubscriptionMetadata {
            exchange: exchange.to_owned(),
            routing_keys: vec![],
            queue: QueueSpec::server_named(),
        }
    }

    /// Adds a routing-key pattern. Patterns are bound independently.
    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_keys.push(key.to_owned());
        self
    }

    /// Sets the queue declaration for this subscription.
    pub fn queue(mut self, spec: QueueSpec) -> Self {
        self.queue = spec;
        self
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn routing_keys(&self) -> &[String] {
        &self.routing_keys
    }
}

/// One handler method declared by a service: its name, its metadata, and the
/// callable bound to the service instance.
pub struct Subscription {
    pub method: String,
    pub metadata: SubscriptionMetadata,
    pub handler: Arc<dyn SubscriberHandler>,
}

impl Subscription {
    pub fn new(
        method: &str,
        metadata: SubscriptionMetadata,
        handler: Arc<dyn SubscriberHandler>,
    ) -> Subscription {
        Subscription {
            method: method.to_owned(),
            metadata,
            handler,
        }
    }
}

/// A service instance exposing its declared subscriptions.
///
/// This is the explicit registration table that replaces decorator scanning:
/// each service lists its subscribing methods once, at startup.
pub trait AmqpService: Send + Sync {
    fn name(&self) -> &str;

    /// Subscriptions declared by this service, in declaration order. A
    /// service with nothing to declare returns an empty list and contributes
    /// no bindings.
    fn subscriptions(&self) -> Vec<Subscription>;
}

/// Pairing of a [`SubscriptionMetadata`] with a callable bound to a specific
/// service instance. Created once at startup; lives for the process lifetime.
pub struct HandlerBinding {
    pub(crate) service: String,
    pub(crate) method: String,
    pub(crate) metadata: SubscriptionMetadata,
    pub(crate) handler: Arc<dyn SubscriberHandler>,
}

impl HandlerBinding {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn metadata(&self) -> &SubscriptionMetadata {
        &self.metadata
    }
}

/// Registry of the application services whose subscriptions drive the
/// consumer topology.
#[derive(Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<dyn AmqpService>>,
}

impl ServiceRegistry {
    pub fn new() -> ServiceRegistry {
        ServiceRegistry::default()
    }

    /// Registers a service instance. Order of registration is the order its
    /// bindings are produced in.
    pub fn register(&mut self, service: Arc<dyn AmqpService>) {
        self.services.push(service);
    }

    pub fn services(&self) -> &[Arc<dyn AmqpService>] {
        &self.services
    }

    /// Walks every registered service and produces the ordered list of
    /// handler bindings.
    ///
    /// Fails on the first malformed subscription (missing exchange or routing
    /// key) or when two subscriptions claim the same explicit queue name; a
    /// queue is never consumed by more than one handler.
    pub fn bindings(&self) -> Result<Vec<HandlerBinding>, AmqpError> {
        let mut bindings = vec![];
        let mut claimed_queues = HashSet::new();

        for service in &self.services {
            for subscription in service.subscriptions() {
                let identity = format!("{}.{}", service.name(), subscription.method);

                if subscription.metadata.exchange.is_empty() {
                    return Err(AmqpError::InvalidSubscription(format!(
                        "{identity} declares no exchange"
                    )));
                }

                if subscription.metadata.routing_keys.is_empty() {
                    return Err(AmqpError::InvalidSubscription(format!(
                        "{identity} declares no routing key"
                    )));
                }

                let queue_name = subscription.metadata.queue.name();
                if !queue_name.is_empty() && !claimed_queues.insert(queue_name.to_owned()) {
                    return Err(AmqpError::DuplicateQueueError(queue_name.to_owned()));
                }

                bindings.push(HandlerBinding {
                    service: service.name().to_owned(),
                    method: subscription.method,
                    metadata: subscription.metadata,
                    handler: subscription.handler,
                });
            }
        }

        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::MockSubscriberHandler;

    struct FakeService {
        name: &'static str,
        subscriptions: Vec<(String, SubscriptionMetadata)>,
    }

    impl AmqpService for FakeService {
        fn name(&self) -> &str {
            self.name
        }

        fn subscriptions(&self) -> Vec<Subscription> {
            self.subscriptions
                .iter()
                .map(|(method, metadata)| {
                    Subscription::new(
                        method,
                        metadata.clone(),
                        Arc::new(MockSubscriberHandler::new()),
                    )
                })
                .collect()
        }
    }

    fn metadata(queue: &str) -> SubscriptionMetadata {
        SubscriptionMetadata::new("catalog.events")
            .routing_key("category.created")
            .queue(QueueSpec::named(queue))
    }

    #[test]
    fn bindings_follow_registration_order() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(FakeService {
            name: "category-sync",
            subscriptions: vec![
                ("on_created".to_owned(), metadata("q.category.created")),
                ("on_updated".to_owned(), metadata("q.category.updated")),
            ],
        }));
        registry.register(Arc::new(FakeService {
            name: "genre-sync",
            subscriptions: vec![("on_created".to_owned(), metadata("q.genre.created"))],
        }));

        let bindings = registry.bindings().unwrap();

        let identities: Vec<String> = bindings
            .iter()
            .map(|b| format!("{}.{}", b.service(), b.method()))
            .collect();
        assert_eq!(
            identities,
            vec![
                "category-sync.on_created",
                "category-sync.on_updated",
                "genre-sync.on_created"
            ]
        );
    }

    #[test]
    fn service_without_subscriptions_contributes_nothing() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(FakeService {
            name: "idle",
            subscriptions: vec![],
        }));

        assert!(registry.bindings().unwrap().is_empty());
    }

    #[test]
    fn missing_exchange_is_fatal() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(FakeService {
            name: "broken",
            subscriptions: vec![(
                "on_created".to_owned(),
                SubscriptionMetadata::new("").routing_key("category.created"),
            )],
        }));

        assert!(matches!(
            registry.bindings(),
            Err(AmqpError::InvalidSubscription(reason)) if reason.contains("broken.on_created")
        ));
    }

    #[test]
    fn missing_routing_key_is_fatal() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(FakeService {
            name: "broken",
            subscriptions: vec![(
                "on_created".to_owned(),
                SubscriptionMetadata::new("catalog.events"),
            )],
        }));

        assert!(matches!(
            registry.bindings(),
            Err(AmqpError::InvalidSubscription(_))
        ));
    }

    #[test]
    fn duplicate_queue_claim_is_fatal() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(FakeService {
            name: "first",
            subscriptions: vec![("on_created".to_owned(), metadata("q.shared"))],
        }));
        registry.register(Arc::new(FakeService {
            name: "second",
            subscriptions: vec![("on_created".to_owned(), metadata("q.shared"))],
        }));

        assert!(matches!(
            registry.bindings(),
            Err(AmqpError::DuplicateQueueError(queue)) if queue == "q.shared"
        ));
    }

    #[test]
    fn broker_named_queues_never_collide() {
        let mut registry = ServiceRegistry::new();
        registry.register(Arc::new(FakeService {
            name: "first",
            subscriptions: vec![(
                "on_created".to_owned(),
                SubscriptionMetadata::new("catalog.events").routing_key("category.created"),
            )],
        }));
        registry.register(Arc::new(FakeService {
            name: "second",
            subscriptions: vec![(
                "on_updated".to_owned(),
                SubscriptionMetadata::new("catalog.events").routing_key("category.updated"),
            )],
        }));

        assert_eq!(registry.bindings().unwrap().len(), 2);
    }
}
