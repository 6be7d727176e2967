// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Integration
//!
//! Trace context flows through AMQP message headers: the publisher injects
//! the current context into outbound headers, and the consumption loop
//! extracts it to parent the per-delivery consumer span.

use lapin::{
    protocol::basic::AMQPProperties,
    types::{AMQPValue, ShortString},
};
use opentelemetry::{
    global::{BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, Tracer},
    Context,
};
use std::collections::BTreeMap;

/// Adapter exposing an AMQP header map as an OpenTelemetry carrier.
pub(crate) struct AmqpHeaderCarrier<'a> {
    headers: &'a mut BTreeMap<ShortString, AMQPValue>,
}

impl<'a> AmqpHeaderCarrier<'a> {
    pub(crate) fn new(headers: &'a mut BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Injector for AmqpHeaderCarrier<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.headers.insert(
            key.to_lowercase().into(),
            AMQPValue::LongString(value.into()),
        );
    }
}

impl Extractor for AmqpHeaderCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|value| match value {
            AMQPValue::LongString(value) => std::str::from_utf8(value.as_bytes()).ok(),
            AMQPValue::ShortString(value) => Some(value.as_str()),
            _ => None,
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|key| key.as_str()).collect()
    }
}

/// Injects the given context into an outbound header map.
pub(crate) fn inject_context(ctx: &Context, headers: &mut BTreeMap<ShortString, AMQPValue>) {
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(ctx, &mut AmqpHeaderCarrier::new(headers))
    });
}

/// Extracts the upstream context from delivery properties and starts a
/// consumer span parented on it.
pub(crate) fn consumer_span(
    props: &AMQPProperties,
    tracer: &BoxedTracer,
    name: &str,
) -> (Context, BoxedSpan) {
    let mut headers = props.headers().clone().unwrap_or_default().inner().clone();

    let ctx = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&AmqpHeaderCarrier::new(&mut headers))
    });

    let span = tracer
        .span_builder(name.to_owned())
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carrier_round_trips_header_values() {
        let mut headers = BTreeMap::new();

        let mut carrier = AmqpHeaderCarrier::new(&mut headers);
        carrier.set("Traceparent", "00-abc-def-01".to_owned());

        let carrier = AmqpHeaderCarrier::new(&mut headers);
        assert_eq!(carrier.get("traceparent"), Some("00-abc-def-01"));
        assert_eq!(carrier.get("missing"), None);
        assert_eq!(carrier.keys(), vec!["traceparent"]);
    }
}
