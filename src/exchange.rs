// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Declarations
//!
//! This module provides the types used to declare the exchanges the
//! subscriber depends on. Each [`ExchangeSpec`] is declared once at startup
//! and asserted against the broker on every (re)connect; assertion with
//! identical parameters is idempotent on the broker side.

/// Routing behavior of an exchange.
///
/// - Direct: routes on an exact routing-key match
/// - Fanout: broadcasts to every bound queue
/// - Topic: routes on wildcard routing-key patterns
/// - Headers: routes on header values instead of routing keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> lapin::ExchangeKind {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
        }
    }
}

/// Declaration of an exchange with its assertion options.
///
/// Built once per deployment and re-asserted on every reconnect.
#[derive(Debug, Clone)]
pub struct ExchangeSpec {
    pub(crate) name: String,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
    pub(crate) auto_delete: bool,
    pub(crate) internal: bool,
    pub(crate) passive: bool,
    pub(crate) no_wait: bool,
}

impl ExchangeSpec {
    /// Creates a declaration for a direct exchange with default options.
    pub fn new(name: &str) -> ExchangeSpec {
        ExchangeSpec {
            name: name.to_owned(),
            kind: ExchangeKind::Direct,
            durable: false,
            auto_delete: false,
            internal: false,
            passive: false,
            no_wait: false,
        }
    }

    /// Sets the exchange kind.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the exchange to auto-delete when no longer used.
    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Makes the exchange internal, preventing direct publishing.
    pub fn internal(mut self) -> Self {
        self.internal = true;
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn declare_options(&self) -> lapin::options::ExchangeDeclareOptions {
        lapin::options::ExchangeDeclareOptions {
            passive: self.passive,
            durable: self.durable,
            auto_delete: self.auto_delete,
            internal: self.internal,
            nowait: self.no_wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_lapin() {
        assert_eq!(
            lapin::ExchangeKind::from(ExchangeKind::Topic),
            lapin::ExchangeKind::Topic
        );
        assert_eq!(
            lapin::ExchangeKind::from(ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        );
    }

    #[test]
    fn spec_builder_sets_options() {
        let spec = ExchangeSpec::new("catalog.events")
            .kind(ExchangeKind::Topic)
            .durable();

        assert_eq!(spec.name(), "catalog.events");
        assert_eq!(spec.kind, ExchangeKind::Topic);
        let options = spec.declare_options();
        assert!(options.durable);
        assert!(!options.auto_delete);
    }
}
