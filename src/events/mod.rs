//! Event Bus
//!
//! In-process pub/sub with a bounded event history.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::vector::MetadataValue;

/// An application event
#[derive(Debug, Clone)]
pub struct Event {
    /// Event kind, the subscription key
    pub kind: String,
    /// Structured payload
    pub data: HashMap<String, MetadataValue>,
    /// Originating component
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: HashMap::new(),
            source: "system".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: HashMap<String, MetadataValue>) -> Self {
        self.data = data;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

type EventHandler = Box<dyn Fn(&Event) + Send + Sync>;

/// In-process event bus
///
/// Dispatch is synchronous: `publish` invokes every handler subscribed to
/// the event's kind before returning. Handles are cheap to clone and share
/// the same subscribers and history.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    subscribers: RwLock<HashMap<String, Vec<EventHandler>>>,
    history: RwLock<VecDeque<Event>>,
    max_history: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus keeping up to 1000 events of history
    pub fn new() -> Self {
        Self::with_history_limit(1000)
    }

    /// Create a bus with a custom history bound (0 disables history)
    pub fn with_history_limit(max_history: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(HashMap::new()),
                history: RwLock::new(VecDeque::new()),
                max_history,
            }),
        }
    }

    /// Subscribe a handler to an event kind
    pub fn subscribe<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let kind = kind.into();
        let mut subscribers = self.inner.subscribers.write().unwrap();
        subscribers
            .entry(kind.clone())
            .or_default()
            .push(Box::new(handler));
        debug!(kind = %kind, "Subscribed handler");
    }

    /// Publish an event to every handler of its kind
    ///
    /// The event lands in history first, evicting the oldest entry beyond
    /// the bound.
    pub fn publish(&self, event: Event) {
        if self.inner.max_history > 0 {
            let mut history = self.inner.history.write().unwrap();
            history.push_back(event.clone());
            while history.len() > self.inner.max_history {
                history.pop_front();
            }
        }

        let subscribers = self.inner.subscribers.read().unwrap();
        if let Some(handlers) = subscribers.get(&event.kind) {
            for handler in handlers {
                handler(&event);
            }
        }
        debug!(kind = %event.kind, "Published event");
    }

    /// Get recorded events, optionally filtered by kind
    pub fn history(&self, kind: Option<&str>) -> Vec<Event> {
        let history = self.inner.history.read().unwrap();
        match kind {
            Some(kind) => history.iter().filter(|e| e.kind == kind).cloned().collect(),
            None => history.iter().cloned().collect(),
        }
    }

    /// Get number of recorded events
    pub fn history_len(&self) -> usize {
        self.inner.history.read().unwrap().len()
    }

    /// Drop all recorded events
    pub fn clear_history(&self) {
        self.inner.history.write().unwrap().clear();
    }

    /// Get number of handlers subscribed to a kind
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap()
            .get(kind)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicU64::new(0));

        let counter = seen.clone();
        bus.subscribe("memory.added", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let counter = seen.clone();
        bus.subscribe("memory.added", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish(Event::new("memory.added"));
        assert_eq!(seen.load(Ordering::Relaxed), 2);
        assert_eq!(bus.subscriber_count("memory.added"), 2);
    }

    #[test]
    fn test_publish_ignores_other_kinds() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicU64::new(0));

        let counter = seen.clone();
        bus.subscribe("memory.added", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish(Event::new("memory.deleted"));
        assert_eq!(seen.load(Ordering::Relaxed), 0);
        assert_eq!(bus.history_len(), 1);
    }

    #[test]
    fn test_handler_sees_event_data() {
        let bus = EventBus::new();
        let seen = Arc::new(RwLock::new(None));

        let slot = seen.clone();
        bus.subscribe("cache.evicted", move |event| {
            *slot.write().unwrap() = event.data.get("key").cloned();
        });

        let mut data = HashMap::new();
        data.insert("key".to_string(), MetadataValue::Str("y".to_string()));
        bus.publish(Event::new("cache.evicted").with_data(data));

        assert_eq!(
            *seen.read().unwrap(),
            Some(MetadataValue::Str("y".to_string()))
        );
    }

    #[test]
    fn test_history_bounded_and_filterable() {
        let bus = EventBus::with_history_limit(3);

        bus.publish(Event::new("a"));
        bus.publish(Event::new("b"));
        bus.publish(Event::new("a"));
        bus.publish(Event::new("a"));

        assert_eq!(bus.history_len(), 3);
        // The oldest event fell off the ring
        assert_eq!(bus.history(Some("b")).len(), 1);
        assert_eq!(bus.history(Some("a")).len(), 2);
        assert_eq!(bus.history(None).len(), 3);
    }

    #[test]
    fn test_clear_history() {
        let bus = EventBus::new();
        bus.publish(Event::new("a"));

        bus.clear_history();
        assert_eq!(bus.history_len(), 0);
    }

    #[test]
    fn test_event_builder() {
        let event = Event::new("agent.reply").with_source("assistant");
        assert_eq!(event.kind, "agent.reply");
        assert_eq!(event.source, "assistant");
        assert!(event.data.is_empty());
    }
}
