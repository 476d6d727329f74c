//! Topic-filter subscription table and inbound message dispatch.
//!
//! One table per session manager. The transport's read path and the
//! facade's write path both touch it: reads take a shared lock,
//! subscribe/unsubscribe writes are serialized by the exclusive lock.
//! Callbacks run on spawned tasks so a slow consumer never stalls the
//! read path or keep-alive processing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An inbound message handed to a subscription callback.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Callback invoked once per matching inbound message.
pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Mapping from topic filter (may contain `+`/`#` wildcards) to a
/// callback handle. Keys are unique per session manager.
#[derive(Default)]
pub struct SubscriptionTable {
    entries: RwLock<HashMap<String, MessageHandler>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `filter`. Returns true if an existing
    /// handler was replaced.
    pub fn insert(&self, filter: &str, handler: MessageHandler) -> bool {
        self.entries
            .write()
            .unwrap()
            .insert(filter.to_string(), handler)
            .is_some()
    }

    /// Remove the handler for `filter`. Returns true if one existed.
    pub fn remove(&self, filter: &str) -> bool {
        self.entries.write().unwrap().remove(filter).is_some()
    }

    /// Drop all entries. The table itself survives for re-subscription.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn contains(&self, filter: &str) -> bool {
        self.entries.read().unwrap().contains_key(filter)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Dispatch an inbound message to every matching handler, exactly
    /// once each, on spawned tasks. Returns the number of matches.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let handlers: Vec<MessageHandler> = {
            let entries = self.entries.read().unwrap();
            entries
                .iter()
                .filter(|(filter, _)| filter_matches(filter, topic))
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };

        if handlers.is_empty() {
            tracing::debug!(topic = %topic, "no subscription matches topic");
            return 0;
        }

        let matched = handlers.len();
        for handler in handlers {
            let message = InboundMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            };
            tokio::spawn(async move {
                handler(message);
            });
        }
        matched
    }
}

/// MQTT 3.1.1 topic filter matching: `+` matches one level, a trailing
/// `#` matches any number of remaining levels (including zero).
pub fn filter_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
