//! Per-agent fan-out of the event stream.
//!
//! One producer (the supervisor) and many consumers (SSE connections).
//! Subscribing replays the retained tail and registers for live delivery
//! under a single lock, so a subscriber observes every event exactly once
//! and in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use swarm_sanitizer::Sanitizer;

use crate::event::AgentEvent;
use crate::log::{EventLog, EventRecord};

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<Arc<EventRecord>>,
}

struct AgentChannel {
    log: EventLog,
    subscribers: Vec<Subscriber>,
}

type ChannelMap = DashMap<String, Arc<Mutex<AgentChannel>>>;

/// Sanitize → append → deliver pipeline for every agent's event stream.
pub struct FanoutHub {
    sanitizer: Arc<Sanitizer>,
    channels: Arc<ChannelMap>,
    next_subscriber_id: AtomicU64,
    log_capacity: usize,
}

impl FanoutHub {
    /// A hub using the default retained-tail size.
    #[must_use]
    pub fn new(sanitizer: Arc<Sanitizer>) -> Self {
        Self::with_log_capacity(sanitizer, crate::log::DEFAULT_RETAINED_EVENTS)
    }

    /// A hub whose per-agent logs retain `log_capacity` events.
    #[must_use]
    pub fn with_log_capacity(sanitizer: Arc<Sanitizer>, log_capacity: usize) -> Self {
        Self {
            sanitizer,
            channels: Arc::new(DashMap::new()),
            next_subscriber_id: AtomicU64::new(0),
            log_capacity,
        }
    }

    /// Create the channel for a new agent. Idempotent.
    pub fn register(&self, agent_id: &str) {
        let _ = self
            .channels
            .entry(agent_id.to_owned())
            .or_insert_with(|| {
                Arc::new(Mutex::new(AgentChannel {
                    log: EventLog::with_capacity(self.log_capacity),
                    subscribers: Vec::new(),
                }))
            });
    }

    /// Whether a channel exists for the agent.
    #[must_use]
    pub fn contains(&self, agent_id: &str) -> bool {
        self.channels.contains_key(agent_id)
    }

    /// Sanitize an event, append it to the agent's log, and deliver it to
    /// every current subscriber. Returns the appended index, or `None` when
    /// the agent has no channel.
    ///
    /// An event that cannot be sanitized is dropped; a synthetic system
    /// error event takes its place so subscribers see that something was
    /// lost without ever seeing the unsanitized payload.
    pub fn publish(&self, agent_id: &str, event: &AgentEvent) -> Option<u64> {
        let channel = self.channels.get(agent_id)?.clone();
        let event = self.sanitized(agent_id, event);
        let mut guard = channel.lock();
        let record = guard.log.append(event);
        let index = record.index;
        deliver(&mut guard, &record);
        Some(index)
    }

    /// Sanitize an event and deliver it to current subscribers without
    /// appending it to the log. Replay after reconnect never reproduces
    /// injected events. Returns `false` when the agent has no channel.
    pub fn inject(&self, agent_id: &str, event: &AgentEvent) -> bool {
        let Some(channel) = self.channels.get(agent_id).map(|c| c.clone()) else {
            return false;
        };
        let event = self.sanitized(agent_id, event);
        let mut guard = channel.lock();
        // Local-only events carry the index the next logged event will get,
        // so clients can still order them against the log.
        let record = Arc::new(EventRecord {
            index: guard.log.next_index(),
            event,
        });
        deliver(&mut guard, &record);
        true
    }

    /// Atomically replay the retained tail with `index >= after` into a new
    /// subscription, then register it for live events. Returns `None` when
    /// the agent has no channel.
    #[must_use]
    pub fn subscribe(&self, agent_id: &str, after: Option<u64>) -> Option<Subscription> {
        let channel = self.channels.get(agent_id)?.clone();
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut guard = channel.lock();
        for record in guard.log.snapshot(after) {
            // The receiver is brand new; a send can only fail if rx was
            // dropped already, in which case registering is pointless.
            if tx.send(record).is_err() {
                return None;
            }
        }
        guard.subscribers.push(Subscriber { id, tx });
        drop(guard);

        Some(Subscription {
            agent_id: agent_id.to_owned(),
            subscriber_id: id,
            channels: Arc::clone(&self.channels),
            rx,
        })
    }

    /// Retained events with `index >= after`.
    #[must_use]
    pub fn snapshot(&self, agent_id: &str, after: Option<u64>) -> Option<Vec<Arc<EventRecord>>> {
        let channel = self.channels.get(agent_id)?.clone();
        let guard = channel.lock();
        Some(guard.log.snapshot(after))
    }

    /// The whole retained tail for an agent.
    #[must_use]
    pub fn all_events(&self, agent_id: &str) -> Option<Vec<Arc<EventRecord>>> {
        self.snapshot(agent_id, None)
    }

    /// The index the next published event would receive.
    #[must_use]
    pub fn next_index(&self, agent_id: &str) -> Option<u64> {
        let channel = self.channels.get(agent_id)?.clone();
        let guard = channel.lock();
        Some(guard.log.next_index())
    }

    /// Current live subscriber count for an agent.
    #[must_use]
    pub fn subscriber_count(&self, agent_id: &str) -> usize {
        self.channels
            .get(agent_id)
            .map_or(0, |c| c.lock().subscribers.len())
    }

    /// Deliver a terminal `destroyed` event, unsubscribe everyone, and
    /// remove the channel. Returns `false` when the agent has no channel.
    pub fn close(&self, agent_id: &str) -> bool {
        let Some((_, channel)) = self.channels.remove(agent_id) else {
            return false;
        };
        let mut guard = channel.lock();
        let record = guard.log.append(AgentEvent::destroyed());
        deliver(&mut guard, &record);
        guard.subscribers.clear();
        true
    }

    /// Number of registered agent channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The sanitizer shared by every channel.
    #[must_use]
    pub fn sanitizer(&self) -> &Arc<Sanitizer> {
        &self.sanitizer
    }

    fn sanitized(&self, agent_id: &str, event: &AgentEvent) -> AgentEvent {
        let result = event
            .to_value()
            .map_err(|e| e.to_string())
            .and_then(|value| {
                self.sanitizer
                    .sanitize(&value)
                    .map_err(|e| e.to_string())
            })
            .and_then(|clean| AgentEvent::from_value(clean).map_err(|e| e.to_string()));
        match result {
            Ok(event) => event,
            Err(error) => {
                warn!(agent_id, %error, "event dropped: sanitization failed");
                AgentEvent::system("sanitizer_error", "an event was dropped: sanitization failed")
            }
        }
    }
}

/// Send a record to every subscriber; a closed receiver is unregistered and
/// logged, the rest still receive the event.
fn deliver(channel: &mut AgentChannel, record: &Arc<EventRecord>) {
    channel.subscribers.retain(|sub| {
        let ok = sub.tx.send(Arc::clone(record)).is_ok();
        if !ok {
            warn!(subscriber_id = sub.id, "subscriber gone, unregistering");
        }
        ok
    });
}

/// A live subscription to one agent's event stream.
///
/// Dropping the subscription unsubscribes; doing so twice is harmless.
pub struct Subscription {
    agent_id: String,
    subscriber_id: u64,
    channels: Arc<ChannelMap>,
    rx: mpsc::UnboundedReceiver<Arc<EventRecord>>,
}

impl Subscription {
    /// The agent this subscription watches.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Wait for the next event. Returns `None` once the stream is closed
    /// and all buffered events have been consumed.
    pub async fn recv(&mut self) -> Option<Arc<EventRecord>> {
        self.rx.recv().await
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<EventRecord>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let channel = self
            .channels
            .get(&self.agent_id)
            .map(|entry| Arc::clone(&entry));
        if let Some(channel) = channel {
            channel
                .lock()
                .subscribers
                .retain(|sub| sub.id != self.subscriber_id);
        }
    }
}
