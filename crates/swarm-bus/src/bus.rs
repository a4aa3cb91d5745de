//! The message bus: bounded storage, visibility, read tracking, listeners,
//! and debounced persistence.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use swarm_core::ids::MessageId;
use swarm_guardrails::MAX_MESSAGES;

use crate::message::{Message, MessageQuery, PostMessage};

/// Coalescing window between a mutation and the durable flush.
pub const FLUSH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default query result cap.
const DEFAULT_QUERY_LIMIT: usize = 100;

type Listener = Box<dyn Fn(&Message) + Send + Sync>;

/// Persistent, in-memory-primary store of inter-agent messages.
///
/// The in-memory list is authoritative; persistence is best-effort. Every
/// mutation schedules a debounced flush that serializes the whole list to a
/// temp file and atomically renames it over the destination. A flush in
/// progress never overlaps another; mutations during a flush are picked up
/// by the next one.
pub struct MessageBus {
    messages: Mutex<Vec<Message>>,
    listeners: RwLock<Vec<(u64, Listener)>>,
    /// Serializes listener notification so listeners observe posts in
    /// storage order. Acquired while `messages` is still held, released
    /// after the callbacks ran.
    notify_lock: Mutex<()>,
    next_listener_id: AtomicU64,
    capacity: usize,
    path: Option<PathBuf>,
    flush_signal: Arc<Notify>,
    cancel: CancellationToken,
}

impl MessageBus {
    /// An in-memory bus with no persistence (tests, ephemeral deployments).
    #[must_use]
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::build(None, MAX_MESSAGES))
    }

    /// A bus persisted to `path`, loading the existing dump if present and
    /// starting the background flusher. Must be called from a tokio
    /// runtime.
    #[must_use]
    pub fn with_persistence(path: PathBuf) -> Arc<Self> {
        let bus = Arc::new(Self::build(Some(path), MAX_MESSAGES));
        bus.load();
        bus.spawn_flusher();
        bus
    }

    /// An in-memory bus with an explicit capacity, for tests.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self::build(None, capacity))
    }

    fn build(path: Option<PathBuf>, capacity: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
            notify_lock: Mutex::new(()),
            next_listener_id: AtomicU64::new(0),
            capacity,
            path,
            flush_signal: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
        }
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Assign an ID and timestamp, append, trim to capacity, notify
    /// listeners, and schedule a flush. Returns the stored message.
    pub fn post(&self, post: PostMessage) -> Message {
        let mut messages = self.messages.lock();
        // Storage order and createdAt order must agree even if the clock
        // steps backwards between posts.
        let now = Utc::now();
        let created_at = match messages.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        let message = Message {
            id: MessageId::new(),
            from: post.from,
            from_name: post.from_name,
            to: post.to,
            channel: post.channel,
            kind: post.kind,
            content: post.content,
            metadata: post.metadata,
            created_at,
            read_by: std::collections::BTreeSet::new(),
            exclude_roles: post.exclude_roles,
        };
        messages.push(message.clone());
        let overflow = messages.len().saturating_sub(self.capacity);
        if overflow > 0 {
            let _ = messages.drain(..overflow);
        }
        // Take the notify lock before releasing storage so a racing post
        // cannot overtake this one between append and notification.
        let notify_guard = self.notify_lock.lock();
        drop(messages);
        self.notify_listeners(&message);
        drop(notify_guard);

        self.schedule_flush();
        message
    }

    /// Add `agent_id` to a message's read set. Returns whether anything
    /// changed; a flush is scheduled only on change.
    pub fn mark_read(&self, message_id: &str, agent_id: &str) -> bool {
        let changed = {
            let mut messages = self.messages.lock();
            messages
                .iter_mut()
                .find(|m| m.id.as_str() == message_id)
                .is_some_and(|m| m.read_by.insert(agent_id.to_owned()))
        };
        if changed {
            self.schedule_flush();
        }
        changed
    }

    /// Mark every message visible to `(agent_id, role)` as read by that
    /// agent. Returns how many messages were newly marked.
    pub fn mark_all_read(&self, agent_id: &str, role: Option<&str>) -> usize {
        let marked = {
            let mut messages = self.messages.lock();
            let mut count = 0;
            for m in messages
                .iter_mut()
                .filter(|m| m.is_visible_to(agent_id, role))
            {
                if m.read_by.insert(agent_id.to_owned()) {
                    count += 1;
                }
            }
            count
        };
        if marked > 0 {
            self.schedule_flush();
        }
        marked
    }

    /// Remove a message by ID.
    pub fn delete_message(&self, message_id: &str) -> bool {
        let removed = {
            let mut messages = self.messages.lock();
            let before = messages.len();
            messages.retain(|m| m.id.as_str() != message_id);
            messages.len() != before
        };
        if removed {
            self.schedule_flush();
        }
        removed
    }

    /// Remove every message sent by or addressed to a destroyed agent.
    pub fn cleanup_for_agent(&self, agent_id: &str) {
        let removed = {
            let mut messages = self.messages.lock();
            let before = messages.len();
            messages.retain(|m| m.from != agent_id && m.to.as_deref() != Some(agent_id));
            before - messages.len()
        };
        if removed > 0 {
            debug!(agent_id, removed, "cleaned up messages for destroyed agent");
            self.schedule_flush();
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Filtered query; returns the newest `limit` matches in original
    /// (oldest-first) order.
    #[must_use]
    pub fn query(&self, query: &MessageQuery) -> Vec<Message> {
        let messages = self.messages.lock();
        let matches: Vec<&Message> = messages
            .iter()
            .filter(|m| match (&query.to, &m.to) {
                (Some(to), Some(direct)) => direct == to,
                (Some(_), None) => !m.excludes_role(query.agent_role.as_deref()),
                (None, _) => true,
            })
            .filter(|m| query.from.as_deref().is_none_or(|from| m.from == from))
            .filter(|m| {
                query
                    .channel
                    .as_deref()
                    .is_none_or(|channel| m.channel.as_deref() == Some(channel))
            })
            .filter(|m| query.kind.as_deref().is_none_or(|kind| m.kind == kind))
            .filter(|m| {
                query
                    .unread_by
                    .as_deref()
                    .is_none_or(|agent| m.is_unread_by(agent))
            })
            .filter(|m| query.since.is_none_or(|since| m.created_at > since))
            .collect();

        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let skip = matches.len().saturating_sub(limit);
        matches.into_iter().skip(skip).cloned().collect()
    }

    /// Unread message count for `(agent_id, role)` under the same
    /// visibility rule as [`MessageBus::query`].
    #[must_use]
    pub fn unread_count(&self, agent_id: &str, role: Option<&str>) -> usize {
        let messages = self.messages.lock();
        messages
            .iter()
            .filter(|m| m.is_visible_to(agent_id, role) && m.is_unread_by(agent_id))
            .count()
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether the bus holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    // ── Listeners ──────────────────────────────────────────────────────

    /// Register a listener invoked for every posted message, in storage
    /// order. Listeners do not replay history and run on the posting
    /// thread: they may query the bus but must not post from inside the
    /// callback. The subscription unregisters on drop.
    #[must_use]
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&Message) + Send + Sync + 'static,
    ) -> BusSubscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Box::new(listener)));
        BusSubscription {
            id,
            bus: Arc::clone(self),
        }
    }

    fn notify_listeners(&self, message: &Message) {
        let listeners = self.listeners.read();
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
                warn!(listener_id = id, "message listener panicked");
            }
        }
    }

    // ── Persistence ────────────────────────────────────────────────────

    fn load(&self) {
        let Some(path) = &self.path else { return };
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<Message>>(&bytes) {
                Ok(mut loaded) => {
                    let overflow = loaded.len().saturating_sub(self.capacity);
                    if overflow > 0 {
                        let _ = loaded.drain(..overflow);
                    }
                    debug!(count = loaded.len(), path = %path.display(), "loaded message dump");
                    *self.messages.lock() = loaded;
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "corrupt message dump, starting empty");
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %path.display(), %error, "could not read message dump, starting empty");
            }
        }
    }

    fn spawn_flusher(self: &Arc<Self>) {
        let bus = Arc::clone(self);
        let signal = Arc::clone(&self.flush_signal);
        let cancel = self.cancel.clone();
        let _ = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = signal.notified() => {}
                    () = cancel.cancelled() => break,
                }
                // Coalesce bursts of mutations into one write.
                tokio::time::sleep(FLUSH_DEBOUNCE).await;
                if let Err(error) = bus.flush_now().await {
                    warn!(%error, "message flush failed, will retry on next mutation");
                }
            }
            debug!("message flusher stopped");
        });
    }

    fn schedule_flush(&self) {
        if self.path.is_some() {
            self.flush_signal.notify_one();
        }
    }

    /// Serialize the current list and atomically replace the dump file.
    pub async fn flush_now(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = self.messages.lock().clone();
        let bytes = serde_json::to_vec(&snapshot)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(count = snapshot.len(), path = %path.display(), "flushed messages");
        Ok(())
    }

    /// Stop the background flusher. Callers should `flush_now` first.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Handle for a registered bus listener; dropping it unregisters.
pub struct BusSubscription {
    id: u64,
    bus: Arc<MessageBus>,
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        self.bus.listeners.write().retain(|(id, _)| *id != self.id);
    }
}
