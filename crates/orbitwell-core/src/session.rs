//! Session context store: session id -> bounded recent-turn history.
//!
//! Sharded map (DashMap) of per-session mutexes. Different sessions never contend;
//! one exchange (user turn, classification, assistant turn) runs under its
//! session's lock so concurrent requests on the same id cannot interleave.
//! Growth is bounded by a pluggable [`EvictionPolicy`].

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Turns kept per session (three user/assistant exchanges).
pub const MAX_TURNS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message by either side. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Recent history for one conversation. Never holds more than [`MAX_TURNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub session_id: String,
    turns: Vec<Turn>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::with_capacity(MAX_TURNS + 1),
        }
    }

    /// Append, then drop the oldest turns beyond [`MAX_TURNS`].
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        if self.turns.len() > MAX_TURNS {
            let excess = self.turns.len() - MAX_TURNS;
            self.turns.drain(..excess);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// At most the last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Shared, lockable session. Hold the guard for a whole exchange.
pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// Lock a session, recovering the data if a previous holder panicked.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, SessionContext> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Storage capability the orchestrator depends on.
pub trait SessionStore: Send + Sync {
    /// Handle for `session_id`, provisioning an empty session if unseen.
    fn session(&self, session_id: &str) -> SessionHandle;

    /// Handle for an existing session; never provisions.
    fn peek(&self, session_id: &str) -> Option<SessionHandle>;

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// Apply the eviction policy now. Returns how many sessions were dropped.
    fn evict_idle(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the session, provisioning it if unseen.
    fn get_or_create(&self, session_id: &str) -> SessionContext {
        lock_session(&self.session(session_id)).clone()
    }

    /// Append one turn and trim to [`MAX_TURNS`].
    fn append_turn(&self, session_id: &str, turn: Turn) {
        lock_session(&self.session(session_id)).push(turn);
    }

    /// At most the last `n` turns; empty for unknown sessions.
    fn recent_turns(&self, session_id: &str, n: usize) -> Vec<Turn> {
        self.peek(session_id)
            .map(|h| lock_session(&h).recent(n).to_vec())
            .unwrap_or_default()
    }
}

/// Usage snapshot handed to an eviction policy.
#[derive(Debug, Clone)]
pub struct SessionUsage {
    pub session_id: String,
    pub last_access: Instant,
    /// Logical access clock; larger = more recently used.
    pub recency: u64,
}

/// Decides which sessions to drop.
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    fn select_victims(&self, usage: &[SessionUsage], now: Instant) -> Vec<String>;
}

/// Never evicts. Sessions live for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn select_victims(&self, _usage: &[SessionUsage], _now: Instant) -> Vec<String> {
        Vec::new()
    }
}

/// Least-recently-used bound on session count, plus an optional idle timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct LruPolicy {
    pub max_sessions: Option<usize>,
    pub idle_ttl: Option<Duration>,
}

impl EvictionPolicy for LruPolicy {
    fn select_victims(&self, usage: &[SessionUsage], now: Instant) -> Vec<String> {
        let mut victims = Vec::new();
        let mut live: Vec<&SessionUsage> = Vec::with_capacity(usage.len());
        for u in usage {
            let idle = now.saturating_duration_since(u.last_access);
            match self.idle_ttl {
                Some(ttl) if idle >= ttl => victims.push(u.session_id.clone()),
                _ => live.push(u),
            }
        }
        if let Some(max) = self.max_sessions {
            if live.len() > max {
                live.sort_by_key(|u| u.recency);
                let excess = live.len() - max;
                victims.extend(live.iter().take(excess).map(|u| u.session_id.clone()));
            }
        }
        victims
    }
}

struct SessionSlot {
    handle: SessionHandle,
    last_access: Mutex<Instant>,
    recency: AtomicU64,
}

impl SessionSlot {
    fn new(session_id: &str, tick: u64) -> Self {
        Self {
            handle: Arc::new(Mutex::new(SessionContext::new(session_id))),
            last_access: Mutex::new(Instant::now()),
            recency: AtomicU64::new(tick),
        }
    }

    fn touch(&self, tick: u64) {
        *self.last_access.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.recency.store(tick, Ordering::Relaxed);
    }

    fn usage(&self, session_id: &str) -> SessionUsage {
        SessionUsage {
            session_id: session_id.to_string(),
            last_access: *self.last_access.lock().unwrap_or_else(PoisonError::into_inner),
            recency: self.recency.load(Ordering::Relaxed),
        }
    }
}

/// Process-local session store.
pub struct InMemorySessionStore {
    slots: DashMap<String, SessionSlot>,
    policy: Box<dyn EvictionPolicy>,
    clock: AtomicU64,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Unbounded)
    }
}

impl InMemorySessionStore {
    pub fn new(policy: impl EvictionPolicy + 'static) -> Self {
        Self::with_boxed_policy(Box::new(policy))
    }

    /// Store driven by a policy chosen at runtime (see `CompanionConfig::eviction_policy`).
    pub fn with_boxed_policy(policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            slots: DashMap::new(),
            policy,
            clock: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &dyn EvictionPolicy {
        self.policy.as_ref()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Run the policy; `keep` is never evicted (the session being provisioned).
    fn apply_policy(&self, keep: Option<&str>) -> usize {
        let usage: Vec<SessionUsage> = self
            .slots
            .iter()
            .map(|entry| entry.value().usage(entry.key()))
            .collect();
        let victims = self.policy.select_victims(&usage, Instant::now());
        let mut evicted = 0;
        for id in victims {
            if Some(id.as_str()) == keep {
                continue;
            }
            if self.slots.remove(&id).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::info!(evicted, live = self.slots.len(), "Evicted conversation sessions");
        }
        evicted
    }
}

impl SessionStore for InMemorySessionStore {
    fn session(&self, session_id: &str) -> SessionHandle {
        let tick = self.tick();
        if let Some(slot) = self.slots.get(session_id) {
            slot.touch(tick);
            return Arc::clone(&slot.handle);
        }
        let (handle, created) = {
            let mut created = false;
            let slot = self.slots.entry(session_id.to_string()).or_insert_with(|| {
                created = true;
                SessionSlot::new(session_id, tick)
            });
            slot.touch(tick);
            (Arc::clone(&slot.handle), created)
        };
        if created {
            tracing::debug!(session_id, "Provisioned conversation session");
            self.apply_policy(Some(session_id));
        }
        handle
    }

    fn peek(&self, session_id: &str) -> Option<SessionHandle> {
        self.slots.get(session_id).map(|slot| Arc::clone(&slot.handle))
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn evict_idle(&self) -> usize {
        self.apply_policy(None)
    }
}

impl fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .field("sessions", &self.slots.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_round_trip() {
        let store = InMemorySessionStore::default();
        store.append_turn("s1", Turn::user("hello"));
        store.append_turn("s1", Turn::assistant("hi there"));
        let ctx = store.get_or_create("s1");
        assert_eq!(ctx.turns(), &[Turn::user("hello"), Turn::assistant("hi there")]);
    }

    #[test]
    fn trims_oldest_first() {
        let mut ctx = SessionContext::new("s");
        for i in 0..9 {
            ctx.push(Turn::user(format!("m{}", i)));
            assert!(ctx.len() <= MAX_TURNS);
        }
        let contents: Vec<&str> = ctx.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5", "m6", "m7", "m8"]);
        assert_eq!(ctx.recent(2)[0].content, "m7");
        assert_eq!(ctx.recent(100).len(), MAX_TURNS);
    }

    #[test]
    fn get_or_create_provisions_unseen() {
        let store = InMemorySessionStore::default();
        assert!(store.is_empty());
        let ctx = store.get_or_create("new");
        assert_eq!(ctx.session_id, "new");
        assert!(ctx.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn recent_turns_does_not_provision() {
        let store = InMemorySessionStore::default();
        assert!(store.recent_turns("ghost", 6).is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn lru_keeps_most_recent_sessions() {
        let store = InMemorySessionStore::new(LruPolicy {
            max_sessions: Some(2),
            idle_ttl: None,
        });
        store.append_turn("a", Turn::user("1"));
        store.append_turn("b", Turn::user("2"));
        // touch "a" so "b" becomes least recently used
        store.append_turn("a", Turn::user("3"));
        store.append_turn("c", Turn::user("4"));
        assert_eq!(store.len(), 2);
        assert!(store.peek("a").is_some());
        assert!(store.peek("b").is_none());
        assert!(store.peek("c").is_some());
    }

    #[test]
    fn idle_ttl_sweep() {
        let store = InMemorySessionStore::new(LruPolicy {
            max_sessions: None,
            idle_ttl: Some(Duration::ZERO),
        });
        store.append_turn("a", Turn::user("1"));
        // provisioning "b" sweeps the idle "a" but never the new session
        store.append_turn("b", Turn::user("2"));
        assert!(store.peek("a").is_none());
        assert!(store.peek("b").is_some());
        assert_eq!(store.evict_idle(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn unbounded_never_evicts() {
        let store = InMemorySessionStore::default();
        for i in 0..50 {
            store.append_turn(&format!("s{}", i), Turn::user("x"));
        }
        assert_eq!(store.evict_idle(), 0);
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn lru_policy_prefers_idle_then_oldest() {
        let then = Instant::now();
        let now = then + Duration::from_secs(600);
        let usage = vec![
            SessionUsage { session_id: "old".into(), last_access: then, recency: 1 },
            SessionUsage { session_id: "mid".into(), last_access: now, recency: 2 },
            SessionUsage { session_id: "new".into(), last_access: now, recency: 3 },
        ];
        let policy = LruPolicy {
            max_sessions: Some(1),
            idle_ttl: Some(Duration::from_secs(300)),
        };
        let victims = policy.select_victims(&usage, now);
        assert_eq!(victims, vec!["old".to_string(), "mid".to_string()]);
    }

    #[test]
    fn concurrent_sessions_stay_bounded() {
        let store = Arc::new(InMemorySessionStore::default());
        let mut threads = Vec::new();
        for t in 0..4 {
            let store = Arc::clone(&store);
            threads.push(std::thread::spawn(move || {
                for i in 0..50 {
                    store.append_turn("shared", Turn::user(format!("{}-{}", t, i)));
                    store.append_turn(&format!("own-{}", t), Turn::user("x"));
                }
            }));
        }
        for th in threads {
            th.join().unwrap();
        }
        assert_eq!(store.get_or_create("shared").len(), MAX_TURNS);
        assert_eq!(store.len(), 5);
    }
}
