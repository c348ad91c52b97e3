//! In-memory per-user session state.
//!
//! The store is the single source of local truth for a user's draft
//! configuration. Each session sits behind its own `tokio::sync::Mutex`:
//! the conversation handler and the completion watcher both read-modify-
//! write `backend_started`/`is_paused`, and the per-user lock is the
//! critical section that keeps them consistent. The outer map uses a
//! plain `std::sync::Mutex` and is never held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::amounts;
use crate::transport::MessageRef;

/// Telegram user identifier. Private chats share the same id for the chat.
pub type UserId = i64;

/// Draft configuration for one user, mutated by every configuration step
/// and by lifecycle transitions.
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    /// Target token contract address; empty until set.
    pub token_address: String,
    /// Total budget in wei, decimal-safe; empty means unset.
    pub pump_amount_wei: String,
    /// Per-swap amount in wei, bounded by the backend-estimated maximum.
    pub swap_amount_wei: String,
    /// Inter-swap delay in milliseconds, always > 0.
    pub delay_millis: u64,
    /// True once the remote job has been created for this cycle.
    pub backend_started: bool,
    /// Local mirror of the remote pause state.
    pub is_paused: bool,
}

impl UserSession {
    pub fn new() -> Self {
        Self {
            delay_millis: 1000,
            ..Self::default()
        }
    }

    pub fn token_configured(&self) -> bool {
        !self.token_address.is_empty()
    }

    pub fn pump_configured(&self) -> bool {
        amounts::wei_value(&self.pump_amount_wei).is_ok_and(|v| v > 0)
    }

    pub fn swap_configured(&self) -> bool {
        amounts::wei_value(&self.swap_amount_wei).is_ok_and(|v| v > 0)
    }

    /// Reset the lifecycle flags after the remote job finished. The draft
    /// configuration survives so the user can immediately start again.
    pub fn reset_job_cycle(&mut self) {
        self.backend_started = false;
        self.is_paused = false;
    }
}

/// Handle to one user's session. Lock it for the duration of any
/// read-modify-write touching the lifecycle flags.
pub type SessionHandle = Arc<tokio::sync::Mutex<UserSession>>;

/// Keyed in-memory store; at most one session per user id.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId) -> Option<SessionHandle> {
        self.inner.lock().expect("session store poisoned").get(&user_id).cloned()
    }

    /// Create a fresh session, overwriting any existing one.
    pub fn create(&self, user_id: UserId) -> SessionHandle {
        let session = Arc::new(tokio::sync::Mutex::new(UserSession::new()));
        self.inner
            .lock()
            .expect("session store poisoned")
            .insert(user_id, Arc::clone(&session));
        session
    }

    pub fn delete(&self, user_id: UserId) {
        self.inner.lock().expect("session store poisoned").remove(&user_id);
    }

    pub fn exists(&self, user_id: UserId) -> bool {
        self.inner.lock().expect("session store poisoned").contains_key(&user_id)
    }

    /// Ids of all live sessions, for the completion watcher's scan.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.inner.lock().expect("session store poisoned").keys().copied().collect()
    }
}

/// Which input the conversation is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    /// Re-entrant hub state: token input and all menu buttons live here.
    #[default]
    AwaitingToken,
    AwaitingPumpAmount,
    AwaitingSwapAmount,
    AwaitingDelay,
}

/// Per-conversation transient context. View-layer state, deliberately kept
/// out of [`UserSession`]: the max-swap figure is a cached backend estimate
/// and the message reference belongs to the rendered menu, not the config.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    pub step: Step,
    /// Cached backend-estimated maximum swap amount in wei; invalidated
    /// whenever the pump amount changes.
    pub max_swap_wei: Option<String>,
    /// Reference to the last rendered config message, if any.
    pub config_message: Option<MessageRef>,
}

/// Handle to one user's conversation context. Handlers hold this lock for
/// their whole body, which serializes conversation handling per user.
pub type ContextHandle = Arc<tokio::sync::Mutex<ConversationContext>>;

/// Per-user conversation contexts, created on first touch.
#[derive(Debug, Default)]
pub struct ContextStore {
    inner: Mutex<HashMap<UserId, ContextHandle>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, user_id: UserId) -> ContextHandle {
        self.inner
            .lock()
            .expect("context store poisoned")
            .entry(user_id)
            .or_default()
            .clone()
    }

    pub fn get(&self, user_id: UserId) -> Option<ContextHandle> {
        self.inner.lock().expect("context store poisoned").get(&user_id).cloned()
    }

    pub fn delete(&self, user_id: UserId) {
        self.inner.lock().expect("context store poisoned").remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn create_overwrites_existing_session() {
        let store = SessionStore::new();
        let first = store.create(7);
        first.try_lock().unwrap().token_address = "0xabc".to_string();

        store.create(7);
        let fresh = store.get(7).unwrap();
        assert_eq!(fresh.try_lock().unwrap().token_address, "");
    }

    #[test]
    fn delete_removes_session() {
        let store = SessionStore::new();
        store.create(7);
        assert!(store.exists(7));
        store.delete(7);
        assert!(!store.exists(7));
        assert!(store.get(7).is_none());
    }

    #[test]
    fn new_session_has_default_delay_and_no_flags() {
        let session = UserSession::new();
        assert_eq!(session.delay_millis, 1000);
        assert!(!session.backend_started);
        assert!(!session.is_paused);
        assert!(!session.pump_configured());
        assert!(!session.swap_configured());
    }

    #[test]
    fn configured_requires_positive_amount() {
        let mut session = UserSession::new();
        session.pump_amount_wei = "0".to_string();
        assert!(!session.pump_configured());
        session.pump_amount_wei = "500000000000000000".to_string();
        assert!(session.pump_configured());
    }

    #[test]
    fn reset_job_cycle_keeps_draft_config() {
        let mut session = UserSession::new();
        session.token_address = "0xabc".to_string();
        session.pump_amount_wei = "1000".to_string();
        session.backend_started = true;
        session.is_paused = true;

        session.reset_job_cycle();
        assert!(!session.backend_started);
        assert!(!session.is_paused);
        assert_eq!(session.pump_amount_wei, "1000");
    }

    #[test]
    fn context_store_creates_on_first_touch() {
        let store = ContextStore::new();
        assert!(store.get(1).is_none());
        let ctx = store.get_or_create(1);
        ctx.try_lock().unwrap().step = Step::AwaitingDelay;
        let again = store.get_or_create(1);
        assert_eq!(again.try_lock().unwrap().step, Step::AwaitingDelay);
    }
}
