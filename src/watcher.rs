//! Completion watcher.
//!
//! A periodic background task that detects backend-reported success and
//! announces it exactly once per job cycle. The notify ledger is the dedup
//! set shared with the controller: the watcher adds a user after a
//! successful announcement, and a fresh `start_job` clears the entry so
//! the next completion can notify again.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{BackendGateway, JobStatus};
use crate::config::Config;
use crate::session::{ContextStore, SessionStore, UserId};
use crate::transport::ChatTransport;
use crate::view;

/// Users already notified of the current job's completion.
#[derive(Debug, Default)]
pub struct NotifyLedger {
    inner: Mutex<HashSet<UserId>>,
}

impl NotifyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_notified(&self, user_id: UserId) -> bool {
        self.inner.lock().expect("notify ledger poisoned").contains(&user_id)
    }

    pub fn mark(&self, user_id: UserId) {
        self.inner.lock().expect("notify ledger poisoned").insert(user_id);
    }

    /// Called when a new job cycle begins for the user.
    pub fn clear(&self, user_id: UserId) {
        self.inner.lock().expect("notify ledger poisoned").remove(&user_id);
    }
}

/// Periodic scanner over active sessions.
pub struct CompletionWatcher {
    gateway: Arc<dyn BackendGateway>,
    transport: Arc<dyn ChatTransport>,
    store: Arc<SessionStore>,
    contexts: Arc<ContextStore>,
    ledger: Arc<NotifyLedger>,
}

impl CompletionWatcher {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        transport: Arc<dyn ChatTransport>,
        store: Arc<SessionStore>,
        contexts: Arc<ContextStore>,
        ledger: Arc<NotifyLedger>,
    ) -> Self {
        Self {
            gateway,
            transport,
            store,
            contexts,
            ledger,
        }
    }

    /// Spawn the watcher loop on the current runtime.
    pub fn spawn(self: Arc<Self>, config: &Config) -> JoinHandle<()> {
        let initial_delay = config.watcher_initial_delay;
        let interval = config.watcher_interval;
        tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.scan().await;
            }
        })
    }

    /// One pass over all sessions. A failure for one user never stops the
    /// scan for the others.
    pub async fn scan(&self) {
        for user_id in self.store.user_ids() {
            if self.ledger.is_notified(user_id) {
                continue;
            }
            if let Err(err) = self.check_user(user_id).await {
                warn!(user_id, %err, "completion check failed");
            }
        }
    }

    async fn check_user(&self, user_id: UserId) -> crate::error::Result<()> {
        let Some(session) = self.store.get(user_id) else {
            return Ok(());
        };

        // The flag read happens under the per-user session lock, the same
        // critical section the controller uses. The lock is NOT held while
        // messaging: the controller holds the conversation context lock for
        // whole handlers and takes session locks inside it, so the watcher
        // must never wait on a context lock while owning a session lock.
        let report = {
            let locked = session.lock().await;
            if !locked.backend_started {
                return Ok(());
            }
            let status = self.gateway.get_status(user_id).await?;
            match status {
                JobStatus::Success(report) => report,
                other => {
                    debug!(user_id, ?other, "job not finished yet");
                    return Ok(());
                }
            }
        };

        // The config menu is superseded by the announcement.
        let stale_message = match self.contexts.get(user_id) {
            Some(ctx) => ctx.lock().await.config_message.take(),
            None => None,
        };
        if let Some(message) = stale_message {
            if let Err(err) = self.transport.delete_message(&message).await {
                warn!(user_id, %err, "failed to delete config message");
            }
        }

        // Announce first, reset after: a failed send leaves the flags
        // untouched so the next scan retries, while the ledger entry
        // (added only after a successful send) prevents duplicates.
        let text = view::completion_text(&report);
        let keyboard = view::status_keyboard();
        self.transport
            .send_message(user_id, &text, Some(&keyboard))
            .await?;
        self.ledger.mark(user_id);
        session.lock().await.reset_job_cycle();
        info!(user_id, pumped_wei = %report.pumped_wei, "completion announced");
        Ok(())
    }
}
