//! FlowSession: shared async handle around one navigator.
//!
//! Serializes calls through a per-session mutex so hosts with several writers
//! (UI events, background tasks) never interleave two navigation operations,
//! and saves progress after forward moves without letting store failures
//! touch the flow state.
//!
//! Background saves form a chain: each one waits for the previous save before
//! writing, so the store always ends up with the newest snapshot. `end`
//! drains the chain before deleting saved progress.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::navigator::{
    FlowAnalytics, FlowNavigator, FlowProgress, FlowSnapshot, NavigationHistoryEntry, NextOutcome,
};
use crate::profile::UserProfile;
use crate::store::{ProgressStore, progress_key};

struct SessionInner {
    navigator: FlowNavigator,
    /// Tail of the background save chain.
    pending_save: Option<JoinHandle<()>>,
}

/// Cloneable handle to a single onboarding session.
#[derive(Clone)]
pub struct FlowSession {
    inner: Arc<Mutex<SessionInner>>,
    store: Option<Arc<dyn ProgressStore>>,
    key: String,
}

impl FlowSession {
    pub fn new(navigator: FlowNavigator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                navigator,
                pending_save: None,
            })),
            store: None,
            key: progress_key("default"),
        }
    }

    /// Save progress for `user_id` into `store` after every forward move.
    pub fn with_store(mut self, store: Arc<dyn ProgressStore>, user_id: &str) -> Self {
        self.store = Some(store);
        self.key = progress_key(user_id);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Initialize the session. No-op if already initialized.
    pub async fn start(&self, profile: Option<UserProfile>) -> Result<()> {
        self.inner.lock().await.navigator.initialize(profile)
    }

    /// Restore saved progress if the store has any, otherwise start fresh.
    ///
    /// Returns `true` when a saved session was restored. An unreadable or
    /// inconsistent saved snapshot is logged and ignored.
    pub async fn resume_or_start(&self, profile: Option<UserProfile>) -> Result<bool> {
        let mut inner = self.inner.lock().await;

        if let Some(store) = &self.store {
            match store.load_progress(&self.key).await {
                Ok(Some(snapshot)) => match inner.navigator.restore(snapshot) {
                    Ok(()) => return Ok(true),
                    Err(e) => {
                        tracing::warn!(key = %self.key, "Discarding saved onboarding progress: {}", e);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %self.key, "Failed to load onboarding progress: {}", e);
                }
            }
        }

        inner.navigator.initialize(profile)?;
        Ok(false)
    }

    pub async fn navigate_next(&self) -> Result<NextOutcome> {
        let mut inner = self.inner.lock().await;
        let outcome = inner.navigator.navigate_next().await?;
        let snapshot = inner.navigator.snapshot()?;
        self.save_in_background(&mut inner, snapshot);
        Ok(outcome)
    }

    pub async fn skip_current_step(&self) -> Result<NextOutcome> {
        let mut inner = self.inner.lock().await;
        let outcome = inner.navigator.skip_current_step().await?;
        let snapshot = inner.navigator.snapshot()?;
        self.save_in_background(&mut inner, snapshot);
        Ok(outcome)
    }

    pub async fn navigate_previous(&self) -> Result<NavigationHistoryEntry> {
        self.inner.lock().await.navigator.navigate_previous()
    }

    pub async fn jump_to_step(&self, target: usize) -> Result<NavigationHistoryEntry> {
        self.inner.lock().await.navigator.jump_to_step(target)
    }

    pub async fn reset_flow(&self) -> Result<()> {
        self.inner.lock().await.navigator.reset_flow()
    }

    pub async fn update_user_profile(&self, profile: UserProfile) -> Result<()> {
        self.inner.lock().await.navigator.update_user_profile(profile)
    }

    pub async fn progress(&self) -> Result<FlowProgress> {
        Ok(self.inner.lock().await.navigator.get_flow_progress()?)
    }

    pub async fn analytics(&self) -> Result<FlowAnalytics> {
        Ok(self.inner.lock().await.navigator.get_flow_analytics()?)
    }

    pub async fn snapshot(&self) -> Result<FlowSnapshot> {
        Ok(self.inner.lock().await.navigator.snapshot()?)
    }

    /// Wait for every background save started so far.
    pub async fn flush(&self) {
        let mut inner = self.inner.lock().await;
        drain_pending(&mut inner, &self.key).await;
    }

    /// Save the current snapshot and wait for the store. No-op without a store.
    pub async fn save(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let mut inner = self.inner.lock().await;
        drain_pending(&mut inner, &self.key).await;
        let snapshot = inner.navigator.snapshot()?;
        store.save_progress(&self.key, &snapshot).await?;
        Ok(())
    }

    /// End the session and drop any saved progress for it.
    pub async fn end(&self) {
        let mut inner = self.inner.lock().await;
        inner.navigator.end_session();
        drain_pending(&mut inner, &self.key).await;
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.delete_progress(&self.key).await {
            tracing::warn!(key = %self.key, "Failed to delete onboarding progress: {}", e);
        }
    }

    fn save_in_background(&self, inner: &mut SessionInner, snapshot: FlowSnapshot) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let key = self.key.clone();
        let previous = inner.pending_save.take();
        inner.pending_save = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if let Err(e) = store.save_progress(&key, &snapshot).await {
                tracing::warn!(key = %key, "Failed to persist onboarding progress: {}", e);
            }
        }));
    }
}

async fn drain_pending(inner: &mut SessionInner, key: &str) {
    let Some(pending) = inner.pending_save.take() else {
        return;
    };
    if let Err(e) = pending.await {
        tracing::warn!(key = %key, "Background onboarding save did not finish: {}", e);
    }
}
