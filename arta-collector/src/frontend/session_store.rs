//! In-memory session store keyed by user id
//!
//! Sessions idle for longer than the timeout are treated as absent on
//! access and removed by the periodic sweep.

use crate::models::AnalysisSession;
use arta_common::time::SharedClock;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Sessions idle longer than this are expired
pub const SESSION_IDLE_TIMEOUT_SECS: i64 = 30 * 60;
/// Interval between expiry sweeps
pub const SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Called with the user id of every session dropped for inactivity
pub type ExpiryHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, AnalysisSession>>>,
    clock: SharedClock,
    idle_timeout: Duration,
    on_expire: Option<ExpiryHook>,
}

impl SessionStore {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_timeout(clock, Duration::seconds(SESSION_IDLE_TIMEOUT_SECS))
    }

    pub fn with_timeout(clock: SharedClock, idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
            idle_timeout,
            on_expire: None,
        }
    }

    /// Run `hook` for each session removed because it expired
    pub fn on_expire(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_expire = Some(Arc::new(hook));
        self
    }

    fn expired(&self, user_id: &str) {
        tracing::info!(user_id = %user_id, "Removed expired session");
        if let Some(hook) = &self.on_expire {
            hook(user_id);
        }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    fn is_expired(&self, session: &AnalysisSession) -> bool {
        self.clock.now() - session.last_activity > self.idle_timeout
    }

    /// Start a fresh session for `user_id`, replacing any previous one
    pub async fn create(&self, user_id: &str) -> AnalysisSession {
        let session = AnalysisSession::new(user_id, self.clock.now());
        let mut sessions = self.sessions.write().await;
        if sessions.insert(user_id.to_string(), session.clone()).is_some() {
            tracing::debug!(user_id = %user_id, "Replaced existing session");
        }
        session
    }

    /// Snapshot of a live session
    pub async fn get(&self, user_id: &str) -> Option<AnalysisSession> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(user_id) {
            Some(session) if self.is_expired(session) => {
                sessions.remove(user_id);
                self.expired(user_id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    /// Mutate a live session in place
    pub async fn update<F, R>(&self, user_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut AnalysisSession) -> R,
    {
        let mut sessions = self.sessions.write().await;
        if sessions.get(user_id).is_some_and(|s| self.is_expired(s)) {
            sessions.remove(user_id);
            self.expired(user_id);
            return None;
        }
        sessions.get_mut(user_id).map(f)
    }

    /// Mutate a live session only while it still owns pipeline run `run_id`
    ///
    /// Results of runs whose session ended, expired or started over are dropped.
    pub async fn update_run<F, R>(&self, user_id: &str, run_id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut AnalysisSession) -> R,
    {
        self.update(user_id, |session| {
            (session.run_id == Some(run_id)).then(|| f(session))
        })
        .await
        .flatten()
    }

    /// Remove a session; returns whether one existed
    pub async fn remove(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Drop every expired session, returning how many were removed
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| self.is_expired(session))
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in &expired {
            sessions.remove(user_id);
            self.expired(user_id);
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Run [`Self::sweep_expired`] every `interval` until the runtime shuts down
    pub fn spawn_sweeper(&self, interval: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Session sweep complete");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionState;
    use arta_common::time::{Clock, ManualClock};
    use chrono::{TimeZone, Utc};

    fn store() -> (SessionStore, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        (SessionStore::new(Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _) = store();
        store.create("alice").await;
        let session = store.get("alice").await.unwrap();
        assert_eq!(session.state, SessionState::AwaitingGenre);
        assert!(store.get("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_session_expires_after_idle_timeout() {
        let (store, clock) = store();
        store.create("alice").await;

        clock.advance(Duration::minutes(30));
        assert!(store.get("alice").await.is_some(), "exactly 30 minutes is still live");

        clock.advance(Duration::seconds(1));
        assert!(store.get("alice").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_touch_keeps_session_alive() {
        let (store, clock) = store();
        store.create("alice").await;

        clock.advance(Duration::minutes(20));
        let now = clock.now();
        store.update("alice", |s| s.touch(now)).await.unwrap();

        clock.advance(Duration::minutes(20));
        assert!(store.get("alice").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (store, clock) = store();
        store.create("old").await;
        clock.advance(Duration::minutes(25));
        store.create("fresh").await;
        clock.advance(Duration::minutes(10));

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_expiry_hook_sees_swept_and_lazily_expired_users() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (store, clock) = store();
        let store = store.on_expire({
            let seen = seen.clone();
            move |user_id| seen.lock().unwrap().push(user_id.to_string())
        });
        store.create("swept").await;
        store.create("touched").await;
        clock.advance(Duration::minutes(31));

        assert!(store.get("touched").await.is_none());
        assert_eq!(store.sweep_expired().await, 1);

        assert_eq!(*seen.lock().unwrap(), vec!["touched", "swept"]);
    }

    #[tokio::test]
    async fn test_update_run_ignores_other_runs() {
        let (store, _) = store();
        store.create("alice").await;
        let current = Uuid::new_v4();
        store.update("alice", |s| s.run_id = Some(current)).await;

        assert!(store.update_run("alice", Uuid::new_v4(), |_| ()).await.is_none());
        assert!(store.update_run("alice", current, |_| ()).await.is_some());
    }
}
