//! Session lifecycle management
//!
//! [`SessionManager`] owns the signed-in state of the client, mirrors it into
//! the durable store so it survives restarts, and expires it after a period
//! without user activity.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use common::store::KeyValueStore;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::activity::ActivitySignal;
use super::notice::NoticeSlot;
use super::state::{
    LAST_ACTIVITY_KEY, PersistedSession, SESSION_KEYS, SessionEvent, SessionState, TOKEN_KEY,
    USER_KEY,
};
use super::timer::InactivityTimer;
use crate::config::{DEFAULT_INACTIVITY_LIMIT_SECS, PortalConfig};
use crate::error::{PortalError, PortalResult};
use crate::identity::IdentityApi;
use crate::models::User;

/// Logout reason used when the inactivity limit is reached
pub const INACTIVITY_REASON: &str = "Your session has expired due to inactivity";
/// Logout reason used when the Identity API rejects the persisted token
pub const EXPIRED_REASON: &str = "Your session has expired. Please sign in again";
/// Logout reason used when the persisted token could not be checked
pub const VALIDATION_ERROR_REASON: &str = "Could not validate your session. Please sign in again";

const EVENT_CAPACITY: usize = 16;

/// Session manager settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which the session is expired
    pub inactivity_limit: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_limit: Duration::from_secs(DEFAULT_INACTIVITY_LIMIT_SECS),
        }
    }
}

impl From<&PortalConfig> for SessionConfig {
    fn from(config: &PortalConfig) -> Self {
        Self {
            inactivity_limit: config.inactivity_limit(),
        }
    }
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    identity: Arc<dyn IdentityApi>,
    inactivity_limit: Duration,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    token: Mutex<Option<String>>,
    /// Epoch milliseconds, 0 when there is no session
    last_activity: AtomicI64,
    timer: InactivityTimer,
    notice: NoticeSlot,
    /// Serializes every mutation of session state
    ops: tokio::sync::Mutex<()>,
    shut_down: AtomicBool,
}

impl Inner {
    fn token(&self) -> MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to the client session.
///
/// Construct one per process and clone it into every collaborator that needs
/// to observe or change the session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Whether a session last active at `last_activity` (epoch millis) has been
/// idle for at least `limit` at `now`.
///
/// Timestamps in the future, or too far in the past to subtract, count as
/// stale.
fn is_stale(last_activity: i64, now: i64, limit: Duration) -> bool {
    match now.checked_sub(last_activity) {
        Some(idle) if idle >= 0 => idle as u128 >= limit.as_millis(),
        _ => true,
    }
}

impl SessionManager {
    /// Create a session manager in the `Initializing` state
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityApi>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                store,
                identity,
                inactivity_limit: config.inactivity_limit,
                state,
                events,
                token: Mutex::new(None),
                last_activity: AtomicI64::new(0),
                timer: InactivityTimer::new(),
                notice: NoticeSlot::new(),
                ops: tokio::sync::Mutex::new(()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Start a session for `user`.
    ///
    /// The caller has already obtained `user` (and usually `token`) from the
    /// Identity API. Without a token the previously persisted one stays in
    /// effect.
    pub async fn login(&self, user: User, token: Option<String>) -> PortalResult<()> {
        if user.id.trim().is_empty() {
            return Err(PortalError::Validation(
                "User id must not be empty".to_string(),
            ));
        }

        let _op = self.inner.ops.lock().await;
        if self.is_shut_down() {
            warn!("Ignoring login for user {} after shutdown", user.id);
            return Ok(());
        }

        let user_json = serde_json::to_string(&user)?;
        let now = now_millis();
        let now_text = now.to_string();

        let mut entries = vec![
            (USER_KEY, user_json.as_str()),
            (LAST_ACTIVITY_KEY, now_text.as_str()),
        ];
        if let Some(token) = token.as_deref() {
            entries.push((TOKEN_KEY, token));
        }
        self.inner.store.set_many(&entries).await?;

        let token = match token {
            Some(token) => Some(token),
            None => self.inner.store.get(TOKEN_KEY).await.unwrap_or_else(|e| {
                warn!("Failed to read persisted token: {}", e);
                None
            }),
        };
        *self.inner.token() = token;
        self.inner.last_activity.store(now, Ordering::SeqCst);

        self.arm_timer();
        self.inner.state.send_replace(SessionState::Authenticated { user: user.clone() });
        info!("User {} signed in", user.id);
        let _ = self.inner.events.send(SessionEvent::LoggedIn { user });

        Ok(())
    }

    /// End the session.
    ///
    /// Clears the persisted record unless the manager is shut down. Only a
    /// transition out of a live or initializing session posts `reason` as the
    /// logout notice and emits [`SessionEvent::LoggedOut`], so repeated calls
    /// have no further effect.
    pub async fn logout(&self, reason: Option<&str>) {
        let _op = self.inner.ops.lock().await;
        if self.is_shut_down() {
            debug!("Ignoring logout after shutdown");
            return;
        }
        self.clear(reason).await;
    }

    /// Revalidate the persisted session at startup.
    ///
    /// Never fails: every outcome is a transition to `Authenticated` or
    /// `Unauthenticated`. The Identity API is not contacted for a missing or
    /// stale record, and a failed check is not retried.
    pub async fn validate_session(&self) {
        let _op = self.inner.ops.lock().await;
        if self.is_shut_down() {
            return;
        }

        let Some(persisted) = PersistedSession::load(self.inner.store.as_ref()).await else {
            debug!("No persisted session found");
            self.inner.state.send_if_modified(|state| {
                if state.is_loading() {
                    *state = SessionState::Unauthenticated;
                    true
                } else {
                    false
                }
            });
            return;
        };

        if let Some(last_activity) = persisted.last_activity {
            if is_stale(last_activity, now_millis(), self.inner.inactivity_limit) {
                info!(
                    "Persisted session for user {} last active at {}, expiring",
                    persisted.user.id, last_activity
                );
                self.clear(Some(INACTIVITY_REASON)).await;
                return;
            }
        }

        let result = self
            .inner
            .identity
            .validate_token(&persisted.user.id, &persisted.token)
            .await;

        if self.is_shut_down() {
            debug!("Discarding session validation result after shutdown");
            return;
        }

        match result {
            Ok(()) => {
                let now = now_millis();
                if let Err(e) = self
                    .inner
                    .store
                    .set(LAST_ACTIVITY_KEY, &now.to_string())
                    .await
                {
                    warn!("Failed to persist last activity: {}", e);
                }
                *self.inner.token() = Some(persisted.token);
                self.inner.last_activity.store(now, Ordering::SeqCst);

                self.arm_timer();
                let user = persisted.user;
                self.inner.state.send_replace(SessionState::Authenticated { user: user.clone() });
                info!("Restored session for user {}", user.id);
                let _ = self.inner.events.send(SessionEvent::LoggedIn { user });
            }
            Err(PortalError::Api { status, .. }) => {
                info!(
                    "Identity API rejected persisted session for user {} ({})",
                    persisted.user.id, status
                );
                self.clear(Some(EXPIRED_REASON)).await;
            }
            Err(e) => {
                error!("Error validating session: {}", e);
                self.clear(Some(VALIDATION_ERROR_REASON)).await;
            }
        }
    }

    /// Extend the session by a full inactivity period.
    ///
    /// Has no effect without a live session.
    pub async fn reset_inactivity_timer(&self) {
        let _op = self.inner.ops.lock().await;
        if self.is_shut_down() {
            return;
        }
        let authenticated = self.inner.state.borrow().is_authenticated();
        if !authenticated {
            debug!("No active session, ignoring inactivity reset");
            return;
        }

        let now = now_millis();
        let latest = self
            .inner
            .last_activity
            .fetch_max(now, Ordering::SeqCst)
            .max(now);
        if let Err(e) = self
            .inner
            .store
            .set(LAST_ACTIVITY_KEY, &latest.to_string())
            .await
        {
            warn!("Failed to persist last activity: {}", e);
        }

        self.arm_timer();
    }

    /// Forward a user activity signal
    pub async fn record_activity(&self, signal: ActivitySignal) {
        debug!("Activity: {}", signal);
        self.reset_inactivity_timer().await;
    }

    /// Take the pending logout notice; it is returned only once
    pub fn take_logout_notice(&self) -> Option<String> {
        self.inner.notice.take()
    }

    /// Stop the session timer and ignore any further changes.
    ///
    /// A validation still in flight will have its result discarded.
    pub fn shutdown(&self) {
        if !self.inner.shut_down.swap(true, Ordering::SeqCst) {
            self.inner.timer.cancel();
            info!("Session manager shut down");
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Receive login and logout events
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Bearer token of the current session
    pub fn token(&self) -> Option<String> {
        if self.is_authenticated() {
            self.inner.token().clone()
        } else {
            None
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    /// Last recorded activity in epoch milliseconds
    pub fn last_activity(&self) -> Option<i64> {
        match self.inner.last_activity.load(Ordering::SeqCst) {
            0 => None,
            millis => Some(millis),
        }
    }

    pub fn inactivity_limit(&self) -> Duration {
        self.inner.inactivity_limit
    }

    /// When the session will expire without further activity
    pub fn expires_at(&self) -> Option<Instant> {
        self.inner.timer.deadline()
    }

    fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    fn arm_timer(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .timer
            .arm(self.inner.inactivity_limit, move || async move {
                if let Some(inner) = weak.upgrade() {
                    SessionManager { inner }.expire().await;
                }
            });
    }

    async fn expire(&self) {
        let _op = self.inner.ops.lock().await;

        // A rearm between firing and taking the lock means fresh activity
        if self.is_shut_down() || self.inner.timer.is_armed() || !self.is_authenticated() {
            debug!("Ignoring superseded inactivity expiry");
            return;
        }

        info!(
            "Session expired after {:?} without activity",
            self.inner.inactivity_limit
        );
        self.clear(Some(INACTIVITY_REASON)).await;
    }

    /// Logout body; callers hold the operation lock
    async fn clear(&self, reason: Option<&str>) {
        self.inner.timer.cancel();
        *self.inner.token() = None;
        self.inner.last_activity.store(0, Ordering::SeqCst);

        if let Err(e) = self.inner.store.delete_many(&SESSION_KEYS).await {
            error!("Failed to clear persisted session: {}", e);
        }

        let previous = self.inner.state.send_replace(SessionState::Unauthenticated);
        if previous == SessionState::Unauthenticated {
            debug!("Already signed out");
            return;
        }

        if let Some(reason) = reason {
            self.inner.notice.post(reason);
        }
        match previous.user() {
            Some(user) => info!("User {} signed out", user.id),
            None => info!("Persisted session discarded"),
        }
        let _ = self.inner.events.send(SessionEvent::LoggedOut {
            reason: reason.map(str::to_string),
        });
    }
}
