//! Session states, events and the persisted record

use common::store::KeyValueStore;
use tracing::warn;

use crate::models::User;

/// Persisted key holding the JSON user record
pub const USER_KEY: &str = "user";
/// Persisted key holding the bearer token
pub const TOKEN_KEY: &str = "token";
/// Persisted key holding the last activity, in epoch milliseconds
pub const LAST_ACTIVITY_KEY: &str = "lastActivity";
/// Every persisted session key; they are written and cleared together
pub const SESSION_KEYS: [&str; 3] = [USER_KEY, TOKEN_KEY, LAST_ACTIVITY_KEY];

/// What the UI should render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup validation has not finished
    Initializing,
    Unauthenticated,
    Authenticated { user: User },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { user } => Some(user),
            _ => None,
        }
    }
}

/// One-off notifications for UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user: User },
    /// The session ended. A reason means the UI should navigate to the landing
    /// view, where the notice is displayed.
    LoggedOut { reason: Option<String> },
}

/// Session record as found in the durable store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub user: User,
    pub token: String,
    /// Missing or unparsable timestamps are `None`
    pub last_activity: Option<i64>,
}

impl PersistedSession {
    /// Read the persisted record.
    ///
    /// Anything short of a complete, well-formed user + token pair is
    /// reported as no session; this never fails.
    pub async fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let user = read(store, USER_KEY).await?;
        let token = read(store, TOKEN_KEY).await?;
        let last_activity = read(store, LAST_ACTIVITY_KEY)
            .await
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        let user: User = match serde_json::from_str(&user) {
            Ok(user) => user,
            Err(e) => {
                warn!("Ignoring malformed persisted user: {}", e);
                return None;
            }
        };

        if user.id.is_empty() || token.is_empty() {
            warn!("Ignoring incomplete persisted session");
            return None;
        }

        Some(Self {
            user,
            token,
            last_activity,
        })
    }
}

async fn read(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read persisted {}: {}", key, e);
            None
        }
    }
}
