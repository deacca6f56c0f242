//! Client session lifecycle: state, persistence and inactivity expiry

pub mod activity;
pub mod manager;
pub mod notice;
pub mod state;
pub mod timer;

// Re-export for convenience
pub use activity::ActivitySignal;
pub use manager::{
    EXPIRED_REASON, INACTIVITY_REASON, SessionConfig, SessionManager, VALIDATION_ERROR_REASON,
};
pub use notice::NoticeSlot;
pub use state::{PersistedSession, SessionEvent, SessionState};
pub use timer::InactivityTimer;
