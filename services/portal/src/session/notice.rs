//! Read-once holder for the message shown after a forced logout

use std::sync::Mutex;

/// Single pending notice; reading it removes it
#[derive(Debug, Default)]
pub struct NoticeSlot {
    pending: Mutex<Option<String>>,
}

impl NoticeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending notice
    pub fn post(&self, message: impl Into<String>) {
        *self.lock() = Some(message.into());
    }

    /// Take the pending notice, leaving the slot empty
    pub fn take(&self) -> Option<String> {
        self.lock().take()
    }

    #[cfg(test)]
    fn peek(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
