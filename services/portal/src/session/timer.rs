//! Inactivity countdown
//!
//! [`InactivityTimer`] owns at most one pending expiry task. Arming replaces
//! the previous countdown, cancelling disarms it, and dropping the timer
//! cancels whatever is pending.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

struct Armed {
    generation: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

/// Single-shot, re-armable expiry timer
#[derive(Default)]
pub struct InactivityTimer {
    slot: Arc<Mutex<Option<Armed>>>,
    generations: AtomicU64,
}

fn lock(slot: &Mutex<Option<Armed>>) -> MutexGuard<'_, Option<Armed>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InactivityTimer {
    /// Create a disarmed timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh countdown of `duration`, cancelling any pending one.
    ///
    /// When the countdown elapses the timer disarms itself and then awaits
    /// `on_expire`, so the callback may freely call [`cancel`](Self::cancel)
    /// or [`arm`](Self::arm) on this timer. Must be called inside a Tokio
    /// runtime.
    pub fn arm<F, Fut>(&self, duration: Duration, on_expire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let deadline = Instant::now() + duration;
        let slot = Arc::clone(&self.slot);

        let mut guard = lock(&self.slot);
        if let Some(previous) = guard.take() {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            {
                let mut guard = lock(&slot);
                match guard.as_ref() {
                    Some(armed) if armed.generation == generation => {
                        guard.take();
                    }
                    // Superseded or cancelled while we were waking up
                    _ => return,
                }
            }
            debug!("Inactivity timer {} expired", generation);
            on_expire().await;
        });

        *guard = Some(Armed {
            generation,
            deadline,
            handle,
        });
        debug!("Inactivity timer {} armed for {:?}", generation, duration);
    }

    /// Disarm the pending countdown, if any
    pub fn cancel(&self) {
        if let Some(armed) = lock(&self.slot).take() {
            armed.handle.abort();
            debug!("Inactivity timer {} cancelled", armed.generation);
        }
    }

    /// Whether a countdown is pending
    pub fn is_armed(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// When the pending countdown will fire
    pub fn deadline(&self) -> Option<Instant> {
        lock(&self.slot).as_ref().map(|armed| armed.deadline)
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_callback(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_duration() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = InactivityTimer::new();

        timer.arm(Duration::from_secs(60), counter_callback(&fired));
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_countdown() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let timer = InactivityTimer::new();

        timer.arm(Duration::from_secs(60), counter_callback(&first));
        tokio::time::sleep(Duration::from_secs(40)).await;
        timer.arm(Duration::from_secs(60), counter_callback(&second));

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_disarm() {
        let fired = Arc::new(AtomicUsize::new(0));

        let timer = InactivityTimer::new();
        timer.arm(Duration::from_secs(10), counter_callback(&fired));
        timer.cancel();
        assert!(!timer.is_armed());
        assert_eq!(timer.deadline(), None);

        let dropped = InactivityTimer::new();
        dropped.arm(Duration::from_secs(10), counter_callback(&fired));
        drop(dropped);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reflects_latest_arm() {
        let timer = InactivityTimer::new();
        let start = Instant::now();

        timer.arm(Duration::from_secs(100), || async {});
        assert_eq!(timer.deadline(), Some(start + Duration::from_secs(100)));

        tokio::time::advance(Duration::from_secs(30)).await;
        timer.arm(Duration::from_secs(100), || async {});
        assert_eq!(timer.deadline(), Some(start + Duration::from_secs(130)));
    }
}
