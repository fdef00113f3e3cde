//! Periodic application-session refresh.
//!
//! The scheduler runs as its own task and sleeps until the next deadline
//! inside a `tokio::select!`, alongside a `watch` channel carrying its
//! settings:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = sleep_until(next) => { refresh(session_id).await; }
//!         _ = settings.changed() => { next = now + interval; }
//!     }
//! }
//! ```
//!
//! Starting it again for the same client only pushes new settings, so
//! there is never more than one refresh loop per client.

use std::future::Future;
use std::time::Duration;

use csta_transport::InvokeId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::SessionError;

/// What the scheduler refreshes, and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveSettings {
    pub session_id: String,
    pub interval: Duration,
}

impl KeepAliveSettings {
    /// Shortest interval the scheduler will use.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(session_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            interval: interval.max(Self::MIN_INTERVAL),
        }
    }
}

/// Handle to a running refresh loop. Dropping it stops the loop.
pub struct KeepAlive {
    settings: watch::Sender<KeepAliveSettings>,
    task: JoinHandle<()>,
}

impl KeepAlive {
    /// Starts refreshing every `settings.interval`.
    ///
    /// `refresh` is called with the current session id. Its errors are
    /// logged and the loop carries on.
    pub fn spawn<F, Fut>(settings: KeepAliveSettings, refresh: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<InvokeId, SessionError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(settings);
        let task = tokio::spawn(run(rx, refresh));
        Self { settings: tx, task }
    }

    /// Replaces the settings and restarts the countdown.
    pub fn reconfigure(&self, settings: KeepAliveSettings) {
        self.settings.send_replace(settings);
    }

    /// The settings currently in effect.
    pub fn settings(&self) -> KeepAliveSettings {
        self.settings.borrow().clone()
    }

    /// Stops the loop.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F, Fut>(mut rx: watch::Receiver<KeepAliveSettings>, refresh: F)
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<InvokeId, SessionError>>,
{
    let mut settings = rx.borrow_and_update().clone();
    let mut next = Instant::now() + settings.interval;
    tracing::debug!(interval = ?settings.interval, "keep-alive started");

    loop {
        tokio::select! {
            _ = sleep_until(next) => {
                match refresh(settings.session_id.clone()).await {
                    Ok(invoke_id) => {
                        tracing::debug!(
                            %invoke_id,
                            session_id = %settings.session_id,
                            "session timer refreshed"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %settings.session_id,
                            error = %e,
                            "keep-alive refresh failed"
                        );
                    }
                }
                next = Instant::now() + settings.interval;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                settings = rx.borrow_and_update().clone();
                next = Instant::now() + settings.interval;
                tracing::debug!(interval = ?settings.interval, "keep-alive reconfigured");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type Refresh = std::future::Ready<Result<InvokeId, SessionError>>;

    fn counting(count: &Arc<AtomicUsize>) -> impl Fn(String) -> Refresh + Send + Sync + 'static {
        let count = Arc::clone(count);
        move |_session_id| {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(InvokeId::new(1).unwrap()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_once_per_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let _keep_alive = KeepAlive::spawn(
            KeepAliveSettings::new("s1", Duration::from_secs(10)),
            counting(&count),
        );

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_restarts_countdown_without_second_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let keep_alive = KeepAlive::spawn(
            KeepAliveSettings::new("s1", Duration::from_secs(10)),
            counting(&count),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        keep_alive.reconfigure(KeepAliveSettings::new("s1", Duration::from_secs(10)));

        // Next refresh is now due at t=15.
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_running() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _keep_alive = KeepAlive::spawn(
            KeepAliveSettings::new("s1", Duration::from_secs(10)),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(SessionError::Closed))
            },
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_refreshing() {
        let count = Arc::new(AtomicUsize::new(0));
        let keep_alive = KeepAlive::spawn(
            KeepAliveSettings::new("s1", Duration::from_secs(10)),
            counting(&count),
        );
        keep_alive.stop();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let settings = KeepAliveSettings::new("s1", Duration::ZERO);
        assert_eq!(settings.interval, KeepAliveSettings::MIN_INTERVAL);
    }
}
