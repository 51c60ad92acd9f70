//! Periodic cache refresh loop.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Refresh hook invoked on every tick of the [`UpdateTimer`].
#[async_trait]
pub trait CacheUpdater: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<()>;
}

/// Updater used until a cache exists to refresh.
pub struct NoopCacheUpdater;

#[async_trait]
impl CacheUpdater for NoopCacheUpdater {
    async fn refresh(&self) -> anyhow::Result<()> {
        // TODO: reload services and operator policies once lookups are cached.
        tracing::debug!("Cache refresh tick");
        Ok(())
    }
}

pub struct UpdateTimer {
    interval: Duration,
    updater: Arc<dyn CacheUpdater>,
    shutdown_token: CancellationToken,
}

impl UpdateTimer {
    pub fn new(interval: Duration, updater: Arc<dyn CacheUpdater>) -> Self {
        Self {
            interval,
            updater,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Run the refresh loop until `exit` fires or [`stop`](Self::stop) is
    /// called. Returns the code received on `exit`, or 0 when stopped.
    pub async fn start(&self, mut exit: oneshot::Receiver<i32>) -> i32 {
        tracing::info!(
            interval_seconds = self.interval.as_secs(),
            "Starting cache update timer"
        );

        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately; skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Cache update timer stopped");
                    return 0;
                }
                code = &mut exit => {
                    let code = code.unwrap_or(0);
                    tracing::info!(code, "Cache update timer exiting");
                    return code;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.updater.refresh().await {
                        tracing::warn!(error = %e, "Cache refresh failed");
                    }
                }
            }
        }
    }

    pub fn stop(&self) {
        self.shutdown_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingUpdater {
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl CacheUpdater for CountingUpdater {
        async fn refresh(&self) -> anyhow::Result<()> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_exit_signal_returns_its_code() {
        let timer = UpdateTimer::new(Duration::from_secs(300), Arc::new(NoopCacheUpdater));
        let (tx, rx) = oneshot::channel();
        tx.send(3).unwrap();

        assert_eq!(timer.start(rx).await, 3);
    }

    #[tokio::test]
    async fn test_stop_ends_the_loop() {
        let timer = Arc::new(UpdateTimer::new(
            Duration::from_secs(300),
            Arc::new(NoopCacheUpdater),
        ));
        let (_tx, rx) = oneshot::channel();

        let running = tokio::spawn({
            let timer = timer.clone();
            async move { timer.start(rx).await }
        });
        timer.stop();

        assert_eq!(running.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_updater_runs_on_every_tick() {
        let updater = Arc::new(CountingUpdater::default());
        let timer = Arc::new(UpdateTimer::new(Duration::from_millis(20), updater.clone()));
        let (tx, rx) = oneshot::channel();

        let running = tokio::spawn({
            let timer = timer.clone();
            async move { timer.start(rx).await }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(0).unwrap();
        assert_eq!(running.await.unwrap(), 0);

        assert!(updater.ticks.load(Ordering::SeqCst) >= 2);
    }
}
