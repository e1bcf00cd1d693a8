use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::endpoints::EndpointRegistry;
use crate::scanner::Scanner;
use crate::types::{rfc3339, Snapshot};

/// Something a host scheduler can ask to refresh itself.
#[async_trait]
pub trait ScheduledUpdate: Send + Sync {
    async fn on_scheduled_update(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub title: String,
    pub refresh_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            title: "Certificates".into(),
            refresh_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Scans a fixed registry and keeps the latest snapshot. Cheap to clone.
#[derive(Clone)]
pub struct CertificateMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    settings: MonitorSettings,
    registry: EndpointRegistry,
    scanner: Scanner,
    snapshot: RwLock<Snapshot>,
    // Held across scan-and-store so refreshes never interleave.
    refresh_lock: Mutex<()>,
}

impl CertificateMonitor {
    pub fn new(registry: EndpointRegistry, scanner: Scanner, settings: MonitorSettings) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                settings,
                registry,
                scanner,
                snapshot: RwLock::new(Snapshot::default()),
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    pub fn title(&self) -> &str {
        &self.inner.settings.title
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.settings.refresh_interval
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.inner.registry
    }

    /// Latest snapshot; empty until the first refresh completes.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.read().await.clone()
    }

    /// Scan now and replace the held snapshot with the fresh result set.
    ///
    /// Concurrent callers queue up: each scan starts after the previous one has
    /// stored, so the held snapshot is always from the most recently started scan.
    pub async fn refresh(&self) -> Snapshot {
        let _guard = self.inner.refresh_lock.lock().await;
        let results = self
            .inner
            .scanner
            .scan(self.inner.registry.endpoints())
            .await;
        let fresh = Snapshot {
            results,
            updated_at: Some(rfc3339(OffsetDateTime::now_utc())),
        };
        *self.inner.snapshot.write().await = fresh.clone();
        fresh
    }
}

#[async_trait]
impl ScheduledUpdate for CertificateMonitor {
    async fn on_scheduled_update(&self) -> Result<()> {
        let snap = self.refresh().await;
        info!(
            title = %self.title(),
            results = snap.results.len(),
            "snapshot updated"
        );
        Ok(())
    }
}

/// Run `updater` immediately and then every `interval` until `cancel` fires.
///
/// Update errors are logged and the loop keeps going; an update still running
/// at cancellation is dropped without touching the held snapshot.
pub async fn run_schedule<U>(updater: &U, interval: Duration, cancel: CancellationToken)
where
    U: ScheduledUpdate + ?Sized,
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = updater.on_scheduled_update() => {
                if let Err(e) = res {
                    warn!("scheduled update failed: {e:#}");
                }
            }
        }
    }
}

/// Cancel `cancel` once `signal` resolves `Ok`. A signal that fails to install
/// is logged and leaves the token alone.
pub async fn cancel_on_signal<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("interrupt received, cancelling");
            cancel.cancel();
        }
        Err(e) => warn!("could not listen for interrupt: {e}"),
    }
}
