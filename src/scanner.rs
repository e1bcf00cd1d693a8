use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProbeFailure;
use crate::probe::{CertificateSource, Prober};
use crate::types::{Endpoint, ScanResult};

/// Tuning for a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Max probes in flight at once. Clamped to 1..=256.
    pub concurrency: usize,
    /// Bound on connect plus handshake for one probe.
    pub timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Fans a batch of endpoints out to the prober and collects the successes in input order.
#[derive(Clone)]
pub struct Scanner {
    prober: Prober,
    concurrency: usize,
}

impl Scanner {
    pub fn new(source: Arc<dyn CertificateSource>, options: ScanOptions) -> Self {
        Self {
            prober: Prober::new(source, options.timeout),
            concurrency: options.concurrency.clamp(1, 256),
        }
    }

    /// Scan every endpoint and return the results that succeeded.
    ///
    /// - Never fails; unreachable endpoints and peers without a certificate
    ///   are left out of the output, not replaced by placeholders.
    /// - Output order follows input order, regardless of completion order.
    /// - Duplicates are probed independently.
    pub async fn scan(&self, endpoints: &[Endpoint]) -> Vec<ScanResult> {
        self.scan_with_cancel(endpoints, CancellationToken::new())
            .await
    }

    /// Variant that accepts a `CancellationToken`. Probes still in flight when it
    /// fires are dropped from the output.
    pub async fn scan_with_cancel(
        &self,
        endpoints: &[Endpoint],
        cancel: CancellationToken,
    ) -> Vec<ScanResult> {
        let outcomes = self.probe_all(endpoints, cancel).await;
        let mut results = Vec::with_capacity(outcomes.len());
        for (endpoint, outcome) in endpoints.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => debug!(
                    endpoint = %endpoint.host_port,
                    name = %endpoint.display_name,
                    kind = ?err.kind(),
                    error = %err,
                    "dropping endpoint from scan"
                ),
            }
        }
        info!(
            probed = endpoints.len(),
            ok = results.len(),
            dropped = endpoints.len() - results.len(),
            "certificate scan finished"
        );
        results
    }

    /// Probe every endpoint and return one outcome per input, index-aligned.
    pub async fn probe_all(
        &self,
        endpoints: &[Endpoint],
        cancel: CancellationToken,
    ) -> Vec<Result<ScanResult, ProbeFailure>> {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for (idx, endpoint) in endpoints.iter().cloned().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = sem.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };
            let prober = self.prober.clone();
            let cancel = cancel.clone();

            set.spawn(async move {
                let _permit = permit; // keep permit until task completes
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ProbeFailure::Cancelled),
                    res = prober.probe(&endpoint) => res,
                };
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<Result<ScanResult, ProbeFailure>>> =
            endpoints.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(e) => warn!("probe task failed: {e}"),
            }
        }

        // Slots never filled were skipped by cancellation or lost to a failed task.
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(ProbeFailure::Cancelled)))
            .collect()
    }
}
