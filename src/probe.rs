use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use ::time::OffsetDateTime;

use crate::error::ProbeFailure;
use crate::types::{rfc3339, CertStatus, Endpoint, ScanResult};

/// Source of peer certificates. One call owns one connection for its
/// duration and releases it before returning.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Connect to `endpoint` and return the DER bytes of the leaf certificate,
    /// or `None` if the handshake succeeded without the peer presenting one.
    async fn fetch_leaf(&self, endpoint: &Endpoint) -> Result<Option<Vec<u8>>, ProbeFailure>;
}

/// Certificate verification mode for a [`TlsDialer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verification {
    /// Accept any chain and any hostname. The prober only reads the leaf's
    /// declared validity window, so this is the normal mode.
    #[default]
    Insecure,
    /// Standard chain and hostname verification; untrusted peers fail the handshake.
    Strict,
}

/// TLS client over `tokio-native-tls` that dials each endpoint's own `host:port`.
#[derive(Clone)]
pub struct TlsDialer {
    connector: tokio_native_tls::TlsConnector,
}

impl TlsDialer {
    pub fn new(verification: Verification) -> Result<Self, native_tls::Error> {
        let mut builder = native_tls::TlsConnector::builder();
        if verification == Verification::Insecure {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let connector = builder.build()?;
        Ok(Self {
            connector: tokio_native_tls::TlsConnector::from(connector),
        })
    }

    pub fn insecure() -> Result<Self, native_tls::Error> {
        Self::new(Verification::Insecure)
    }
}

#[async_trait]
impl CertificateSource for TlsDialer {
    async fn fetch_leaf(&self, endpoint: &Endpoint) -> Result<Option<Vec<u8>>, ProbeFailure> {
        let target = endpoint.host_port.trim();
        let tcp = TcpStream::connect(target)
            .await
            .map_err(|source| ProbeFailure::Connect {
                target: target.to_string(),
                source,
            })?;
        let handshake_err = |source| ProbeFailure::Handshake {
            target: target.to_string(),
            source,
        };
        let stream = self
            .connector
            .connect(endpoint.host(), tcp)
            .await
            .map_err(handshake_err)?;
        let leaf = stream
            .get_ref()
            .peer_certificate()
            .map_err(handshake_err)?
            .map(|cert| cert.to_der())
            .transpose()
            .map_err(handshake_err)?;
        drop(stream);
        Ok(leaf)
    }
}

/// Declared validity window of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

/// Classify a validity window against `now`. Both edges are inclusive.
pub fn classify(validity: &Validity, now: OffsetDateTime) -> CertStatus {
    if now < validity.not_before {
        CertStatus::NotYetValid
    } else if now > validity.not_after {
        CertStatus::Expired
    } else {
        let remaining = validity.not_after - now;
        CertStatus::Valid {
            time_remaining: Duration::try_from(remaining).unwrap_or(Duration::ZERO),
        }
    }
}

/// Parse a DER leaf certificate and classify it for `endpoint` at `now`.
pub fn inspect_leaf(
    endpoint: &Endpoint,
    der: &[u8],
    now: OffsetDateTime,
) -> Result<ScanResult, ProbeFailure> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| ProbeFailure::UnreadableCertificate(e.to_string()))?;
    let validity = Validity {
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
    };
    let subject = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string);

    Ok(ScanResult {
        source: endpoint.clone(),
        status: classify(&validity, now),
        subject,
        not_before: rfc3339(validity.not_before),
        not_after: rfc3339(validity.not_after),
        checked_at: rfc3339(now),
    })
}

/// Probes single endpoints through a [`CertificateSource`] with a bounded timeout.
#[derive(Clone)]
pub struct Prober {
    source: Arc<dyn CertificateSource>,
    timeout: Duration,
}

impl Prober {
    pub fn new(source: Arc<dyn CertificateSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Probe one endpoint. `now` is read after the certificate arrives, so each
    /// endpoint in a long scan is judged against its own read time.
    pub async fn probe(&self, endpoint: &Endpoint) -> Result<ScanResult, ProbeFailure> {
        let leaf = time::timeout(self.timeout, self.source.fetch_leaf(endpoint))
            .await
            .map_err(|_| ProbeFailure::TimedOut(self.timeout))??;
        let der = leaf.ok_or(ProbeFailure::NoCertificates)?;
        inspect_leaf(endpoint, &der, OffsetDateTime::now_utc())
    }
}
