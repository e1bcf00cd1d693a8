use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// DNS, refused, timeout, handshake or cancellation.
    ConnectionFailed,
    /// Handshake completed but the peer presented no certificate.
    NoCertificates,
    /// A certificate was presented but is not parseable X.509.
    UnreadableCertificate,
}

/// Why a single endpoint produced no result. Never fatal to a scan.
#[derive(Error, Debug)]
pub enum ProbeFailure {
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    #[error("TLS handshake with {target} failed: {source}")]
    Handshake {
        target: String,
        source: native_tls::Error,
    },

    #[error("probe timed out after {0:?}")]
    TimedOut(Duration),

    #[error("probe cancelled")]
    Cancelled,

    #[error("peer presented no certificate")]
    NoCertificates,

    #[error("leaf certificate could not be parsed: {0}")]
    UnreadableCertificate(String),
}

impl ProbeFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeFailure::Connect { .. }
            | ProbeFailure::Handshake { .. }
            | ProbeFailure::TimedOut(_)
            | ProbeFailure::Cancelled => FailureKind::ConnectionFailed,
            ProbeFailure::NoCertificates => FailureKind::NoCertificates,
            ProbeFailure::UnreadableCertificate(_) => FailureKind::UnreadableCertificate,
        }
    }
}
