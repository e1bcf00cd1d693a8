use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::{format_description::well_known, OffsetDateTime};

/// One configured target: a `host:port` to dial and the name shown for it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    #[serde(rename = "hostport")]
    pub host_port: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl Endpoint {
    pub fn new(host_port: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            host_port: host_port.into(),
            display_name: display_name.into(),
        }
    }

    /// Host part of `host_port`, used as the TLS server name.
    ///
    /// `[::1]:443` yields `::1`; a bare IPv6 literal or a value without a port
    /// is returned as-is so the connect step can report it.
    pub fn host(&self) -> &str {
        let hp = self.host_port.trim();
        if let Some(rest) = hp.strip_prefix('[') {
            if let Some((host, _)) = rest.split_once(']') {
                return host;
            }
        }
        match hp.rsplit_once(':') {
            Some((host, _)) if !host.contains(':') => host,
            _ => hp,
        }
    }
}

/// Why a certificate is not currently valid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NotYetValid,
    Expired,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotYetValid => f.write_str("NOT YET VALID"),
            FailureReason::Expired => f.write_str("EXPIRED"),
        }
    }
}

/// Validity state of a leaf certificate at the moment it was checked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CertStatus {
    Valid {
        #[serde(rename = "time_remaining_secs", with = "duration_secs")]
        time_remaining: Duration,
    },
    NotYetValid,
    Expired,
}

impl CertStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CertStatus::Valid { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            CertStatus::Valid { .. } => None,
            CertStatus::NotYetValid => Some(FailureReason::NotYetValid),
            CertStatus::Expired => Some(FailureReason::Expired),
        }
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        match self {
            CertStatus::Valid { time_remaining } => Some(*time_remaining),
            _ => None,
        }
    }
}

/// Outcome of one successful probe.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub source: Endpoint,
    #[serde(flatten)]
    pub status: CertStatus,
    pub subject: Option<String>,
    pub not_before: String,
    pub not_after: String,
    pub checked_at: String,
}

impl ScanResult {
    pub fn valid(&self) -> bool {
        self.status.is_valid()
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.status.failure_reason()
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        self.status.time_remaining()
    }
}

/// The result set a host holds between scans. Each scan replaces it whole.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub results: Vec<ScanResult>,
    pub updated_at: Option<String>,
}

pub(crate) fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
