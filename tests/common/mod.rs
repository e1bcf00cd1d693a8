#![allow(dead_code)]

use async_trait::async_trait;
use cert_watch::error::ProbeFailure;
use cert_watch::probe::CertificateSource;
use cert_watch::types::Endpoint;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

/// Canned behaviour for one `host:port`.
#[derive(Clone)]
pub enum Stub {
    Refused,
    NoCert,
    Leaf(Vec<u8>),
    Delayed(Duration, Vec<u8>),
    Hang,
}

/// In-memory certificate source keyed by `host_port`. Unknown targets are refused.
#[derive(Default)]
pub struct StubSource {
    stubs: HashMap<String, Stub>,
    pub calls: AtomicUsize,
}

impl StubSource {
    pub fn with(mut self, host_port: &str, stub: Stub) -> Self {
        self.stubs.insert(host_port.to_string(), stub);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateSource for StubSource {
    async fn fetch_leaf(&self, endpoint: &Endpoint) -> Result<Option<Vec<u8>>, ProbeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.stubs.get(&endpoint.host_port) {
            None | Some(Stub::Refused) => Err(ProbeFailure::Connect {
                target: endpoint.host_port.clone(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            }),
            Some(Stub::NoCert) => Ok(None),
            Some(Stub::Leaf(der)) => Ok(Some(der.clone())),
            Some(Stub::Delayed(delay, der)) => {
                tokio::time::sleep(*delay).await;
                Ok(Some(der.clone()))
            }
            Some(Stub::Hang) => std::future::pending().await,
        }
    }
}

/// A freshly generated self-signed certificate.
pub struct TestCert {
    pub der: Vec<u8>,
    pub cert_pem: String,
    pub key_pem: String,
}

/// Self-signed certificate for `cn` valid from `now + not_before` to `now + not_after`.
pub fn self_signed(cn: &str, not_before: time::Duration, not_after: time::Duration) -> TestCert {
    let now = OffsetDateTime::now_utc();
    let mut params = rcgen::CertificateParams::new(vec![cn.to_string()]).unwrap();
    params.distinguished_name.push(rcgen::DnType::CommonName, cn);
    params.not_before = now + not_before;
    params.not_after = now + not_after;
    let key = rcgen::KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    TestCert {
        der: cert.der().to_vec(),
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
    }
}

pub fn valid_cert(cn: &str) -> TestCert {
    self_signed(cn, -time::Duration::hours(1), time::Duration::hours(24))
}

pub fn expired_cert(cn: &str) -> TestCert {
    self_signed(cn, -time::Duration::days(30), -time::Duration::hours(1))
}

pub fn future_cert(cn: &str) -> TestCert {
    self_signed(cn, time::Duration::hours(1), time::Duration::days(30))
}
