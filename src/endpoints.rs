use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::types::Endpoint;

/// Ordered list of endpoints to scan. May be empty and may contain duplicates;
/// `host_port` values are not validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn extend(&mut self, more: impl IntoIterator<Item = Endpoint>) {
        self.endpoints.extend(more);
    }
}

/// Parse an endpoints file into an ordered list.
///
/// Supported formats per line:
/// - `host:port` : display name defaults to the target itself
/// - `host:port Display Name` : everything after the first whitespace is the name
/// - comments: everything after `#` is ignored
/// - whitespace and blank lines are ignored
///
/// Duplicates are kept and order is preserved.
pub fn parse_endpoints_str(s: &str) -> Vec<Endpoint> {
    let mut out = Vec::new();
    for raw_line in s.lines() {
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }
        let (target, name) = match line.split_once(char::is_whitespace) {
            Some((t, n)) => (t, n.trim()),
            None => (line, ""),
        };
        let name = if name.is_empty() { target } else { name };
        out.push(Endpoint::new(target, name));
    }
    out
}

/// Parse a single `host:port[=Display Name]` command-line value.
pub fn parse_endpoint_arg(s: &str) -> Result<Endpoint> {
    let (target, name) = match s.split_once('=') {
        Some((t, n)) => (t.trim(), n.trim()),
        None => (s.trim(), ""),
    };
    if target.is_empty() {
        bail!("empty endpoint target in {s:?}");
    }
    let name = if name.is_empty() { target } else { name };
    Ok(Endpoint::new(target, name))
}

/// Structured endpoint documents: a bare list, or a widget block carrying the
/// list under `domains`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum EndpointsDocument {
    List(Vec<Endpoint>),
    Widget { domains: Vec<Endpoint> },
}

impl EndpointsDocument {
    fn into_registry(self) -> EndpointRegistry {
        match self {
            EndpointsDocument::List(endpoints) => EndpointRegistry::new(endpoints),
            EndpointsDocument::Widget { domains } => EndpointRegistry::new(domains),
        }
    }
}

/// Load endpoints from a file, picking the format by extension:
/// - `.json` : `[{"hostport": ..., "name": ...}]` or `{"domains": [...]}`
/// - `.yaml` / `.yml` : the same shapes in YAML
/// - anything else : the line format of [`parse_endpoints_str`]
pub fn load_endpoints_from_path(path: impl AsRef<Path>) -> Result<EndpointRegistry> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read endpoints file: {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => {
            let doc: EndpointsDocument = serde_json::from_str(&content)
                .with_context(|| format!("invalid endpoints JSON: {}", path.display()))?;
            Ok(doc.into_registry())
        }
        "yaml" | "yml" => {
            let doc: EndpointsDocument = serde_yaml::from_str(&content)
                .with_context(|| format!("invalid endpoints YAML: {}", path.display()))?;
            Ok(doc.into_registry())
        }
        _ => Ok(EndpointRegistry::new(parse_endpoints_str(&content))),
    }
}
