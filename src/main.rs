use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cert_watch::endpoints::{self, EndpointRegistry};
use cert_watch::monitor::{cancel_on_signal, run_schedule, CertificateMonitor, MonitorSettings};
use cert_watch::probe::{TlsDialer, Verification};
use cert_watch::scanner::{ScanOptions, Scanner};
use cert_watch::server;
use cert_watch::types::{CertStatus, ScanResult};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// cert-watch: probe TLS endpoints and report how long their certificates stay valid.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cert-watch",
    version,
    about = "Probe TLS endpoints and report the validity of each leaf certificate.",
    long_about = None
)]
struct Cli {
    /// Path to endpoints file (`host:port [name]` per line, or a .json array).
    #[arg(long)]
    endpoints: Option<PathBuf>,

    /// Extra endpoint as `host:port[=Display Name]`. May be repeated.
    #[arg(long = "endpoint", value_name = "HOST:PORT[=NAME]")]
    extra: Vec<String>,

    /// Max concurrent probes.
    #[arg(long, default_value_t = 16)]
    concurrency: usize,

    /// Per-probe connect + handshake timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 5000)]
    timeout_ms: u64,

    /// Verify certificate chains and hostnames (peers that fail are dropped).
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Write results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Serve the JSON API on this address and refresh on a timer instead of scanning once.
    #[arg(long, value_name = "ADDR")]
    serve: Option<String>,

    /// Refresh interval in seconds when serving.
    #[arg(long = "refresh-secs", default_value_t = 3600)]
    refresh_secs: u64,

    /// Log per-endpoint failures.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let registry = load_registry(&cli)?;
    let verification = if cli.strict {
        Verification::Strict
    } else {
        Verification::Insecure
    };
    let dialer = TlsDialer::new(verification).context("failed to build TLS connector")?;
    let scanner = Scanner::new(
        Arc::new(dialer),
        ScanOptions {
            concurrency: cli.concurrency,
            timeout: Duration::from_millis(cli.timeout_ms),
        },
    );

    info!(
        endpoints = registry.len(),
        concurrency = cli.concurrency,
        timeout_ms = cli.timeout_ms,
        ?verification,
        "cert-watch starting"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), cancel.clone()));

    if let Some(bind) = cli.serve.as_deref() {
        let monitor = CertificateMonitor::new(
            registry,
            scanner,
            MonitorSettings {
                refresh_interval: Duration::from_secs(cli.refresh_secs),
                ..MonitorSettings::default()
            },
        );
        let schedule = {
            let monitor = monitor.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run_schedule(&monitor, monitor.refresh_interval(), cancel).await
            })
        };
        server::spawn_server(bind, monitor, cancel.clone()).await?;
        cancel.cancel();
        let _ = schedule.await;
        return Ok(());
    }

    let results = scanner
        .scan_with_cancel(registry.endpoints(), cancel)
        .await;
    print_results_table(&results);
    if let Some(path) = cli.output.as_deref() {
        write_results_json(path, &results)
            .with_context(|| format!("failed to write JSON to {}", path.display()))?;
        println!("Wrote JSON results to {}", path.display());
    }
    Ok(())
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(cli: &Cli) -> Result<EndpointRegistry> {
    let mut registry = match cli.endpoints.as_deref() {
        Some(path) => endpoints::load_endpoints_from_path(path)?,
        None => EndpointRegistry::default(),
    };
    for raw in &cli.extra {
        registry.extend([endpoints::parse_endpoint_arg(raw)?]);
    }
    if registry.is_empty() && cli.serve.is_none() {
        bail!("no endpoints given; use --endpoints <file> or --endpoint host:port");
    }
    Ok(registry)
}

fn status_label(status: &CertStatus) -> String {
    match status.failure_reason() {
        Some(reason) => reason.to_string(),
        None => "OK".to_string(),
    }
}

fn humanize(d: Duration) -> String {
    let secs = d.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    if days > 0 {
        format!("{days}d {hours}h")
    } else {
        format!("{hours}h {}m", (secs % 3600) / 60)
    }
}

fn print_results_table(results: &[ScanResult]) {
    let rows: Vec<[String; 4]> = results
        .iter()
        .map(|r| {
            [
                r.source.display_name.clone(),
                status_label(&r.status),
                r.time_remaining().map(humanize).unwrap_or_default(),
                r.not_after.clone(),
            ]
        })
        .collect();

    let headers = ["name", "status", "remaining", "not_after"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count().min(60));
        }
    }

    println!("\nCertificates: {}", results.len());
    println!(
        "{:<w0$}  {:<w1$}  {:>w2$}  {:<w3$}",
        headers[0],
        headers[1],
        headers[2],
        headers[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3]
    );
    println!(
        "{:-<w0$}  {:-<w1$}  {:-<w2$}  {:-<w3$}",
        "",
        "",
        "",
        "",
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3]
    );
    for row in &rows {
        let name: String = row[0].chars().take(60).collect();
        println!(
            "{:<w0$}  {:<w1$}  {:>w2$}  {:<w3$}",
            name,
            row[1],
            row[2],
            row[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3]
        );
    }
}

fn write_results_json(path: &std::path::Path, results: &[ScanResult]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}
