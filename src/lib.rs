//! Library crate for cert-watch: probe TLS endpoints and classify the validity
//! of the leaf certificate each one presents.
pub mod endpoints;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod scanner;
pub mod server;
pub mod types;
