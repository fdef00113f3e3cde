//! A standalone stub switch for exercising CSTA clients.
//!
//! Configured from the environment:
//!
//! | Variable              | Default      |
//! |-----------------------|--------------|
//! | `CSTA_BIND`           | `0.0.0.0`    |
//! | `CSTA_PORT`           | 4721 (4722 with TLS) |
//! | `CSTA_SWITCH_NAME`    | `CM`         |
//! | `CSTA_SWITCH_ADDRESS` | `127.0.0.1`  |
//! | `CSTA_TLS_CERT`, `CSTA_TLS_KEY` | PEM files; both enable TLS |
//! | `CSTA_EXTENSIONS`     | comma-separated station numbers |
//! | `CSTA_VDNS`           | comma-separated VDNs |
//! | `CSTA_AUTO_PROVISION` | `false`      |
//!
//! Log verbosity follows `RUST_LOG`.

use std::env;

use csta::prelude::*;
use csta::transport::{DEFAULT_PORT, DEFAULT_TLS_PORT};
use tracing_subscriber::EnvFilter;

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Splits a comma-separated list, dropping blank entries.
fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|dn| !dn.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn is_enabled(value: Option<String>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn tls_from_env() -> Result<Option<TlsServerConfig>, Box<dyn std::error::Error>> {
    match (var("CSTA_TLS_CERT"), var("CSTA_TLS_KEY")) {
        (Some(cert), Some(key)) => Ok(Some(TlsServerConfig {
            cert: std::fs::read(cert)?,
            key: std::fs::read(key)?,
        })),
        (None, None) => Ok(None),
        _ => Err("CSTA_TLS_CERT and CSTA_TLS_KEY must be set together".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let tls = tls_from_env()?;
    let port = match var("CSTA_PORT") {
        Some(port) => port.parse::<u16>()?,
        None if tls.is_some() => DEFAULT_TLS_PORT,
        None => DEFAULT_PORT,
    };
    let host = var("CSTA_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
    let switch_name = var("CSTA_SWITCH_NAME").unwrap_or_else(|| "CM".to_string());
    let switch_address = var("CSTA_SWITCH_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string());
    let auto_provision = is_enabled(var("CSTA_AUTO_PROVISION"));

    let resources = Arc::new(ResourceRegistry::new());
    for dn in split_list(var("CSTA_EXTENSIONS")) {
        resources.add_extension(&dn, &switch_name, &switch_address).await?;
    }
    for dn in split_list(var("CSTA_VDNS")) {
        resources.add_vdn(&dn, &switch_name, &switch_address).await?;
    }
    tracing::info!(resources = resources.len().await, "registry seeded");

    let mut builder = CstaServer::builder()
        .bind(&format!("{host}:{port}"))
        .switch_name(&switch_name)
        .switch_address(&switch_address)
        .auto_provision(auto_provision)
        .resources(resources);
    if let Some(tls) = tls {
        builder = builder.tls(tls);
    }
    let server = builder.build().await?;

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        shutdown.cancel();
    });

    server.run().await?;
    Ok(())
}
