//! Target address resolution.

use std::net::{IpAddr, SocketAddr};

use tokio::net::lookup_host;

use crate::CliError;

/// Resolve `host`, `host:port`, `ip` or `ip:port` to one socket address.
///
/// Entries without a port get `default_port`.
pub async fn resolve_target(target: &str, default_port: u16) -> Result<SocketAddr, CliError> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let candidate = if target.contains(':') {
        target.to_string()
    } else {
        format!("{target}:{default_port}")
    };

    let resolved = lookup_host(candidate.as_str())
        .await
        .map_err(|e| CliError::Resolve {
            target: target.to_string(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| CliError::Resolve {
            target: target.to_string(),
            reason: "no addresses".to_string(),
        });
    resolved
}

/// Resolve every target, failing on the first that does not resolve.
pub async fn resolve_all(targets: &[String], default_port: u16) -> Result<Vec<SocketAddr>, CliError> {
    let mut resolved = Vec::with_capacity(targets.len());
    for target in targets {
        resolved.push(resolve_target(target, default_port).await?);
    }
    Ok(resolved)
}
