//! `emit` command implementation.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::info;

use crate::cli::EmitArgs;
use crate::error::{self, CliError};

/// Execute the `emit` command
pub async fn run_emit(args: &EmitArgs) -> Result<()> {
    let sent = send_datagram(&args.target, args.payload.as_bytes())
        .await
        .with_context(|| format!("Failed to emit datagram to {}", args.target))?;

    info!(target_addr = %sent.0, bytes = sent.1, "Datagram sent");
    println!("Sent {} bytes to {}", sent.1, sent.0);
    Ok(())
}

/// Resolve `target` and send `payload` as one datagram
async fn send_datagram(target: &str, payload: &[u8]) -> error::Result<(SocketAddr, usize)> {
    let addr = tokio::net::lookup_host(target)
        .await
        .map_err(|e| CliError::invalid_target(target, e.to_string()))?
        .next()
        .ok_or_else(|| CliError::invalid_target(target, "resolved to no address"))?;

    let local: SocketAddr = if addr.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local).await?;
    let sent = socket.send_to(payload, addr).await?;
    Ok((addr, sent))
}
