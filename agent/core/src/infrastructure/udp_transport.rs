// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! UDP broadcast transport.
//!
//! Every agent binds the same port and sends to the subnet broadcast address.
//! The kernel loops our own broadcasts back to us; those are dropped in
//! [`UdpTransport::recv`] by comparing the sender with the local endpoint.

use crate::domain::agent::AgentId;
use crate::domain::node_config::TransportConfig;
use crate::domain::transport::{Transport, TransportError};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

/// Largest datum we expect; the wire format is a few dozen bytes.
const MAX_DATAGRAM: usize = 512;

pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    local_ip: IpAddr,
    local_port: u16,
    send_timeout: Duration,
}

impl UdpTransport {
    /// Bind the configured address and enable broadcasting.
    pub async fn bind(config: &TransportConfig) -> Result<Self, TransportError> {
        let bind_addr = parse_socket_addr(&config.bind_address, config.port)?;
        let target = parse_socket_addr(&config.broadcast_address, config.port)?;

        let socket = UdpSocket::bind(bind_addr).await?;
        let transport = Self::from_socket(socket, target, Duration::from_millis(config.send_timeout_ms))?;

        info!(
            "UDP transport bound to {}:{} (broadcasting to {}, local address {})",
            config.bind_address, transport.local_port, target, transport.local_ip
        );
        Ok(transport)
    }

    /// Wrap an already bound socket.
    pub fn from_socket(
        socket: UdpSocket,
        target: SocketAddr,
        send_timeout: Duration,
    ) -> Result<Self, TransportError> {
        socket.set_broadcast(true)?;
        let local = socket.local_addr()?;
        let local_ip = if local.ip().is_unspecified() {
            detect_local_ip(target)?
        } else {
            local.ip()
        };

        Ok(Self {
            socket,
            target,
            local_ip,
            local_port: local.port(),
            send_timeout,
        })
    }

    pub fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    /// Identifier derived from the local address.
    pub fn agent_id(&self) -> AgentId {
        AgentId::from_ip(self.local_ip)
    }

    fn is_own(&self, from: SocketAddr) -> bool {
        from.port() == self.local_port && from.ip() == self.local_ip
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn broadcast(&self, payload: &[u8]) -> Result<(), TransportError> {
        match tokio::time::timeout(self.send_timeout, self.socket.send_to(payload, self.target)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(TransportError::Timeout(self.send_timeout.as_millis() as u64)),
        }
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            if self.is_own(from) {
                trace!("Dropped own echo from {}", from);
                continue;
            }
            debug!("Received {} bytes from {}", len, from);
            return Ok(buf[..len].to_vec());
        }
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| TransportError::InvalidAddress(host.to_string()))?;
    Ok(SocketAddr::new(ip, port))
}

/// Address of the interface the kernel would route `target` through.
///
/// Connecting a datagram socket sends nothing; it only selects a route.
fn detect_local_ip(target: SocketAddr) -> Result<IpAddr, TransportError> {
    let probe = std::net::UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))?;
    probe.set_broadcast(true)?;
    probe.connect(target)?;
    Ok(probe.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socket_addr_rejects_hostnames() {
        assert!(matches!(
            parse_socket_addr("swarm.local", 47000),
            Err(TransportError::InvalidAddress(_))
        ));
        assert_eq!(
            parse_socket_addr("192.168.1.255", 47000).unwrap(),
            "192.168.1.255:47000".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_own_echo_is_suppressed() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let own_addr = socket.local_addr().unwrap();
        // Target ourselves so the echo is guaranteed to arrive first
        let transport = UdpTransport::from_socket(socket, own_addr, Duration::from_millis(500)).unwrap();
        assert_eq!(transport.local_ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));

        transport.broadcast(b"0 1 1 0.65").await.unwrap();

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(b"0 2 3 0.40", own_addr).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(2), transport.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, b"0 2 3 0.40");
    }

    #[tokio::test]
    async fn test_agent_id_from_bound_address() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let transport = UdpTransport::from_socket(socket, addr, Duration::from_millis(100)).unwrap();
        assert_eq!(transport.agent_id(), AgentId::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }
}
