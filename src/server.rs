use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hickory_server::ServerFuture;
use log::info;
use tokio::net::{TcpListener, UdpSocket};

use crate::domain_tree::Config;
use crate::handler::TrafficHandler;

/// TCP connections are given a generous idle timeout since this server
/// never streams large zone transfers, only single-answer A queries.
const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DnsServer {
    config: Arc<Config>,
    bind_addr: SocketAddr,
    ttl: u32,
}

impl DnsServer {
    pub fn new(config: Arc<Config>, bind_addr: SocketAddr, ttl: u32) -> Self {
        Self {
            config,
            bind_addr,
            ttl,
        }
    }

    /// Binds UDP and TCP on the same address and serves both
    /// concurrently with a single handler until the process is
    /// signaled to stop.
    pub async fn run(self) -> Result<()> {
        let handler = TrafficHandler::new(self.config, self.ttl);
        let mut server = ServerFuture::new(handler);

        let udp_socket = UdpSocket::bind(self.bind_addr).await?;
        info!("listening on udp {}", self.bind_addr);
        server.register_socket(udp_socket);

        let tcp_listener = TcpListener::bind(self.bind_addr).await?;
        info!("listening on tcp {}", self.bind_addr);
        server.register_listener(tcp_listener, TCP_IDLE_TIMEOUT);

        server.block_until_done().await?;
        Ok(())
    }
}
