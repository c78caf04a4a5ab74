use std::{io, net::SocketAddr, sync::Arc};

use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::codec::DecodeMode;
use crate::processor::process_dns_query;
use crate::protocol::UDP_MAX_MESSAGE_SIZE;
use crate::resolver::Resolver;

/// UDP front end: one receive loop, one spawned task per datagram.
pub struct DnsServer {
    sock: Arc<UdpSocket>,
    resolver: Arc<dyn Resolver>,
    mode: DecodeMode,
}

impl DnsServer {
    pub async fn bind(
        addr: SocketAddr,
        resolver: Arc<dyn Resolver>,
        mode: DecodeMode,
    ) -> io::Result<Self> {
        let sock = UdpSocket::bind(addr).await?;
        Ok(Self {
            sock: Arc::new(sock),
            resolver,
            mode,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Receive datagrams until the task is dropped.
    pub async fn run(self) {
        let mut buf = [0; UDP_MAX_MESSAGE_SIZE];

        if let Ok(addr) = self.local_addr() {
            info!("DNS server listening on {}", addr);
        }

        loop {
            let (len, addr) = match self.sock.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    continue;
                }
            };
            debug!("Received {} bytes from {}", len, addr);

            // Each task owns its bytes; buf is overwritten by the next receive
            let packet_data = buf[..len].to_vec();

            tokio::spawn(process_dns_query(
                packet_data,
                addr,
                Arc::clone(&self.resolver),
                Arc::clone(&self.sock),
                self.mode,
            ));
        }
    }
}
