//! The accept loop: binds a single port, sniffs each connection to pick a
//! protocol entry, then dials that entry's backend and splices the two
//! sockets together.
//!
//! The sniffing core (`arbiter`, `connection`, `probes`) never touches a
//! socket; this module is the only place that does, and it is what the
//! `sniffd` binary drives.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn, Instrument};

use crate::buffer::SniffBuffer;
use crate::config::Configuration;
use crate::connection::{self, Resolution, DEFAULT_MAX_SNIFF_BYTES};
use crate::entry::BackendTarget;

/// Default maximum concurrent connections per listener.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10000;

#[derive(Debug, Default)]
pub struct ListenerStats {
    pub connections_accepted: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_closed: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub matched: AtomicU64,
    pub fell_back: AtomicU64,
    pub no_backend: AtomicU64,
}

/// A single-port listener sniffing and routing connections per a
/// [`Configuration`].
pub struct Listener {
    listener: TcpListener,
    config: Arc<Configuration>,
    conn_semaphore: Arc<Semaphore>,
    stats: Arc<ListenerStats>,
}

impl Listener {
    pub async fn bind(
        bind_addr: SocketAddr,
        config: Arc<Configuration>,
        max_connections: usize,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(bind_addr = %local_addr, max_connections, "listener bound");

        Ok(Self {
            listener,
            config,
            conn_semaphore: Arc::new(Semaphore::new(max_connections)),
            stats: Arc::new(ListenerStats::default()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    /// Accept connections until the process is killed, handling each one on
    /// its own task bounded by the connection semaphore.
    pub async fn run(self: Arc<Self>) -> io::Result<()> {
        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept error");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    continue;
                }
            };

            let permit = match self.conn_semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(peer_addr = %peer_addr, "connection rejected: max connections reached");
                    continue;
                }
            };

            self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

            let listener = Arc::clone(&self);
            tokio::spawn(
                async move {
                    if let Err(e) = listener.handle_connection(stream, peer_addr).await {
                        debug!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                    listener.stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                    listener.stats.connections_closed.fetch_add(1, Ordering::Relaxed);
                    drop(permit);
                }
                .instrument(tracing::info_span!("connection", peer = %peer_addr)),
            );
        }
    }

    async fn handle_connection(&self, mut client: TcpStream, peer_addr: SocketAddr) -> io::Result<()> {
        let mut buffer = SniffBuffer::with_capacity(DEFAULT_MAX_SNIFF_BYTES);
        let (entry, resolution) = connection::sniff(&mut client, &self.config, &mut buffer).await;

        match resolution {
            Resolution::Matched => {
                self.stats.matched.fetch_add(1, Ordering::Relaxed);
            }
            Resolution::FellBack(reason) => {
                self.stats.fell_back.fetch_add(1, Ordering::Relaxed);
                debug!(peer_addr = %peer_addr, ?reason, "fell back");
            }
        }

        let Some(entry) = entry else {
            debug!(peer_addr = %peer_addr, "no entry configured, dropping connection");
            return Ok(());
        };

        let Some(backend) = entry.backend.as_ref() else {
            self.stats.no_backend.fetch_add(1, Ordering::Relaxed);
            warn!(peer_addr = %peer_addr, entry = %entry.name, "matched entry has no backend configured");
            return Ok(());
        };

        debug!(peer_addr = %peer_addr, entry = %entry.name, backend = %backend.host, port = backend.port, "routing connection");

        connect_and_splice(&mut client, backend, buffer.as_slice()).await
    }
}

/// Dial `backend`, replay the already-buffered sniff bytes, then copy the
/// rest of the connection bidirectionally until either side closes.
pub async fn connect_and_splice(
    client: &mut TcpStream,
    backend: &BackendTarget,
    prefix: &[u8],
) -> io::Result<()> {
    let mut upstream = TcpStream::connect((backend.host.as_str(), backend.port)).await?;

    if !prefix.is_empty() {
        upstream.write_all(prefix).await?;
    }

    let (to_upstream, to_client) =
        tokio::io::copy_bidirectional(client, &mut upstream).await?;
    debug!(to_upstream, to_client, "connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_and_reports_local_addr() {
        let config = Arc::new(
            Configuration::builder()
                .entry(crate::entry::ProtocolEntry::new(
                    "anyprot",
                    crate::probes::anyprot_probe,
                ))
                .build()
                .unwrap(),
        );
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), config, DEFAULT_MAX_CONNECTIONS)
            .await
            .unwrap();
        assert!(listener.local_addr().unwrap().port() > 0);
    }
}
