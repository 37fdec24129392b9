//! Drives the TLS probe through a real `rustls` handshake instead of
//! hand-built ClientHello bytes: a genuine TLS client connects to our
//! `Listener`, which sniffs the SNI and splices to a genuine TLS backend
//! that completes the handshake. This exercises the probe chain, the
//! buffer-replay path, and the TLS parser against wire bytes nobody wrote
//! by hand.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_rustls::{TlsAcceptor, TlsConnector};

use plfm_sniffer::config::Configuration;
use plfm_sniffer::entry::ProbeData;
use plfm_sniffer::net::Listener;
use plfm_sniffer::probes;
use plfm_sniffer::tls::TlsPolicy;
use plfm_sniffer::ProtocolEntry;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT_CRYPTO: Once = Once::new();

fn init_crypto_provider() {
    INIT_CRYPTO.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .ok();
    });
}

/// A TLS-terminating backend that echoes back a fixed marker after reading
/// whatever the client sent, so a test can confirm which backend a
/// connection actually reached.
struct TlsBackend {
    addr: SocketAddr,
    cert_der: Vec<u8>,
    connections: Arc<AtomicU64>,
    _shutdown: oneshot::Sender<()>,
}

impl TlsBackend {
    async fn spawn(server_name: &str, marker: &str) -> std::io::Result<Self> {
        init_crypto_provider();

        let cert = rcgen::generate_simple_self_signed(vec![server_name.to_string()])
            .map_err(std::io::Error::other)?;
        let cert_der = cert.cert.der().to_vec();
        let key_der = cert.key_pair.serialize_der();

        let certs = vec![CertificateDer::from(cert_der.clone())];
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der));

        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(std::io::Error::other)?;

        let acceptor = TlsAcceptor::from(Arc::new(config));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let connections = Arc::new(AtomicU64::new(0));
        let conn_clone = Arc::clone(&connections);
        let marker = marker.as_bytes().to_vec();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        conn_clone.fetch_add(1, Ordering::Relaxed);
                        let acceptor = acceptor.clone();
                        let response = marker.clone();
                        tokio::spawn(async move {
                            if let Ok(mut tls_stream) = acceptor.accept(stream).await {
                                let mut buf = vec![0u8; 1024];
                                if tls_stream.read(&mut buf).await.is_ok() {
                                    let _ = tls_stream.write_all(&response).await;
                                }
                            }
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(Self {
            addr,
            cert_der,
            connections,
            _shutdown: shutdown_tx,
        })
    }
}

async fn tls_client_connect(
    addr: SocketAddr,
    server_name: &str,
    cert_der: &[u8],
) -> std::io::Result<tokio_rustls::client::TlsStream<tokio::net::TcpStream>> {
    init_crypto_provider();

    let mut root_store = rustls::RootCertStore::empty();
    root_store
        .add(CertificateDer::from(cert_der.to_vec()))
        .map_err(std::io::Error::other)?;

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(config));
    let stream = tokio::net::TcpStream::connect(addr).await?;
    let server_name = ServerName::try_from(server_name.to_string())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    connector.connect(server_name, stream).await
}

#[tokio::test]
async fn real_sni_routes_through_the_proxy_to_the_matching_backend() {
    let backend_a = TlsBackend::spawn("a.example.test", "A").await.unwrap();
    let backend_b = TlsBackend::spawn("b.example.test", "B").await.unwrap();

    let config = Arc::new(
        Configuration::builder()
            .entry(
                ProtocolEntry::new("a", probes::tls)
                    .with_data(ProbeData::Tls(TlsPolicy::new().with_sni(["a.example.test"])))
                    .with_backend("127.0.0.1", backend_a.addr.port()),
            )
            .entry(
                ProtocolEntry::new("b", probes::tls)
                    .with_data(ProbeData::Tls(TlsPolicy::new().with_sni(["b.example.test"])))
                    .with_backend("127.0.0.1", backend_b.addr.port()),
            )
            .build()
            .unwrap(),
    );

    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), config, 100)
        .await
        .unwrap();
    let proxy_addr = listener.local_addr().unwrap();
    tokio::spawn(Arc::new(listener).run());

    let reply_a = timeout(TEST_TIMEOUT, async {
        let mut stream =
            tls_client_connect(proxy_addr, "a.example.test", &backend_a.cert_der).await?;
        stream.write_all(b"hello").await?;
        stream.flush().await?;
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await?;
        Ok::<_, std::io::Error>(buf[0])
    })
    .await
    .expect("did not time out")
    .expect("handshake and echo succeeded");
    assert_eq!(reply_a, b'A');

    let reply_b = timeout(TEST_TIMEOUT, async {
        let mut stream =
            tls_client_connect(proxy_addr, "b.example.test", &backend_b.cert_der).await?;
        stream.write_all(b"hello").await?;
        stream.flush().await?;
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await?;
        Ok::<_, std::io::Error>(buf[0])
    })
    .await
    .expect("did not time out")
    .expect("handshake and echo succeeded");
    assert_eq!(reply_b, b'B');

    assert_eq!(backend_a.connections.load(Ordering::Relaxed), 1);
    assert_eq!(backend_b.connections.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn real_sni_mismatch_is_refused_rather_than_misrouted() {
    let backend_a = TlsBackend::spawn("a.example.test", "A").await.unwrap();

    let config = Arc::new(
        Configuration::builder()
            .entry(
                ProtocolEntry::new("a", probes::tls)
                    .with_data(ProbeData::Tls(TlsPolicy::new().with_sni(["a.example.test"])))
                    .with_backend("127.0.0.1", backend_a.addr.port()),
            )
            // No backend: a mismatched SNI falls through to this residual
            // catch-all, which has nowhere to route and drops the
            // connection instead of ever dialing backend_a.
            .entry(ProtocolEntry::new("anyprot", probes::anyprot_probe))
            .build()
            .unwrap(),
    );

    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), config, 100)
        .await
        .unwrap();
    let proxy_addr = listener.local_addr().unwrap();
    tokio::spawn(Arc::new(listener).run());

    // "a" declines (wrong SNI), and the trailing anyprot entry has no
    // backend configured, so the connection is dropped without ever
    // dialing backend_a.
    let result = timeout(TEST_TIMEOUT, async {
        let mut stream =
            tls_client_connect(proxy_addr, "evil.example.test", &backend_a.cert_der).await?;
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await
    })
    .await
    .expect("did not time out");
    assert!(result.is_err(), "expected the connection to be closed, not routed");
    assert_eq!(backend_a.connections.load(Ordering::Relaxed), 0);
}
