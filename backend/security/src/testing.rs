//! Test fixtures: throwaway certificate authorities and a minimal HTTPS server.
//!
//! Only compiled for tests or with the `test-util` feature.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, SanType};
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// A self-signed certificate authority generated in memory.
pub struct TestCa {
    cert: rcgen::Certificate,
    key: KeyPair,
}

impl TestCa {
    pub fn new(common_name: &str) -> Self {
        let mut params = CertificateParams::default();
        params.distinguished_name.push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let key = KeyPair::generate().expect("key generation should succeed");
        let cert = params.self_signed(&key).expect("self-signing should succeed");
        Self { cert, key }
    }

    pub fn cert_pem(&self) -> String {
        self.cert.pem()
    }

    pub fn cert_der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    /// A leaf certificate for `localhost` / `127.0.0.1` signed by this CA.
    pub fn issue_localhost(&self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        self.issue_leaf(&["localhost"], true, false)
    }

    /// Same as [`issue_localhost`](Self::issue_localhost) but already expired.
    pub fn issue_expired_localhost(&self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        self.issue_leaf(&["localhost"], true, true)
    }

    /// A valid leaf for exactly `dns_names`, without the loopback IP.
    pub fn issue_leaf_for(
        &self,
        dns_names: &[&str],
    ) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        self.issue_leaf(dns_names, false, false)
    }

    fn issue_leaf(
        &self,
        dns_names: &[&str],
        loopback_ip: bool,
        expired: bool,
    ) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        let names = dns_names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let mut params = CertificateParams::new(names).expect("valid DNS names");
        if let Some(first) = dns_names.first() {
            params.distinguished_name.push(DnType::CommonName, *first);
        }
        if loopback_ip {
            params
                .subject_alt_names
                .push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        }
        if expired {
            params.not_before = rcgen::date_time_ymd(2000, 1, 1);
            params.not_after = rcgen::date_time_ymd(2001, 1, 1);
        }

        let key = KeyPair::generate().expect("leaf key generation should succeed");
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("leaf signing should succeed");

        let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
        (vec![cert.der().clone()], key_der)
    }

    /// Server config presenting a fresh `localhost` leaf signed by this CA.
    pub fn server_config(&self) -> Arc<ServerConfig> {
        let (chain, key) = self.issue_localhost();
        server_config_for(chain, key)
    }
}

pub fn server_config_for(
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Arc<ServerConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("protocol versions should be supported")
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .expect("server certificate should be accepted");
    Arc::new(config)
}

/// Canned HTTP response served for every request.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TestResponse {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "text/html; charset=utf-8".into())],
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: String::new() }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {} Test\r\n", self.status);
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));
        out.push_str(&self.body);
        out.into_bytes()
    }
}

/// A running HTTPS server bound to `127.0.0.1`.
pub struct TestServer {
    pub addr: SocketAddr,
    /// Request lines (`GET /path HTTP/1.1`) seen so far.
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("https://{}/", self.addr)
    }

    pub fn request_lines(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

/// Serve `response` over TLS until the runtime shuts down.
/// Handshake failures are ignored; the client observes them.
pub async fn spawn_https_server(config: Arc<ServerConfig>, response: TestResponse) -> TestServer {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr");
    let acceptor = TlsAcceptor::from(config);
    let requests = Arc::new(Mutex::new(Vec::new()));

    let log = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else { break };
            let acceptor = acceptor.clone();
            let response = response.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(tcp).await else { return };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.len() < 16 * 1024 {
                    match tls.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                if let Some(line) = String::from_utf8_lossy(&buf).lines().next() {
                    log.lock().expect("request log poisoned").push(line.to_string());
                }
                let _ = tls.write_all(&response.to_bytes()).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    TestServer { addr, requests }
}
