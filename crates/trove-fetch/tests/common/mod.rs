#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use trove_fetch::FetchOptions;

pub const CA: &[u8] = include_bytes!("../fixtures/ca.pem");

/// 100 bytes served at `/targets/a.tgz` by [`standard_routes`].
pub const HUNDRED: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyzAB";

/// What the test server answers on one path.
#[derive(Debug, Clone)]
pub enum Route {
    Body {
        content:  Vec<u8>,
        declared: bool,
    },
    /// Declares `declared` bytes, sends `content`, then closes.
    Overstated {
        content:  Vec<u8>,
        declared: u64,
    },
    Status(u16),
    /// Zero bytes without end and without Content-Length.
    Endless,
    /// Headers and a few bytes, then silence.
    Stall,
    /// Accept the request and never answer.
    Silent,
    Redirect(String),
}

pub fn standard_routes() -> Vec<(&'static str, Route)> {
    vec![
        ("/targets/a.tgz", Route::Body {
            content:  HUNDRED.to_vec(),
            declared: true,
        }),
        ("/targets/undeclared", Route::Body {
            content:  HUNDRED.to_vec(),
            declared: false,
        }),
        ("/empty", Route::Body {
            content:  Vec::new(),
            declared: true,
        }),
        ("/targets/overstated", Route::Overstated {
            content:  HUNDRED.to_vec(),
            declared: 200,
        }),
        ("/missing", Route::Status(404)),
        ("/broken", Route::Status(500)),
        ("/endless", Route::Endless),
        ("/stall", Route::Stall),
        ("/silent", Route::Silent),
        ("/hop/1", Route::Redirect("/hop/2".into())),
        ("/hop/2", Route::Redirect("/targets/a.tgz".into())),
        ("/loop", Route::Redirect("/loop".into())),
        ("/to-file", Route::Redirect("file:///etc/passwd".into())),
        ("/to-ftp", Route::Redirect("ftp://127.0.0.1/a".into())),
    ]
}

/// A plain HTTP/1.1 server on 127.0.0.1 serving fixed routes.
pub struct TestServer {
    addr:     SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&'static str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<String, Route>> =
            Arc::new(routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect());
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let routes = Arc::clone(&routes);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &counter).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String { format!("http://{}{path}", self.addr) }

    pub fn requests(&self) -> usize { self.requests.load(Ordering::SeqCst) }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    counter: &AtomicUsize,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }
    counter.fetch_add(1, Ordering::SeqCst);

    let path = request_path(&head);
    match routes.get(&path).cloned().unwrap_or(Route::Status(404)) {
        Route::Body { content, declared } => {
            stream.write_all(&response_head(200, &content, declared)).await?;
            stream.write_all(&content).await?;
        }
        Route::Overstated { content, declared } => {
            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n");
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(&content).await?;
        }
        Route::Status(status) => {
            stream
                .write_all(&response_head(status, b"error\n", true))
                .await?;
            stream.write_all(b"error\n").await?;
        }
        Route::Endless => {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
                .await?;
            let chunk = vec![0u8; 16 * 1024];
            loop {
                stream.write_all(&chunk).await?;
            }
        }
        Route::Stall => {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n0123456789")
                .await?;
            stream.flush().await?;
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Route::Silent => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Route::Redirect(location) => {
            let head = format!(
                "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(head.as_bytes()).await?;
        }
    }
    stream.shutdown().await
}

fn request_path(head: &[u8]) -> String {
    String::from_utf8_lossy(head)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

fn response_head(status: u16, content: &[u8], declared: bool) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {status} Test\r\nConnection: close\r\n");
    if declared {
        head.push_str(&format!("Content-Length: {}\r\n", content.len()));
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// An address nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/a")
}

/// Options for talking to the local servers: no proxies, short timeouts.
pub fn local_options() -> FetchOptions {
    FetchOptions::default()
        .system_proxy(false)
        .connect_timeout(Duration::from_secs(5))
        .read_timeout(Duration::from_secs(5))
}

/// A rustls server on 127.0.0.1 presenting one fixture certificate and
/// answering every request with [`HUNDRED`].
pub struct TlsServer {
    addr: SocketAddr,
}

impl TlsServer {
    /// `name` is the fixture stem: `localhost`, `wronghost` or `expired`.
    pub fn start(name: &str) -> Self {
        let config = server_config(name);
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let config = Arc::clone(&config);
                std::thread::spawn(move || {
                    let _ = serve_tls(stream, config);
                });
            }
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String { format!("https://{}{path}", self.addr) }
}

fn fixture(file: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(file);
    std::fs::read(path).unwrap()
}

fn server_config(name: &str) -> Arc<rustls::ServerConfig> {
    let cert_pem = fixture(&format!("{name}.pem"));
    let key_pem = fixture(&format!("{name}.key"));

    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .unwrap()
        .unwrap();

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    Arc::new(config)
}

fn serve_tls(stream: std::net::TcpStream, config: Arc<rustls::ServerConfig>) -> std::io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    let conn = rustls::ServerConnection::new(config).map_err(std::io::Error::other)?;
    let mut tls = rustls::StreamOwned::new(conn, stream);

    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tls.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    tls.write_all(&response_head(200, HUNDRED, true))?;
    tls.write_all(HUNDRED)?;
    tls.conn.send_close_notify();
    tls.flush()
}
