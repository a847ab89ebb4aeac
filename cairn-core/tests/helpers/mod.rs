#![allow(dead_code)]
//! Shared pieces for the socket-level tests: an in-process server bound
//! to an ephemeral port plus a very small raw HTTP client.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cairn_core::config::{AppConfig, CairnConfig, MappingConfig};
use cairn_core::handler::FnHandler;
use cairn_core::session::{MemorySessionStore, Session, DEFAULT_SESSION_TTL};
use cairn_core::CairnServer;
use tempfile::TempDir;

/// An in-process server: the application "site" mounted at the root
/// context over a temp docroot, plus a few scripted handlers.
pub struct TestServer {
    pub port: u16,
    pub docroot: TempDir,
}

impl TestServer {
    pub fn start() -> TestServer {
        Self::start_with(|_| {})
    }

    /// Bind on an ephemeral port after letting the caller adjust the
    /// configuration, then serve from a detached thread.
    pub fn start_with(configure: impl FnOnce(&mut CairnConfig)) -> TestServer {
        cairn_core::logging::init_for_tests();
        let docroot = tempfile::tempdir().unwrap();

        let mut config = CairnConfig::default();
        config.server.port = 0;
        configure(&mut config);

        let sessions = Arc::new(MemorySessionStore::new());
        let store = Arc::clone(&sessions);

        let bound = CairnServer::new(config)
            .with_application(site_app(&docroot))
            .with_session_store(sessions)
            .with_handler(
                "hello",
                Arc::new(FnHandler::new(|_req, resp| {
                    resp.text("hello from site");
                    Ok(())
                })),
            )
            .with_handler(
                "echo",
                Arc::new(FnHandler::new(|req, resp| {
                    let mut lines = Vec::new();
                    for (key, value) in req.params().iter() {
                        if let Some(text) = value.as_text() {
                            lines.push(format!("{key}={text}"));
                        }
                    }
                    for part in req.parts() {
                        lines.push(format!("file:{}:{}:{}", part.name, part.filename, part.size()));
                    }
                    resp.text(lines.join("\n"));
                    Ok(())
                })),
            )
            .with_handler(
                "visits",
                Arc::new(FnHandler::new(move |req, resp| {
                    let mut session = Session::obtain(store.as_ref(), req);
                    let visits =
                        session.data.get("visits").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
                    session.data.insert("visits".to_string(), serde_json::json!(visits));
                    session.persist(store.as_ref(), resp, DEFAULT_SESSION_TTL);
                    resp.text(format!("visits={visits}"));
                    Ok(())
                })),
            )
            .with_handler(
                "boom",
                Arc::new(FnHandler::new(|_req, _resp| {
                    anyhow::bail!("backend exploded")
                })),
            )
            .with_handler(
                "whoami",
                Arc::new(FnHandler::new(|req, resp| {
                    resp.text(format!(
                        "app={} context={} path={}",
                        req.webapp_name().unwrap_or("?"),
                        req.context_path(),
                        req.relative_path()
                    ));
                    Ok(())
                })),
            )
            .bind()
            .unwrap();

        let port = bound.local_addr().port();
        thread::spawn(move || {
            let _ = bound.serve();
        });
        TestServer { port, docroot }
    }
}

fn site_app(docroot: &TempDir) -> AppConfig {
    AppConfig {
        name: "site".to_string(),
        webapp_path: docroot.path().display().to_string(),
        context: Some("/".to_string()),
        vhosts: Vec::new(),
        servlet_mappings: vec![
            mapping("/hello", "hello"),
            mapping("/echo", "echo"),
            mapping("/visits", "visits"),
            mapping("/boom", "boom"),
            // Directory serving is an explicit opt-in, not engine magic.
            mapping("/", "static"),
            mapping("/docs*", "static"),
        ],
        secured_urls: Vec::new(),
    }
}

pub fn mapping(pattern: &str, handler: &str) -> MappingConfig {
    MappingConfig { url_pattern: pattern.to_string(), handler: handler.to_string() }
}

/// One response as read off the wire.
pub struct RawResponse {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Case-insensitive single-header lookup over the raw head lines.
    pub fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.head
            .lines()
            .skip(1)
            .find_map(|line| line.to_ascii_lowercase().starts_with(&prefix).then(|| line[prefix.len()..].trim()))
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn connect(port: u16) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    stream
}

pub fn send(stream: &mut TcpStream, request: &str) {
    stream.write_all(request.as_bytes()).unwrap();
    stream.flush().unwrap();
}

/// `GET` request text against the loopback authority.
pub fn get_request(path: &str, port: u16, extra_headers: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\n{extra_headers}\r\n")
}

/// Read exactly one response: the head up to the blank line, then the
/// `Content-Length` body.
pub fn read_response(stream: &mut TcpStream) -> RawResponse {
    let mut raw = Vec::new();
    let mut byte = [0u8; 1];
    while !raw.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).unwrap();
        assert!(n > 0, "connection closed mid-head: {:?}", String::from_utf8_lossy(&raw));
        raw.push(byte[0]);
    }
    let head = String::from_utf8(raw[..raw.len() - 4].to_vec()).unwrap();
    let status: u16 = head
        .split_whitespace()
        .nth(1)
        .and_then(|token| token.parse().ok())
        .unwrap_or_else(|| panic!("no status code in {head:?}"));
    let length: usize = head
        .lines()
        .skip(1)
        .find_map(|line| {
            line.to_ascii_lowercase()
                .strip_prefix("content-length:")
                .map(|v| v.trim().parse().unwrap())
        })
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).unwrap();
    RawResponse { status, head, body }
}

/// Drain the stream to EOF, tolerating a reset from an already-closed
/// peer.
pub fn drain(stream: &mut TcpStream) -> Vec<u8> {
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest);
    rest
}
