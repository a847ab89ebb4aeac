//! Byte-stream abstraction over plain TCP and TLS sockets.
//!
//! The connection loop is written against [`Transport`] so the same code
//! path serves both listeners. TLS uses rustls' blocking `StreamOwned`;
//! the handshake happens lazily on first read, under the same receive
//! timeout as plain sockets.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rustls::{ServerConfig as TlsServerConfig, ServerConnection, StreamOwned};

use crate::error::{HttpError, HttpResult};

/// What the connection loop needs from a socket.
pub trait Transport: Read + Write + Send {
    fn peer_addr(&self) -> io::Result<SocketAddr>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn shutdown(&mut self) -> io::Result<()>;
    fn is_secure(&self) -> bool {
        false
    }
}

impl Transport for TcpStream {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// TLS-wrapped TCP stream.
pub struct TlsTransport {
    stream: StreamOwned<ServerConnection, TcpStream>,
}

impl Read for TlsTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TlsTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TlsTransport {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.sock.peer_addr()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.sock.local_addr()
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.sock.set_read_timeout(timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.sock.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.stream.conn.send_close_notify();
        let _ = self.stream.flush();
        self.stream.sock.shutdown(Shutdown::Both)
    }

    fn is_secure(&self) -> bool {
        true
    }
}

/// Shared TLS acceptor state built once at startup.
#[derive(Clone, Debug)]
pub struct TlsContext {
    config: Arc<TlsServerConfig>,
}

impl TlsContext {
    /// Load certificate chain and private key from PEM files.
    pub fn from_pem_files(cert_path: &str, key_path: &str) -> Result<Self> {
        let mut cert_reader = BufReader::new(
            File::open(cert_path)
                .with_context(|| format!("Failed to open TLS certificate: {cert_path}"))?,
        );
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<io::Result<Vec<_>>>()
            .with_context(|| format!("Failed to parse TLS certificate: {cert_path}"))?;

        let mut key_reader = BufReader::new(
            File::open(key_path)
                .with_context(|| format!("Failed to open TLS key: {key_path}"))?,
        );
        let key = rustls_pemfile::private_key(&mut key_reader)
            .with_context(|| format!("Failed to parse TLS key: {key_path}"))?
            .with_context(|| format!("No private key found in {key_path}"))?;

        // Pin the ring provider; with several crypto providers compiled in,
        // the provider-less builder refuses to guess.
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = TlsServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("Failed to select TLS protocol versions")?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .context("Invalid TLS certificate/key pair")?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Wrap an accepted socket; the handshake runs on first use.
    pub fn accept(&self, sock: TcpStream) -> HttpResult<TlsTransport> {
        let conn = ServerConnection::new(Arc::clone(&self.config))
            .map_err(|err| HttpError::Tls(err.to_string()))?;
        Ok(TlsTransport {
            stream: StreamOwned::new(conn, sock),
        })
    }
}
