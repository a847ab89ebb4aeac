//! Listener and connection configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listening port (0 binds an ephemeral port)
    /// Env: CAIRN_PORT
    /// Default: 8590
    pub port: u16,

    /// Server listening address
    /// Env: CAIRN_HOST
    /// Default: "127.0.0.1"
    pub host: String,

    /// Number of acceptor worker threads
    /// Env: CAIRN_WORKERS
    /// Default: 4
    pub workers: Option<usize>,

    /// Connections accepted per worker cycle before the worker recycles
    /// Env: CAIRN_ACCEPTS_PER_CYCLE
    /// Default: 64
    pub accepts_per_cycle: u32,

    /// Requests served per keep-alive connection
    /// Env: CAIRN_KEEP_ALIVE_MAX
    /// Default: 5
    pub keep_alive_max: u32,

    /// Receive window per connection, in seconds
    /// Env: CAIRN_RECEIVE_TIMEOUT
    /// Default: 5
    pub receive_timeout: u64,

    /// Maximum request body size in bytes
    /// Env: CAIRN_MAX_BODY_SIZE
    /// Default: 10485760 (10MB)
    pub max_body_size: usize,

    /// Server banner used in the Server header and error pages
    /// Default: "Cairn/<version>"
    pub software: String,

    /// Administrator contact exposed as SERVER_ADMIN
    /// Env: CAIRN_ADMIN
    /// Default: "admin@localhost"
    pub admin: String,

    /// Path to TLS certificate PEM file
    /// Env: CAIRN_TLS_CERT
    /// Default: None (plain HTTP)
    pub tls_cert_path: Option<String>,

    /// Path to TLS private key PEM file
    /// Env: CAIRN_TLS_KEY
    /// Default: None (plain HTTP)
    pub tls_key_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8590,
            host: "127.0.0.1".to_string(),
            workers: None, // Auto-detect
            accepts_per_cycle: 64,
            keep_alive_max: 5,
            receive_timeout: 5,
            max_body_size: 10 * 1024 * 1024, // 10MB
            software: format!("Cairn/{}", env!("CARGO_PKG_VERSION")),
            admin: "admin@localhost".to_string(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.port = other.port;
        self.host = other.host;
        self.workers = other.workers;
        self.accepts_per_cycle = other.accepts_per_cycle;
        self.keep_alive_max = other.keep_alive_max;
        self.receive_timeout = other.receive_timeout;
        self.max_body_size = other.max_body_size;
        self.software = other.software;
        self.admin = other.admin;
        self.tls_cert_path = other.tls_cert_path;
        self.tls_key_path = other.tls_key_path;
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        if let Ok(port) = env::var("CAIRN_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(host) = env::var("CAIRN_HOST") {
            self.host = host;
        }

        if let Ok(workers) = env::var("CAIRN_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.workers = Some(w);
            }
        }

        if let Ok(accepts) = env::var("CAIRN_ACCEPTS_PER_CYCLE") {
            if let Ok(a) = accepts.parse() {
                self.accepts_per_cycle = a;
            }
        }

        if let Ok(max) = env::var("CAIRN_KEEP_ALIVE_MAX") {
            if let Ok(m) = max.parse() {
                self.keep_alive_max = m;
            }
        }

        if let Ok(timeout) = env::var("CAIRN_RECEIVE_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.receive_timeout = t;
            }
        }

        if let Ok(size) = env::var("CAIRN_MAX_BODY_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_body_size = s;
            }
        }

        if let Ok(admin) = env::var("CAIRN_ADMIN") {
            self.admin = admin;
        }

        if let Ok(cert) = env::var("CAIRN_TLS_CERT") {
            self.tls_cert_path = Some(cert);
        }

        if let Ok(key) = env::var("CAIRN_TLS_KEY") {
            self.tls_key_path = Some(key);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                bail!("Invalid workers: must be at least 1");
            }
        }

        if self.accepts_per_cycle == 0 {
            bail!("Invalid accepts_per_cycle: must be at least 1");
        }

        if self.keep_alive_max == 0 {
            bail!("Invalid keep_alive_max: must be at least 1");
        }

        if self.receive_timeout == 0 {
            bail!("Invalid receive_timeout: must be greater than 0");
        }

        if self.max_body_size == 0 {
            bail!("Invalid max_body_size: must be greater than 0");
        }

        // TLS: both cert and key must be set together
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => {
                if !std::path::Path::new(cert).exists() {
                    bail!("TLS certificate file not found: {}", cert);
                }
                if !std::path::Path::new(key).exists() {
                    bail!("TLS key file not found: {}", key);
                }
            }
            (Some(_), None) => {
                bail!("CAIRN_TLS_CERT is set but CAIRN_TLS_KEY is missing; both are required for TLS");
            }
            (None, Some(_)) => {
                bail!("CAIRN_TLS_KEY is set but CAIRN_TLS_CERT is missing; both are required for TLS");
            }
            (None, None) => {} // Plain HTTP, fine
        }

        Ok(())
    }
}
