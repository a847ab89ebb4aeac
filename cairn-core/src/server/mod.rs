//! Server assembly: configuration in, accept loops out.
//!
//! [`CairnServer`] is the builder: it collects the configuration, the
//! handler registry and the optional session/auth collaborators, then
//! `bind` freezes everything into a [`BoundServer`] with a live listener.
//! Splitting bind from serve lets callers bind port 0 and learn the
//! ephemeral port before the accept loops start.

mod acceptor;
mod connection;
mod transport;

pub use acceptor::ConnectionAcceptor;
pub use connection::ConnectionHandler;
pub use transport::{TlsContext, TlsTransport, Transport};

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};

use crate::auth::AuthenticationManager;
use crate::config::{AppConfig, CairnConfig, ServerConfig};
use crate::container::Container;
use crate::handler::{Handler, HandlerRegistry, StaticFileHandler, STATIC_HANDLER};
use crate::session::{MemorySessionStore, SessionStore};

/// Builder for a configured server.
pub struct CairnServer {
    config: CairnConfig,
    registry: HandlerRegistry,
    sessions: Arc<dyn SessionStore>,
    auth: Option<Arc<dyn AuthenticationManager>>,
}

impl CairnServer {
    pub fn new(config: CairnConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
            sessions: Arc::new(MemorySessionStore::new()),
            auth: None,
        }
    }

    /// Register a named handler that servlet mappings can reference.
    pub fn with_handler(mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.registry.register(name, handler);
        self
    }

    /// Deploy an application on top of those the configuration declares.
    pub fn with_application(mut self, app: AppConfig) -> Self {
        self.config.deploy.applications.push(app);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    pub fn with_authentication(mut self, manager: Arc<dyn AuthenticationManager>) -> Self {
        self.auth = Some(manager);
        self
    }

    /// Validate, deploy and bind the listener without accepting yet.
    pub fn bind(mut self) -> Result<BoundServer> {
        self.config.validate()?;

        if !self.registry.contains(STATIC_HANDLER) {
            self.registry.register(
                STATIC_HANDLER,
                Arc::new(StaticFileHandler::with_welcome_files(
                    self.config.deploy.welcome_files.clone(),
                )),
            );
        }

        let tls = match (
            &self.config.server.tls_cert_path,
            &self.config.server.tls_key_path,
        ) {
            (Some(cert), Some(key)) => Some(TlsContext::from_pem_files(cert, key)?),
            _ => None,
        };

        let container =
            Container::deploy(&self.config.deploy, self.registry, self.sessions, self.auth)?;

        let address = (self.config.server.host.as_str(), self.config.server.port);
        let listener = TcpListener::bind(address).with_context(|| {
            format!(
                "Failed to bind {}:{}",
                self.config.server.host, self.config.server.port
            )
        })?;
        let local = listener
            .local_addr()
            .context("Failed to read bound address")?;

        log::info!(
            "🚀 {} listening on {}{}",
            self.config.server.software,
            local,
            if tls.is_some() { " (TLS)" } else { "" }
        );

        Ok(BoundServer {
            listener,
            local,
            container: Arc::new(container),
            config: Arc::new(self.config.server),
            tls,
        })
    }

    /// Bind and serve on the calling thread.
    pub fn serve(self) -> Result<()> {
        self.bind()?.serve()
    }
}

/// A bound listener with its deployed container, ready to accept.
#[derive(Debug)]
pub struct BoundServer {
    listener: TcpListener,
    local: SocketAddr,
    container: Arc<Container>,
    config: Arc<ServerConfig>,
    tls: Option<TlsContext>,
}

impl BoundServer {
    /// Actual bound address; differs from the configured one when port 0
    /// asked for an ephemeral port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Run the accept loops: extra workers on their own threads, the last
    /// acceptor on the calling thread. Does not return in normal operation.
    pub fn serve(self) -> Result<()> {
        let workers = self.config.workers.unwrap_or_else(default_workers).max(1);
        log::info!("accepting with {workers} worker(s)");
        for id in 1..workers {
            let listener = self
                .listener
                .try_clone()
                .context("Failed to clone listener for worker")?;
            let acceptor = ConnectionAcceptor::new(
                listener,
                Arc::clone(&self.container),
                Arc::clone(&self.config),
                self.tls.clone(),
                id,
            );
            thread::Builder::new()
                .name(format!("cairn-worker-{id}"))
                .spawn(move || acceptor.run())
                .context("Failed to spawn acceptor worker")?;
        }
        ConnectionAcceptor::new(self.listener, self.container, self.config, self.tls, 0).run();
        Ok(())
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}
