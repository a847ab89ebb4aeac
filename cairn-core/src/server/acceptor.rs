//! Accept loop with bounded cycles.
//!
//! Each worker owns a clone of the listening socket and accepts a bounded
//! number of connections per cycle before recycling; every accepted socket
//! is handed to a fresh thread running its own [`ConnectionHandler`].

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::container::Container;
use crate::server::connection::ConnectionHandler;
use crate::server::transport::TlsContext;

pub struct ConnectionAcceptor {
    listener: TcpListener,
    container: Arc<Container>,
    config: Arc<ServerConfig>,
    tls: Option<TlsContext>,
    worker_id: usize,
}

impl ConnectionAcceptor {
    pub fn new(
        listener: TcpListener,
        container: Arc<Container>,
        config: Arc<ServerConfig>,
        tls: Option<TlsContext>,
        worker_id: usize,
    ) -> Self {
        Self {
            listener,
            container,
            config,
            tls,
            worker_id,
        }
    }

    /// Accept forever, one bounded cycle at a time.
    pub fn run(&self) {
        loop {
            self.accept_cycle();
            log::debug!(
                "worker {} recycling after {} accept slots",
                self.worker_id,
                self.config.accepts_per_cycle
            );
        }
    }

    /// One accept cycle: at most `accepts_per_cycle` connections.
    fn accept_cycle(&self) {
        for _ in 0..self.config.accepts_per_cycle {
            match self.listener.accept() {
                Ok((socket, peer)) => self.spawn_connection(socket, peer),
                Err(err) => {
                    log::warn!("worker {} accept failed: {}", self.worker_id, err);
                    // Do not spin on a listener stuck in an error state.
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }

    fn spawn_connection(&self, socket: TcpStream, peer: SocketAddr) {
        log::debug!("worker {} accepted {}", self.worker_id, peer);
        let handler = ConnectionHandler::new(Arc::clone(&self.container), Arc::clone(&self.config));
        let tls = self.tls.clone();
        let spawned = thread::Builder::new()
            .name(format!("cairn-conn-{peer}"))
            .spawn(move || match tls {
                Some(tls) => match tls.accept(socket) {
                    Ok(mut transport) => handler.handle(&mut transport),
                    Err(err) => log::debug!("TLS accept failed for {peer}: {err}"),
                },
                None => {
                    let mut transport = socket;
                    handler.handle(&mut transport);
                }
            });
        if let Err(err) = spawned {
            log::warn!("failed to spawn connection thread for {peer}: {err}");
        }
    }
}
