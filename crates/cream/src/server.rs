//! Process assembly: cache + handoff + worker pool + accept loop.
//!
//! [`Server::bind`] builds the shared cache, spawns the worker threads, and
//! claims the listening socket; a bind or listen failure is the only fatal
//! startup path. [`Server::run`] then feeds accepted connections into the
//! handoff forever, logging and continuing on accept failure. Binding and
//! running are split so embedders (and the integration tests) can bind port
//! 0 and learn the real address before the loop starts.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::handoff::Handoff;
use crate::types::ServerConfig;
use crate::worker::worker_loop;

pub struct Server {
    listener: TcpListener,
    handoff: Arc<Handoff<TcpStream>>,
    cache: Arc<Cache>,
}

impl Server {
    /// Build the cache and worker pool, then bind the listening socket.
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let cache = Arc::new(Cache::new(config.cache.clone()));
        let handoff = Arc::new(Handoff::new());

        let workers = config.workers.max(1);
        for id in 0..workers {
            let handoff = Arc::clone(&handoff);
            let cache = Arc::clone(&cache);
            thread::Builder::new()
                .name(format!("cream-worker-{id}"))
                .spawn(move || worker_loop(handoff, cache))?;
        }

        let listener = TcpListener::bind(("0.0.0.0", config.port))?;
        info!(
            addr = %listener.local_addr()?,
            workers,
            capacity = cache.capacity(),
            "listening"
        );
        Ok(Self {
            listener,
            handoff,
            cache,
        })
    }

    /// The address actually bound, useful when the config asked for port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to the cache shared with the workers.
    pub fn cache(&self) -> Arc<Cache> {
        Arc::clone(&self.cache)
    }

    /// Accept connections forever, pushing each into the worker handoff.
    /// Accept failures are logged and skipped. Returns only if the handoff
    /// is invalidated out from under the loop.
    pub fn run(self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    if self.handoff.push(stream).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
