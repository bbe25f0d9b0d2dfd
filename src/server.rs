use std::io;
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::engines::KvsEngine;
use crate::session::Session;
use crate::thread_pool::ThreadPool;
use crate::{KvError, Result};

/// The server of a key-value store.
///
/// Owns the listening socket and hands every accepted connection to the
/// thread pool as one session. Generic over both the storage engine `E`
/// and the thread pool `P`.
pub struct KvsServer<E: KvsEngine, P: ThreadPool> {
    engine: E,
    pool: P,
    idle_timeout: Option<Duration>,
}

impl<E: KvsEngine, P: ThreadPool> KvsServer<E, P> {
    /// Creates a `KvsServer` with a given storage engine and thread pool.
    pub fn new(engine: E, pool: P) -> Self {
        Self {
            engine,
            pool,
            idle_timeout: None,
        }
    }

    /// Closes connections that send nothing for `timeout`.
    ///
    /// Off by default: a session otherwise runs until the peer closes.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Binds to the given address and serves connections forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub fn run(&self, addr: impl ToSocketAddrs) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        info!("Listening on {}", listener.local_addr()?);
        self.serve(listener)
    }

    /// Serves connections accepted on an already bound listener.
    ///
    /// Each connection is dispatched to the thread pool for handling.
    /// Failed accepts are logged and skipped.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let engine = self.engine.clone();
                    let idle_timeout = self.idle_timeout;
                    self.pool.spawn(move || {
                        if let Err(e) = handle_connection(engine, stream, idle_timeout) {
                            error!("Error handling connection: {}", e);
                        }
                    });
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }

        Ok(())
    }
}

/// Handles a single client connection. The stream is closed on return.
fn handle_connection<E: KvsEngine>(
    engine: E,
    stream: TcpStream,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    let peer_addr = stream.peer_addr()?;
    debug!("Accepted connection from {}", peer_addr);

    if let Err(e) = stream.set_nodelay(true) {
        warn!("Could not set TCP_NODELAY for {}: {}", peer_addr, e);
    }
    stream.set_read_timeout(idle_timeout)?;

    match Session::new(engine, &stream, &stream).run() {
        Err(e) if is_idle_expiry(&e) => {
            debug!("Connection from {} idle too long, closing", peer_addr);
            Ok(())
        }
        result => {
            debug!("Closing connection from {}", peer_addr);
            result
        }
    }
}

/// A read that hit the idle timeout surfaces as `WouldBlock` on Unix and
/// `TimedOut` on Windows.
fn is_idle_expiry(err: &KvError) -> bool {
    matches!(
        err,
        KvError::Io(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
    )
}
