//! UDP Server
//!
//! Receives command datagrams and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::dispatch::{Dispatcher, Executor};
use crate::error::Result;

/// One received packet and where to send the answer
struct Datagram {
    peer: SocketAddr,
    payload: Bytes,
}

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop; it exits within one read timeout
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// UDP server for a C&C node
pub struct Server {
    config: Config,
    socket: UdpSocket,
    dispatcher: Dispatcher,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, executor: Arc<dyn Executor>) -> Result<Self> {
        let socket = UdpSocket::bind(&config.listen_addr)?;
        socket.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;

        let dispatcher = Dispatcher::new(config.limits, executor);

        Ok(Self {
            config,
            socket,
            dispatcher,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Handle for stopping the server
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Serve until shutdown is requested (blocking)
    pub fn run(&self) -> Result<()> {
        let mtu = self.config.limits.mtu();
        let (tx, rx) = channel::bounded::<Datagram>(self.config.queue_depth);

        let workers = (0..self.config.workers)
            .map(|id| self.spawn_worker(id, rx.clone()))
            .collect::<std::io::Result<Vec<_>>>()?;
        drop(rx);

        tracing::info!(
            "Listening on {} (mtu {}, {} workers)",
            self.local_addr()?,
            mtu,
            workers.len()
        );

        // One extra byte so an oversize datagram is distinguishable from a full one
        let mut buf = vec![0u8; mtu + 1];

        while !self.shutdown.is_shutdown() {
            let (len, peer) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(ref e) if e.kind() == ErrorKind::ConnectionReset => {
                    // ICMP port unreachable from an earlier reply (Windows)
                    tracing::debug!("Ignoring connection reset: {}", e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("Receive failed: {}", e);
                    self.shutdown.shutdown();
                    break;
                }
            };

            if len > mtu {
                tracing::warn!("Dropping oversize datagram from {} (mtu {})", peer, mtu);
                continue;
            }

            tracing::trace!("Received {} bytes from {}", len, peer);

            let datagram = Datagram {
                peer,
                payload: Bytes::copy_from_slice(&buf[..len]),
            };
            match tx.try_send(datagram) {
                Ok(()) => {}
                Err(TrySendError::Full(datagram)) => {
                    tracing::warn!("Worker queue full, dropping packet from {}", datagram.peer);
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::error!("All workers exited");
                    break;
                }
            }
        }

        drop(tx);
        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!("Worker thread panicked");
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    fn spawn_worker(&self, id: usize, rx: Receiver<Datagram>) -> std::io::Result<JoinHandle<()>> {
        let socket = self.socket.try_clone()?;
        let dispatcher = self.dispatcher.clone();

        thread::Builder::new()
            .name(format!("cnc-worker-{}", id))
            .spawn(move || {
                for datagram in rx.iter() {
                    match dispatcher.handle(&datagram.payload) {
                        Ok(response) => {
                            if let Err(e) = socket.send_to(&response, datagram.peer) {
                                tracing::warn!("Error replying to {}: {}", datagram.peer, e);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Rejected packet from {}: {}", datagram.peer, e);
                        }
                    }
                }
                tracing::debug!("Worker {} stopped", id);
            })
    }
}
