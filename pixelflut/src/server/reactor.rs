use std::sync::Arc;
use std::thread;

use pixelflut_core::counters::Counters;
use pixelflut_core::framebuffer::FrameBuffer;
use snafu::ResultExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use super::connection::handle_connection;
use super::{AcceptNewClientConnectionSnafu, BindToListenAddressSnafu, BuildWorkerRuntimeSnafu, Error};

pub const N_WORKERS: usize = 8;

const LISTEN_ADDRESS: &str = "0.0.0.0:12345";

// One acceptor event loop plus N_WORKERS worker event loops, each on its own
// OS thread. New connections are handed to a worker by counter-mod dispatch,
// not load-aware.
pub struct Reactor {
    fb: Arc<FrameBuffer>,
    counters: Arc<Counters>,
}

struct Worker {
    handle: thread::JoinHandle<()>,
    new_connection_tx: mpsc::UnboundedSender<TcpStream>,
}

impl Reactor {
    pub fn new(fb: Arc<FrameBuffer>, counters: Arc<Counters>) -> Self {
        Reactor { fb, counters }
    }

    // Spawns the N_WORKERS worker threads first; a worker with zero sockets
    // just awaits its channel, so its event loop never exits on its own.
    // startup_rx gates the first accept(): the display loop releases it once
    // the window exists.
    pub async fn run(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
        startup_rx: oneshot::Receiver<()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(LISTEN_ADDRESS)
            .await
            .context(BindToListenAddressSnafu {
                listen_address: LISTEN_ADDRESS,
            })?;
        info!("started pixelflut server on {LISTEN_ADDRESS}");

        let workers: Vec<Worker> = (0..N_WORKERS)
            .map(|id| self.spawn_worker(id, shutdown_rx.resubscribe()))
            .collect::<Result<_, _>>()?;

        // The sender side is dropped without a message if the display loop
        // fails to start at all; either way we're released to proceed.
        let _ = startup_rx.await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("acceptor received shutdown signal");
                    break;
                }
                accepted = listener.accept() => {
                    let (socket, _addr) = accepted.context(AcceptNewClientConnectionSnafu)?;
                    // The same counter doubles as the round-robin dispatch
                    // key and the live-client count.
                    let dispatch_key = self.counters.client_connected();
                    let worker = &workers[dispatch_key as usize % N_WORKERS];
                    if worker.new_connection_tx.send(socket).is_err() {
                        debug!(worker_id = dispatch_key as usize % N_WORKERS, "worker gone, dropping accepted connection");
                        self.counters.client_disconnected();
                    }
                }
            }
        }

        for worker in workers {
            drop(worker.new_connection_tx);
            let _ = worker.handle.join();
        }

        Ok(())
    }

    fn spawn_worker(
        &self,
        id: usize,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Worker, Error> {
        let (new_connection_tx, mut new_connection_rx) = mpsc::unbounded_channel::<TcpStream>();
        let fb = Arc::clone(&self.fb);
        let counters = Arc::clone(&self.counters);

        let handle = thread::Builder::new()
            .name(format!("pixelflut-worker-{id}"))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        tracing::error!(worker_id = id, error = %err, "failed to build worker runtime");
                        return;
                    }
                };

                runtime.block_on(async move {
                    debug!(worker_id = id, "worker reactor started");
                    let mut in_flight = tokio::task::JoinSet::new();
                    loop {
                        tokio::select! {
                            biased;
                            _ = shutdown_rx.recv() => {
                                debug!(worker_id = id, "worker received shutdown signal");
                                break;
                            }
                            maybe_socket = new_connection_rx.recv() => {
                                let Some(socket) = maybe_socket else {
                                    break;
                                };
                                let fb = Arc::clone(&fb);
                                let counters = Arc::clone(&counters);
                                in_flight.spawn(async move {
                                    handle_connection(socket, fb, counters).await;
                                });
                            }
                        }
                    }
                    // Best-effort drain, bounded so shutdown always makes
                    // progress even if a peer never closes its side.
                    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), async {
                        while in_flight.join_next().await.is_some() {}
                    })
                    .await;
                });
            })
            .context(BuildWorkerRuntimeSnafu)?;

        Ok(Worker {
            handle,
            new_connection_tx,
        })
    }
}
