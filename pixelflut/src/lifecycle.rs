//! Startup and shutdown ordering.
//!
//! Startup: the framebuffer is allocated once, up front; the acceptor
//! thread is given a one-shot rendezvous receiver and will not call
//! `accept()` until the display loop (or, headless, the sink shim) fires
//! it. Shutdown: a Ctrl+C, the display's own quit handling, or an acceptor
//! failure all collapse onto one `broadcast` channel; workers are joined
//! before the display thread's blocking call returns control to `main`,
//! which then drops the framebuffer.

use std::sync::Arc;
use std::thread;

use color_eyre::eyre::{self, Context};
use pixelflut_core::counters::Counters;
use pixelflut_core::framebuffer::FrameBuffer;
use tokio::sync::{broadcast, oneshot};
use tracing::info;

use crate::server::{Reactor, N_WORKERS};
use crate::sinks;

const LISTEN_ADDRESS_LABEL: &str = "0.0.0.0:12345";

pub fn run() -> eyre::Result<()> {
    let fb = Arc::new(FrameBuffer::new(
        pixelflut_core::WIDTH,
        pixelflut_core::HEIGHT,
    ));
    let counters = Arc::new(Counters::new());

    let (shutdown_tx, _) = broadcast::channel(1);
    let (startup_tx, startup_rx) = oneshot::channel();

    info!(workers = N_WORKERS, "spawning reactor workers");
    let acceptor = spawn_acceptor(
        Arc::clone(&fb),
        Arc::clone(&counters),
        shutdown_tx.clone(),
        startup_rx,
    );
    spawn_ctrl_c_handler(shutdown_tx.clone());

    // Runs on this thread and blocks until quit; several windowing
    // backends refuse to create a window anywhere but the main thread.
    let display_result = sinks::run(
        fb,
        counters,
        LISTEN_ADDRESS_LABEL.to_string(),
        shutdown_tx.clone(),
        startup_tx,
    );

    // Make sure the acceptor and its workers unwind even if the display
    // loop exited without anyone sending on the shutdown channel (e.g. the
    // headless sink racing a failed display init).
    let _ = shutdown_tx.send(());

    let acceptor_result = acceptor
        .join()
        .map_err(|_| eyre::eyre!("acceptor thread panicked"))?;

    display_result?;
    acceptor_result.context("acceptor reactor failed")?;

    info!("successfully shut down");
    Ok(())
}

fn spawn_acceptor(
    fb: Arc<FrameBuffer>,
    counters: Arc<Counters>,
    shutdown_tx: broadcast::Sender<()>,
    startup_rx: oneshot::Receiver<()>,
) -> thread::JoinHandle<Result<(), crate::server::Error>> {
    thread::Builder::new()
        .name("pixelflut-acceptor".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build acceptor runtime");

            runtime.block_on(async move {
                let reactor = Reactor::new(fb, counters);
                reactor.run(shutdown_tx.subscribe(), startup_rx).await
            })
        })
        .expect("failed to spawn acceptor thread")
}

fn spawn_ctrl_c_handler(shutdown_tx: broadcast::Sender<()>) {
    thread::Builder::new()
        .name("pixelflut-ctrl-c".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build ctrl-c runtime");

            runtime.block_on(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received Ctrl+C, shutting down");
                    let _ = shutdown_tx.send(());
                }
            });
        })
        .expect("failed to spawn ctrl-c handler thread");
}
