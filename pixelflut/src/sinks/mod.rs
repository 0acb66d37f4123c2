// Wires the display loop into the binary. The windowing toolkit and its
// renderer are an external collaborator; this module only owns the handoff.

use std::sync::Arc;

use color_eyre::eyre;
use pixelflut_core::counters::Counters;
use pixelflut_core::framebuffer::FrameBuffer;
use tokio::sync::{broadcast, oneshot};

#[cfg(feature = "display")]
pub fn run(
    fb: Arc<FrameBuffer>,
    counters: Arc<Counters>,
    bound_address: String,
    shutdown_tx: broadcast::Sender<()>,
    startup_tx: oneshot::Sender<()>,
) -> eyre::Result<()> {
    pixelflut_display::run(fb, counters, bound_address, shutdown_tx, startup_tx)
        .map_err(|err| eyre::eyre!("display loop failed: {err}"))
}

// No window without the display feature, so the startup rendezvous is
// released immediately; this just blocks until shutdown fires.
#[cfg(not(feature = "display"))]
pub fn run(
    _fb: Arc<FrameBuffer>,
    _counters: Arc<Counters>,
    _bound_address: String,
    shutdown_tx: broadcast::Sender<()>,
    startup_tx: oneshot::Sender<()>,
) -> eyre::Result<()> {
    use color_eyre::eyre::Context;

    let _ = startup_tx.send(());
    let mut shutdown_rx = shutdown_tx.subscribe();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build headless sink runtime")?;
    runtime.block_on(async {
        let _ = shutdown_rx.recv().await;
    });
    Ok(())
}
