// The display loop: owns the window, uploads the framebuffer and
// re-composes the telemetry overlay every frame, and turns quit input into
// the process-wide shutdown broadcast. Texture upload and font rasterization
// are left entirely to egui/eframe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use pixelflut_core::counters::Counters;
use pixelflut_core::framebuffer::FrameBuffer;
use tokio::sync::{broadcast, oneshot};
use tracing::info;

// How often the FPS figure and telemetry rates are recomputed; the overlay
// text itself is re-rendered every frame.
const FPS_INTERVAL: Duration = Duration::from_secs(1);

// Opens the display window and blocks the calling thread running its event
// loop until the user quits or shutdown_tx fires elsewhere. Must be called
// from the main thread. startup_tx fires the moment the window exists.
pub fn run(
    fb: Arc<FrameBuffer>,
    counters: Arc<Counters>,
    bound_address: String,
    shutdown_tx: broadcast::Sender<()>,
    startup_tx: oneshot::Sender<()>,
) -> eframe::Result<()> {
    let shutdown_rx = shutdown_tx.subscribe();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([fb.width() as f32, fb.height() as f32])
            .with_title("pixelflood")
            .with_decorations(false),
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    eframe::run_native(
        "pixelflood",
        options,
        Box::new(move |cc| {
            Ok(Box::new(App::new(
                cc,
                fb,
                counters,
                bound_address,
                shutdown_tx,
                shutdown_rx,
                startup_tx,
            )))
        }),
    )
}

struct App {
    fb: Arc<FrameBuffer>,
    counters: Arc<Counters>,
    bound_address: String,

    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
    startup_tx: Option<oneshot::Sender<()>>,

    texture: egui::TextureHandle,

    tick_started: Instant,
    frames_this_tick: u32,
    pixels_at_tick_start: u64,
    fps: u32,
    kpixels_per_s: u64,
    mbits_per_s: f64,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    fn new(
        cc: &eframe::CreationContext<'_>,
        fb: Arc<FrameBuffer>,
        counters: Arc<Counters>,
        bound_address: String,
        shutdown_tx: broadcast::Sender<()>,
        shutdown_rx: broadcast::Receiver<()>,
        startup_tx: oneshot::Sender<()>,
    ) -> Self {
        let placeholder = egui::ColorImage::new([fb.width(), fb.height()], egui::Color32::BLACK);
        let texture =
            cc.egui_ctx
                .load_texture("framebuffer", placeholder, egui::TextureOptions::NEAREST);

        info!("display window created, releasing startup rendezvous");

        App {
            fb,
            counters,
            bound_address,
            shutdown_tx,
            shutdown_rx,
            startup_tx: Some(startup_tx),
            texture,
            tick_started: Instant::now(),
            frames_this_tick: 0,
            pixels_at_tick_start: 0,
            fps: 0,
            kpixels_per_s: 0,
            mbits_per_s: 0.0,
        }
    }

    // Packs the shared ARGB framebuffer into an RGBA image for upload, alpha
    // forced opaque regardless of the stored byte.
    fn snapshot_image(&self) -> egui::ColorImage {
        let mut rgba = Vec::with_capacity(self.fb.as_pixels().len() * 4);
        for &argb in self.fb.as_pixels() {
            rgba.push(((argb >> 16) & 0xff) as u8);
            rgba.push(((argb >> 8) & 0xff) as u8);
            rgba.push((argb & 0xff) as u8);
            rgba.push(0xff);
        }
        egui::ColorImage::from_rgba_unmultiplied([self.fb.width(), self.fb.height()], &rgba)
    }

    fn retick_if_due(&mut self) {
        self.frames_this_tick += 1;
        let elapsed = self.tick_started.elapsed();
        if elapsed < FPS_INTERVAL {
            return;
        }

        let elapsed_s = elapsed.as_secs_f64();
        let pixels_now = self.counters.nr_pixels();
        let bytes_now = self.counters.take_bytes();

        self.fps = (self.frames_this_tick as f64 / elapsed_s).round() as u32;
        self.kpixels_per_s =
            ((pixels_now.saturating_sub(self.pixels_at_tick_start)) as f64 / elapsed_s / 1000.0)
                .round() as u64;
        self.mbits_per_s = (bytes_now as f64 * 8.0) / elapsed_s / 1_000_000.0;

        self.pixels_at_tick_start = pixels_now;
        self.frames_this_tick = 0;
        self.tick_started = Instant::now();
    }

    fn overlay_text(&self) -> String {
        let megapixels = self.counters.nr_pixels() as f64 / 1_000_000.0;
        format!(
            "FPS: {:<4} Clients: {:<5} Mp: {:<8.1} kp/s: {:<7} Mbit/s: {:<7.1}\nIP: {}",
            self.fps,
            self.counters.nr_clients(),
            megapixels,
            self.kpixels_per_s,
            self.mbits_per_s,
            self.bound_address,
        )
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(startup_tx) = self.startup_tx.take() {
            let _ = startup_tx.send(());
        }

        let quit_requested = ctx.input(|i| {
            i.viewport().close_requested() || i.key_pressed(egui::Key::Q)
        });
        let shutdown_requested = matches!(
            self.shutdown_rx.try_recv(),
            Ok(()) | Err(broadcast::error::TryRecvError::Closed)
        );
        if quit_requested || shutdown_requested {
            let _ = self.shutdown_tx.send(());
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.retick_if_due();

        let image = self.snapshot_image();
        self.texture
            .set(image, egui::TextureOptions::NEAREST);

        let blank_frame = egui::Frame {
            fill: egui::Color32::BLACK,
            stroke: egui::Stroke::NONE,
            rounding: egui::Rounding::ZERO,
            shadow: eframe::epaint::Shadow::default(),
            inner_margin: egui::Margin::ZERO,
            outer_margin: egui::Margin::ZERO,
        };
        egui::CentralPanel::default()
            .frame(blank_frame)
            .show(ctx, |ui| {
                ui.image(&self.texture);
            });

        let overlay_frame = egui::Frame {
            fill: egui::Color32::from_black_alpha(180),
            stroke: egui::Stroke::NONE,
            rounding: egui::Rounding::same(4.0),
            shadow: eframe::epaint::Shadow::default(),
            inner_margin: egui::Margin::same(6.0),
            outer_margin: egui::Margin::ZERO,
        };

        egui::Area::new(egui::Id::new("telemetry_overlay"))
            .fixed_pos(egui::pos2(8.0, 8.0))
            .show(ctx, |ui| {
                overlay_frame
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(self.overlay_text())
                                .monospace()
                                .size(self.fb.height() as f32 / 12.0)
                                .color(egui::Color32::WHITE),
                        );
                    });
            });

        ctx.request_repaint();
    }
}
