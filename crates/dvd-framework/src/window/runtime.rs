use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use crate::coords::Projection;
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::platform::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::paint::Color;
use crate::render::{RenderCtx, RenderTarget};

/// How long `Runtime::open` waits for the platform to hand out a window.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    /// Inner size in logical pixels.
    pub size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "dvd".to_string(),
            size: LogicalSize::new(800.0, 600.0),
            resizable: false,
        }
    }
}

/// Result of a [`Runtime::render`] call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Presented,
    /// No frame this time (surface reconfigured, timed out, or no window).
    Skipped,
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Receives winit callbacks while the event loop is being pumped.
struct Handler {
    config: RuntimeConfig,
    gpu_init: GpuInit,

    entry: Option<WindowEntry>,
    open_error: Option<anyhow::Error>,

    input_state: InputState,
    input_frame: InputFrame,
    close_requested: bool,
}

impl Handler {
    fn create_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")
    }
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if self.entry.is_some() || self.open_error.is_some() {
            return;
        }

        match self.create_entry(event_loop) {
            Ok(entry) => {
                let size = entry.with_gpu(|gpu| gpu.size());
                log::info!(
                    "window `{}` created ({}x{} physical)",
                    self.config.title,
                    size.width,
                    size.height
                );
                self.entry = Some(entry);
            }
            Err(e) => self.open_error = Some(e),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(entry) = self.entry.as_mut() else { return };

        let translated = entry
            .with_window(|w| translate_window_event(w, &self.input_state, &event));
        if let Some(ev) = translated {
            self.input_state.apply_event(&mut self.input_frame, ev);
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                if !self.close_requested {
                    log::info!("close requested by the window system");
                }
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => entry.with_gpu_mut(|gpu| gpu.resize(size)),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(size));
            }
            _ => {}
        }
    }
}

/// A single window plus its GPU context, driven by explicit event pumping.
///
/// Unlike a callback-owning run loop, the caller keeps control of the frame:
/// `pump_events` drains pending window-system events without blocking and
/// `render` draws and presents one frame.
pub struct Runtime {
    // Declared first so the window and surface drop before the event loop.
    handler: Handler,
    event_loop: EventLoop<()>,
}

impl Runtime {
    /// Creates the event loop, the window and its GPU context.
    pub fn open(config: RuntimeConfig, gpu_init: GpuInit) -> Result<Self> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut runtime = Self {
            handler: Handler {
                config,
                gpu_init,
                entry: None,
                open_error: None,
                input_state: InputState::default(),
                input_frame: InputFrame::default(),
                close_requested: false,
            },
            event_loop,
        };

        let deadline = Instant::now() + OPEN_TIMEOUT;
        while runtime.handler.entry.is_none() {
            let status = runtime
                .event_loop
                .pump_app_events(Some(Duration::from_millis(10)), &mut runtime.handler);

            if let Some(err) = runtime.handler.open_error.take() {
                return Err(err);
            }
            if let PumpStatus::Exit(code) = status {
                anyhow::bail!("event loop exited with code {code} before a window was created");
            }
            if Instant::now() >= deadline {
                anyhow::bail!("timed out waiting for the window to be created");
            }
        }

        Ok(runtime)
    }

    /// Drains pending window-system events without blocking.
    ///
    /// Per-frame input transitions from the previous call are discarded first.
    pub fn pump_events(&mut self) {
        self.handler.input_frame.clear();
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler);
        if let PumpStatus::Exit(code) = status {
            log::info!("event loop exited with code {code}");
            self.handler.close_requested = true;
        }
    }

    pub fn should_close(&self) -> bool {
        self.handler.close_requested
    }

    pub fn request_close(&mut self) {
        self.handler.close_requested = true;
    }

    /// Held keys and buttons, pointer position.
    pub fn input(&self) -> &InputState {
        &self.handler.input_state
    }

    /// Transitions seen by the last `pump_events`.
    pub fn input_frame(&self) -> &InputFrame {
        &self.handler.input_frame
    }

    /// Clears the surface with `clear`, lets `draw` record into the frame, then presents.
    ///
    /// Surface errors never escape: lost/outdated surfaces are reconfigured and
    /// the frame skipped; out-of-memory requests close.
    pub fn render<F>(&mut self, clear: Color, projection: Projection, draw: F) -> FrameStatus
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>),
    {
        let Some(entry) = self.handler.entry.as_mut() else {
            return FrameStatus::Skipped;
        };

        let mut fatal = false;
        let status = entry.with_mut(|fields| {
            let gpu = fields.gpu;

            let mut frame = match gpu.begin_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("surface error: {err}");
                    if gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                        fatal = true;
                    }
                    return FrameStatus::Skipped;
                }
            };

            clear_pass(&mut frame.encoder, &frame.view, clear);

            let rctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), projection);
            {
                let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
                draw(&rctx, &mut target);
            }

            fields.window.pre_present_notify();
            gpu.submit(frame);
            FrameStatus::Presented
        });

        if fatal {
            log::error!("GPU out of memory; closing");
            self.handler.close_requested = true;
        }
        status
    }
}

fn clear_pass(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, clear: Color) {
    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("dvd clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: clear.r as f64,
                    g: clear.g as f64,
                    b: clear.b as f64,
                    a: clear.a as f64,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_fixed_800_by_600() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.size, LogicalSize::new(800.0, 600.0));
        assert!(!cfg.resizable);
    }
}
