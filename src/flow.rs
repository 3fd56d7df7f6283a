//! Flow control and application event loop.
//!
//! A "flow" is the host side of the application: it owns the models and
//! shader programs and decides what gets drawn. The loop owns the window and
//! the [`Context`] and drives the flow through winit.
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Feed window/device events into the camera input and the flow
//! 2. Move the camera by the frame delta and rebuild its matrices
//! 3. Call `on_update`
//! 4. Open a render pass that clears colour and depth, call `on_render`
//! 5. Present frame

use std::{iter, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::context::Context;

/// Trait for the application driven by [`run`].
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after the constructor; configure the context (camera, clear colour, etc.)
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame, after the camera moved
/// 4. `on_render()` is called each frame inside the main render pass
pub trait GraphicsFlow {
    fn on_init(&mut self, ctx: &mut Context);

    /// Update state every frame with the elapsed time `dt`.
    fn on_update(&mut self, _ctx: &Context, _dt: Duration) {}

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    ///
    /// Camera input has already been recorded when this is called.
    fn on_window_events(&mut self, _ctx: &mut Context, _event: &WindowEvent) {}

    /// Record the draws of this frame.
    fn on_render(&mut self, ctx: &Context, render_pass: &mut wgpu::RenderPass<'_>);
}

/// Builds the flow once the GPU context exists, so it can load models and
/// compile shaders.
pub type FlowConstructor = Box<dyn FnOnce(&Context) -> anyhow::Result<Box<dyn GraphicsFlow>>>;

/// GPU context plus surface status.
#[derive(Debug)]
struct AppState {
    ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn update(&mut self, flow: &mut dyn GraphicsFlow, dt: Duration) {
        let ctx = &mut self.ctx;
        let scroll = ctx.input.take_scroll();
        if scroll != 0.0 {
            ctx.camera.on_scroll(scroll);
        }
        ctx.camera.update_with_mode(&ctx.input, dt.as_secs_f32());
        ctx.input.end_frame();
        ctx.camera.update_matrix();
        flow.on_update(ctx, dt);
    }

    fn render(&mut self, flow: &mut dyn GraphicsFlow) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            flow.on_render(&self.ctx, &mut render_pass);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    title: String,
    state: Option<AppState>,
    flow: Option<Box<dyn GraphicsFlow>>,
    constructor: Option<FlowConstructor>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(title: &str, constructor: FlowConstructor) -> Self {
        Self {
            title: title.to_string(),
            state: None,
            flow: None,
            constructor: Some(constructor),
            last_time: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes().with_title(self.title.clone());
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let ctx = futures::executor::block_on(Context::new(window))?;
        let mut state = AppState {
            ctx,
            is_surface_configured: false,
        };
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);

        if let Some(constructor) = self.constructor.take() {
            let mut flow = constructor(&state.ctx)?;
            flow.on_init(&mut state.ctx);
            self.flow = Some(flow);
        }
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.last_time = Instant::now();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("App initialization failed: {:#}", e);
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.ctx.input.process_device_event(&event);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let (Some(state), Some(flow)) = (&mut self.state, &mut self.flow) else {
            return;
        };

        let was_looking = state.ctx.input.is_looking();
        state.ctx.input.process_window_event(&event);
        let looking = state.ctx.input.is_looking();
        if looking != was_looking {
            state.ctx.window.set_cursor_visible(!looking);
        }

        flow.on_window_events(&mut state.ctx, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.update(flow.as_mut(), dt);
                match state.render(flow.as_mut()) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Open a window titled `title` and run `constructor`'s flow until the
/// window is closed.
pub fn run(title: &str, constructor: FlowConstructor) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(title, constructor);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
