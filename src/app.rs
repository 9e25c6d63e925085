//! Window and event loop.
//!
//! [`run`] opens a window, builds the renderer on top of it, lets the caller
//! register meshes/materials and build a [`Scene`], then drives the frame loop:
//!
//! 1. Collect window/device events (movement keys, mouse look, actions)
//! 2. Move the camera and update the scene by the frame time
//! 3. Snapshot the scene and render it
//! 4. Reconfigure the surface if it was lost or outdated
//!
//! Controls: `WASD` walk, `Space`/`Shift` rise and sink, hold the right mouse
//! button to look around, `E` interact, `T` toggle shadows, `R` reload
//! shaders, `Esc` quit.

use std::sync::Arc;

use cgmath::Vector3;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    backend::GpuBackend,
    config::{RendererConfig, ShaderSources},
    context::Context,
    error::RenderError,
    renderer::Renderer,
    scene::Scene,
};

/// Builds the scene once the GPU is up. Meshes and materials are registered
/// on the renderer's backend and bound to render kinds here.
pub type SceneBuilder = Box<dyn FnOnce(&mut Renderer<GpuBackend>) -> anyhow::Result<Scene>>;

/// World units per second.
const WALK_SPEED: f32 = 5.0;
/// Degrees per pixel of mouse motion.
const LOOK_SPEED: f32 = 0.2;

#[derive(Debug, Default)]
struct Input {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    rise: bool,
    sink: bool,
    looking: bool,
}

impl Input {
    /// Movement along `(forwards, right, up)`, not yet scaled by speed.
    fn direction(&self) -> Vector3<f32> {
        let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
        Vector3::new(
            axis(self.forward, self.back),
            axis(self.right, self.left),
            axis(self.rise, self.sink),
        )
    }
}

struct AppState {
    window: Arc<Window>,
    renderer: Renderer<GpuBackend>,
    scene: Scene,
}

impl AppState {
    fn new(
        runtime: &tokio::runtime::Runtime,
        window: Arc<Window>,
        config: RendererConfig,
        sources: ShaderSources,
        builder: SceneBuilder,
    ) -> anyhow::Result<Self> {
        let ctx = runtime.block_on(Context::new(window.clone()))?;
        let mut renderer = Renderer::new(GpuBackend::new(ctx), config, sources)?;
        let scene = builder(&mut renderer)?;
        Ok(Self {
            window,
            renderer,
            scene,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Err(e) = self.renderer.resize(width, height) {
            log::error!("Unable to resize to {width}x{height}: {e}");
        }
    }

    fn frame(&mut self, dt: f32, input: &Input) {
        self.scene.walk(input.direction() * WALK_SPEED * dt);
        self.scene.update(dt);

        let (camera, renderables) = self.scene.snapshot();
        match self.renderer.render(&camera, &renderables, &self.scene.lights) {
            Ok(()) => {}
            // Reconfigure the surface if it's lost or outdated
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
            }
            Err(e) => log::error!("Unable to render {e}"),
        }
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: RendererConfig,
    sources: ShaderSources,
    builder: Option<SceneBuilder>,
    state: Option<AppState>,
    input: Input,
    last_time: Instant,
}

impl App {
    fn new(config: RendererConfig, sources: ShaderSources, builder: SceneBuilder) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            sources,
            builder: Some(builder),
            state: None,
            input: Input::default(),
            last_time: Instant::now(),
        })
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;
        match code {
            KeyCode::KeyW => self.input.forward = pressed,
            KeyCode::KeyS => self.input.back = pressed,
            KeyCode::KeyA => self.input.left = pressed,
            KeyCode::KeyD => self.input.right = pressed,
            KeyCode::Space => self.input.rise = pressed,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.input.sink = pressed,
            _ => {}
        }
        if !pressed || event.repeat {
            return;
        }

        let Some(state) = &mut self.state else {
            return;
        };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyE => {
                if !state.scene.interact() {
                    log::debug!("nothing to interact with");
                }
            }
            KeyCode::KeyT => {
                state.renderer.toggle_shadows();
            }
            KeyCode::KeyR => {
                // Failures are logged and the previous shaders stay active
                let _ = state.renderer.reload_shaders();
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(builder) = self.builder.take() else {
            return;
        };
        let window_attributes = Window::default_attributes().with_title("walkthrough");
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Unable to create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        match AppState::new(
            &self.async_runtime,
            window,
            self.config.clone(),
            self.sources.clone(),
            builder,
        ) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => {
                log::error!("Unable to set up the renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.input.looking {
                state.scene.spin(Vector3::new(
                    0.0,
                    -dy as f32 * LOOK_SPEED,
                    -dx as f32 * LOOK_SPEED,
                ));
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Right,
                ..
            } => self.input.looking = button_state.is_pressed(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed().as_secs_f32();
                self.last_time = Instant::now();
                if let Some(state) = &mut self.state {
                    state.frame(dt, &self.input);
                    state.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.renderer.destroy();
        }
    }
}

/// Open a window and run the walkthrough until it is closed.
pub fn run(
    config: RendererConfig,
    sources: ShaderSources,
    builder: SceneBuilder,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, sources, builder)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
