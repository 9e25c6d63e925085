//! The renderer facade.
//!
//! [`Renderer`] ties the pieces together: it selects lights, decides whether
//! the shadow pass runs this frame, records both passes and hands the command
//! list to its backend. Window level events arrive through [`Renderer::resize`],
//! [`Renderer::toggle_shadows`] and [`Renderer::reload_shaders`].

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    backend::RenderBackend,
    commands::{CommandList, DepthState},
    config::{RendererConfig, ShaderSources},
    error::Result,
    lights::{self, Light},
    passes::{FrameInputs, main_pass, shadow},
    pipelines::registry::PipelineRegistry,
    render::{Binding, BindingTable, CameraView, RenderKind, Renderables},
    targets::RenderTargets,
    transform,
};

pub struct Renderer<B: RenderBackend> {
    backend: B,
    registry: PipelineRegistry,
    targets: RenderTargets<B::ShadowTarget>,
    bindings: BindingTable,
    config: RendererConfig,
    projection: Matrix4<f32>,
    shadows_enabled: bool,
    size: (u32, u32),
}

impl<B: RenderBackend> Renderer<B> {
    /// Compile every pipeline, build it on the backend and create the shadow
    /// target at the current surface size.
    pub fn new(mut backend: B, config: RendererConfig, sources: ShaderSources) -> Result<Self> {
        let registry = PipelineRegistry::load(sources, config.max_lights)?;
        backend.rebuild_pipelines(&registry)?;

        let (width, height) = backend.surface_size();
        let mut targets = RenderTargets::new();
        targets.create(width, height, |w, h| backend.create_shadow_target(w, h))?;
        log::info!("renderer ready at {width}x{height}");

        Ok(Self {
            projection: projection(&config, width, height),
            shadows_enabled: config.shadows_enabled,
            backend,
            registry,
            targets,
            bindings: BindingTable::new(),
            config,
            size: (width, height),
        })
    }

    /// Record the shadow pass (when active) and the main pass for one frame.
    pub fn record_frame(
        &self,
        camera: &CameraView,
        renderables: &Renderables,
        lights: &[Light],
    ) -> Result<CommandList> {
        let selected = lights::select(lights, camera.position, self.registry.max_lights());
        // Padding only starts after the real lights, so slot 0 is real whenever any exist
        let dominant = selected.first().filter(|_| !lights.is_empty());
        let shadow_size = self.targets.size().filter(|_| self.targets.get().is_some());

        let (shadows_active, light_space) = match (self.shadows_enabled, dominant, shadow_size) {
            (true, Some(light), Some(_)) => (
                true,
                shadow::light_space_matrix(light, &self.config.shadow),
            ),
            _ => (false, Matrix4::identity()),
        };

        let frame = FrameInputs {
            registry: &self.registry,
            bindings: &self.bindings,
            renderables,
            camera,
            projection: self.projection,
            selected: &selected,
            light_space,
            shadows_active,
            viewport: self.size,
            clear_colour: self.config.clear_colour,
        };

        let mut list = CommandList::new();
        if let (true, Some((width, height))) = (shadows_active, shadow_size) {
            shadow::record(&mut list, &frame, width, height)?;
        }
        main_pass::record(&mut list, &frame)?;
        debug_assert_eq!(list.depth(), DepthState::Less);
        Ok(list)
    }

    pub fn render(
        &mut self,
        camera: &CameraView,
        renderables: &Renderables,
        lights: &[Light],
    ) -> Result<()> {
        let list = self.record_frame(camera, renderables, lights)?;
        self.backend
            .execute(&list, &self.registry, self.targets.get())
    }

    /// Follow a new surface size: reconfigure the surface, recompute the
    /// projection and recreate the shadow target. Zero sizes (minimised
    /// windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        log::info!("resizing to {width}x{height}");
        self.backend.configure_surface(width, height);
        self.size = (width, height);
        self.projection = projection(&self.config, width, height);
        self.targets
            .resize(width, height, |w, h| self.backend.create_shadow_target(w, h))
    }

    /// Flip the global shadow switch and return the new state.
    pub fn toggle_shadows(&mut self) -> bool {
        self.shadows_enabled = !self.shadows_enabled;
        self.config.shadows_enabled = self.shadows_enabled;
        log::info!(
            "shadows {}",
            if self.shadows_enabled { "on" } else { "off" }
        );
        self.shadows_enabled
    }

    /// Recompile every pipeline from its sources.
    ///
    /// Either all pipelines and handles are replaced or none are: on error the
    /// previous registry and backend pipelines stay live.
    pub fn reload_shaders(&mut self) -> Result<()> {
        let reloaded = self
            .registry
            .rebuilt()
            .and_then(|candidate| {
                self.backend.rebuild_pipelines(&candidate)?;
                Ok(candidate)
            });
        match reloaded {
            Ok(candidate) => {
                log::info!("reloaded shaders, generation {}", candidate.generation());
                self.registry = candidate;
                Ok(())
            }
            Err(e) => {
                log::error!("shader reload failed, keeping the previous pipelines: {e}");
                Err(e)
            }
        }
    }

    /// Release the shadow target and GPU pipelines. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.targets.destroy();
        self.backend.release();
    }

    /// Change the configuration at runtime. A new light count rebuilds the
    /// pipelines with the same all or nothing rule as [`Renderer::reload_shaders`].
    pub fn configure<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RendererConfig),
    {
        let mut config = self.config.clone();
        f(&mut config);
        if config.max_lights != self.registry.max_lights() {
            let candidate = self.registry.with_max_lights(config.max_lights)?;
            self.backend.rebuild_pipelines(&candidate)?;
            self.registry = candidate;
        }
        self.shadows_enabled = config.shadows_enabled;
        self.projection = projection(&config, self.size.0, self.size.1);
        self.config = config;
        Ok(())
    }

    pub fn bind(&mut self, kind: RenderKind, binding: Binding) {
        self.bindings.set(kind, binding);
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn shadow_target(&self) -> Option<&B::ShadowTarget> {
        self.targets.get()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

fn projection(config: &RendererConfig, width: u32, height: u32) -> Matrix4<f32> {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    transform::perspective(config.fov_y, aspect, config.near, config.far)
}
