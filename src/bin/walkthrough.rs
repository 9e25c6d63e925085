//! The campus walkthrough: one static block, a door to open and the hallway lights.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cgmath::Vector3;
use walkthrough_ngin::{
    GpuBackend, Renderer, app,
    config::{RendererConfig, ShaderSources},
    data_structures::{instance::Instance, model::MeshData, texture::Texture},
    lights::Light,
    render::{Binding, MaterialId, RenderKind},
    scene::{Camera, Door, Scene, Swing},
};

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

#[rustfmt::skip]
const HALLWAY_LIGHTS: [[f32; 3]; 16] = [
    [-6.0, 30.0, 8.0], [-6.0, 27.0, 8.0], [-6.0, 33.0, 8.0],
    [-10.0, 30.0, 10.0], [-10.0, 27.0, 10.0], [-10.0, 33.0, 10.0],
    [-14.0, 30.0, 10.0], [-14.0, 27.0, 10.0], [-14.0, 33.0, 10.0],
    [-4.0, -24.0, 3.0], [-4.0, -33.0, 3.0], [-15.0, -33.0, 3.0],
    [-15.0, -13.0, 3.0], [-15.0, 1.0, 3.0], [29.0, 26.0, 6.0],
    [13.5, 34.0, 6.0],
];

fn lights() -> Vec<Light> {
    let mut lights = vec![Light::new(
        Vector3::new(1.0, 1.0, 1.0),
        WHITE.into(),
        7.0,
    )];
    lights.extend(
        HALLWAY_LIGHTS
            .iter()
            .map(|&position| Light::new(position.into(), WHITE.into(), 8.0)),
    );
    lights
}

/// `WALKTHROUGH_SHADERS=<dir>` loads WGSL from disk so it can be edited and
/// reloaded with `R` while running.
fn shader_sources() -> ShaderSources {
    match std::env::var_os("WALKTHROUGH_SHADERS") {
        Some(dir) => ShaderSources::Directory(dir.into()),
        None => ShaderSources::Embedded,
    }
}

const SKY_FACES: [&str; 6] = [
    "sky_px.png",
    "sky_nx.png",
    "sky_py.png",
    "sky_ny.png",
    "sky_pz.png",
    "sky_nz.png",
];

/// `WALKTHROUGH_ASSETS=<dir>` replaces the solid colour stand-ins with
/// `light-bulb.png`, `prompt.png` and the `sky_*.png` faces from that directory.
fn assets_dir() -> Option<PathBuf> {
    std::env::var_os("WALKTHROUGH_ASSETS").map(PathBuf::from)
}

fn open_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("failed to load {}", path.display()))
}

struct Artwork {
    marker: MaterialId,
    prompt: MaterialId,
    sky: MaterialId,
}

fn artwork(backend: &mut GpuBackend) -> anyhow::Result<Artwork> {
    if let Some(dir) = assets_dir() {
        log::info!("loading artwork from {}", dir.display());
        let marker = backend.add_image_material("light bulb", &open_image(&dir.join("light-bulb.png"))?);
        let prompt = backend.add_image_material("prompt", &open_image(&dir.join("prompt.png"))?);
        let [px, nx, py, ny, pz, nz] = SKY_FACES.map(|face| open_image(&dir.join(face)));
        let faces = [px?, nx?, py?, ny?, pz?, nz?];
        let sky = backend.add_sky_faces("sky", &faces);
        return Ok(Artwork { marker, prompt, sky });
    }

    let white = backend.add_solid_material("white", [255, 255, 255, 255]);
    let sky_texture = {
        let ctx = backend.context();
        Texture::solid_cubemap(&ctx.device, &ctx.queue, [135, 190, 235, 255], "sky")
    };
    Ok(Artwork {
        marker: white,
        prompt: white,
        sky: backend.add_sky_material("sky", sky_texture),
    })
}

fn main() -> anyhow::Result<()> {
    app::run(
        RendererConfig::default(),
        shader_sources(),
        Box::new(|renderer: &mut Renderer<GpuBackend>| -> anyhow::Result<Scene> {
            let backend = renderer.backend_mut();
            let block = backend.add_mesh(&MeshData::cuboid("block", Vector3::new(4.0, 4.0, 4.0)));
            let door = backend.add_mesh(&MeshData::cuboid("door", Vector3::new(0.1, 1.0, 2.2)));
            let marker = backend.add_mesh(&MeshData::quad("light marker", 0.3, 0.3));
            let prompt = backend.add_mesh(&MeshData::quad("prompt", 0.5, 0.15));
            let sky = backend.add_mesh(&MeshData::sky_cube());

            let concrete = backend.add_solid_material("concrete", [180, 176, 168, 255]);
            let wood = backend.add_solid_material("wood", [120, 82, 50, 255]);
            let art = artwork(backend)?;

            let bindings = renderer.bindings_mut();
            bindings.set(RenderKind::Static, Binding::bound(block, concrete));
            bindings.set(RenderKind::Door, Binding::bound(door, wood));
            bindings.set(RenderKind::Prompt, Binding::bound(prompt, art.prompt));
            bindings.light_marker = Binding::bound(marker, art.marker);
            bindings.skybox = Binding::bound(sky, art.sky);

            let mut scene = Scene::new(Camera::new(Vector3::new(-26.1, 30.15, 1.5)));
            scene
                .statics
                .push(Instance::new().with_eulers(Vector3::new(90.0, 0.0, -90.0)));
            scene.doors.push(Door::new(
                Vector3::new(18.60, 31.418, 5.05),
                Vector3::new(90.0, 90.0, 0.0),
                Swing::Negative,
            ));
            scene.lights = lights();
            Ok(scene)
        }),
    )
}
