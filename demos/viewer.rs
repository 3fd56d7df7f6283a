//! Minimal model viewer.
//!
//! ```text
//! cargo run --example viewer -- <model.gltf|model.obj> [--skybox <dir>] [skip-substring...]
//! ```
//!
//! Right mouse button looks around, WASD/Space/C move, Shift sprints, the
//! wheel zooms and R resets the zoom. Tab toggles an orbit around the model.
//! A skybox directory holds `right`, `left`, `top`, `bottom`, `front` and
//! `back` images (png or jpg).

use std::path::{Path, PathBuf};

use anyhow::bail;
use render_scaffold::{
    Context, GraphicsFlow, ImportOptions, Model, ProgramDescriptor, ShaderProgram,
    WindowEvent,
    data_structures::{cubemap::Cubemap, skybox::Skybox},
    pipelines::shader::{
        MODEL_FRAGMENT_SHADER, MODEL_VERTEX_SHADER, SKYBOX_FRAGMENT_SHADER, SKYBOX_VERTEX_SHADER,
    },
};
use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

const FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

struct Args {
    model: PathBuf,
    skybox: Option<PathBuf>,
    skip: Vec<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let Some(model) = args.next() else {
        bail!("usage: viewer <model> [--skybox <dir>] [skip-substring...]");
    };
    let mut skybox = None;
    let mut skip = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--skybox" {
            match args.next() {
                Some(dir) => skybox = Some(PathBuf::from(dir)),
                None => bail!("--skybox needs a directory"),
            }
        } else {
            skip.push(arg);
        }
    }
    Ok(Args {
        model: PathBuf::from(model),
        skybox,
        skip,
    })
}

fn face_path(dir: &Path, face: &str) -> PathBuf {
    ["png", "jpg", "jpeg"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", face, ext)))
        .find(|path| path.is_file())
        .unwrap_or_else(|| dir.join(format!("{}.png", face)))
}

struct Viewer {
    model: Model,
    program: ShaderProgram,
    sky: Option<(Skybox, ShaderProgram)>,
}

impl Viewer {
    fn new(ctx: &Context, args: Args) -> anyhow::Result<Self> {
        let options = ImportOptions::skipping(args.skip);
        let model = Model::load(&ctx.device, &ctx.queue, &args.model, &options)?;

        let format = ctx.surface_format();
        let program = ShaderProgram::new(
            &ctx.device,
            &ctx.queue,
            MODEL_VERTEX_SHADER,
            MODEL_FRAGMENT_SHADER,
            &ProgramDescriptor::model(format),
        );
        if !program.is_valid() {
            bail!("model shader program failed to build");
        }

        let sky = args.skybox.map(|dir| {
            let paths = FACES.map(|face| face_path(&dir, face));
            let cubemap = Cubemap::load(&ctx.device, &ctx.queue, paths.each_ref().map(PathBuf::as_path));
            let program = ShaderProgram::new(
                &ctx.device,
                &ctx.queue,
                SKYBOX_VERTEX_SHADER,
                SKYBOX_FRAGMENT_SHADER,
                &ProgramDescriptor::skybox(format),
            );
            (Skybox::new(&ctx.device, cubemap), program)
        });

        Ok(Self {
            model,
            program,
            sky,
        })
    }
}

impl GraphicsFlow for Viewer {
    fn on_init(&mut self, ctx: &mut Context) {
        // Back off far enough to see the whole model.
        if let (Some(center), Some(size)) = (self.model.aabb().center(), self.model.aabb().size()) {
            let extent = size.x.max(size.y).max(size.z);
            ctx.camera.position = center + cgmath::Vector3::new(0.0, 0.0, extent.max(1.0) * 1.5);
            ctx.camera.update_matrix();
        }
        log::info!(
            "Viewing {} meshes, {} textures",
            self.model.meshes.len(),
            self.model.textures().len()
        );
    }

    fn on_window_events(&mut self, ctx: &mut Context, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(KeyCode::Tab),
                    state: ElementState::Pressed,
                    repeat: false,
                    ..
                },
            ..
        } = event
        {
            let center = self.model.aabb().center().unwrap_or(self.model.position());
            ctx.camera.toggle_cinema(center);
        }
    }

    fn on_render(&mut self, ctx: &Context, render_pass: &mut wgpu::RenderPass<'_>) {
        self.program.begin_frame();
        ctx.camera.matrix(&mut self.program, "camMatrix");
        self.model.draw(&ctx.queue, render_pass, &mut self.program);

        if let Some((skybox, program)) = &mut self.sky {
            program.begin_frame();
            skybox.draw(&ctx.queue, render_pass, &ctx.camera, program);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    render_scaffold::run(
        "render-scaffold viewer",
        Box::new(move |ctx| Ok(Box::new(Viewer::new(ctx, args)?) as Box<dyn GraphicsFlow>)),
    )
}
