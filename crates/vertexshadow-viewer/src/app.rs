use anyhow::Context;
use vertexshadow_engine::core::{App, AppControl, FrameCtx, StartCtx};
use vertexshadow_engine::gl::WgpuGl;
use vertexshadow_engine::input::{InputEvent, InputState};
use vertexshadow_engine::render::{
    request_load, MeshData, RendererState, ShadingSources, TextureEvent,
};

use crate::config::ViewerConfig;
use crate::controls::{map_event, Command, SliderBank};

/// GPU-side state, created once the window exists.
struct Scene {
    gl: WgpuGl,
    state: RendererState<WgpuGl>,
    sliders: SliderBank,
}

pub struct ViewerApp {
    config: ViewerConfig,
    mesh: MeshData,
    scene: Option<Scene>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig, mesh: MeshData) -> Self {
        Self {
            config,
            mesh,
            scene: None,
        }
    }
}

impl App for ViewerApp {
    fn on_start(&mut self, ctx: &mut StartCtx<'_, '_>) -> anyhow::Result<()> {
        let mut gl = WgpuGl::new(ctx.gpu);
        let mut state = RendererState::new(&mut gl, &self.mesh, &ShadingSources::default())
            .context("failed to upload mesh")?;

        if let Some(source) = &self.config.texture {
            let waker = ctx.waker.clone();
            match request_load(source, move || waker.wake()) {
                Ok(pending) => state.begin_texture_load(pending),
                Err(e) => log::warn!("texture `{source}` not loaded: {e}"),
            }
        }

        let sliders = SliderBank::from_state(self.config.sliders, state.interaction());
        for (axis, value) in sliders.corrections(state.interaction()) {
            log::warn!("light {axis:?} outside slider range, starting at {value}");
            state.set_light_component(axis, value);
        }
        self.scene = Some(Scene { gl, state, sliders });
        Ok(())
    }

    fn on_input(&mut self, event: &InputEvent, input: &InputState) -> AppControl {
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };
        let Some(command) = map_event(event, input) else {
            return AppControl::Continue;
        };

        match command {
            Command::DragStart { x, y } => scene.state.begin_drag(x, y),
            Command::DragMove { x, y } => scene.state.drag_to(x, y),
            Command::DragEnd => scene.state.end_drag(),
            Command::StepSlider { axis, direction } => {
                if let Some(value) = scene.sliders.step(axis, direction) {
                    log::debug!("light {axis:?} = {value}");
                    scene.state.set_light_component(axis, value);
                }
            }
            Command::Radio(value) => scene.state.select_radio(value),
            Command::Exit => return AppControl::Exit,
        }
        AppControl::Continue
    }

    fn on_wake(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let Some(TextureEvent::Failed(err)) = scene.state.poll_texture(&mut scene.gl) {
            log::warn!("continuing without texture: {err}");
        }
    }

    fn take_redraw_request(&mut self) -> bool {
        self.scene
            .as_mut()
            .is_some_and(|scene| scene.state.take_redraw_request())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };
        log::trace!("frame {}", ctx.frame_index);

        let Scene { gl, state, .. } = scene;
        ctx.render(|target| {
            state.render(gl);
            gl.flush(target.encoder, target.color_view, target.depth_view);
        })
    }
}
