//! Per-frame orchestration and the state object the host drives.

use glam::Vec4;

use crate::gl::GraphicsApi;

use super::geometry::GeometryStore;
use super::mesh::{AssetError, MeshData};
use super::schedule::RedrawScheduler;
use super::shader::{ProgramKind, ProgramSource, ShaderProgram};
use super::state::{InteractionState, LightAxis, Technique};
use super::texture::{PendingTexture, TextureEvent, TextureResource};
use super::transform::{self, Transforms, MODEL_TRANSLATION};

pub const CLEAR_COLOR: [f32; 4] = [0.82, 0.84, 0.86, 1.0];

/// Source text for the three programs.
#[derive(Debug, Copy, Clone)]
pub struct ShadingSources<'a> {
    pub textured: ProgramSource<'a>,
    pub diffuse_shadow: ProgramSource<'a>,
    pub total_shadow: ProgramSource<'a>,
}

impl Default for ShadingSources<'static> {
    fn default() -> Self {
        Self {
            textured: ProgramKind::Textured.sources(),
            diffuse_shadow: ProgramKind::DiffuseShadow.sources(),
            total_shadow: ProgramKind::TotalShadow.sources(),
        }
    }
}

impl<'a> ShadingSources<'a> {
    fn get(&self, kind: ProgramKind) -> ProgramSource<'a> {
        match kind {
            ProgramKind::Textured => self.textured,
            ProgramKind::DiffuseShadow => self.diffuse_shadow,
            ProgramKind::TotalShadow => self.total_shadow,
        }
    }
}

/// A program slot. Programs that failed to build stay empty and their pass
/// is skipped.
struct Pass<G: GraphicsApi> {
    kind: ProgramKind,
    program: Option<ShaderProgram<G>>,
    warned: bool,
}

impl<G: GraphicsApi> Pass<G> {
    fn build(gl: &mut G, kind: ProgramKind, source: ProgramSource<'_>) -> Self {
        let program = match ShaderProgram::compile_and_link(gl, source) {
            Ok(program) => {
                log::info!("built `{}` program", kind.label());
                Some(program)
            }
            Err(err) => {
                log::error!("`{}` program unavailable: {err}", kind.label());
                None
            }
        };
        Self {
            kind,
            program,
            warned: false,
        }
    }

    fn draw(&mut self, gl: &mut G, geometry: &GeometryStore<G>, t: &Transforms, light: Vec4) {
        let Some(program) = &self.program else {
            if !self.warned {
                log::warn!("skipping `{}` pass: program failed to build", self.kind.label());
                self.warned = true;
            }
            return;
        };
        program.apply_transforms(gl, &t.projection, &t.view, &t.model);
        program.set_light_position(gl, light);
        geometry.bind_and_draw(gl, program);
    }
}

/// Owns the GPU-side scene: geometry, the three programs and the texture.
pub struct FrameRenderer<G: GraphicsApi> {
    geometry: GeometryStore<G>,
    textured: Pass<G>,
    diffuse_shadow: Pass<G>,
    total_shadow: Pass<G>,
    texture: TextureResource<G>,
}

impl<G: GraphicsApi> FrameRenderer<G> {
    /// Uploads the mesh and builds every program. A bad mesh is fatal; a
    /// program that fails to build only disables its own pass.
    pub fn new(gl: &mut G, mesh: &MeshData, sources: &ShadingSources<'_>) -> Result<Self, AssetError> {
        let geometry = GeometryStore::create(gl, mesh)?;
        let mut pass = |kind| Pass::build(gl, kind, sources.get(kind));

        Ok(Self {
            geometry,
            textured: pass(ProgramKind::Textured),
            diffuse_shadow: pass(ProgramKind::DiffuseShadow),
            total_shadow: pass(ProgramKind::TotalShadow),
            texture: TextureResource::new(),
        })
    }

    pub fn program(&self, kind: ProgramKind) -> Option<&ShaderProgram<G>> {
        match kind {
            ProgramKind::Textured => self.textured.program.as_ref(),
            ProgramKind::DiffuseShadow => self.diffuse_shadow.program.as_ref(),
            ProgramKind::TotalShadow => self.total_shadow.program.as_ref(),
        }
    }

    pub fn texture(&self) -> &TextureResource<G> {
        &self.texture
    }

    pub fn texture_mut(&mut self) -> &mut TextureResource<G> {
        &mut self.texture
    }

    /// Redraws the whole frame from `state`: clear, textured pass, then the
    /// one shadow pass the technique selects.
    pub fn render_frame(&mut self, gl: &mut G, state: &InteractionState) {
        gl.clear(CLEAR_COLOR);
        gl.enable_depth_test();

        let t = transform::compute(state.orientation(), MODEL_TRANSLATION);
        let light = state.light_position();
        log::trace!("frame: {:?} light {light}", state.orientation());

        gl.bind_texture(self.texture.handle());
        self.textured.draw(gl, &self.geometry, &t, light);

        let shadow = match state.technique() {
            Technique::DiffuseShadow => &mut self.diffuse_shadow,
            Technique::TotalShadow => &mut self.total_shadow,
        };
        shadow.draw(gl, &self.geometry, &t, light);
    }
}

/// Everything the host needs between frames: interaction state, the
/// renderer, and the pending-redraw flag. Input entry points mutate state and
/// request a redraw; the host renders once per display refresh when one is
/// pending.
pub struct RendererState<G: GraphicsApi> {
    interaction: InteractionState,
    renderer: FrameRenderer<G>,
    redraw: RedrawScheduler,
}

impl<G: GraphicsApi> RendererState<G> {
    pub fn new(gl: &mut G, mesh: &MeshData, sources: &ShadingSources<'_>) -> Result<Self, AssetError> {
        let renderer = FrameRenderer::new(gl, mesh, sources)?;
        let mut redraw = RedrawScheduler::default();
        redraw.request();
        Ok(Self {
            interaction: InteractionState::default(),
            renderer,
            redraw,
        })
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn renderer(&self) -> &FrameRenderer<G> {
        &self.renderer
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.interaction.begin_drag(x, y);
    }

    pub fn drag_to(&mut self, x: f32, y: f32) {
        if self.interaction.drag_to(x, y) {
            self.redraw.request();
        }
    }

    pub fn end_drag(&mut self) {
        self.interaction.end_drag();
    }

    pub fn set_light_component(&mut self, axis: LightAxis, value: f32) {
        self.interaction.set_light_component(axis, value);
        self.redraw.request();
    }

    /// Applies a radio value; values other than 0 and 1 are ignored.
    pub fn select_radio(&mut self, value: u8) {
        let Some(technique) = Technique::from_radio(value) else {
            log::warn!("ignoring unknown technique selector {value}");
            return;
        };
        self.interaction.select_technique(technique);
        self.redraw.request();
    }

    pub fn begin_texture_load(&mut self, pending: PendingTexture) {
        self.renderer.texture_mut().begin_load(pending);
    }

    /// Uploads a finished texture load; success requests a redraw.
    pub fn poll_texture(&mut self, gl: &mut G) -> Option<TextureEvent> {
        let event = self.renderer.texture_mut().poll(gl)?;
        if matches!(event, TextureEvent::Uploaded) {
            self.redraw.request();
        }
        Some(event)
    }

    /// Returns whether a frame should be drawn and clears the request.
    pub fn take_redraw_request(&mut self) -> bool {
        self.redraw.take()
    }

    pub fn render(&mut self, gl: &mut G) {
        self.renderer.render_frame(gl, &self.interaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{DrawRecord, RecordedProgram, RecordingGl, UniformValue};
    use crate::render::shader::{LIGHT_POSITION, MODEL_MATRIX, VIEW_MATRIX};
    use crate::render::texture::TextureLoadError;
    use futures::channel::oneshot;
    use glam::{Mat4, Vec3};
    use image::{Rgba, RgbaImage};

    fn state(gl: &mut RecordingGl) -> RendererState<RecordingGl> {
        RendererState::new(gl, &MeshData::unit_cube(), &ShadingSources::default()).unwrap()
    }

    fn program_id(s: &RendererState<RecordingGl>, kind: ProgramKind) -> RecordedProgram {
        *s.renderer().program(kind).unwrap().handle()
    }

    fn frame(gl: &mut RecordingGl, s: &mut RendererState<RecordingGl>) -> Vec<DrawRecord> {
        gl.clear_calls();
        s.render(gl);
        gl.draws().into_iter().cloned().collect()
    }

    // ── pass selection ──

    #[test]
    fn initial_frame_draws_textured_then_total_shadow() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        let draws = frame(&mut gl, &mut s);

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].program, Some(program_id(&s, ProgramKind::Textured)));
        assert_eq!(draws[1].program, Some(program_id(&s, ProgramKind::TotalShadow)));
        assert!(draws.iter().all(|d| d.depth_test && d.index_count == 36));
    }

    #[test]
    fn initial_frame_uses_startup_transforms() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        frame(&mut gl, &mut s);

        let expected_view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
            * Mat4::from_rotation_x(45f32.to_radians())
            * Mat4::from_rotation_y((-45f32).to_radians());
        for kind in [ProgramKind::Textured, ProgramKind::TotalShadow] {
            let id = program_id(&s, kind);
            let Some(UniformValue::Mat4(view)) = gl.uniform(id, VIEW_MATRIX) else {
                panic!("view matrix not uploaded for {kind:?}");
            };
            assert!(view.abs_diff_eq(expected_view, 1e-5));
            assert_eq!(
                gl.uniform(id, MODEL_MATRIX),
                Some(UniformValue::Mat4(Mat4::from_translation(Vec3::Y)))
            );
        }
    }

    #[test]
    fn exactly_one_shadow_pass_follows_radio_selection() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        let textured = program_id(&s, ProgramKind::Textured);
        let diffuse = program_id(&s, ProgramKind::DiffuseShadow);
        let total = program_id(&s, ProgramKind::TotalShadow);

        for (radio, expected) in [(1, diffuse), (0, total), (1, diffuse), (1, diffuse), (0, total)] {
            s.select_radio(radio);
            let draws = frame(&mut gl, &mut s);
            let programs: Vec<_> = draws.iter().map(|d| d.program).collect();
            assert_eq!(programs, vec![Some(textured), Some(expected)]);
        }
    }

    #[test]
    fn unknown_radio_value_keeps_technique() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.select_radio(1);
        s.take_redraw_request();
        s.select_radio(7);
        assert_eq!(s.interaction().technique(), Technique::DiffuseShadow);
        assert!(!s.take_redraw_request());
    }

    // ── uniforms ──

    #[test]
    fn light_reaches_both_active_programs() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.set_light_component(LightAxis::X, 2.5);
        frame(&mut gl, &mut s);

        let light = UniformValue::Vec4(glam::Vec4::new(2.5, 3.0, 3.0, 1.0));
        assert_eq!(gl.uniform(program_id(&s, ProgramKind::Textured), LIGHT_POSITION), Some(light));
        assert_eq!(gl.uniform(program_id(&s, ProgramKind::TotalShadow), LIGHT_POSITION), Some(light));
    }

    #[test]
    fn frame_starts_with_clear_and_depth_test() {
        use crate::gl::recording::GlCall;
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        gl.clear_calls();
        s.render(&mut gl);
        assert_eq!(gl.calls()[0], GlCall::Clear(CLEAR_COLOR));
        assert_eq!(gl.calls()[1], GlCall::EnableDepthTest);
    }

    #[test]
    fn no_attributes_stay_enabled_after_a_frame() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.select_radio(1);
        frame(&mut gl, &mut s);
        assert!(gl.enabled_attributes().is_empty());
    }

    // ── redraw scheduling ──

    #[test]
    fn startup_requests_first_frame() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        assert!(s.take_redraw_request());
        assert!(!s.take_redraw_request());
    }

    #[test]
    fn many_mutations_coalesce_into_one_redraw() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.take_redraw_request();

        s.begin_drag(0.0, 0.0);
        for i in 1..=10 {
            s.drag_to(i as f32, 0.0);
        }
        s.set_light_component(LightAxis::Y, 4.0);
        s.select_radio(1);

        assert!(s.take_redraw_request());
        assert!(!s.take_redraw_request());
        assert_eq!(s.interaction().orientation().yaw, -35.0);
    }

    #[test]
    fn pointer_motion_without_drag_requests_nothing() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.take_redraw_request();
        s.drag_to(30.0, 30.0);
        assert!(!s.take_redraw_request());
    }

    // ── texture ──

    #[test]
    fn frames_before_texture_arrives_draw_untextured() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        let draws = frame(&mut gl, &mut s);
        assert!(draws.iter().all(|d| d.texture.is_none()));
    }

    #[test]
    fn uploaded_texture_is_bound_and_requests_redraw() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.take_redraw_request();

        let (sender, receiver) = oneshot::channel();
        s.begin_texture_load(PendingTexture::from_receiver("t.png", receiver));
        assert!(s.poll_texture(&mut gl).is_none());
        sender
            .send(Ok(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]))))
            .unwrap();
        assert!(matches!(s.poll_texture(&mut gl), Some(TextureEvent::Uploaded)));
        assert!(s.take_redraw_request());

        let draws = frame(&mut gl, &mut s);
        assert!(draws[0].texture.is_some());
    }

    #[test]
    fn failed_texture_keeps_both_passes_drawing() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        s.take_redraw_request();

        let (sender, receiver) = oneshot::channel();
        s.begin_texture_load(PendingTexture::from_receiver("t.png", receiver));
        sender
            .send(Err(TextureLoadError::UnsupportedSource("t.png".into())))
            .unwrap();
        assert!(matches!(s.poll_texture(&mut gl), Some(TextureEvent::Failed(_))));
        assert!(!s.take_redraw_request());

        let draws = frame(&mut gl, &mut s);
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| d.texture.is_none()));
    }

    // ── degraded mode ──

    #[test]
    fn broken_shadow_program_leaves_textured_pass_drawing() {
        let mut gl = RecordingGl::new();
        let sources = ShadingSources {
            total_shadow: ("total shadow", "this is not wgsl", "nor is this").into(),
            ..ShadingSources::default()
        };
        let mut s = RendererState::new(&mut gl, &MeshData::unit_cube(), &sources).unwrap();
        assert!(s.renderer().program(ProgramKind::TotalShadow).is_none());

        let textured = program_id(&s, ProgramKind::Textured);
        for _ in 0..3 {
            let draws = frame(&mut gl, &mut s);
            assert_eq!(draws.len(), 1);
            assert_eq!(draws[0].program, Some(textured));
        }

        s.select_radio(1);
        let draws = frame(&mut gl, &mut s);
        assert_eq!(draws.len(), 2);
    }

    #[test]
    fn bad_mesh_fails_construction() {
        let mut gl = RecordingGl::new();
        let mut mesh = MeshData::unit_cube();
        mesh.indices.push(99);
        let result = RendererState::new(&mut gl, &mesh, &ShadingSources::default());
        assert!(result.is_err());
        assert_eq!(gl.program_count(), 0);
    }

    #[test]
    fn render_is_idempotent_for_unchanged_state() {
        let mut gl = RecordingGl::new();
        let mut s = state(&mut gl);
        gl.clear_calls();
        s.render(&mut gl);
        let first = gl.calls().to_vec();
        gl.clear_calls();
        s.render(&mut gl);
        assert_eq!(gl.calls(), first.as_slice());
    }
}
