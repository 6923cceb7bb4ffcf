use std::collections::HashSet;
use std::time::Instant;

use dvd_framework::coords::{Projection, Vec2, Viewport};
use dvd_framework::device::GpuInit;
use dvd_framework::input::{Key, MouseButton};
use dvd_framework::paint::Color;
use dvd_framework::render::shapes::rect::RectRenderer;
use dvd_framework::render::shapes::text::TextRenderer;
use dvd_framework::scene::{DrawList, ZIndex};
use dvd_framework::shader::ShaderLibrary;
use dvd_framework::text::{FontId, FontSystem};
use dvd_framework::time::FrameClock;
use dvd_framework::window::{FrameStatus, Runtime, RuntimeConfig};

use crate::config::DemoConfig;
use crate::error::EngineError;
use crate::sim::{self, Bounds, ConfettiPolicy, Hit, Shape, World};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

const CLEAR_COLOR: Color = Color::from_premul(0.02, 0.02, 0.04, 1.0);
const OVERLAY_MARGIN: f32 = 12.0;

const Z_LOGO: ZIndex = ZIndex(0);
const Z_CONFETTI: ZIndex = ZIndex(1);
const Z_OVERLAY: ZIndex = ZIndex(2);

/// Engine lifecycle. Initialization steps must run in this order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Uninitialized,
    WindowReady,
    ShadersReady,
    ShapesReady,
    Running,
    Closing,
}

struct Renderers {
    rect: RectRenderer,
    text: TextRenderer,
}

/// Input sampled once per frame.
struct InputSnapshot {
    keys: HashSet<Key>,
    pointer: Option<Vec2>,
    left_down: bool,
}

/// Owns the window, GPU renderers, input state and the simulation.
///
/// Drive it with `init_window`, `init_shaders`, `init_shapes`, then
/// `process_input`, `update` and `render` once per frame until `should_close`.
pub struct Engine {
    config: DemoConfig,
    phase: Phase,
    projection: Projection,

    // Renderers hold GPU objects; declared before the runtime so they drop first.
    renderers: Option<Renderers>,
    runtime: Option<Runtime>,
    shaders: ShaderLibrary,
    fonts: FontSystem,
    overlay_font: Option<FontId>,
    draw_list: DrawList,

    world: Option<World>,
    clock: FrameClock,
    delta_time: f32,

    keys: HashSet<Key>,
    mouse_pos: Vec2,
    mouse_pressed_last_frame: bool,
}

impl Engine {
    pub fn new(config: DemoConfig) -> Self {
        let mut shaders = ShaderLibrary::new();
        if let Some(dir) = &config.shader_dir {
            shaders = shaders.with_override_dir(dir);
        }

        Self {
            config,
            phase: Phase::Uninitialized,
            projection: Projection::orthographic(Viewport::new(WIDTH as f32, HEIGHT as f32)),
            renderers: None,
            runtime: None,
            shaders,
            fonts: FontSystem::new(),
            overlay_font: None,
            draw_list: DrawList::new(),
            world: None,
            clock: FrameClock::new(),
            delta_time: 0.0,
            keys: HashSet::new(),
            mouse_pos: Vec2::zero(),
            mouse_pressed_last_frame: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Seconds covered by the last `update`.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn last_frame(&self) -> Instant {
        self.clock.last_frame()
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn walls_hit(&self) -> u32 {
        self.world.as_ref().map_or(0, World::walls_hit)
    }

    pub fn corners_hit(&self) -> u32 {
        self.world.as_ref().map_or(0, World::corners_hit)
    }

    pub fn confetti_on_screen(&self) -> bool {
        self.world.as_ref().is_some_and(World::confetti_on_screen)
    }

    /// Keys held as of the last `process_input`.
    pub fn keys(&self) -> &HashSet<Key> {
        &self.keys
    }

    pub fn mouse_pos(&self) -> Vec2 {
        self.mouse_pos
    }

    // ── initialization ─────────────────────────────────────────────────────

    /// Opens the fixed-size window and its GPU context.
    pub fn init_window(&mut self, debug: bool) -> Result<(), EngineError> {
        self.expect_phase("init_window", Phase::Uninitialized)?;

        let config = RuntimeConfig {
            title: self.config.window.title.clone(),
            size: (WIDTH as f64, HEIGHT as f64).into(),
            resizable: false,
        };
        let runtime = Runtime::open(config, GpuInit::with_debug(debug)).map_err(EngineError::Window)?;

        self.runtime = Some(runtime);
        self.phase = Phase::WindowReady;
        log::info!("window ready ({WIDTH}x{HEIGHT}, debug={debug})");
        Ok(())
    }

    /// Loads the shape and text programs and the overlay font.
    pub fn init_shaders(&mut self) -> Result<(), EngineError> {
        self.expect_phase("init_shaders", Phase::WindowReady)?;

        let shape = self.shaders.load(ShaderLibrary::SHAPE)?;
        let text = self.shaders.load(ShaderLibrary::TEXT)?;

        self.overlay_font = self.load_overlay_font()?;
        self.renderers = Some(Renderers {
            rect: RectRenderer::new(shape),
            text: TextRenderer::new(text),
        });

        self.phase = Phase::ShadersReady;
        log::info!("shaders ready");
        Ok(())
    }

    /// Builds the logo from the configuration and starts the frame clock.
    pub fn init_shapes(&mut self) -> Result<(), EngineError> {
        self.expect_phase("init_shapes", Phase::ShadersReady)?;

        let logo_cfg = &self.config.logo;
        let logo = Shape::new(
            Vec2::new(logo_cfg.position[0], logo_cfg.position[1]),
            Vec2::new(logo_cfg.size[0], logo_cfg.size[1]),
            Vec2::new(logo_cfg.velocity[0], logo_cfg.velocity[1]),
            logo_cfg.color(),
        );

        self.world = Some(World::new(
            Bounds::new(WIDTH as f32, HEIGHT as f32),
            logo,
            ConfettiPolicy::from(&self.config.confetti),
            self.config.seed,
        ));
        self.clock.reset();
        self.delta_time = 0.0;
        self.phase = Phase::ShapesReady;
        log::info!("shapes ready");
        Ok(())
    }

    fn load_overlay_font(&mut self) -> Result<Option<FontId>, EngineError> {
        if let Some(path) = &self.config.overlay.font_path {
            let id = self.fonts.load_font_file(path)?;
            log::info!("overlay font loaded from {}", path.display());
            return Ok(Some(id));
        }

        match self.fonts.load_system_fallback() {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                log::warn!("{e}; hit counters will not be drawn");
                Ok(None)
            }
        }
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<(), EngineError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                expected,
                actual: self.phase,
            })
        }
    }

    /// Per-frame operations only run once the shapes exist.
    fn in_frame_phase(&self, operation: &str) -> bool {
        match self.phase {
            Phase::ShapesReady | Phase::Running => true,
            Phase::Closing => false,
            other => {
                log::warn!("`{operation}` ignored in phase {other:?}");
                false
            }
        }
    }

    // ── per frame ──────────────────────────────────────────────────────────

    /// Polls window-system events without blocking and refreshes key and mouse state.
    pub fn process_input(&mut self) {
        if !self.in_frame_phase("process_input") {
            return;
        }
        let Some(runtime) = self.runtime.as_mut() else { return };

        runtime.pump_events();
        let input = runtime.input();
        let snapshot = InputSnapshot {
            keys: input.keys_down.clone(),
            pointer: input.pointer_pos,
            // A press and release within one pump still counts as a click.
            left_down: input.button_down(MouseButton::Left)
                || runtime.input_frame().button_pressed(MouseButton::Left),
        };
        let window_closed = runtime.should_close();

        self.apply_input(snapshot);
        if window_closed {
            self.request_close();
        }
    }

    fn apply_input(&mut self, snapshot: InputSnapshot) {
        if let Some(pos) = snapshot.pointer {
            self.mouse_pos = pos;
        }

        let clicked = snapshot.left_down && !self.mouse_pressed_last_frame;
        self.mouse_pressed_last_frame = snapshot.left_down;
        if clicked {
            let at = self.mouse_pos;
            if let Some(world) = self.world.as_mut() {
                world.spawn_burst(at);
                log::debug!("confetti burst at ({:.0}, {:.0})", at.x, at.y);
            }
        }

        let escape = snapshot.keys.contains(&Key::Escape);
        self.keys = snapshot.keys;
        if escape {
            log::info!("escape pressed");
            self.request_close();
        }
    }

    /// Advances the simulation by the time elapsed since the previous frame.
    pub fn update(&mut self) {
        if !self.in_frame_phase("update") {
            return;
        }
        let ft = self.clock.tick();
        self.step(ft.dt);
    }

    fn step(&mut self, dt: f32) {
        self.delta_time = dt;
        if let Some(world) = self.world.as_mut() {
            world.step(dt);
        }
        if self.phase == Phase::ShapesReady {
            self.phase = Phase::Running;
            log::info!("running");
        }
    }

    /// Keeps the logo inside the window, counting wall and corner hits.
    ///
    /// `update` already runs this after moving the logo. A logo resting on an
    /// edge is not past it, so calling it again without movement returns
    /// `Hit::None` and leaves the counters and confetti alone.
    pub fn check_bounds(&mut self) -> Hit {
        if !self.in_frame_phase("check_bounds") {
            return Hit::None;
        }
        match self.world.as_mut() {
            Some(world) => world.check_bounds(),
            None => Hit::None,
        }
    }

    /// Reflects a confetti piece off the window edges; no counters.
    pub fn check_confetti_bounds(&self, piece: &mut Shape) {
        sim::check_confetti_bounds(piece, Bounds::new(WIDTH as f32, HEIGHT as f32));
    }

    pub fn spawn_confetti(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.spawn_confetti();
        }
    }

    /// Draws the logo, confetti and hit counters, then presents.
    pub fn render(&mut self) {
        if !self.in_frame_phase("render") {
            return;
        }
        let Some(world) = self.world.as_ref() else { return };

        let size = self.config.overlay.font_size;
        let overlay = self.overlay_font.map(|font| Overlay {
            font,
            size,
            line_height: self.fonts.measure_text("Hg", font, size).y,
        });
        record_frame(&mut self.draw_list, world, overlay);

        let Engine {
            runtime,
            renderers,
            draw_list,
            fonts,
            projection,
            ..
        } = self;
        let (Some(runtime), Some(renderers)) = (runtime.as_mut(), renderers.as_mut()) else {
            return;
        };

        let status = runtime.render(CLEAR_COLOR, *projection, |rctx, target| {
            renderers.rect.render(rctx, target, draw_list);
            renderers.text.render(rctx, target, draw_list, fonts);
        });
        if status == FrameStatus::Skipped {
            log::trace!("frame skipped");
        }

        if runtime.should_close() {
            self.request_close();
        }
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    /// True once the window system or the Escape key asked to close.
    pub fn should_close(&self) -> bool {
        self.phase == Phase::Closing || self.runtime.as_ref().is_some_and(Runtime::should_close)
    }

    pub fn request_close(&mut self) {
        if self.phase != Phase::Closing {
            log::info!(
                "closing after {} wall hit(s) and {} corner hit(s)",
                self.walls_hit(),
                self.corners_hit()
            );
        }
        self.phase = Phase::Closing;
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.request_close();
        }
    }
}

/// Text settings for the hit counters.
#[derive(Debug, Copy, Clone)]
struct Overlay {
    font: FontId,
    size: f32,
    line_height: f32,
}

/// Rebuilds `list` with the logo, the confetti and, given a font, the counters.
fn record_frame(list: &mut DrawList, world: &World, overlay: Option<Overlay>) {
    list.clear();

    let logo = world.logo();
    list.push_rect(Z_LOGO, logo.rect(), logo.color);

    let policy = world.policy();
    for piece in world.confetti().pieces() {
        list.push_rect(Z_CONFETTI, piece.shape.rect(), piece.display_color(policy));
    }

    if let Some(o) = overlay {
        let lines = [
            format!("Walls hit: {}", world.walls_hit()),
            format!("Corners hit: {}", world.corners_hit()),
        ];
        for (i, text) in lines.into_iter().enumerate() {
            let y = OVERLAY_MARGIN + i as f32 * o.line_height;
            list.push_text(Z_OVERLAY, text, o.font, o.size, Color::WHITE, Vec2::new(OVERLAY_MARGIN, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvd_framework::scene::DrawCmd;

    fn config_with_logo(position: [f32; 2], size: [f32; 2], velocity: [f32; 2]) -> DemoConfig {
        let mut cfg = DemoConfig::default();
        cfg.logo.position = position;
        cfg.logo.size = size;
        cfg.logo.velocity = velocity;
        cfg.seed = Some(3);
        cfg
    }

    /// An engine past the GPU steps, as if `init_window` and `init_shaders` had run.
    fn shaped(cfg: DemoConfig) -> Engine {
        let mut engine = Engine::new(cfg);
        engine.phase = Phase::ShadersReady;
        engine.init_shapes().unwrap();
        engine
    }

    fn snapshot(keys: &[Key], pointer: Option<Vec2>, left_down: bool) -> InputSnapshot {
        InputSnapshot {
            keys: keys.iter().copied().collect(),
            pointer,
            left_down,
        }
    }

    #[test]
    fn repeated_bounds_checks_count_one_hit() {
        let mut engine = shaped(config_with_logo([798.0, 598.0], [0.0, 0.0], [50.0, 50.0]));
        engine.step(0.1);
        assert_eq!(engine.corners_hit(), 1);
        let pieces = engine.world().map(|w| w.confetti().len());

        for _ in 0..3 {
            assert_eq!(engine.check_bounds(), Hit::None);
        }
        assert_eq!(engine.corners_hit(), 1);
        assert_eq!(engine.walls_hit(), 0);
        assert_eq!(engine.world().map(|w| w.confetti().len()), pieces);
    }

    #[test]
    fn bounds_check_before_shapes_is_ignored() {
        let mut engine = Engine::new(DemoConfig::default());
        assert_eq!(engine.check_bounds(), Hit::None);
        assert_eq!(engine.walls_hit() + engine.corners_hit(), 0);
    }

    #[test]
    fn fresh_engine_is_uninitialized_and_open() {
        let engine = Engine::new(DemoConfig::default());
        assert_eq!(engine.phase(), Phase::Uninitialized);
        assert!(!engine.should_close());
        assert_eq!(engine.walls_hit(), 0);
        assert!(!engine.confetti_on_screen());
    }

    #[test]
    fn init_out_of_order_is_rejected() {
        let mut engine = Engine::new(DemoConfig::default());

        let err = engine.init_shaders().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState { operation: "init_shaders", expected: Phase::WindowReady, .. }
        ));
        assert!(matches!(engine.init_shapes(), Err(EngineError::InvalidState { .. })));
        assert_eq!(engine.phase(), Phase::Uninitialized);
    }

    #[test]
    fn init_shapes_runs_once() {
        let mut engine = shaped(DemoConfig::default());
        assert_eq!(engine.phase(), Phase::ShapesReady);
        assert!(!engine.should_close());
        assert!(matches!(engine.init_shapes(), Err(EngineError::InvalidState { .. })));
    }

    #[test]
    fn logo_comes_from_config() {
        let engine = shaped(config_with_logo([100.0, 200.0], [40.0, 20.0], [5.0, -5.0]));
        let logo = engine.world().unwrap().logo();
        assert_eq!(logo.pos, Vec2::new(100.0, 200.0));
        assert_eq!(logo.size, Vec2::new(40.0, 20.0));
        assert_eq!(logo.vel, Vec2::new(5.0, -5.0));
    }

    #[test]
    fn per_frame_ops_before_shapes_are_no_ops() {
        let mut engine = Engine::new(DemoConfig::default());
        engine.update();
        engine.process_input();
        engine.render();
        assert_eq!(engine.phase(), Phase::Uninitialized);
        assert_eq!(engine.delta_time(), 0.0);
    }

    #[test]
    fn first_step_starts_running() {
        let mut engine = shaped(DemoConfig::default());
        engine.step(0.016);
        assert_eq!(engine.phase(), Phase::Running);
        assert_eq!(engine.delta_time(), 0.016);
    }

    #[test]
    fn wall_scenario() {
        let mut engine = shaped(config_with_logo([798.0, 300.0], [0.0, 0.0], [50.0, 0.0]));
        engine.step(0.1);

        let logo = engine.world().unwrap().logo();
        assert_eq!(logo.vel, Vec2::new(-50.0, 0.0));
        assert_eq!(logo.pos.x, 800.0);
        assert_eq!(engine.walls_hit(), 1);
        assert_eq!(engine.corners_hit(), 0);
    }

    #[test]
    fn corner_scenario() {
        let mut engine = shaped(config_with_logo([798.0, 598.0], [0.0, 0.0], [50.0, 50.0]));
        engine.step(0.1);

        let world = engine.world().unwrap();
        assert_eq!(world.logo().vel, Vec2::new(-50.0, -50.0));
        assert_eq!(engine.corners_hit(), 1);
        assert_eq!(world.confetti().len(), 1);
        assert!(engine.confetti_on_screen());
    }

    #[test]
    fn logo_outside_window_is_pulled_in_at_init() {
        let engine = shaped(config_with_logo([-40.0, 900.0], [20.0, 20.0], [0.0, 0.0]));
        let logo = engine.world().unwrap().logo();
        assert_eq!(logo.pos, Vec2::new(10.0, 590.0));
    }

    #[test]
    fn spawn_confetti_keeps_logo_velocity() {
        let mut engine = shaped(DemoConfig::default());
        let vel = engine.world().unwrap().logo().vel;
        engine.spawn_confetti();
        engine.spawn_confetti();
        assert_eq!(engine.world().unwrap().logo().vel, vel);
        assert_eq!(engine.world().unwrap().confetti().len(), 2);
    }

    #[test]
    fn check_confetti_bounds_reflects_without_counting() {
        let engine = shaped(DemoConfig::default());
        let mut piece = Shape::new(Vec2::new(-5.0, 300.0), Vec2::zero(), Vec2::new(-10.0, 0.0), Color::WHITE);
        engine.check_confetti_bounds(&mut piece);
        assert_eq!(piece.pos.x, 0.0);
        assert_eq!(piece.vel.x, 10.0);
        assert_eq!(engine.walls_hit(), 0);
    }

    #[test]
    fn escape_requests_close() {
        let mut engine = shaped(DemoConfig::default());
        engine.apply_input(snapshot(&[Key::Escape], None, false));
        assert!(engine.should_close());
        assert_eq!(engine.phase(), Phase::Closing);

        // Nothing runs once closing.
        engine.update();
        assert_eq!(engine.delta_time(), 0.0);
    }

    #[test]
    fn other_keys_are_tracked_but_do_not_close() {
        let mut engine = shaped(DemoConfig::default());
        engine.apply_input(snapshot(&[Key::Space, Key::A], None, false));
        assert!(engine.keys().contains(&Key::Space));
        assert!(!engine.should_close());
    }

    #[test]
    fn click_spawns_one_burst_per_press() {
        let mut engine = shaped(DemoConfig::default());
        let per_click = engine.world().unwrap().policy().per_click;
        let at = Some(Vec2::new(200.0, 150.0));

        engine.apply_input(snapshot(&[], at, true));
        engine.apply_input(snapshot(&[], at, true));
        assert_eq!(engine.world().unwrap().confetti().len(), per_click);
        assert_eq!(engine.mouse_pos(), Vec2::new(200.0, 150.0));

        engine.apply_input(snapshot(&[], at, false));
        engine.apply_input(snapshot(&[], at, true));
        assert_eq!(engine.world().unwrap().confetti().len(), 2 * per_click);
    }

    #[test]
    fn frame_records_logo_confetti_and_counters() {
        let mut engine = shaped(DemoConfig::default());
        engine.spawn_confetti();
        let world = engine.world().unwrap();

        let mut list = DrawList::new();
        let overlay = Overlay {
            font: FontId::default(),
            size: 20.0,
            line_height: 24.0,
        };
        record_frame(&mut list, world, Some(overlay));

        let rects = list.items().iter().filter(|i| matches!(i.cmd, DrawCmd::Rect(_))).count();
        let texts: Vec<String> = list
            .items()
            .iter()
            .filter_map(|i| match &i.cmd {
                DrawCmd::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(rects, 2);
        assert_eq!(texts, vec!["Walls hit: 0".to_string(), "Corners hit: 0".to_string()]);

        let origins: Vec<f32> = list
            .items()
            .iter()
            .filter_map(|i| match &i.cmd {
                DrawCmd::Text(t) => Some(t.origin.y),
                _ => None,
            })
            .collect();
        assert_eq!(origins, vec![OVERLAY_MARGIN, OVERLAY_MARGIN + 24.0]);
    }

    #[test]
    fn frame_without_font_has_no_text() {
        let engine = shaped(DemoConfig::default());
        let mut list = DrawList::new();
        record_frame(&mut list, engine.world().unwrap(), None);
        assert_eq!(list.len(), 1);
    }
}
