//! Fixed-step frame scheduler.
//!
//! Called once per display refresh. Elapsed time is buffered in an
//! accumulator; once it reaches the fixed step, one logic update runs with the
//! whole accumulated time and the accumulator keeps only the remainder modulo
//! the step. Every call ends with exactly one render.

use std::time::Duration;

use crate::params::SchedulerConfig;
use crate::rendering::Renderer;
use crate::session::Session;

/// What one [`FrameScheduler::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    pub logic_update: bool,
    /// Value written to the reactive object during this tick
    pub reactive_position: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    fixed_step: Duration,
    accumulator: Duration,
    frames: u64,
    logic_updates: u64,
}

impl FrameScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            fixed_step: config.fixed_step(),
            accumulator: Duration::ZERO,
            frames: 0,
            logic_updates: 0,
        }
    }

    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    /// Buffered time not yet consumed by a logic update
    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Ticks so far (one render each)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn logic_updates(&self) -> u64 {
        self.logic_updates
    }

    /// Advance by `raw_elapsed` wall time and render one frame
    pub fn tick(
        &mut self,
        raw_elapsed: Duration,
        session: &mut Session,
        renderer: &mut dyn Renderer,
    ) -> FrameReport {
        self.accumulator += raw_elapsed;
        let mut report = FrameReport::default();

        if self.accumulator >= self.fixed_step {
            report.logic_update = true;
            report.reactive_position = session.logic_update(self.accumulator.as_secs_f32());
            self.accumulator = remainder(self.accumulator, self.fixed_step);
            self.logic_updates += 1;
        }

        if let Err(e) = renderer.render(&session.scene, &session.camera) {
            log::error!("Render error: {}", e);
        }
        self.frames += 1;

        report
    }
}

fn remainder(value: Duration, step: Duration) -> Duration {
    let step_ns = step.as_nanos();
    if step_ns == 0 {
        return Duration::ZERO;
    }
    // Below step_ns, which came from a Duration
    Duration::from_nanos((value.as_nanos() % step_ns) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::loader::{LoadError, LoadProgress, LoadedModel, ModelLoader};
    use crate::meter::MeterSampler;
    use crate::params::{AssetManifest, SessionConfig};
    use crate::rendering::{HeadlessRenderer, RenderError};
    use crate::scene::{NodeContent, SceneNode};
    use crate::session::{Collaborators, ReactiveState};
    use crate::camera::Camera;
    use crate::scene::SceneGraph;
    use std::path::Path;
    use std::sync::Arc;

    const STEP: Duration = Duration::from_millis(40);

    struct NoModels;

    impl ModelLoader for NoModels {
        fn load(
            &self,
            path: &Path,
            _progress: &mut dyn FnMut(LoadProgress),
        ) -> Result<LoadedModel, LoadError> {
            Err(LoadError::NoScene {
                path: path.to_path_buf(),
            })
        }
    }

    struct FixedMeter(f32);

    impl MeterSampler for FixedMeter {
        fn read(&self) -> f32 {
            self.0
        }
    }

    struct FailingRenderer {
        attempts: u32,
    }

    impl Renderer for FailingRenderer {
        fn render(&mut self, _scene: &SceneGraph, _camera: &Camera) -> Result<(), RenderError> {
            self.attempts += 1;
            Err(RenderError::NoAdapter)
        }

        fn set_surface_size(&mut self, _width: u32, _height: u32) {}
    }

    fn session(level_db: f32) -> Session {
        let config = SessionConfig {
            assets: AssetManifest { models: Vec::new() },
            ..SessionConfig::default()
        };
        Session::start(
            &config,
            Collaborators {
                loader: Arc::new(NoModels),
                meter: Box::new(FixedMeter(level_db)),
                audio: None,
                diagnostics: Box::new(RecordingSink::new()),
            },
        )
    }

    fn scheduler() -> FrameScheduler {
        FrameScheduler::new(&SchedulerConfig::default())
    }

    #[test]
    fn test_default_step_is_forty_milliseconds() {
        assert_eq!(scheduler().fixed_step(), STEP);
    }

    #[test]
    fn test_below_step_accumulates_without_update() {
        let mut scheduler = scheduler();
        let mut session = session(-30.0);
        let mut renderer = HeadlessRenderer::new(1, 1);

        let report = scheduler.tick(Duration::from_millis(16), &mut session, &mut renderer);
        assert!(!report.logic_update);
        assert_eq!(scheduler.accumulator(), Duration::from_millis(16));

        let report = scheduler.tick(Duration::ZERO, &mut session, &mut renderer);
        assert!(!report.logic_update);
        assert_eq!(scheduler.accumulator(), Duration::from_millis(16));
        assert_eq!(renderer.frames(), 2);
    }

    #[test]
    fn test_exact_step_fires_and_empties_accumulator() {
        let mut scheduler = scheduler();
        let mut session = session(-30.0);
        let mut renderer = HeadlessRenderer::new(1, 1);

        let report = scheduler.tick(STEP, &mut session, &mut renderer);
        assert!(report.logic_update);
        assert_eq!(scheduler.accumulator(), Duration::ZERO);
    }

    #[test]
    fn test_double_step_is_one_update_with_modulo_residual() {
        let mut scheduler = scheduler();
        let mut session = session(-30.0);
        let mut renderer = HeadlessRenderer::new(1, 1);

        let report = scheduler.tick(STEP * 2, &mut session, &mut renderer);
        assert!(report.logic_update);
        assert_eq!(scheduler.logic_updates(), 1);
        assert_eq!(scheduler.accumulator(), Duration::ZERO);

        scheduler.tick(Duration::from_millis(90), &mut session, &mut renderer);
        assert_eq!(scheduler.logic_updates(), 2);
        assert_eq!(scheduler.accumulator(), Duration::from_millis(10));
    }

    #[test]
    fn test_just_over_step_keeps_the_excess() {
        let mut scheduler = scheduler();
        let mut session = session(-30.0);
        let mut renderer = HeadlessRenderer::new(1, 1);
        let epsilon = Duration::from_nanos(1);

        let report = scheduler.tick(STEP + epsilon, &mut session, &mut renderer);
        assert!(report.logic_update);
        assert_eq!(scheduler.accumulator(), epsilon);

        // One nanosecond short of the next step stays below the threshold
        let report = scheduler.tick(STEP - epsilon * 2, &mut session, &mut renderer);
        assert!(!report.logic_update);
        assert_eq!(scheduler.accumulator(), STEP - epsilon);

        let report = scheduler.tick(epsilon, &mut session, &mut renderer);
        assert!(report.logic_update);
        assert_eq!(scheduler.accumulator(), Duration::ZERO);
        assert_eq!(scheduler.logic_updates(), 2);
    }

    #[test]
    fn test_accumulator_invariant_over_irregular_frames() {
        let mut scheduler = scheduler();
        let mut session = session(-30.0);
        let mut renderer = HeadlessRenderer::new(1, 1);
        let frames_ms = [0, 7, 16, 16, 33, 1, 0, 120, 39, 40, 41, 5, 80, 17];

        for ms in frames_ms {
            let before = scheduler.accumulator();
            let report = scheduler.tick(Duration::from_millis(ms), &mut session, &mut renderer);
            if report.logic_update {
                assert!(scheduler.accumulator() < STEP);
            } else {
                assert!(scheduler.accumulator() >= before);
            }
        }
        assert_eq!(renderer.frames(), frames_ms.len() as u64);
        assert_eq!(scheduler.frames(), frames_ms.len() as u64);
    }

    #[test]
    fn test_pending_reactive_object_is_not_written() {
        let mut scheduler = scheduler();
        let mut session = session(-12.0);
        let mut renderer = HeadlessRenderer::new(1, 1);

        let report = scheduler.tick(Duration::from_millis(50), &mut session, &mut renderer);
        assert!(report.logic_update);
        assert_eq!(report.reactive_position, None);
        assert_eq!(session.reactive(), ReactiveState::Pending);
    }

    #[test]
    fn test_render_errors_do_not_escape_tick() {
        let mut scheduler = scheduler();
        let mut session = session(-30.0);
        let root = session.scene.root();
        session
            .scene
            .add_node(root, SceneNode::new(NodeContent::Empty))
            .unwrap();
        let mut renderer = FailingRenderer { attempts: 0 };

        scheduler.tick(STEP, &mut session, &mut renderer);
        scheduler.tick(STEP, &mut session, &mut renderer);
        assert_eq!(renderer.attempts, 2);
        assert_eq!(scheduler.logic_updates(), 2);
    }
}
