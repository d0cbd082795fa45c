//! Headless host for the grove frame pipeline.
//!
//! Builds a [`World`] from [`Config`], registers the pipeline's frame tasks
//! with a [`FrameScheduler`], and drives exactly one scheduler tick per frame
//! from a [`GameLoop`]. A synthetic per-tier cost model stands in for
//! rendering so the adaptive quality loop can be watched without a GPU.

pub mod game_loop;
pub mod tasks;
pub mod world;

use std::time::Duration;

use grove_config::Config;
use grove_frame::{FrameScheduler, Phase, ScheduleError};
use grove_lod::{LodDistances, LodPreset};
use grove_quality::QualityError;
use tracing::{error, info};

pub use game_loop::GameLoop;
pub use world::World;

use tasks::{CameraRig, CostTask, LodTask, QualityTask, StatsTask, TerrainTask, WanderTask};

/// Errors that stop the host from starting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unknown LOD preset `{0}` (expected normal or close-up)")]
    UnknownPreset(String),

    #[error("invalid quality settings: {0}")]
    Quality(#[from] QualityError),

    #[error("task registration failed: {0}")]
    Schedule(#[from] ScheduleError),
}

/// What a finished run looked like.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: f64,
    pub average_fps: Option<f32>,
    pub adjustments: u64,
    pub task_failures: u64,
    pub distances: LodDistances,
}

/// Register the pipeline's tasks in phase order.
pub fn build_scheduler(config: &Config) -> Result<FrameScheduler<World>, AppError> {
    let sim = &config.simulation;
    let close_up = LodPreset::from_name(&config.lod.preset) == Some(LodPreset::CloseUp);

    let mut scheduler = FrameScheduler::new();
    scheduler.register(
        "camera",
        CameraRig::new(
            sim.camera_orbit_radius,
            sim.camera_orbit_speed,
            sim.close_up_toggle_s,
            config.lod.frustum_culling,
            close_up,
        ),
        Phase::PreFrame,
    )?;
    scheduler.register(
        "terrain",
        // Perlin only takes 32 bits of seed.
        TerrainTask::new(sim.terrain_shift_s, sim.seed as u32),
        Phase::PreFrame.offset(10),
    )?;
    scheduler.register("herd.wander", WanderTask::new(sim.decision_hz), Phase::Simulation)?;
    scheduler.register("lod.classify", LodTask, Phase::Presentation)?;
    scheduler.register("frame.cost", CostTask, Phase::PostFrame)?;
    scheduler.register("quality.feedback", QualityTask, Phase::PostFrame.offset(10))?;
    scheduler.register(
        "stats",
        StatsTask::new(sim.stats_interval_s),
        Phase::PostFrame.offset(20),
    )?;

    scheduler.set_failure_hook(|failure| {
        error!(
            "task `{}` failed on frame {} ({} so far): {}",
            failure.id, failure.frame, failure.count, failure.error
        );
    });
    Ok(scheduler)
}

/// The running host: scheduler, shared world and frame clock.
pub struct App {
    scheduler: FrameScheduler<World>,
    world: World,
    game_loop: GameLoop,
    realtime: bool,
    frame_limit: u64,
}

impl App {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let world = World::from_config(config)?;
        let scheduler = build_scheduler(config)?;
        info!(
            "Pipeline ready: {} tasks, {} walkers, preset {}, adaptive quality {}",
            scheduler.len(),
            world.herd.len(),
            config.lod.preset,
            if config.quality.enabled { "on" } else { "off" }
        );
        Ok(Self {
            scheduler,
            world,
            game_loop: GameLoop::new(),
            realtime: config.simulation.realtime,
            frame_limit: config.simulation.frames,
        })
    }

    /// Run a single frame.
    ///
    /// In simulated mode the clock advances by the previous frame's synthetic
    /// cost; in realtime mode the frame sleeps for that cost and the clock
    /// measures wall time.
    pub fn step(&mut self) {
        let Self {
            scheduler,
            world,
            game_loop,
            realtime,
            ..
        } = self;

        if *realtime {
            game_loop.tick(|elapsed, delta| scheduler.tick(world, elapsed, delta));
            let cost_ms = world.frame_cost_ms;
            if cost_ms.is_finite() && cost_ms > 0.0 {
                std::thread::sleep(Duration::from_secs_f32(cost_ms / 1000.0));
            }
        } else {
            let frame_time = f64::from(world.frame_cost_ms) / 1000.0;
            game_loop.advance(frame_time, |elapsed, delta| {
                scheduler.tick(world, elapsed, delta)
            });
        }
    }

    /// Run until the configured frame count is reached, or forever when it
    /// is zero.
    pub fn run(&mut self) -> RunSummary {
        while self.frame_limit == 0 || self.game_loop.frame_count() < self.frame_limit {
            self.step();
        }
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames: self.game_loop.frame_count(),
            elapsed: self.game_loop.elapsed(),
            average_fps: self.world.quality.average_fps(),
            adjustments: self.world.quality.adjustments(),
            task_failures: self.scheduler.total_failures(),
            distances: self.world.lod.distances(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scheduler(&self) -> &FrameScheduler<World> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<World> {
        &mut self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_frame::{FnTask, FrameTime, TaskError};
    use grove_quality::QualityAction;

    fn config(entities: u32, frames: u64) -> Config {
        let mut config = Config::default();
        config.simulation.entity_count = entities;
        config.simulation.frames = frames;
        config.simulation.world_radius = 80.0;
        config.simulation.close_up_toggle_s = 0.0;
        config
    }

    #[test]
    fn test_pipeline_order() {
        let mut app = App::new(&config(10, 1)).unwrap();
        let order: Vec<&str> = app.scheduler_mut().ordered_ids().collect();
        assert_eq!(
            order,
            [
                "camera",
                "terrain",
                "herd.wander",
                "lod.classify",
                "frame.cost",
                "quality.feedback",
                "stats"
            ]
        );
    }

    #[test]
    fn test_run_stops_at_frame_limit() {
        let mut app = App::new(&config(25, 90)).unwrap();
        let summary = app.run();
        assert_eq!(summary.frames, 90);
        assert_eq!(app.scheduler().frame_count(), 90);
        assert_eq!(summary.task_failures, 0);
        assert!(summary.elapsed > 0.0);
    }

    #[test]
    fn test_every_walker_classified_each_frame() {
        let mut app = App::new(&config(40, 0)).unwrap();
        for _ in 0..30 {
            app.step();
            let world = app.world();
            assert_eq!(world.tally.total() as usize, world.herd.len());
            assert_eq!(world.lod.cached_len(), world.herd.len());
        }
    }

    #[test]
    fn test_heavy_frames_shrink_distances() {
        let mut config = config(20, 130);
        // 40ms frames: 25 FPS, under the 30 FPS floor.
        config.simulation.cost.base_ms = 40.0;
        let mut app = App::new(&config).unwrap();
        let before = app.world().lod.distances();
        let summary = app.run();
        assert!(summary.adjustments >= 1);
        assert!(summary.distances.cull < before.cull);
        let last = app.world().quality.last_adjustment().unwrap();
        assert_eq!(last.action, QualityAction::Shrink);
    }

    #[test]
    fn test_light_frames_grow_distances() {
        let mut config = config(20, 130);
        // ~5ms frames: far above 60 * 1.2 FPS.
        config.simulation.cost.base_ms = 5.0;
        config.simulation.cost.high_ms = 0.0;
        config.simulation.cost.medium_ms = 0.0;
        config.simulation.cost.low_ms = 0.0;
        let mut app = App::new(&config).unwrap();
        let before = app.world().lod.distances();
        let summary = app.run();
        assert!(summary.distances.cull > before.cull);
    }

    #[test]
    fn test_adaptive_off_keeps_distances() {
        let mut config = config(20, 130);
        config.quality.enabled = false;
        config.simulation.cost.base_ms = 40.0;
        let mut app = App::new(&config).unwrap();
        let before = app.world().lod.distances();
        let summary = app.run();
        assert_eq!(summary.adjustments, 0);
        assert_eq!(summary.distances, before);
    }

    #[test]
    fn test_failing_task_does_not_stop_pipeline() {
        let mut app = App::new(&config(10, 20)).unwrap();
        app.scheduler_mut()
            .register(
                "faulty",
                FnTask(|_: &mut World, time: FrameTime| -> Result<(), TaskError> {
                    if time.frame % 2 == 0 {
                        panic!("boom");
                    }
                    Err(TaskError::failed("odd frame"))
                }),
                Phase::Simulation.offset(50),
            )
            .unwrap();
        let summary = app.run();
        assert_eq!(summary.frames, 20);
        assert_eq!(summary.task_failures, 20);
        assert_eq!(app.scheduler().failure_count("faulty"), Some(20));
        assert_eq!(app.world().tally.total() as usize, app.world().herd.len());
    }
}
