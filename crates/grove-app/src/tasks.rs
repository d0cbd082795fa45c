//! The host's frame tasks, one per pipeline stage.

use std::f32::consts::PI;

use glam::{Mat4, Vec3};
use grove_frame::{FrameTask, FrameTime, TaskError};
use grove_lod::{LodPreset, LodTier};
use grove_memo::Memo;
use rand::Rng;
use tracing::{info, warn};

use crate::world::{Terrain, World};

const FOV_Y: f32 = 60.0 * PI / 180.0;
const ASPECT: f32 = 16.0 / 9.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 500.0;
const CAMERA_HEIGHT: f32 = 8.0;
/// Orbit radius multiplier while the close-up preset is active.
const CLOSE_UP_ORBIT: f32 = 0.3;

/// Orbits the camera around the origin and publishes it to the classifier.
///
/// Every `toggle_interval` seconds the rig swaps between the normal and
/// close-up presets and pulls in accordingly. Switching presets resets the
/// thresholds, so whatever scale the quality controller had applied to the
/// old preset is carried over onto the new one.
pub struct CameraRig {
    orbit_radius: f32,
    orbit_speed: f32,
    toggle_interval: f64,
    next_toggle: f64,
    close_up: bool,
    frustum_culling: bool,
    /// View-projection keyed by the eye's bit pattern; a parked camera
    /// reuses it.
    view_projection: Memo<[u32; 3], Mat4>,
}

impl CameraRig {
    pub fn new(
        orbit_radius: f32,
        orbit_speed: f32,
        toggle_interval: f64,
        frustum_culling: bool,
        close_up: bool,
    ) -> Self {
        Self {
            orbit_radius,
            orbit_speed,
            toggle_interval,
            next_toggle: toggle_interval,
            close_up,
            frustum_culling,
            view_projection: Memo::new(),
        }
    }

    fn preset(&self) -> LodPreset {
        if self.close_up {
            LodPreset::CloseUp
        } else {
            LodPreset::Normal
        }
    }

    /// How many times the view-projection was rebuilt.
    pub fn view_projection_builds(&self) -> u64 {
        self.view_projection.recomputes()
    }

    /// Eye position at `elapsed` seconds.
    pub fn eye(&self, elapsed: f64) -> Vec3 {
        let angle = elapsed as f32 * self.orbit_speed;
        let radius = if self.close_up {
            self.orbit_radius * CLOSE_UP_ORBIT
        } else {
            self.orbit_radius
        };
        Vec3::new(radius * angle.cos(), CAMERA_HEIGHT, radius * angle.sin())
    }
}

/// View-projection for a camera at `eye` looking at `target`, [0, 1] depth.
pub fn view_projection(eye: Vec3, target: Vec3) -> Mat4 {
    let proj = Mat4::perspective_rh(FOV_Y, ASPECT, Z_NEAR, Z_FAR);
    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    proj * view
}

impl FrameTask<World> for CameraRig {
    fn on_tick(&mut self, world: &mut World, time: FrameTime) -> Result<(), TaskError> {
        if self.toggle_interval > 0.0 && time.elapsed >= self.next_toggle {
            self.next_toggle = time.elapsed + self.toggle_interval;
            let scale = world.lod.distances().cull / self.preset().config().distances.cull;
            self.close_up = !self.close_up;
            let preset = self.preset();
            world.lod.set_preset(preset);
            world.lod.set_frustum_culling(self.frustum_culling);
            if scale.is_finite() && (scale - 1.0).abs() > f32::EPSILON {
                let floors = world.quality.config().floors;
                let scaled = preset.config().distances.scaled(scale, &floors);
                if let Err(err) = world.lod.set_thresholds(scaled.into()) {
                    warn!("could not carry quality scale {scale:.2} over: {err}");
                }
            }
            info!("Camera switched to {} preset", preset.name());
        }

        let eye = self.eye(time.elapsed);
        let key = [eye.x.to_bits(), eye.y.to_bits(), eye.z.to_bits()];
        let vp = *self
            .view_projection
            .get_or_update(key, |_| view_projection(eye, Vec3::ZERO));
        world.lod.update_camera(eye, vp);
        Ok(())
    }
}

/// Reseeds the terrain every `interval` seconds, standing in for edits to
/// the ground. Zero disables it.
pub struct TerrainTask {
    interval: f64,
    next_shift: f64,
    seed: u32,
}

impl TerrainTask {
    pub fn new(interval: f64, seed: u32) -> Self {
        Self {
            interval,
            next_shift: interval,
            seed,
        }
    }
}

impl FrameTask<World> for TerrainTask {
    fn on_tick(&mut self, world: &mut World, time: FrameTime) -> Result<(), TaskError> {
        if self.interval <= 0.0 || time.elapsed < self.next_shift {
            return Ok(());
        }
        self.next_shift = time.elapsed + self.interval;
        self.seed = self.seed.wrapping_add(1);
        let radius = world.terrain.radius();
        world.set_terrain(Terrain::new(self.seed, radius));
        info!("Terrain reseeded ({})", self.seed);
        Ok(())
    }
}

/// Name under which herd decisions are throttled.
pub const DECISION_KEY: &str = "herd.decide";
/// Chance a walker picks a new heading on a decision tick.
const TURN_CHANCE: f32 = 0.2;

/// Moves the herd across walkable ground.
///
/// Steering decisions are throttled; movement and the walkability check run
/// every frame against the cached grid.
pub struct WanderTask {
    decision_interval: f64,
}

impl WanderTask {
    /// `decision_hz` of zero or less decides every frame.
    pub fn new(decision_hz: f64) -> Self {
        let decision_interval = if decision_hz > 0.0 {
            1.0 / decision_hz
        } else {
            0.0
        };
        Self { decision_interval }
    }
}

impl FrameTask<World> for WanderTask {
    fn on_tick(&mut self, world: &mut World, time: FrameTime) -> Result<(), TaskError> {
        if world.terrain_dirty.take() {
            log::debug!(
                "terrain changed, dropping {} walkability cells",
                world.walkable.len()
            );
            world.walkable.clear();
        }
        let decide = world
            .throttle
            .ready(DECISION_KEY, time.elapsed, self.decision_interval);
        let dt = time.delta as f32;
        let cell_size = world.walkable.cell_size();
        let terrain = &world.terrain;
        let blocked = world.scratch.next();

        for (i, walker) in world.herd.iter_mut().enumerate() {
            if decide && world.rng.random::<f32>() < TURN_CHANCE {
                walker.heading += world.rng.random_range(-0.8..0.8);
            }
            let next = walker.position + walker.direction() * walker.speed * dt;
            let open = world.walkable.get_or_compute(next.x, next.z, |cell| {
                terrain.is_cell_walkable(cell, cell_size)
            });
            if open {
                walker.position = next;
            } else {
                blocked.push(i);
            }
        }

        for &i in blocked.iter() {
            let walker = &mut world.herd[i];
            walker.heading += PI + world.rng.random_range(-0.5..0.5);
        }
        if !blocked.is_empty() {
            log::trace!("{} walkers turned back on frame {}", blocked.len(), time.frame);
        }
        Ok(())
    }
}

/// Classifies the whole herd and tallies the tiers.
pub struct LodTask;

impl FrameTask<World> for LodTask {
    fn on_tick(&mut self, world: &mut World, _time: FrameTime) -> Result<(), TaskError> {
        world.lod.batch_classify(
            world.herd.iter().map(|w| (w.id, w.position)),
            &mut world.tiers,
        );
        for &(_, tier) in &world.tiers {
            world.tally.add(tier);
        }
        Ok(())
    }
}

/// Prices the frame from the tier tally.
pub struct CostTask;

impl FrameTask<World> for CostTask {
    fn on_tick(&mut self, world: &mut World, _time: FrameTime) -> Result<(), TaskError> {
        let cost = &world.cost;
        let tally = &world.tally;
        world.frame_cost_ms = cost.base_ms
            + cost.high_ms * tally.get(LodTier::High) as f32
            + cost.medium_ms * tally.get(LodTier::Medium) as f32
            + cost.low_ms * tally.get(LodTier::Low) as f32;
        Ok(())
    }
}

/// Feeds the previous frame's duration to the quality controller.
pub struct QualityTask;

impl FrameTask<World> for QualityTask {
    fn on_tick(&mut self, world: &mut World, time: FrameTime) -> Result<(), TaskError> {
        // The first frame has no predecessor to measure.
        if time.delta <= 0.0 {
            return Ok(());
        }
        let millis = (time.delta * 1000.0) as f32;
        if let Some(adjustment) = world.quality.record_frame_duration(millis, &mut world.lod) {
            world.last_adjustment = Some(adjustment);
        }
        Ok(())
    }
}

/// Name under which the stats log is throttled.
pub const STATS_KEY: &str = "stats.log";

/// Periodic one-line summary of the pipeline.
pub struct StatsTask {
    interval: f64,
}

impl StatsTask {
    pub fn new(interval: f64) -> Self {
        Self { interval }
    }
}

impl FrameTask<World> for StatsTask {
    fn on_tick(&mut self, world: &mut World, time: FrameTime) -> Result<(), TaskError> {
        if !world.throttle.ready(STATS_KEY, time.elapsed, self.interval) {
            return Ok(());
        }

        let stats = world.lod.take_stats();
        let d = world.lod.distances();
        let tally = world.tally;
        info!(
            "frame {} | fps {} | high {} medium {} low {} culled {} | cost {:.2}ms | \
             cached {}/{} | walkable hits {} misses {} | cull {:.1}m",
            time.frame,
            world
                .quality
                .average_fps()
                .map_or_else(|| "-".to_string(), |fps| format!("{fps:.1}")),
            tally.get(LodTier::High),
            tally.get(LodTier::Medium),
            tally.get(LodTier::Low),
            tally.get(LodTier::Culled),
            world.frame_cost_ms,
            stats.cached,
            stats.queries,
            world.walkable.hits(),
            world.walkable.misses(),
            d.cull,
        );

        if let Some(adjustment) = world.last_adjustment.take() {
            info!(
                "quality {:?} at {:.1} fps: medium {:.1} -> {:.1}, cull {:.1} -> {:.1}",
                adjustment.action,
                adjustment.average_fps,
                adjustment.before.medium,
                adjustment.after.medium,
                adjustment.before.cull,
                adjustment.after.cull,
            );
        }
        Ok(())
    }
}
