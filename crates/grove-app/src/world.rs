//! The shared frame context: everything the frame tasks read and write.

use glam::Vec3;
use grove_config::{Config, CostModel};
use grove_frame::{FrameContext, ScratchPool};
use grove_lod::{EntityId, EntityRegistry, LodClassifier, LodDistances, LodPreset, LodTier};
use grove_memo::{CellKey, DirtyFlag, SpatialBoolCache, Throttle};
use grove_quality::{QualityAdjustment, QualityConfig, QualityController};
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::AppError;

/// Noise value above which ground is rock or water.
const ROUGH_GROUND: f64 = 0.35;
/// Noise frequency in cycles per metre.
const TERRAIN_FREQUENCY: f64 = 0.04;

/// Walkability of the ground, sampled from Perlin noise inside a disc.
pub struct Terrain {
    noise: Perlin,
    radius: f32,
}

impl Terrain {
    pub fn new(seed: u32, radius: f32) -> Self {
        Self {
            noise: Perlin::new(seed),
            radius,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Whether an agent may stand at `(x, z)`.
    pub fn is_walkable(&self, x: f32, z: f32) -> bool {
        if x * x + z * z > self.radius * self.radius {
            return false;
        }
        let sample = self.noise.get([
            f64::from(x) * TERRAIN_FREQUENCY,
            f64::from(z) * TERRAIN_FREQUENCY,
        ]);
        sample < ROUGH_GROUND
    }

    /// Walkability of a cache cell, sampled at its centre.
    pub fn is_cell_walkable(&self, cell: CellKey, cell_size: f32) -> bool {
        self.is_walkable(
            (cell.x as f32 + 0.5) * cell_size,
            (cell.z as f32 + 0.5) * cell_size,
        )
    }
}

/// One member of the herd.
#[derive(Clone, Copy, Debug)]
pub struct Walker {
    pub id: EntityId,
    pub position: Vec3,
    /// Heading in radians around +Y.
    pub heading: f32,
    /// Metres per second.
    pub speed: f32,
}

impl Walker {
    pub fn direction(&self) -> Vec3 {
        Vec3::new(self.heading.cos(), 0.0, self.heading.sin())
    }
}

/// Per-frame count of entities per tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierTally([u32; 4]);

impl TierTally {
    pub fn add(&mut self, tier: LodTier) {
        self.0[tier.index()] += 1;
    }

    pub fn get(&self, tier: LodTier) -> u32 {
        self.0[tier.index()]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn clear(&mut self) {
        self.0 = [0; 4];
    }
}

/// Shared state handed to every frame task.
pub struct World {
    pub lod: LodClassifier,
    pub quality: QualityController,
    pub terrain: Terrain,
    /// Raised when `terrain` changes; the wander task clears `walkable`.
    pub terrain_dirty: DirtyFlag,
    pub walkable: SpatialBoolCache,
    pub throttle: Throttle,
    /// Frame-scoped index lists, rewound every tick.
    pub scratch: ScratchPool<Vec<usize>>,
    pub registry: EntityRegistry,
    pub herd: Vec<Walker>,
    /// Output of this frame's batch classification.
    pub tiers: Vec<(EntityId, LodTier)>,
    pub tally: TierTally,
    pub cost: CostModel,
    /// Synthetic cost of the current frame, filled in by the cost task.
    pub frame_cost_ms: f32,
    /// Most recent threshold rewrite, kept until the stats task reports it.
    pub last_adjustment: Option<QualityAdjustment>,
    pub rng: ChaCha8Rng,
}

impl World {
    /// Build the world described by `config` and scatter the herd on
    /// walkable ground.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let preset = LodPreset::from_name(&config.lod.preset)
            .ok_or_else(|| AppError::UnknownPreset(config.lod.preset.clone()))?;
        let mut lod = LodClassifier::with_preset(preset);
        lod.set_frustum_culling(config.lod.frustum_culling);

        let mut quality = QualityController::new(quality_config(config))?;
        quality.set_enabled(config.quality.enabled);

        let sim = &config.simulation;
        // Truncating the seed is fine; Perlin only takes 32 bits.
        let terrain = Terrain::new(sim.seed as u32, sim.world_radius);
        let mut walkable = SpatialBoolCache::new(sim.walkable_cell_size);
        let mut rng = ChaCha8Rng::seed_from_u64(sim.seed);
        let mut registry = EntityRegistry::new();

        let mut herd = Vec::with_capacity(sim.entity_count as usize);
        for _ in 0..sim.entity_count {
            let Some(position) = find_walkable_spot(&terrain, &mut walkable, &mut rng) else {
                log::warn!(
                    "no walkable ground found after {} herd members, stopping",
                    herd.len()
                );
                break;
            };
            herd.push(Walker {
                id: registry.spawn(),
                position,
                heading: rng.random::<f32>() * std::f32::consts::TAU,
                speed: 0.5 + rng.random::<f32>() * 1.5,
            });
        }
        log::info!(
            "Spawned {} walkers in a {:.0}m world ({} cached cells)",
            herd.len(),
            terrain.radius(),
            walkable.len()
        );

        Ok(Self {
            lod,
            quality,
            terrain,
            terrain_dirty: DirtyFlag::default(),
            walkable,
            throttle: Throttle::new(),
            scratch: ScratchPool::with_capacity(2),
            registry,
            tiers: Vec::with_capacity(herd.len()),
            herd,
            tally: TierTally::default(),
            cost: sim.cost.clone(),
            frame_cost_ms: 0.0,
            last_adjustment: None,
            rng,
        })
    }

    /// Replace the ground. Cached walkability is dropped before the next
    /// herd move.
    pub fn set_terrain(&mut self, terrain: Terrain) {
        self.terrain = terrain;
        self.terrain_dirty.mark();
    }

    /// Remove a walker from the herd, releasing its handle and cache entry.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(at) = self.herd.iter().position(|w| w.id == id) else {
            return false;
        };
        self.herd.swap_remove(at);
        self.lod.invalidate(id);
        self.registry.despawn(id)
    }
}

impl FrameContext for World {
    fn reset_scratch(&mut self) {
        self.scratch.reset();
        self.tiers.clear();
        self.tally.clear();
    }
}

/// Translate the persisted quality settings into controller tuning.
pub fn quality_config(config: &Config) -> QualityConfig {
    let q = &config.quality;
    let [high, medium, low, cull] = q.floors;
    QualityConfig {
        target_fps: q.target_fps,
        min_fps: q.min_fps,
        surplus_ratio: q.surplus_ratio,
        shrink_factor: q.shrink_factor,
        growth_factor: q.growth_factor,
        floors: LodDistances::new(high, medium, low, cull),
        window: q.window,
    }
}

fn find_walkable_spot(
    terrain: &Terrain,
    walkable: &mut SpatialBoolCache,
    rng: &mut ChaCha8Rng,
) -> Option<Vec3> {
    let cell_size = walkable.cell_size();
    for _ in 0..64 {
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let r = terrain.radius() * rng.random::<f32>().sqrt();
        let (x, z) = (r * angle.cos(), r * angle.sin());
        if walkable.get_or_compute(x, z, |cell| terrain.is_cell_walkable(cell, cell_size)) {
            return Some(Vec3::new(x, 0.0, z));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.simulation.entity_count = 50;
        config.simulation.world_radius = 60.0;
        config
    }

    #[test]
    fn test_terrain_outside_radius_is_blocked() {
        let terrain = Terrain::new(1, 10.0);
        assert!(!terrain.is_walkable(11.0, 0.0));
        assert!(!terrain.is_walkable(-8.0, 8.0));
    }

    #[test]
    fn test_herd_spawns_on_walkable_ground() {
        let world = World::from_config(&small_config()).unwrap();
        assert_eq!(world.herd.len(), 50);
        assert_eq!(world.registry.len(), 50);
        let cell_size = world.walkable.cell_size();
        for walker in &world.herd {
            let cell = world.walkable.cell_of(walker.position.x, walker.position.z);
            assert!(world.terrain.is_cell_walkable(cell, cell_size));
        }
    }

    #[test]
    fn test_same_seed_same_herd() {
        let a = World::from_config(&small_config()).unwrap();
        let b = World::from_config(&small_config()).unwrap();
        let positions = |w: &World| w.herd.iter().map(|h| h.position).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let mut config = small_config();
        config.lod.preset = "ultra".to_string();
        assert!(matches!(
            World::from_config(&config),
            Err(AppError::UnknownPreset(name)) if name == "ultra"
        ));
    }

    #[test]
    fn test_invalid_quality_settings_rejected() {
        let mut config = small_config();
        config.quality.shrink_factor = 1.5;
        assert!(matches!(
            World::from_config(&config),
            Err(AppError::Quality(_))
        ));
    }

    #[test]
    fn test_despawn_releases_handle() {
        let mut world = World::from_config(&small_config()).unwrap();
        let id = world.herd[3].id;
        assert!(world.despawn(id));
        assert!(!world.registry.is_alive(id));
        assert_eq!(world.herd.len(), 49);
        assert!(!world.despawn(id));
    }

    #[test]
    fn test_reset_scratch_clears_frame_state() {
        let mut world = World::from_config(&small_config()).unwrap();
        world.tally.add(LodTier::High);
        world.scratch.next().push(1);
        world.reset_scratch();
        assert_eq!(world.tally.total(), 0);
        assert_eq!(world.scratch.in_use(), 0);
    }
}
