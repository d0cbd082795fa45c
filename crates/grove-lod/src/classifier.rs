//! Per-entity tier classification with a hysteresis-guarded result cache.
//!
//! Most entities sit well inside their current tier most of the time, so the
//! common path is a slot lookup and one comparison against the tier's band.
//! Only when an entity overshoots its band by the hysteresis margin, in the
//! direction it is travelling, is the full threshold comparison re-run.

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use crate::config::{LodConfig, LodDistances, LodDistancesPatch, LodPreset};
use crate::error::LodError;
use crate::frustum::Frustum;
use crate::handle::EntityId;
use crate::tier::LodTier;

/// Camera state copied once per frame by the camera task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    pub view_projection: Mat4,
}

/// Counters for the classification hot path. Reset with
/// [`LodClassifier::take_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierStats {
    /// Total `classify` calls.
    pub queries: u64,
    /// Queries answered from the cached tier without re-evaluation.
    pub cached: u64,
    /// Queries that re-ran the threshold comparison.
    pub reevaluated: u64,
    /// Point-in-frustum tests performed.
    pub frustum_tests: u64,
    /// Entries dropped by `invalidate` / `invalidate_all`.
    pub invalidated: u64,
}

/// Handle indices below this live in the dense cache; the rest go to a map.
const DENSE_SLOTS: usize = 1 << 18;

#[derive(Clone, Copy, Debug)]
struct CachedTier {
    generation: u32,
    /// Tier from distance alone; frustum culling is applied on top.
    tier: LodTier,
    last_distance: f32,
    last_position: Vec3,
    in_frustum: bool,
    /// Camera revision `in_frustum` was computed against.
    frustum_revision: u64,
}

/// Assigns [`LodTier`]s to entities from camera distance and frustum membership.
///
/// Owned by the render session and handed to the tasks that need it; there
/// is no process-wide instance. Not thread-safe: all calls are expected from
/// the frame thread.
#[derive(Debug)]
pub struct LodClassifier {
    config: LodConfig,
    preset: Option<LodPreset>,
    camera: Option<CameraSnapshot>,
    frustum: Option<Frustum>,
    camera_revision: u64,
    cache: Vec<Option<CachedTier>>,
    /// Entries for indices at or past [`DENSE_SLOTS`], so a sparse handle
    /// never grows the dense vector.
    sparse: FxHashMap<u32, CachedTier>,
    cached_len: usize,
    stats: ClassifierStats,
    warned_missing_camera: bool,
}

impl LodClassifier {
    /// Create a classifier with a custom configuration.
    pub fn new(config: LodConfig) -> Result<Self, LodError> {
        config.validate()?;
        Ok(Self::from_parts(config, None))
    }

    /// Create a classifier using a named preset.
    pub fn with_preset(preset: LodPreset) -> Self {
        Self::from_parts(preset.config(), Some(preset))
    }

    fn from_parts(config: LodConfig, preset: Option<LodPreset>) -> Self {
        Self {
            config,
            preset,
            camera: None,
            frustum: None,
            camera_revision: 0,
            cache: Vec::new(),
            sparse: FxHashMap::default(),
            cached_len: 0,
            stats: ClassifierStats::default(),
            warned_missing_camera: false,
        }
    }

    /// Record this frame's camera. Must run before any `classify` call in the
    /// same frame.
    ///
    /// Frustum planes are only rebuilt, and cached frustum membership only
    /// invalidated, when the view-projection matrix actually changed.
    pub fn update_camera(&mut self, position: Vec3, view_projection: Mat4) {
        let matrix_changed = self
            .camera
            .is_none_or(|c| c.view_projection != view_projection);
        if matrix_changed {
            self.frustum = Some(Frustum::from_view_projection(&view_projection));
            self.camera_revision += 1;
        }
        self.camera = Some(CameraSnapshot {
            position,
            view_projection,
        });
    }

    /// The camera recorded by the last `update_camera`, if any.
    pub fn camera(&self) -> Option<&CameraSnapshot> {
        self.camera.as_ref()
    }

    /// Camera position, or the origin if no camera has been recorded yet.
    fn camera_position(&mut self) -> Vec3 {
        match &self.camera {
            Some(camera) => camera.position,
            None => {
                if !self.warned_missing_camera {
                    log::debug!("LOD classify before first camera update, using origin");
                    self.warned_missing_camera = true;
                }
                Vec3::ZERO
            }
        }
    }

    /// Return the current tier for `id` at `position`, updating the cache.
    pub fn classify(&mut self, id: EntityId, position: Vec3) -> LodTier {
        let camera_position = self.camera_position();
        self.classify_from(camera_position, id, position)
    }

    /// Classify many entities, writing `(id, tier)` pairs into `out`.
    ///
    /// `out` is cleared first and reused, so a caller that keeps the buffer
    /// across frames does not allocate once it has grown.
    pub fn batch_classify<I>(&mut self, entities: I, out: &mut Vec<(EntityId, LodTier)>)
    where
        I: IntoIterator<Item = (EntityId, Vec3)>,
    {
        out.clear();
        let camera_position = self.camera_position();
        for (id, position) in entities {
            let tier = self.classify_from(camera_position, id, position);
            out.push((id, tier));
        }
    }

    fn classify_from(&mut self, camera_position: Vec3, id: EntityId, position: Vec3) -> LodTier {
        self.stats.queries += 1;
        let distance = camera_position.distance(position);
        let cached = self
            .lookup(id.index())
            .filter(|entry| entry.generation == id.generation());

        let (tier, reevaluated) = match cached {
            Some(entry) if !self.needs_reevaluation(&entry, distance) => {
                self.stats.cached += 1;
                (entry.tier, false)
            }
            _ => {
                self.stats.reevaluated += 1;
                (self.distance_tier(distance), true)
            }
        };

        let in_frustum = if !self.config.frustum_culling || tier.is_culled() {
            // Not consulted; keep whatever was known.
            cached.is_none_or(|entry| entry.in_frustum)
        } else {
            match cached {
                Some(entry)
                    if !reevaluated
                        && entry.frustum_revision == self.camera_revision
                        && entry.last_position == position =>
                {
                    entry.in_frustum
                }
                _ => {
                    self.stats.frustum_tests += 1;
                    self.frustum.is_none_or(|f| f.contains_point(position))
                }
            }
        };

        self.store(
            id.index(),
            CachedTier {
                generation: id.generation(),
                tier,
                last_distance: distance,
                last_position: position,
                in_frustum,
                frustum_revision: self.camera_revision,
            },
        );

        if self.config.frustum_culling && !in_frustum {
            LodTier::Culled
        } else {
            tier
        }
    }

    fn lookup(&self, index: u32) -> Option<CachedTier> {
        let slot = index as usize;
        if slot < DENSE_SLOTS {
            self.cache.get(slot).copied().flatten()
        } else {
            self.sparse.get(&index).copied()
        }
    }

    fn store(&mut self, index: u32, entry: CachedTier) {
        let slot = index as usize;
        if slot >= DENSE_SLOTS {
            if self.sparse.insert(index, entry).is_none() {
                self.cached_len += 1;
            }
            return;
        }
        if slot >= self.cache.len() {
            self.cache.resize(slot + 1, None);
        }
        if self.cache[slot].is_none() {
            self.cached_len += 1;
        }
        self.cache[slot] = Some(entry);
    }

    /// Tier from distance alone, no hysteresis.
    fn distance_tier(&self, distance: f32) -> LodTier {
        let d = &self.config.distances;
        if distance >= d.cull {
            LodTier::Culled
        } else if distance >= d.low {
            LodTier::Low
        } else if distance >= d.medium {
            LodTier::Medium
        } else {
            LodTier::High
        }
    }

    /// Whether a cached tier must be recomputed for `distance`.
    ///
    /// Each tier owns a band `[near, far)` of the distance thresholds. A
    /// receding entity is re-evaluated once it passes `far + margin`; an
    /// approaching one once it passes `near - margin`. The cull boundary is
    /// hard: at or beyond `cull` anything not already culled is re-evaluated.
    fn needs_reevaluation(&self, entry: &CachedTier, distance: f32) -> bool {
        let d = &self.config.distances;
        let margin = self.config.hysteresis_margin;

        if distance >= d.cull {
            return entry.tier != LodTier::Culled;
        }

        if distance > entry.last_distance {
            match entry.tier {
                LodTier::High => distance > d.medium + margin,
                LodTier::Medium => distance > d.low + margin,
                // Low's far edge is the hard cull boundary handled above.
                LodTier::Low | LodTier::Culled => false,
            }
        } else if distance < entry.last_distance {
            match entry.tier {
                LodTier::High => false,
                LodTier::Medium => distance < d.medium - margin,
                LodTier::Low => distance < d.low - margin,
                LodTier::Culled => distance < d.cull - margin,
            }
        } else {
            false
        }
    }

    /// Raw frustum test, independent of tiering. Everything is visible
    /// before the first camera update.
    pub fn is_point_visible(&self, position: Vec3) -> bool {
        self.frustum.is_none_or(|f| f.contains_point(position))
    }

    /// Raw sphere-vs-frustum test, independent of tiering.
    pub fn is_sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        self.frustum
            .is_none_or(|f| f.intersects_sphere(center, radius))
    }

    /// Drop the cached tier for one entity, e.g. when it is destroyed.
    pub fn invalidate(&mut self, id: EntityId) {
        let index = id.index();
        let removed = if index as usize >= DENSE_SLOTS {
            let live = self
                .sparse
                .get(&index)
                .is_some_and(|entry| entry.generation == id.generation());
            live && self.sparse.remove(&index).is_some()
        } else if let Some(slot) = self.cache.get_mut(index as usize)
            && slot.is_some_and(|entry| entry.generation == id.generation())
        {
            *slot = None;
            true
        } else {
            false
        };
        if removed {
            self.cached_len -= 1;
            self.stats.invalidated += 1;
        }
    }

    /// Drop every cached tier. Keeps the cache allocation.
    pub fn invalidate_all(&mut self) {
        self.stats.invalidated += self.cached_len as u64;
        self.cache.fill(None);
        self.sparse.clear();
        self.cached_len = 0;
    }

    /// Replace some or all distance thresholds.
    ///
    /// Invalid results are rejected and the previous thresholds stay active.
    /// On success the whole cache is invalidated and the classifier no
    /// longer reports a named preset.
    pub fn set_thresholds(&mut self, patch: LodDistancesPatch) -> Result<(), LodError> {
        let distances = self.config.distances.patched(&patch);
        if let Err(err) = distances.validate() {
            log::warn!("rejected LOD thresholds: {err}");
            return Err(err);
        }
        self.config.distances = distances;
        self.preset = None;
        self.invalidate_all();
        Ok(())
    }

    /// Switch to a named preset, e.g. when the camera enters close-up mode.
    pub fn set_preset(&mut self, preset: LodPreset) {
        log::info!("LOD preset -> {}", preset.name());
        self.config = preset.config();
        self.preset = Some(preset);
        self.invalidate_all();
    }

    /// Turn frustum culling on or off. A change invalidates the cache.
    pub fn set_frustum_culling(&mut self, enabled: bool) {
        if self.config.frustum_culling != enabled {
            self.config.frustum_culling = enabled;
            self.invalidate_all();
        }
    }

    /// Set the hysteresis margin. Negative or non-finite margins are rejected
    /// and leave the current one in place.
    pub fn set_hysteresis_margin(&mut self, margin: f32) -> Result<(), LodError> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(LodError::InvalidMargin(margin));
        }
        self.config.hysteresis_margin = margin;
        self.invalidate_all();
        Ok(())
    }

    /// The active configuration, including any applied threshold changes.
    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    /// The active distance thresholds.
    pub fn distances(&self) -> LodDistances {
        self.config.distances
    }

    /// The active preset, or `None` once thresholds were customised.
    pub fn preset(&self) -> Option<LodPreset> {
        self.preset
    }

    /// Number of entities with a cached tier.
    pub fn cached_len(&self) -> usize {
        self.cached_len
    }

    /// Counters accumulated since the last [`take_stats`](Self::take_stats).
    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    /// Return the counters and reset them.
    pub fn take_stats(&mut self) -> ClassifierStats {
        std::mem::take(&mut self.stats)
    }
}

impl Default for LodClassifier {
    fn default() -> Self {
        Self::with_preset(LodPreset::Normal)
    }
}
