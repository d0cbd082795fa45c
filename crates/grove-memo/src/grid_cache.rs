//! Boolean results of expensive spatial predicates, memoized per grid cell.

use rustc_hash::FxHashMap;

/// Integer coordinates of a grid cell on the XZ ground plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub x: i32,
    pub z: i32,
}

/// Memoizes a boolean predicate over a quantized 2D grid.
///
/// Positions are snapped to square cells of `cell_size` world units; the
/// predicate runs at most once per cell until the cache is cleared. Typical
/// use is "is this ground cell walkable", which must be cleared whenever the
/// terrain under the cache changes.
#[derive(Debug)]
pub struct SpatialBoolCache {
    cell_size: f32,
    cells: FxHashMap<CellKey, bool>,
    hits: u64,
    misses: u64,
}

impl SpatialBoolCache {
    /// Create an empty cache with the given cell edge length.
    ///
    /// Non-positive or non-finite sizes fall back to `1.0`.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            log::warn!("invalid grid cell size {cell_size}, using 1.0");
            1.0
        };
        Self {
            cell_size,
            cells: FxHashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// Edge length of one cell in world units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Quantize a world position to its cell.
    pub fn cell_of(&self, x: f32, z: f32) -> CellKey {
        CellKey {
            x: (x / self.cell_size).floor() as i32,
            z: (z / self.cell_size).floor() as i32,
        }
    }

    /// Return the cached result for the cell containing `(x, z)`, evaluating
    /// `predicate` with the cell key on a miss.
    pub fn get_or_compute(&mut self, x: f32, z: f32, predicate: impl FnOnce(CellKey) -> bool) -> bool {
        let key = self.cell_of(x, z);
        if let Some(&value) = self.cells.get(&key) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = predicate(key);
        self.cells.insert(key, value);
        value
    }

    /// Cached result for the cell containing `(x, z)`, without evaluating anything.
    pub fn peek(&self, x: f32, z: f32) -> Option<bool> {
        self.cells.get(&self.cell_of(x, z)).copied()
    }

    /// Store a known result for a cell, e.g. after a local terrain edit.
    pub fn insert(&mut self, key: CellKey, value: bool) {
        self.cells.insert(key, value);
    }

    /// Forget a single cell.
    pub fn invalidate_cell(&mut self, key: CellKey) -> bool {
        self.cells.remove(&key).is_some()
    }

    /// Forget every cell. Keeps the allocated capacity.
    pub fn clear(&mut self) {
        log::debug!("clearing spatial cache ({} cells)", self.cells.len());
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to run the predicate.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
