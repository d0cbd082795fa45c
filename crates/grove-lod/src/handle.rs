//! Generation-checked entity handles.

/// Typed handle for an entity that owns LOD state.
///
/// `index` addresses a dense slot; `generation` distinguishes successive
/// occupants of the same slot so a stale handle never aliases a new entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Build a handle from raw parts. Mostly useful in tests and for
    /// callers that manage their own slot allocation.
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Dense slot this handle addresses.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Occupant counter for the slot; bumped on every despawn.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Issues and recycles [`EntityId`]s.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,
}

impl EntityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle, reusing a freed slot when one is available.
    pub fn spawn(&mut self) -> EntityId {
        self.live_count += 1;
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return EntityId::from_raw(index, self.generations[slot]);
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        EntityId::from_raw(index, 0)
    }

    /// Release a handle. Returns `false` if it was already stale.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = id.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(id.index);
        self.live_count -= 1;
        true
    }

    /// Whether `id` is the current occupant of its slot.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.index as usize;
        slot < self.alive.len() && self.alive[slot] && self.generations[slot] == id.generation
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}
