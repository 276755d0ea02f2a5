use crate::header::HEADER_SIZE;

/// Default initial region size: 1 MB.
pub const DEFAULT_INITIAL_CAPACITY: u64 = 1024 * 1024;

/// Default ceiling for region growth: 4 GB.
pub const DEFAULT_MAX_CAPACITY: u64 = 4 * 1024 * 1024 * 1024;

/// Sizing for a new arena region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Bytes reserved when the arena is created (including the header).
    pub initial_capacity: u64,
    /// Growth never takes the region past this many bytes. An allocation that
    /// would need more is fatal.
    pub max_capacity: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl ArenaConfig {
    /// A small region for tests; it starts tiny so growth paths get exercised.
    pub fn small() -> Self {
        Self {
            initial_capacity: 4 * 1024,
            max_capacity: 256 * 1024 * 1024,
        }
    }

    pub fn with_initial_capacity(mut self, capacity: u64) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Initial size clamped so the header always fits.
    pub(crate) fn effective_initial_capacity(&self) -> u64 {
        self.initial_capacity
            .max(HEADER_SIZE as u64)
            .min(self.max_capacity.max(HEADER_SIZE as u64))
    }
}
