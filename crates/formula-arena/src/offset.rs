use std::fmt;

/// A relocation-safe position inside an arena.
///
/// Offsets stay valid for the lifetime of the arena no matter how often the
/// underlying region is grown or remapped. Offset zero is reserved for the
/// arena header, so it doubles as the null reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaOffset(u64);

impl ArenaOffset {
    pub const NULL: Self = Self(0);

    /// Width of an offset when stored inside the arena.
    pub const SIZE: usize = 8;

    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Offset `bytes` further into the arena.
    #[must_use]
    pub const fn add(self, bytes: u64) -> Self {
        Self(self.0 + bytes)
    }

    pub(crate) fn as_index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for ArenaOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// The result of an allocation: where it starts and how many bytes were granted.
///
/// `capacity` is the requested length rounded up to the arena's alignment, and
/// callers that keep growable buffers record it so later writes can reuse the
/// slack without allocating again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub offset: ArenaOffset,
    pub capacity: usize,
}
