//! Byte layout of a column record inside the arena.
//!
//! ```text
//! 0    id                   i32
//! 4    column_type          u8
//! 5    data_type            u8
//! 6    measure_type         u8
//! 7    auto_measure         u8
//! 8    active               u8
//! 9    trim_levels          u8
//! 12   dps                  i32
//! 16   changes              u64
//! 24   row_count            u64
//! 32   blocks               offset -> [offset; blocks_capacity]
//! 40   blocks_used          u32
//! 44   blocks_capacity      u32
//! 48   levels               offset -> [Level; levels_capacity]
//! 56   levels_used          u32
//! 60   levels_capacity      u32
//! 64   name                 offset
//! 72   name_capacity        u32
//! 80   formula              offset
//! 88   formula_capacity     u32
//! 96   formula_message      offset
//! 104  formula_msg_capacity u32
//! ```
//!
//! A zeroed record is a valid empty column: integer data, no measure, no
//! rows, no levels, no text.

use formula_arena::{Arena, ArenaOffset};

pub(crate) const RECORD_SIZE: usize = 112;

pub(crate) const ID: u64 = 0;
pub(crate) const COLUMN_TYPE: u64 = 4;
pub(crate) const DATA_TYPE: u64 = 5;
pub(crate) const MEASURE_TYPE: u64 = 6;
pub(crate) const AUTO_MEASURE: u64 = 7;
pub(crate) const ACTIVE: u64 = 8;
pub(crate) const TRIM_LEVELS: u64 = 9;
pub(crate) const DPS: u64 = 12;
pub(crate) const CHANGES: u64 = 16;
pub(crate) const ROW_COUNT: u64 = 24;
pub(crate) const BLOCKS: u64 = 32;
pub(crate) const BLOCKS_USED: u64 = 40;
pub(crate) const BLOCKS_CAPACITY: u64 = 44;
pub(crate) const LEVELS: u64 = 48;
pub(crate) const LEVELS_USED: u64 = 56;
pub(crate) const LEVELS_CAPACITY: u64 = 60;

/// Offset/capacity pair of one variable-length text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextSlot {
    pub offset: u64,
    pub capacity: u64,
}

pub(crate) const NAME: TextSlot = TextSlot {
    offset: 64,
    capacity: 72,
};
pub(crate) const FORMULA: TextSlot = TextSlot {
    offset: 80,
    capacity: 88,
};
pub(crate) const FORMULA_MESSAGE: TextSlot = TextSlot {
    offset: 96,
    capacity: 104,
};

/// Stable handle to a column record.
///
/// This is the only thing callers keep between operations; every access
/// resolves the record through the arena again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnHandle(ArenaOffset);

impl ColumnHandle {
    pub const fn from_offset(offset: ArenaOffset) -> Self {
        Self(offset)
    }

    pub const fn offset(self) -> ArenaOffset {
        self.0
    }

    pub(crate) fn field(self, field: u64) -> ArenaOffset {
        self.0.add(field)
    }
}

/// Allocate an empty column record.
pub fn create_column<A: Arena + ?Sized>(arena: &mut A) -> ColumnHandle {
    let offset = arena.allocate(RECORD_SIZE);
    log::trace!("created column record at {offset}");
    ColumnHandle(offset)
}

pub(crate) fn read_count<A: Arena + ?Sized>(arena: &A, at: ArenaOffset) -> usize {
    arena.read_u32(at) as usize
}

pub(crate) fn write_count<A: Arena + ?Sized>(arena: &mut A, at: ArenaOffset, value: usize) {
    let value = u32::try_from(value).unwrap_or_else(|_| panic!("count {value} exceeds u32"));
    arena.write_u32(at, value);
}
