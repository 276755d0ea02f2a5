//! Owned text buffers in the arena.
//!
//! A buffer is a `u32` byte length followed by UTF-8 bytes. Its recorded
//! capacity (when the owner keeps one) covers the prefix too.
//!
//! Buffers are never freed. Overwriting a field with longer text, replacing an
//! id cell or clearing the level dictionary abandons the old buffer in place;
//! the space comes back when the whole arena is discarded.

use crate::record::{ColumnHandle, TextSlot};
use crate::ColumnWriter;
use formula_arena::{Allocation, Arena, ArenaOffset};
use std::borrow::Cow;

const LEN_PREFIX: usize = 4;

fn encoded_len(text: &str) -> usize {
    LEN_PREFIX + text.len()
}

fn write_into<A: Arena + ?Sized>(arena: &mut A, at: ArenaOffset, text: &str) {
    let len = u32::try_from(text.len())
        .unwrap_or_else(|_| panic!("text of {} bytes is too long to store", text.len()));
    arena.write_u32(at, len);
    arena
        .bytes_mut(at.add(LEN_PREFIX as u64), text.len())
        .copy_from_slice(text.as_bytes());
}

/// Allocate an owned copy of `text`.
pub(crate) fn alloc_text<A: Arena + ?Sized>(arena: &mut A, text: &str) -> Allocation {
    let allocation = arena.allocate_size(encoded_len(text));
    write_into(arena, allocation.offset, text);
    allocation
}

/// Read the buffer at `at`. A null offset reads as empty text.
pub(crate) fn read_text<A: Arena + ?Sized>(arena: &A, at: ArenaOffset) -> Cow<'_, str> {
    if at.is_null() {
        return Cow::Borrowed("");
    }
    let len = arena.read_u32(at) as usize;
    String::from_utf8_lossy(arena.bytes(at.add(LEN_PREFIX as u64), len))
}

pub(crate) fn read_slot<A: Arena + ?Sized>(
    arena: &A,
    column: ColumnHandle,
    slot: TextSlot,
) -> Cow<'_, str> {
    read_text(arena, arena.read_offset(column.field(slot.offset)))
}

impl<A: Arena + ?Sized> ColumnWriter<'_, A> {
    /// Store `value` in a capacity-tracked text field, reusing its buffer when it fits.
    pub(crate) fn write_slot(&mut self, slot: TextSlot, value: &str) {
        let column = self.column;
        let capacity = self.arena.read_u32(column.field(slot.capacity)) as usize;
        let needed = encoded_len(value);

        if needed > capacity {
            let allocation = alloc_text(self.arena, value);
            self.arena.write_offset(column.field(slot.offset), allocation.offset);
            let capacity = u32::try_from(allocation.capacity)
                .unwrap_or_else(|_| panic!("text capacity {} exceeds u32", allocation.capacity));
            self.arena.write_u32(column.field(slot.capacity), capacity);
        } else {
            let at = self.arena.read_offset(column.field(slot.offset));
            write_into(self.arena, at, value);
        }

        self.bump_changes();
    }

    pub fn set_name(&mut self, name: &str) {
        self.write_slot(crate::record::NAME, name);
    }

    pub fn set_formula(&mut self, formula: &str) {
        self.write_slot(crate::record::FORMULA, formula);
    }

    pub fn set_formula_message(&mut self, message: &str) {
        self.write_slot(crate::record::FORMULA_MESSAGE, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_arena::{ArenaConfig, HeapArena};

    #[test]
    fn text_roundtrip_including_empty_and_null() {
        let mut arena = HeapArena::new(&ArenaConfig::small());
        let hello = alloc_text(&mut arena, "héllo");
        let empty = alloc_text(&mut arena, "");

        assert_eq!(hello.capacity, 16);
        assert_eq!(read_text(&arena, hello.offset), "héllo");
        assert_eq!(read_text(&arena, empty.offset), "");
        assert_eq!(read_text(&arena, ArenaOffset::NULL), "");
    }
}
