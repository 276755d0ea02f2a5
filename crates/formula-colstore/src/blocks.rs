//! Row storage: a directory of fixed-size blocks per column.
//!
//! Cells are packed densely. Row `i` of an element of `size` bytes lives in
//! block `i * size / BLOCK_VALUES_SPACE` at the remainder offset. Element
//! sizes divide the block size, so a cell never straddles two blocks, and
//! blocks are never moved once written: growth only appends blocks (and, when
//! the directory itself is full, copies the directory of block offsets).

use crate::record::{self, read_count, write_count, ColumnHandle};
use crate::text::alloc_text;
use crate::types::{CellKind, CellValue};
use crate::ColumnWriter;
use formula_arena::{Arena, ArenaOffset};

/// Bytes of cell data per block.
pub const BLOCK_VALUES_SPACE: usize = 4096;

const INITIAL_DIRECTORY_CAPACITY: usize = 16;

/// Blocks needed to hold `rows` cells of `size` bytes.
pub(crate) fn blocks_required(rows: usize, size: usize) -> usize {
    (rows * size).div_ceil(BLOCK_VALUES_SPACE)
}

/// Which block holds `row`, and where inside it.
pub(crate) fn block_index(row: usize, size: usize) -> (usize, usize) {
    let byte = row * size;
    (byte / BLOCK_VALUES_SPACE, byte % BLOCK_VALUES_SPACE)
}

/// Arena offset of the cell for `row`.
///
/// The result is only good until the next allocation on `arena`.
pub(crate) fn cell_at<A: Arena + ?Sized>(
    arena: &A,
    column: ColumnHandle,
    kind: CellKind,
    row: usize,
) -> ArenaOffset {
    let (block, within) = block_index(row, kind.size());
    let used = read_count(arena, column.field(record::BLOCKS_USED));
    assert!(
        block < used,
        "row {row} needs block {block} but only {used} are allocated"
    );
    let directory = arena.read_offset(column.field(record::BLOCKS));
    let block = arena.read_offset(directory.add((block * ArenaOffset::SIZE) as u64));
    block.add(within as u64)
}

impl<A: Arena + ?Sized> ColumnWriter<'_, A> {
    /// Set the row count using the column's current cell kind.
    ///
    /// Rows added at the end start out missing. Shrinking keeps the blocks;
    /// level counts are not adjusted, so follow a shrink of a level-tracked
    /// column with [`ColumnWriter::update_level_counts`].
    pub fn set_row_count(&mut self, count: usize) {
        let kind = self.view().cell_kind();
        self.ensure_row_capacity(kind, count);
    }

    /// Grow the block directory so `count` cells of `kind` are addressable,
    /// then set the row count to `count`.
    ///
    /// Blocks are allocated one at a time and only as many as needed. Slots
    /// between the previous row count and `count` are set to the kind's
    /// missing value.
    pub(crate) fn ensure_row_capacity(&mut self, kind: CellKind, count: usize) {
        let column = self.column;
        let required = blocks_required(count, kind.size());
        let mut used = read_count(self.arena, column.field(record::BLOCKS_USED));

        if used < required {
            log::debug!(
                "column {} growing from {used} to {required} blocks",
                column.offset()
            );
        }

        while used < required {
            self.reserve_directory_slot(used);
            let block = self.arena.allocate(BLOCK_VALUES_SPACE);
            let directory = self.arena.read_offset(column.field(record::BLOCKS));
            self.arena
                .write_offset(directory.add((used * ArenaOffset::SIZE) as u64), block);
            used += 1;
            write_count(self.arena, column.field(record::BLOCKS_USED), used);
        }

        let old_count = self.view().row_count();
        self.arena
            .write_u64(column.field(record::ROW_COUNT), count as u64);
        for row in old_count..count {
            self.write_missing(kind, row);
        }

        self.bump_changes();
    }

    /// Make sure the directory has room for an entry at `slot`.
    fn reserve_directory_slot(&mut self, slot: usize) {
        let column = self.column;
        let capacity = read_count(self.arena, column.field(record::BLOCKS_CAPACITY));
        if slot < capacity {
            return;
        }

        let new_capacity = if capacity == 0 {
            INITIAL_DIRECTORY_CAPACITY
        } else {
            capacity * 2
        };
        log::debug!(
            "column {} block directory growing to {new_capacity} entries",
            column.offset()
        );

        let directory = self.arena.allocate(new_capacity * ArenaOffset::SIZE);
        let old = self.arena.read_offset(column.field(record::BLOCKS));
        if capacity > 0 {
            self.arena
                .copy_within(old, directory, capacity * ArenaOffset::SIZE);
        }
        self.arena.write_offset(column.field(record::BLOCKS), directory);
        write_count(self.arena, column.field(record::BLOCKS_CAPACITY), new_capacity);
    }

    pub(crate) fn write_missing(&mut self, kind: CellKind, row: usize) {
        let at = cell_at(self.arena, self.column, kind, row);
        let size = kind.size();
        self.arena
            .bytes_mut(at, size)
            .copy_from_slice(&kind.missing_bytes()[..size]);
    }

    /// Append one row holding `value`.
    ///
    /// This is a raw write: level counts are not touched. Bulk loaders append
    /// and then call [`ColumnWriter::update_level_counts`] once.
    pub fn append(&mut self, value: CellValue<'_>) {
        let kind = self.view().cell_kind();
        assert_eq!(
            kind,
            value.kind(),
            "cannot append a {:?} cell to a {kind:?} column",
            value.kind()
        );

        let row = self.view().row_count();
        self.ensure_row_capacity(kind, row + 1);

        match value {
            CellValue::Integer(v) => {
                let at = cell_at(self.arena, self.column, kind, row);
                self.arena.write_i32(at, v);
            }
            CellValue::Decimal(v) => {
                let at = cell_at(self.arena, self.column, kind, row);
                self.arena.write_f64(at, v);
            }
            CellValue::Text(text) => {
                let reference = if text.is_empty() {
                    ArenaOffset::NULL
                } else {
                    alloc_text(self.arena, text).offset
                };
                let at = cell_at(self.arena, self.column, kind, row);
                self.arena.write_offset(at, reference);
            }
        }
    }

    /// Insert missing rows so they occupy positions `first..=last`.
    ///
    /// Every row at or after `first` moves up by `last - first + 1`. This
    /// copies each of those cells once, so it costs O(row count) per call.
    pub fn insert_rows(&mut self, first: usize, last: usize) {
        assert!(first <= last, "insert range {first}..={last} is reversed");
        let view = self.view();
        let kind = view.cell_kind();
        let start_count = view.row_count();
        assert!(
            first <= start_count,
            "cannot insert at row {first} of a {start_count}-row column"
        );

        let inserted = last - first + 1;
        let final_count = start_count + inserted;
        self.ensure_row_capacity(kind, final_count);

        let size = kind.size();
        for row in (last + 1..final_count).rev() {
            let src = cell_at(self.arena, self.column, kind, row - inserted);
            let dst = cell_at(self.arena, self.column, kind, row);
            self.arena.copy_within(src, dst, size);
        }

        for row in first..=last {
            self.write_missing(kind, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_math_is_exact() {
        assert_eq!(blocks_required(0, 4), 0);
        assert_eq!(blocks_required(1, 4), 1);
        assert_eq!(blocks_required(1024, 4), 1);
        assert_eq!(blocks_required(1025, 4), 2);
        assert_eq!(blocks_required(512, 8), 1);
        assert_eq!(blocks_required(513, 8), 2);
    }

    #[test]
    fn rows_map_to_blocks_without_straddling() {
        assert_eq!(block_index(0, 4), (0, 0));
        assert_eq!(block_index(1023, 4), (0, 4092));
        assert_eq!(block_index(1024, 4), (1, 0));
        assert_eq!(block_index(513, 8), (1, 8));
    }
}
