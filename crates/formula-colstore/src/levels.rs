//! The level dictionary of a categorical column.
//!
//! Levels are fixed-size entries in one growable array:
//!
//! ```text
//! 0   value              i32
//! 4   count              u32
//! 8   count_ex_filtered  u32
//! 12  label_capacity     u32
//! 16  label              offset
//! 24  import_value       offset
//! 32  import_capacity    u32
//! ```
//!
//! Entry order is the display order of the levels; the dictionary keeps it
//! sorted by value when it already was (see [`ColumnWriter::insert_level`]).

use crate::record::{self, read_count, write_count, ColumnHandle};
use crate::text::{alloc_text, read_text};
use crate::types::{CellKind, DataType, MeasureType, MISSING_INTEGER};
use crate::ColumnWriter;
use formula_arena::{Allocation, Arena, ArenaOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) const LEVEL_SIZE: usize = 40;

const VALUE: u64 = 0;
const COUNT: u64 = 4;
const COUNT_EX_FILTERED: u64 = 8;
const LABEL_CAPACITY: u64 = 12;
const LABEL: u64 = 16;
const IMPORT_VALUE: u64 = 24;
const IMPORT_CAPACITY: u64 = 32;

/// Capacity given to a dictionary on its first growth; later growth doubles.
pub const INITIAL_LEVEL_CAPACITY: usize = 50;

/// A snapshot of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub value: i32,
    pub label: String,
    pub import_value: String,
    /// Rows holding `value`.
    pub count: u32,
    /// Rows holding `value` that are not filtered out.
    pub count_ex_filtered: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LevelCounts {
    pub count: u32,
    pub count_ex_filtered: u32,
}

pub(crate) fn level_entry<A: Arena + ?Sized>(
    arena: &A,
    column: ColumnHandle,
    index: usize,
) -> ArenaOffset {
    let levels = arena.read_offset(column.field(record::LEVELS));
    levels.add((index * LEVEL_SIZE) as u64)
}

pub(crate) fn level_value<A: Arena + ?Sized>(arena: &A, column: ColumnHandle, index: usize) -> i32 {
    arena.read_i32(level_entry(arena, column, index).add(VALUE))
}

pub(crate) fn read_level<A: Arena + ?Sized>(
    arena: &A,
    column: ColumnHandle,
    index: usize,
) -> Level {
    let entry = level_entry(arena, column, index);
    Level {
        value: arena.read_i32(entry.add(VALUE)),
        label: read_text(arena, arena.read_offset(entry.add(LABEL))).into_owned(),
        import_value: read_text(arena, arena.read_offset(entry.add(IMPORT_VALUE))).into_owned(),
        count: arena.read_u32(entry.add(COUNT)),
        count_ex_filtered: arena.read_u32(entry.add(COUNT_EX_FILTERED)),
    }
}

/// Whether `values` is ascending and whether it is descending.
///
/// Fewer than two values count as ascending only.
fn detect_order(values: &[i32]) -> (bool, bool) {
    let ascending = values.windows(2).all(|w| w[0] < w[1]);
    let descending = values.windows(2).all(|w| w[0] > w[1]);
    if ascending && descending {
        (true, false)
    } else {
        (ascending, descending)
    }
}

fn capacity_u32(allocation: Allocation) -> u32 {
    u32::try_from(allocation.capacity)
        .unwrap_or_else(|_| panic!("text capacity {} exceeds u32", allocation.capacity))
}

impl<A: Arena + ?Sized> ColumnWriter<'_, A> {
    pub(crate) fn level_counts(&self, index: usize) -> LevelCounts {
        let entry = level_entry(self.arena, self.column, index);
        LevelCounts {
            count: self.arena.read_u32(entry.add(COUNT)),
            count_ex_filtered: self.arena.read_u32(entry.add(COUNT_EX_FILTERED)),
        }
    }

    pub(crate) fn set_level_counts(&mut self, index: usize, counts: LevelCounts) {
        let entry = level_entry(self.arena, self.column, index);
        self.arena.write_u32(entry.add(COUNT), counts.count);
        self.arena
            .write_u32(entry.add(COUNT_EX_FILTERED), counts.count_ex_filtered);
    }

    /// Double (or first-allocate) the level array when `used + 1` entries would not fit.
    fn reserve_level(&mut self) {
        let column = self.column;
        let used = read_count(self.arena, column.field(record::LEVELS_USED));
        let capacity = read_count(self.arena, column.field(record::LEVELS_CAPACITY));
        if used + 1 <= capacity {
            return;
        }

        let new_capacity = if capacity == 0 {
            INITIAL_LEVEL_CAPACITY
        } else {
            capacity * 2
        };
        log::debug!(
            "column {} level dictionary growing from {capacity} to {new_capacity}",
            column.offset()
        );

        let levels = self.arena.allocate(new_capacity * LEVEL_SIZE);
        if used > 0 {
            let old = self.arena.read_offset(column.field(record::LEVELS));
            self.arena.copy_within(old, levels, used * LEVEL_SIZE);
        }
        self.arena.write_offset(column.field(record::LEVELS), levels);
        write_count(self.arena, column.field(record::LEVELS_CAPACITY), new_capacity);
    }

    /// Add a level at the end of the dictionary with zero counts.
    ///
    /// `import_value` defaults to `label`. The value must not already be
    /// present.
    pub fn append_level(&mut self, value: i32, label: &str, import_value: Option<&str>) {
        debug_assert!(
            self.view().level_index(value).is_none(),
            "level {value} already exists"
        );

        self.reserve_level();
        let label_text = alloc_text(self.arena, label);
        let import_text = alloc_text(self.arena, import_value.unwrap_or(label));

        let column = self.column;
        let used = read_count(self.arena, column.field(record::LEVELS_USED));
        let entry = level_entry(self.arena, column, used);
        self.arena.bytes_mut(entry, LEVEL_SIZE).fill(0);
        self.arena.write_i32(entry.add(VALUE), value);
        self.arena.write_offset(entry.add(LABEL), label_text.offset);
        self.arena
            .write_u32(entry.add(LABEL_CAPACITY), capacity_u32(label_text));
        self.arena
            .write_offset(entry.add(IMPORT_VALUE), import_text.offset);
        self.arena
            .write_u32(entry.add(IMPORT_CAPACITY), capacity_u32(import_text));
        write_count(self.arena, column.field(record::LEVELS_USED), used + 1);

        log::trace!("column {} appended level {value} ({label:?})", column.offset());
        self.bump_changes();
    }

    /// Add a level, keeping the dictionary sorted by value if it already is.
    ///
    /// The existing entries are classified as ascending, descending or
    /// neither. When sorted, the new level is placed at its sorted position
    /// (at the head if every entry sorts after it); otherwise it stays at the
    /// end.
    pub fn insert_level(&mut self, value: i32, label: &str, import_value: Option<&str>) {
        self.append_level(value, label, import_value);

        let column = self.column;
        let last = self.view().level_count() - 1;
        let existing: Vec<i32> = (0..last)
            .map(|i| level_value(self.arena, column, i))
            .collect();

        let (ascending, descending) = detect_order(&existing);
        if !ascending && !descending {
            self.bump_changes();
            return;
        }

        let mut inserted = [0u8; LEVEL_SIZE];
        let last_entry = level_entry(self.arena, column, last);
        inserted.copy_from_slice(self.arena.bytes(last_entry, LEVEL_SIZE));

        let mut slot = 0;
        for i in (0..last).rev() {
            let current = existing[i];
            assert_ne!(current, value, "level {value} already exists");
            let moves = if ascending {
                current > value
            } else {
                current < value
            };
            if !moves {
                slot = i + 1;
                break;
            }
            let from = level_entry(self.arena, column, i);
            let to = level_entry(self.arena, column, i + 1);
            self.arena.copy_within(from, to, LEVEL_SIZE);
        }

        let entry = level_entry(self.arena, column, slot);
        self.arena
            .bytes_mut(entry, LEVEL_SIZE)
            .copy_from_slice(&inserted);
        self.bump_changes();
    }

    /// Remove the level holding `value`. Panics if there is none.
    ///
    /// For text columns the codes are positions into the label list, so the
    /// codes of later levels, and every cell holding one, shift down by one
    /// to stay dense.
    pub fn remove_level(&mut self, value: i32) {
        let column = self.column;
        let index = self
            .view()
            .level_index(value)
            .unwrap_or_else(|| panic!("cannot remove level {value}: not in dictionary"));

        let used = read_count(self.arena, column.field(record::LEVELS_USED));
        if index + 1 < used {
            let from = level_entry(self.arena, column, index + 1);
            let to = level_entry(self.arena, column, index);
            self.arena
                .copy_within(from, to, (used - index - 1) * LEVEL_SIZE);
        }
        write_count(self.arena, column.field(record::LEVELS_USED), used - 1);

        if self.view().data_type() == DataType::Text {
            self.consolidate_codes(value);
        }

        log::trace!("column {} removed level {value}", column.offset());
        self.bump_changes();
    }

    /// Close the gap left by `removed` in a dense code space, in the
    /// dictionary and in the cells together.
    fn consolidate_codes(&mut self, removed: i32) {
        let column = self.column;
        let used = self.view().level_count();
        for index in 0..used {
            let entry = level_entry(self.arena, column, index);
            let value = self.arena.read_i32(entry.add(VALUE));
            if value > removed {
                self.arena.write_i32(entry.add(VALUE), value - 1);
            }
        }

        let view = self.view();
        if view.cell_kind() != CellKind::Integer {
            return;
        }
        let rows = view.row_count();
        for row in 0..rows {
            let at = crate::blocks::cell_at(self.arena, column, CellKind::Integer, row);
            let code = self.arena.read_i32(at);
            if code > removed {
                self.arena.write_i32(at, code - 1);
            }
        }
    }

    /// Forget every level. Array storage and label buffers are kept, not reclaimed.
    pub fn clear_levels(&mut self) {
        write_count(self.arena, self.column.field(record::LEVELS_USED), 0);
        self.bump_changes();
    }

    /// Recompute every level's counts from the cells.
    ///
    /// Only applies to level-tracked columns (neither continuous nor id).
    /// Use after any bulk change that bypassed [`ColumnWriter::set_integer`].
    pub fn update_level_counts(&mut self) {
        let view = self.view();
        if matches!(
            view.measure_type(),
            MeasureType::Continuous | MeasureType::Id
        ) || view.cell_kind() != CellKind::Integer
        {
            return;
        }

        let used = view.level_count();
        let positions: HashMap<i32, usize> = (0..used)
            .map(|i| (level_value(self.arena, self.column, i), i))
            .collect();
        let mut counts = vec![LevelCounts::default(); used];

        for row in 0..view.row_count() {
            let value = view.integer(row);
            if value == MISSING_INTEGER {
                continue;
            }
            let index = *positions
                .get(&value)
                .unwrap_or_else(|| panic!("row {row} holds code {value} which has no level"));
            counts[index].count += 1;
            if !self.filter.is_row_filtered(row) {
                counts[index].count_ex_filtered += 1;
            }
        }

        for (index, counts) in counts.into_iter().enumerate() {
            self.set_level_counts(index, counts);
        }
        self.bump_changes();
    }

    /// Enable or disable automatic removal of levels whose count drops to zero.
    ///
    /// Enabling sweeps the levels that are already empty.
    pub fn set_trim_levels(&mut self, trim: bool) {
        if self.view().trim_levels() == trim {
            return;
        }

        if trim {
            let mut index = 0;
            while index < self.view().level_count() {
                let counts = self.level_counts(index);
                if counts.count == 0 {
                    let value = level_value(self.arena, self.column, index);
                    self.remove_level(value);
                } else {
                    index += 1;
                }
            }
        }

        self.arena
            .write_u8(self.column.field(record::TRIM_LEVELS), u8::from(trim));
        self.bump_changes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_detection() {
        assert_eq!(detect_order(&[]), (true, false));
        assert_eq!(detect_order(&[5]), (true, false));
        assert_eq!(detect_order(&[1, 2, 3]), (true, false));
        assert_eq!(detect_order(&[3, 2, 1]), (false, true));
        assert_eq!(detect_order(&[1, 3, 2]), (false, false));
    }
}
