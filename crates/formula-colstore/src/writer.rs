use crate::blocks::cell_at;
use crate::filter::{NoFilter, RowFilter};
use crate::record::{self, ColumnHandle};
use crate::text::alloc_text;
use crate::types::{CellKind, ColumnType, DataType, MeasureType, MISSING_INTEGER};
use crate::view::ColumnView;
use formula_arena::{Arena, ArenaOffset};

/// Mutating access to one column record.
///
/// The writer borrows the arena mutably for its whole lifetime, so there is
/// at most one writer per arena handle and no reader can observe a
/// half-finished operation. It keeps only the record's offset: every
/// operation resolves the record again after it allocates, since allocation
/// may move the region.
///
/// Contract violations (writing a cell of the wrong kind, addressing a row
/// past the end, removing a level that does not exist) panic. Callers
/// validate user input before it reaches this layer.
pub struct ColumnWriter<'a, A: Arena + ?Sized> {
    pub(crate) arena: &'a mut A,
    pub(crate) column: ColumnHandle,
    pub(crate) filter: &'a dyn RowFilter,
}

impl<'a, A: Arena + ?Sized> ColumnWriter<'a, A> {
    pub fn new(arena: &'a mut A, column: ColumnHandle, filter: &'a dyn RowFilter) -> Self {
        Self {
            arena,
            column,
            filter,
        }
    }

    /// A writer for datasets without an active filter.
    pub fn unfiltered(arena: &'a mut A, column: ColumnHandle) -> Self {
        Self::new(arena, column, &NoFilter)
    }

    pub fn handle(&self) -> ColumnHandle {
        self.column
    }

    /// Read-only view of the same column.
    pub fn view(&self) -> ColumnView<'_, A> {
        ColumnView::new(self.arena, self.column)
    }

    pub fn changes(&self) -> u64 {
        self.view().changes()
    }

    pub(crate) fn bump_changes(&mut self) {
        let at = self.column.field(record::CHANGES);
        let changes = self.arena.read_u64(at);
        self.arena.write_u64(at, changes.wrapping_add(1));
    }

    fn set_flag(&mut self, field: u64, value: bool) {
        self.arena.write_u8(self.column.field(field), u8::from(value));
        self.bump_changes();
    }

    pub fn set_id(&mut self, id: i32) {
        self.arena.write_i32(self.column.field(record::ID), id);
        self.bump_changes();
    }

    pub fn set_column_type(&mut self, column_type: ColumnType) {
        self.arena
            .write_u8(self.column.field(record::COLUMN_TYPE), column_type.code());
        self.bump_changes();
    }

    /// Change the data type.
    ///
    /// If this changes the cell kind (to or from decimal), storage is
    /// regrown for the current row count and every row is reset to missing.
    /// Cells are not converted; the caller rewrites them.
    pub fn set_data_type(&mut self, data_type: DataType) {
        let previous = self.view().cell_kind();
        self.arena
            .write_u8(self.column.field(record::DATA_TYPE), data_type.code());
        self.bump_changes();
        self.reshape_cells(previous);
    }

    /// Change the measure type.
    ///
    /// Switching to or from id changes the cell kind to or from text
    /// references; rows are then reset to missing as in
    /// [`ColumnWriter::set_data_type`].
    pub fn set_measure_type(&mut self, measure_type: MeasureType) {
        let previous = self.view().cell_kind();
        self.arena
            .write_u8(self.column.field(record::MEASURE_TYPE), measure_type.code());
        self.bump_changes();
        self.reshape_cells(previous);
    }

    /// Re-lay the rows for the current cell kind if it differs from `previous`.
    fn reshape_cells(&mut self, previous: CellKind) {
        let view = self.view();
        let kind = view.cell_kind();
        if kind == previous {
            return;
        }

        let rows = view.row_count();
        log::debug!(
            "column {} cells change from {previous:?} to {kind:?}; resetting {rows} rows",
            self.column.offset()
        );
        self.ensure_row_capacity(kind, rows);
        for row in 0..rows {
            self.write_missing(kind, row);
        }
    }

    pub fn set_auto_measure(&mut self, auto: bool) {
        self.set_flag(record::AUTO_MEASURE, auto);
    }

    pub fn set_active(&mut self, active: bool) {
        self.set_flag(record::ACTIVE, active);
    }

    pub fn set_dps(&mut self, dps: i32) {
        self.arena.write_i32(self.column.field(record::DPS), dps);
        self.bump_changes();
    }

    /// Store `value` in an id column. Empty text stores a missing cell.
    ///
    /// The `initing` flag is accepted for symmetry with
    /// [`ColumnWriter::set_integer`] and ignored: id cells carry no
    /// bookkeeping.
    pub fn set_text(&mut self, row: usize, value: &str, _initing: bool) {
        let view = self.view();
        assert_eq!(
            view.measure_type(),
            MeasureType::Id,
            "text cells can only be written to id columns"
        );
        view.assert_row(row);

        let reference = if value.is_empty() {
            ArenaOffset::NULL
        } else {
            alloc_text(self.arena, value).offset
        };

        let at = cell_at(self.arena, self.column, CellKind::TextRef, row);
        self.arena.write_offset(at, reference);
        self.bump_changes();
    }

    /// Overwrite a decimal cell. The `initing` flag is ignored, as decimal
    /// cells carry no bookkeeping.
    pub fn set_decimal(&mut self, row: usize, value: f64, _initing: bool) {
        let view = self.view();
        assert_eq!(
            view.cell_kind(),
            CellKind::Decimal,
            "decimal cells can only be written to decimal columns"
        );
        view.assert_row(row);

        let at = cell_at(self.arena, self.column, CellKind::Decimal, row);
        self.arena.write_f64(at, value);
        self.bump_changes();
    }

    /// Store an integer cell, keeping level counts in step.
    ///
    /// For continuous columns this is a plain overwrite. Otherwise the old
    /// value's level is decremented (and removed when it empties and the
    /// column trims levels) and the new value's level is incremented, being
    /// created with its decimal text as label if it does not exist yet.
    /// `count_ex_filtered` only moves when the row is not filtered. The cell
    /// always ends up holding `value` as passed, even when trimming the old
    /// level renumbered a text column's codes.
    ///
    /// With `initing` the current cell content is ignored: use it when the
    /// slot has never held a counted value.
    pub fn set_integer(&mut self, row: usize, value: i32, initing: bool) {
        let view = self.view();
        assert_eq!(
            view.cell_kind(),
            CellKind::Integer,
            "integer cells cannot be written to {:?}/{:?} columns",
            view.data_type(),
            view.measure_type()
        );
        view.assert_row(row);

        if view.measure_type() == MeasureType::Continuous {
            let at = cell_at(self.arena, self.column, CellKind::Integer, row);
            self.arena.write_i32(at, value);
            self.bump_changes();
            return;
        }

        let filtered = self.filter.is_row_filtered(row);

        if !initing {
            let old = view.integer(row);
            if old == value {
                return;
            }
            if old != MISSING_INTEGER {
                self.retire_value(old, filtered);
            }
        }

        if value != MISSING_INTEGER {
            self.count_value(value, filtered);
        }

        let at = cell_at(self.arena, self.column, CellKind::Integer, row);
        self.arena.write_i32(at, value);
        self.bump_changes();
    }

    /// Decrement the level holding `value`, removing it if it empties under trimming.
    fn retire_value(&mut self, value: i32, filtered: bool) {
        let index = self
            .view()
            .level_index(value)
            .unwrap_or_else(|| panic!("cell holds code {value} which has no level"));

        let mut counts = self.level_counts(index);
        counts.count = counts
            .count
            .checked_sub(1)
            .unwrap_or_else(|| panic!("level {value} count underflow"));
        if !filtered {
            counts.count_ex_filtered = counts.count_ex_filtered.saturating_sub(1);
        }
        self.set_level_counts(index, counts);

        if counts.count == 0 && self.view().trim_levels() {
            self.remove_level(value);
        }
    }

    fn count_value(&mut self, value: i32, filtered: bool) {
        let index = match self.view().level_index(value) {
            Some(index) => index,
            None => {
                let label = value.to_string();
                self.insert_level(value, &label, Some(&label));
                self.view()
                    .level_index(value)
                    .unwrap_or_else(|| panic!("level {value} missing right after insertion"))
            }
        };

        let mut counts = self.level_counts(index);
        counts.count += 1;
        if !filtered {
            counts.count_ex_filtered += 1;
        }
        self.set_level_counts(index, counts);
    }
}
