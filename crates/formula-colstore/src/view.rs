use crate::blocks::cell_at;
use crate::levels::{level_value, read_level, Level};
use crate::record::{self, read_count, ColumnHandle, TextSlot};
use crate::text::{read_slot, read_text};
use crate::types::{CellKind, CodeError, ColumnType, DataType, MeasureType};
use formula_arena::Arena;
use std::borrow::Cow;

/// Read-only access to a column record.
///
/// Holds a shared borrow of the arena, so it cannot outlive the next
/// allocation.
pub struct ColumnView<'a, A: Arena + ?Sized> {
    arena: &'a A,
    column: ColumnHandle,
}

impl<A: Arena + ?Sized> Clone for ColumnView<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Arena + ?Sized> Copy for ColumnView<'_, A> {}

impl<'a, A: Arena + ?Sized> ColumnView<'a, A> {
    pub fn new(arena: &'a A, column: ColumnHandle) -> Self {
        Self { arena, column }
    }

    pub fn handle(&self) -> ColumnHandle {
        self.column
    }

    fn code<T>(&self, field: u64) -> T
    where
        T: TryFrom<u8, Error = CodeError>,
    {
        let raw = self.arena.read_u8(self.column.field(field));
        T::try_from(raw).unwrap_or_else(|err| {
            panic!("corrupt column record at {}: {err}", self.column.offset())
        })
    }

    fn flag(&self, field: u64) -> bool {
        self.arena.read_u8(self.column.field(field)) != 0
    }

    fn text(&self, slot: TextSlot) -> Cow<'a, str> {
        read_slot(self.arena, self.column, slot)
    }

    pub fn id(&self) -> i32 {
        self.arena.read_i32(self.column.field(record::ID))
    }

    pub fn name(&self) -> Cow<'a, str> {
        self.text(record::NAME)
    }

    pub fn formula(&self) -> Cow<'a, str> {
        self.text(record::FORMULA)
    }

    pub fn formula_message(&self) -> Cow<'a, str> {
        self.text(record::FORMULA_MESSAGE)
    }

    pub fn column_type(&self) -> ColumnType {
        self.code(record::COLUMN_TYPE)
    }

    pub fn data_type(&self) -> DataType {
        self.code(record::DATA_TYPE)
    }

    pub fn measure_type(&self) -> MeasureType {
        self.code(record::MEASURE_TYPE)
    }

    pub fn cell_kind(&self) -> CellKind {
        CellKind::for_types(self.data_type(), self.measure_type())
    }

    pub fn auto_measure(&self) -> bool {
        self.flag(record::AUTO_MEASURE)
    }

    pub fn active(&self) -> bool {
        self.flag(record::ACTIVE)
    }

    pub fn trim_levels(&self) -> bool {
        self.flag(record::TRIM_LEVELS)
    }

    pub fn dps(&self) -> i32 {
        self.arena.read_i32(self.column.field(record::DPS))
    }

    /// Monotonic modification stamp; compare against a saved value to detect changes.
    pub fn changes(&self) -> u64 {
        self.arena.read_u64(self.column.field(record::CHANGES))
    }

    pub fn row_count(&self) -> usize {
        usize::try_from(self.arena.read_u64(self.column.field(record::ROW_COUNT)))
            .unwrap_or(usize::MAX)
    }

    pub fn blocks_used(&self) -> usize {
        read_count(self.arena, self.column.field(record::BLOCKS_USED))
    }

    pub fn blocks_capacity(&self) -> usize {
        read_count(self.arena, self.column.field(record::BLOCKS_CAPACITY))
    }

    pub(crate) fn assert_row(&self, row: usize) {
        let rows = self.row_count();
        assert!(row < rows, "row {row} out of range for {rows}-row column");
    }

    fn assert_kind(&self, kind: CellKind) {
        let actual = self.cell_kind();
        assert_eq!(actual, kind, "column stores {actual:?} cells, not {kind:?}");
    }

    pub fn integer(&self, row: usize) -> i32 {
        self.assert_kind(CellKind::Integer);
        self.assert_row(row);
        self.arena
            .read_i32(cell_at(self.arena, self.column, CellKind::Integer, row))
    }

    pub fn decimal(&self, row: usize) -> f64 {
        self.assert_kind(CellKind::Decimal);
        self.assert_row(row);
        self.arena
            .read_f64(cell_at(self.arena, self.column, CellKind::Decimal, row))
    }

    /// Text of an id cell, `None` when the cell is missing.
    pub fn text_value(&self, row: usize) -> Option<Cow<'a, str>> {
        self.assert_kind(CellKind::TextRef);
        self.assert_row(row);
        let reference = self
            .arena
            .read_offset(cell_at(self.arena, self.column, CellKind::TextRef, row));
        if reference.is_null() {
            None
        } else {
            Some(read_text(self.arena, reference))
        }
    }

    /// All integer cells in row order.
    pub fn integers(&self) -> impl Iterator<Item = i32> + 'a {
        let view = *self;
        (0..view.row_count()).map(move |row| view.integer(row))
    }

    pub fn level_count(&self) -> usize {
        read_count(self.arena, self.column.field(record::LEVELS_USED))
    }

    pub fn levels_capacity(&self) -> usize {
        read_count(self.arena, self.column.field(record::LEVELS_CAPACITY))
    }

    pub(crate) fn level_index(&self, value: i32) -> Option<usize> {
        (0..self.level_count()).find(|&i| level_value(self.arena, self.column, i) == value)
    }

    pub fn has_level(&self, value: i32) -> bool {
        self.level_index(value).is_some()
    }

    pub fn level(&self, value: i32) -> Option<Level> {
        self.level_index(value)
            .map(|i| read_level(self.arena, self.column, i))
    }

    /// The level at dictionary position `index`.
    pub fn level_at(&self, index: usize) -> Level {
        let count = self.level_count();
        assert!(index < count, "level index {index} out of range for {count} levels");
        read_level(self.arena, self.column, index)
    }

    pub fn levels(&self) -> Vec<Level> {
        (0..self.level_count())
            .map(|i| read_level(self.arena, self.column, i))
            .collect()
    }

    pub fn level_by_label(&self, label: &str) -> Option<Level> {
        self.levels().into_iter().find(|level| level.label == label)
    }

    pub fn level_by_import_value(&self, import_value: &str) -> Option<Level> {
        self.levels()
            .into_iter()
            .find(|level| level.import_value == import_value)
    }
}

impl<A: Arena + ?Sized> std::fmt::Debug for ColumnView<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnView")
            .field("offset", &self.column.offset())
            .field("name", &self.name())
            .field("data_type", &self.data_type())
            .field("measure_type", &self.measure_type())
            .field("rows", &self.row_count())
            .field("levels", &self.level_count())
            .finish()
    }
}
