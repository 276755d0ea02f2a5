//! Write path for dataset columns stored in a relocatable arena.
//!
//! A column is a record in a [`formula_arena::Arena`] holding:
//! - type metadata (column/data/measure type, flags, display precision),
//! - a directory of fixed-size blocks with the cell values,
//! - a level dictionary for categorical columns (code, label, import value,
//!   occurrence counts with and without filtered rows),
//! - name, formula and formula-diagnostic text.
//!
//! [`ColumnWriter`] is the only way to mutate a column. Every mutation bumps
//! the record's change counter, and integer writes keep the level counts in
//! step with the cells, consulting a [`RowFilter`] for the filtered-exclusive
//! counts. [`ColumnView`] reads a column without mutating it.
//!
//! This layer assumes a single writer and performs no locking.

#![forbid(unsafe_code)]

mod blocks;
mod filter;
mod levels;
mod record;
mod text;
mod types;
mod view;
mod writer;

pub use crate::blocks::BLOCK_VALUES_SPACE;
pub use crate::filter::{FilterMask, NoFilter, RowFilter};
pub use crate::levels::{Level, INITIAL_LEVEL_CAPACITY};
pub use crate::record::{create_column, ColumnHandle};
pub use crate::types::{
    CellKind, CellValue, CodeError, ColumnType, DataType, MeasureType, MISSING_INTEGER,
};
pub use crate::view::ColumnView;
pub use crate::writer::ColumnWriter;
