use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Missing-value sentinel for integer cells.
pub const MISSING_INTEGER: i32 = i32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown {kind} code {code}")]
pub struct CodeError {
    pub kind: &'static str,
    pub code: u8,
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal
        { $($variant:ident = $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            #[default]
            $($variant = $code),+
        }

        impl $name {
            pub const fn code(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = CodeError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(CodeError { kind: $kind, code }),
                }
            }
        }
    };
}

coded_enum!(
    /// How a column's values come into being.
    ColumnType, "column type" {
        None = 0,
        Data = 1,
        Computed = 2,
        Recoded = 3,
        Filter = 4,
        Output = 5,
    }
);

coded_enum!(
    /// Storage interpretation of a column's values.
    DataType, "data type" {
        Integer = 0,
        Decimal = 1,
        Text = 2,
    }
);

coded_enum!(
    /// Statistical role of a column.
    MeasureType, "measure type" {
        None = 0,
        Nominal = 1,
        Ordinal = 2,
        Continuous = 3,
        Id = 4,
    }
);

/// Physical representation of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// `i32`: a raw value for continuous columns, a level code otherwise.
    Integer,
    /// `f64`, NaN when missing.
    Decimal,
    /// Arena offset of an owned string, null when missing.
    TextRef,
}

impl CellKind {
    /// `Id` measure wins over the data type: id columns always hold text references.
    pub fn for_types(data_type: DataType, measure_type: MeasureType) -> Self {
        match (data_type, measure_type) {
            (_, MeasureType::Id) => Self::TextRef,
            (DataType::Decimal, _) => Self::Decimal,
            _ => Self::Integer,
        }
    }

    pub const fn size(self) -> usize {
        match self {
            Self::Integer => 4,
            Self::Decimal | Self::TextRef => 8,
        }
    }

    pub(crate) fn missing_bytes(self) -> [u8; 8] {
        match self {
            Self::Integer => {
                let mut raw = [0u8; 8];
                raw[..4].copy_from_slice(&MISSING_INTEGER.to_le_bytes());
                raw
            }
            Self::Decimal => f64::NAN.to_le_bytes(),
            Self::TextRef => [0u8; 8],
        }
    }
}

/// A value handed to [`crate::ColumnWriter::append`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Integer(i32),
    Decimal(f64),
    /// Empty text is stored as a missing (null) reference.
    Text(&'a str),
}

impl CellValue<'_> {
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Integer(_) => CellKind::Integer,
            Self::Decimal(_) => CellKind::Decimal,
            Self::Text(_) => CellKind::TextRef,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_and_reject_unknown() {
        for measure in [
            MeasureType::None,
            MeasureType::Nominal,
            MeasureType::Ordinal,
            MeasureType::Continuous,
            MeasureType::Id,
        ] {
            assert_eq!(MeasureType::try_from(measure.code()), Ok(measure));
        }

        let err = DataType::try_from(9).unwrap_err();
        assert_eq!(err.to_string(), "unknown data type code 9");
    }

    #[test]
    fn id_measure_overrides_data_type() {
        assert_eq!(
            CellKind::for_types(DataType::Decimal, MeasureType::Id),
            CellKind::TextRef
        );
        assert_eq!(
            CellKind::for_types(DataType::Decimal, MeasureType::Continuous),
            CellKind::Decimal
        );
        assert_eq!(
            CellKind::for_types(DataType::Text, MeasureType::Nominal),
            CellKind::Integer
        );
    }
}
