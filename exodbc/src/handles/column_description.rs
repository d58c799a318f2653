use super::data_type::DataType;

/// Indication of whether a column or parameter is nullable or not.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Nullability {
    /// Indicates that the column might be nullable or not.
    #[default]
    Unknown,
    /// The column may hold NULL values.
    Nullable,
    /// The column can not hold NULL values.
    NoNulls,
}

impl Nullability {
    /// Construct a new instance from the integer value returned by `SQLDescribeColW` or
    /// `SQLDescribeParam` (`SQL_NO_NULLS`, `SQL_NULLABLE` or `SQL_NULLABLE_UNKNOWN`).
    pub fn new(nullability: odbc_sys::Nullability) -> Self {
        match nullability {
            odbc_sys::Nullability::UNKNOWN => Nullability::Unknown,
            odbc_sys::Nullability::NO_NULLS => Nullability::NoNulls,
            odbc_sys::Nullability::NULLABLE => Nullability::Nullable,
            other => panic!("ODBC returned invalid value for nullability: {:?}", other),
        }
    }
}

/// Describes the type and attributes of a result set column, as answered by `SQLDescribeColW`.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ColumnDescription {
    /// Column name, decoded to UTF-8. May be empty if unavailable.
    pub name: String,
    /// Type of the column
    pub data_type: DataType,
    /// Indicates whether the column is nullable or not.
    pub nullability: Nullability,
}

impl ColumnDescription {
    /// `true` if the column is `Nullable` or it is not known whether the column is nullable.
    /// `false` if and only if the column is `NoNulls`.
    pub fn could_be_nullable(&self) -> bool {
        match self.nullability {
            Nullability::Nullable | Nullability::Unknown => true,
            Nullability::NoNulls => false,
        }
    }
}
