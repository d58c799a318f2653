use odbc_sys::SqlDataType;

/// The SQL type of a column or parameter, as the data source describes it.
///
/// Variants carrying a length or a precision/scale pair correspond to the parameterized SQL
/// types; for everything else the type code alone is sufficient. Codes this crate has no
/// variant for are preserved in [`DataType::Other`] together with their raw description, so
/// vendor specific types survive a describe/bind round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataType {
    /// The data source did not tell (`SQL_UNKNOWN_TYPE`).
    #[default]
    Unknown,
    /// `CHAR(n)`, padded to its fixed length.
    Char { length: usize },
    /// `WCHAR(n)`, fixed length in the wide encoding of the data source.
    WChar { length: usize },
    /// `VARCHAR(n)`.
    Varchar { length: usize },
    /// `NVARCHAR(n)` / `WVARCHAR(n)`.
    WVarchar { length: usize },
    /// `NUMERIC(p,s)`, exact decimal with precision and scale as declared.
    Numeric { precision: usize, scale: i16 },
    /// `DECIMAL(p,s)`, exact decimal with at least the declared precision.
    Decimal { precision: usize, scale: i16 },
    /// `TINYINT`, 8 bit.
    TinyInt,
    /// `SMALLINT`, 16 bit.
    SmallInt,
    /// `INTEGER`, 32 bit.
    Integer,
    /// `BIGINT`, 64 bit.
    BigInt,
    /// `REAL`, single precision floating point.
    Real,
    /// `FLOAT(p)`, floating point with driver defined precision.
    Float,
    /// `DOUBLE PRECISION`.
    Double,
    /// `BIT`, a single bit.
    Bit,
    /// `DATE`.
    Date,
    /// `TIME(p)`. The precision counts fractional second digits.
    Time { precision: i16 },
    /// `TIMESTAMP(p)`. The precision counts fractional second digits.
    Timestamp { precision: i16 },
    /// `BINARY(n)`, fixed length binary data.
    Binary { length: usize },
    /// `VARBINARY(n)`.
    Varbinary { length: usize },
    /// Any type code without a dedicated variant, kept verbatim.
    Other {
        data_type: SqlDataType,
        column_size: usize,
        decimal_digits: i16,
    },
}

impl DataType {
    /// Builds the variant matching a `(type code, column size, decimal digits)` triple as
    /// answered by `SQLDescribeCol` or `SQLDescribeParam`.
    pub fn new(data_type: SqlDataType, column_size: usize, decimal_digits: i16) -> Self {
        match data_type {
            // Character data: the column size is the length in characters.
            SqlDataType::CHAR => DataType::Char {
                length: column_size,
            },
            SqlDataType::VARCHAR => DataType::Varchar {
                length: column_size,
            },
            SqlDataType::EXT_W_CHAR => DataType::WChar {
                length: column_size,
            },
            SqlDataType::EXT_W_VARCHAR => DataType::WVarchar {
                length: column_size,
            },
            // Exact decimals: column size is the precision, decimal digits the scale.
            SqlDataType::NUMERIC => DataType::Numeric {
                precision: column_size,
                scale: decimal_digits,
            },
            SqlDataType::DECIMAL => DataType::Decimal {
                precision: column_size,
                scale: decimal_digits,
            },
            // Integers and floating point types carry everything in the code.
            SqlDataType::EXT_TINY_INT => DataType::TinyInt,
            SqlDataType::SMALLINT => DataType::SmallInt,
            SqlDataType::INTEGER => DataType::Integer,
            SqlDataType::EXT_BIG_INT => DataType::BigInt,
            SqlDataType::REAL => DataType::Real,
            SqlDataType::FLOAT => DataType::Float,
            SqlDataType::DOUBLE => DataType::Double,
            SqlDataType::EXT_BIT => DataType::Bit,
            // Date and time: decimal digits hold the fractional seconds precision.
            SqlDataType::DATE => DataType::Date,
            SqlDataType::TIME => DataType::Time {
                precision: decimal_digits,
            },
            SqlDataType::TIMESTAMP => DataType::Timestamp {
                precision: decimal_digits,
            },
            // Binary data: the column size is the length in bytes.
            SqlDataType::EXT_BINARY => DataType::Binary {
                length: column_size,
            },
            SqlDataType::EXT_VAR_BINARY => DataType::Varbinary {
                length: column_size,
            },
            SqlDataType::UNKNOWN_TYPE => DataType::Unknown,
            other => DataType::Other {
                data_type: other,
                column_size,
                decimal_digits,
            },
        }
    }

    /// The raw type code of this variant, as expected by `SQLBindParameter`.
    pub fn data_type(&self) -> SqlDataType {
        match self {
            DataType::Unknown => SqlDataType::UNKNOWN_TYPE,
            DataType::Char { .. } => SqlDataType::CHAR,
            DataType::Varchar { .. } => SqlDataType::VARCHAR,
            DataType::WChar { .. } => SqlDataType::EXT_W_CHAR,
            DataType::WVarchar { .. } => SqlDataType::EXT_W_VARCHAR,
            DataType::Numeric { .. } => SqlDataType::NUMERIC,
            DataType::Decimal { .. } => SqlDataType::DECIMAL,
            DataType::TinyInt => SqlDataType::EXT_TINY_INT,
            DataType::SmallInt => SqlDataType::SMALLINT,
            DataType::Integer => SqlDataType::INTEGER,
            DataType::BigInt => SqlDataType::EXT_BIG_INT,
            DataType::Real => SqlDataType::REAL,
            DataType::Float => SqlDataType::FLOAT,
            DataType::Double => SqlDataType::DOUBLE,
            DataType::Bit => SqlDataType::EXT_BIT,
            DataType::Date => SqlDataType::DATE,
            DataType::Time { .. } => SqlDataType::TIME,
            DataType::Timestamp { .. } => SqlDataType::TIMESTAMP,
            DataType::Binary { .. } => SqlDataType::EXT_BINARY,
            DataType::Varbinary { .. } => SqlDataType::EXT_VAR_BINARY,
            DataType::Other { data_type, .. } => *data_type,
        }
    }

    /// The column size argument of `SQLBindParameter` for this type: a character or byte length
    /// for text and binary data, the precision for exact decimals, and zero for every type
    /// whose size is implied by its code.
    pub fn column_size(&self) -> usize {
        match self {
            DataType::Char { length }
            | DataType::Varchar { length }
            | DataType::WChar { length }
            | DataType::WVarchar { length }
            | DataType::Binary { length }
            | DataType::Varbinary { length } => *length,
            DataType::Numeric { precision, .. } | DataType::Decimal { precision, .. } => *precision,
            DataType::Other { column_size, .. } => *column_size,
            _ => 0,
        }
    }

    /// The decimal digits argument of `SQLBindParameter` for this type: the scale for exact
    /// decimals, the fractional seconds precision for time and timestamp, zero otherwise.
    pub fn decimal_digits(&self) -> i16 {
        match self {
            DataType::Numeric { scale, .. } | DataType::Decimal { scale, .. } => *scale,
            DataType::Time { precision } | DataType::Timestamp { precision } => *precision,
            DataType::Other { decimal_digits, .. } => *decimal_digits,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, SqlDataType};

    #[test]
    fn new_maps_character_types() {
        assert_eq!(
            DataType::Varchar { length: 16 },
            DataType::new(SqlDataType::VARCHAR, 16, 0)
        );
        assert_eq!(
            DataType::WVarchar { length: 8 },
            DataType::new(SqlDataType::EXT_W_VARCHAR, 8, 0)
        );
    }

    #[test]
    fn round_trip_discriminator() {
        let dt = DataType::new(SqlDataType::NUMERIC, 18, 5);
        assert_eq!(SqlDataType::NUMERIC, dt.data_type());
        assert_eq!(18, dt.column_size());
        assert_eq!(5, dt.decimal_digits());
    }

    #[test]
    fn fixed_types_have_no_size_arguments() {
        let dt = DataType::new(SqlDataType::INTEGER, 10, 0);
        assert_eq!(DataType::Integer, dt);
        assert_eq!(0, dt.column_size());
        assert_eq!(0, dt.decimal_digits());
    }

    #[test]
    fn unknown_codes_survive_verbatim() {
        let dt = DataType::new(SqlDataType(-360), 7, 3);
        assert_eq!(SqlDataType(-360), dt.data_type());
        assert_eq!(7, dt.column_size());
        assert_eq!(3, dt.decimal_digits());
    }
}
