use std::collections::HashMap;

use odbc_sys::{CDataType, SqlDataType};

use crate::{
    environment::OdbcVersion,
    error::{Error, NotSupportedKind},
    handles::ColumnDescription,
};

use super::{
    fixed_sized::{
        BigIntColumn, DateColumn, DoubleColumn, LongColumn, NumericColumn, RealColumn,
        ShortColumn, TimeColumn, TimestampColumn, UBigIntColumn, ULongColumn, UShortColumn,
    },
    text_column::{BinaryColumn, CharColumn, WCharColumn},
    ColumnBuffer, ColumnFlags, ColumnProperties,
};

/// Capacity used for character buffers if the driver reports a column size of zero.
const FALLBACK_TEXT_LEN: usize = 512;

/// Maps the SQL type reported for a column to the SQL C type of the buffer to allocate for it.
///
/// The map is consulted when buffers are created automatically from column metadata, e.g. by the
/// interactive sample binding the columns of an arbitrary `SELECT`. A default C type may be
/// configured as a fallback for unknown SQL types.
#[derive(Debug, Clone, Default)]
pub struct Sql2BufferTypeMap {
    map: HashMap<i16, CDataType>,
    default: Option<CDataType>,
}

impl Sql2BufferTypeMap {
    /// An empty map without a default. [`Sql2BufferTypeMap::buffer_type`] fails for every type
    /// until registrations are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard per-type mapping. Depending on the ODBC version the date and time types map
    /// to the ODBC 3 (`SQL_C_TYPE_*`) or ODBC 2 (`SQL_C_*`) buffer codes.
    pub fn default_map(odbc_version: OdbcVersion) -> Self {
        let odbc3 = odbc_version >= OdbcVersion::V3;
        let mut map = Self::new();
        map.register_type(SqlDataType::SMALLINT, CDataType::SShort);
        map.register_type(SqlDataType::INTEGER, CDataType::SLong);
        map.register_type(SqlDataType::EXT_BIG_INT, CDataType::SBigInt);
        map.register_type(SqlDataType::CHAR, CDataType::Char);
        map.register_type(SqlDataType::VARCHAR, CDataType::Char);
        map.register_type(SqlDataType::EXT_LONG_VARCHAR, CDataType::Char);
        map.register_type(SqlDataType::EXT_W_CHAR, CDataType::WChar);
        map.register_type(SqlDataType::EXT_W_VARCHAR, CDataType::WChar);
        map.register_type(SqlDataType::EXT_W_LONG_VARCHAR, CDataType::WChar);
        map.register_type(SqlDataType::DOUBLE, CDataType::Double);
        map.register_type(SqlDataType::FLOAT, CDataType::Double);
        map.register_type(SqlDataType::REAL, CDataType::Float);
        map.register_type(
            SqlDataType::DATE,
            if odbc3 { CDataType::TypeDate } else { CDataType::Date },
        );
        map.register_type(
            SqlDataType::TIME,
            if odbc3 { CDataType::TypeTime } else { CDataType::Time },
        );
        map.register_type(
            SqlDataType::TIMESTAMP,
            if odbc3 {
                CDataType::TypeTimestamp
            } else {
                CDataType::TimeStamp
            },
        );
        map.register_type(SqlDataType::EXT_BINARY, CDataType::Binary);
        map.register_type(SqlDataType::EXT_VAR_BINARY, CDataType::Binary);
        map.register_type(SqlDataType::EXT_LONG_VAR_BINARY, CDataType::Binary);
        map.register_type(SqlDataType::NUMERIC, CDataType::Numeric);
        map.register_type(SqlDataType::DECIMAL, CDataType::Numeric);
        map
    }

    /// Maps every SQL type to a narrow character buffer.
    pub fn all_as_char() -> Self {
        let mut map = Self::new();
        map.set_default(CDataType::Char);
        map
    }

    /// Maps every SQL type to a wide character buffer.
    pub fn all_as_wchar() -> Self {
        let mut map = Self::new();
        map.set_default(CDataType::WChar);
        map
    }

    /// The standard mapping, except that narrow character types are transported in wide
    /// buffers. Useful for data sources storing text in encodings other than UTF-8.
    pub fn char_as_wchar(odbc_version: OdbcVersion) -> Self {
        let mut map = Self::default_map(odbc_version);
        map.register_type(SqlDataType::CHAR, CDataType::WChar);
        map.register_type(SqlDataType::VARCHAR, CDataType::WChar);
        map.register_type(SqlDataType::EXT_LONG_VARCHAR, CDataType::WChar);
        map
    }

    /// Registers or overrides the buffer type to use for `sql_type`.
    pub fn register_type(&mut self, sql_type: SqlDataType, c_type: CDataType) {
        self.map.insert(sql_type.0, c_type);
    }

    /// Configures the buffer type to fall back to for unregistered SQL types.
    pub fn set_default(&mut self, c_type: CDataType) {
        self.default = Some(c_type);
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// The buffer type to allocate for a column of `sql_type`.
    pub fn buffer_type(&self, sql_type: SqlDataType) -> Result<CDataType, Error> {
        self.map
            .get(&sql_type.0)
            .copied()
            .or(self.default)
            .ok_or_else(|| Error::NotSupported {
                kind: NotSupportedKind::SqlType,
                code: sql_type.0,
                message: "No buffer type registered for SQL type and no default set.".to_string(),
            })
    }

    /// Allocates the buffer matching `description`, e.g. obtained from `SQLDescribeCol`. The
    /// buffer is flagged for `SELECT` usage and nullable if the column could be.
    pub fn create_buffer(&self, description: &ColumnDescription) -> Result<ColumnBuffer, Error> {
        let sql_type = description.data_type.data_type();
        let c_type = self.buffer_type(sql_type)?;
        let mut flags = ColumnFlags::SELECT;
        if description.could_be_nullable() {
            flags = flags | ColumnFlags::NULLABLE;
        }
        let properties = ColumnProperties {
            query_name: description.name.clone(),
            sql_type,
            column_size: description.data_type.column_size(),
            decimal_digits: description.data_type.decimal_digits(),
        };
        let text_len = if properties.column_size == 0 {
            FALLBACK_TEXT_LEN
        } else {
            properties.column_size
        };

        let buffer = match c_type {
            CDataType::SShort => ColumnBuffer::Short(ShortColumn::with_properties(properties, flags)),
            CDataType::UShort => {
                ColumnBuffer::UShort(UShortColumn::with_properties(properties, flags))
            }
            CDataType::SLong => ColumnBuffer::Long(LongColumn::with_properties(properties, flags)),
            CDataType::ULong => ColumnBuffer::ULong(ULongColumn::with_properties(properties, flags)),
            CDataType::SBigInt => {
                ColumnBuffer::BigInt(BigIntColumn::with_properties(properties, flags))
            }
            CDataType::UBigInt => {
                ColumnBuffer::UBigInt(UBigIntColumn::with_properties(properties, flags))
            }
            CDataType::Float => ColumnBuffer::Real(RealColumn::with_properties(properties, flags)),
            CDataType::Double => {
                ColumnBuffer::Double(DoubleColumn::with_properties(properties, flags))
            }
            CDataType::Date | CDataType::TypeDate => {
                ColumnBuffer::Date(DateColumn::with_c_type(properties, flags, c_type))
            }
            CDataType::Time | CDataType::TypeTime => {
                ColumnBuffer::Time(TimeColumn::with_c_type(properties, flags, c_type))
            }
            CDataType::TimeStamp | CDataType::TypeTimestamp => {
                ColumnBuffer::Timestamp(TimestampColumn::with_c_type(properties, flags, c_type))
            }
            CDataType::Numeric => {
                ColumnBuffer::Numeric(NumericColumn::with_properties(properties, flags))
            }
            CDataType::Char => {
                // One extra element for the terminating zero.
                ColumnBuffer::Char(CharColumn::with_properties(text_len + 1, properties, flags))
            }
            CDataType::WChar => {
                ColumnBuffer::WChar(WCharColumn::with_properties(text_len + 1, properties, flags))
            }
            CDataType::Binary => {
                ColumnBuffer::Binary(BinaryColumn::with_properties(text_len, properties, flags))
            }
            other => {
                return Err(Error::NotSupported {
                    kind: NotSupportedKind::SqlCType,
                    code: other as i16,
                    message: "No column buffer kind available for SQL C type.".to_string(),
                })
            }
        };
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::Sql2BufferTypeMap;
    use crate::{
        buffers::ColumnBuffer,
        environment::OdbcVersion,
        handles::{ColumnDescription, DataType, Nullability},
    };
    use odbc_sys::{CDataType, SqlDataType};

    #[test]
    fn default_map_standard_entries() {
        let map = Sql2BufferTypeMap::default_map(OdbcVersion::V3_8);
        assert_eq!(
            CDataType::SLong,
            map.buffer_type(SqlDataType::INTEGER).unwrap()
        );
        assert_eq!(
            CDataType::Char,
            map.buffer_type(SqlDataType::VARCHAR).unwrap()
        );
        assert_eq!(
            CDataType::Numeric,
            map.buffer_type(SqlDataType::DECIMAL).unwrap()
        );
        assert_eq!(
            CDataType::TypeTimestamp,
            map.buffer_type(SqlDataType::TIMESTAMP).unwrap()
        );
    }

    #[test]
    fn odbc2_maps_to_old_datetime_codes() {
        let map = Sql2BufferTypeMap::default_map(OdbcVersion::V2);
        assert_eq!(
            CDataType::TimeStamp,
            map.buffer_type(SqlDataType::TIMESTAMP).unwrap()
        );
        assert_eq!(CDataType::Date, map.buffer_type(SqlDataType::DATE).unwrap());
    }

    #[test]
    fn unknown_type_without_default_fails() {
        let map = Sql2BufferTypeMap::default_map(OdbcVersion::V3);
        // Some vendor specific type code no mapping is registered for.
        assert!(map.buffer_type(SqlDataType(-360)).is_err());
    }

    #[test]
    fn unknown_type_falls_back_to_default() {
        let map = Sql2BufferTypeMap::all_as_wchar();
        assert_eq!(
            CDataType::WChar,
            map.buffer_type(SqlDataType(-360)).unwrap()
        );
    }

    #[test]
    fn char_as_wchar_overrides_narrow_text() {
        let map = Sql2BufferTypeMap::char_as_wchar(OdbcVersion::V3_8);
        assert_eq!(
            CDataType::WChar,
            map.buffer_type(SqlDataType::VARCHAR).unwrap()
        );
        assert_eq!(
            CDataType::SLong,
            map.buffer_type(SqlDataType::INTEGER).unwrap()
        );
    }

    #[test]
    fn create_buffer_sizes_text_from_column_metadata() {
        let map = Sql2BufferTypeMap::default_map(OdbcVersion::V3_8);
        let description = ColumnDescription {
            name: "name".to_string(),
            data_type: DataType::Varchar { length: 16 },
            nullability: Nullability::Nullable,
        };
        let buffer = map.create_buffer(&description).unwrap();
        match buffer {
            ColumnBuffer::Char(b) => assert_eq!(17, b.capacity()),
            _ => panic!("expected a narrow character buffer"),
        }
    }
}
