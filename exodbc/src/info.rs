//! A registry of typed driver and data source properties, read through `SQLGetInfo`.
//!
//! Every property is registered with its value kind when a database is opened and read either
//! eagerly in bulk or lazily on first access. Properties an older driver does not know are
//! marked unsupported instead of failing the connect.

use std::{cell::RefCell, collections::BTreeMap};

use log::warn;

use crate::{
    environment::OdbcVersion,
    error::Error,
    handles::{Connection, InfoId},
    quirks::DatabaseProduct,
};

/// Defaults used when a driver reports `0` for one of the maximum name length properties.
const MAX_NAME_LEN_DEFAULT: u16 = 128;

/// Category tag of a property, used to group the output of diagnostic dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoCategory {
    Driver,
    Dbms,
    DataSource,
    SupportedSql,
    SqlLimits,
    ScalarFunction,
    Conversion,
}

/// How a property value is obtained from `SQLGetInfo` and which Rust type carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValueType {
    /// A 16 bit unsigned integer.
    USmallInt,
    /// A 32 bit unsigned integer, possibly a bitmask.
    UInt,
    /// A string out of the fixed set `"Y"` / `"N"`.
    StringYesNo,
    /// A free form string.
    StringAny,
}

/// Current value of a property. Until a property is read its default is `0`, `"N"` or `""`,
/// depending on the value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    USmallInt(u16),
    UInt(u32),
    String(String),
}

impl PropertyValue {
    /// Renders the value for diagnostic dumps.
    pub fn to_display_string(&self) -> String {
        match self {
            PropertyValue::USmallInt(v) => v.to_string(),
            PropertyValue::UInt(v) => v.to_string(),
            PropertyValue::String(v) => v.clone(),
        }
    }
}

/// One piece of information obtainable from the driver, keyed by its `SQL_*` info id.
#[derive(Debug, Clone)]
pub struct SqlInfoProperty {
    id: InfoId,
    name: &'static str,
    category: InfoCategory,
    value_type: PropertyValueType,
    value: PropertyValue,
    value_read: bool,
    unsupported: bool,
}

impl SqlInfoProperty {
    fn new(
        id: InfoId,
        name: &'static str,
        category: InfoCategory,
        value_type: PropertyValueType,
    ) -> Self {
        let value = match value_type {
            PropertyValueType::USmallInt => PropertyValue::USmallInt(0),
            PropertyValueType::UInt => PropertyValue::UInt(0),
            PropertyValueType::StringYesNo => PropertyValue::String("N".to_string()),
            PropertyValueType::StringAny => PropertyValue::String(String::new()),
        };
        Self {
            id,
            name,
            category,
            value_type,
            value,
            value_read: false,
            unsupported: false,
        }
    }

    pub fn id(&self) -> InfoId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn category(&self) -> InfoCategory {
        self.category
    }

    pub fn value_type(&self) -> PropertyValueType {
        self.value_type
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// `true` once the value has been read from a driver. Stays `false` if reading failed.
    pub fn value_read(&self) -> bool {
        self.value_read
    }

    /// `true` if the driver rejected the info id. Happens for ODBC 3 ids asked of old drivers.
    pub fn unsupported(&self) -> bool {
        self.unsupported
    }

    /// Query the driver for the value of this property.
    fn read(&mut self, connection: &Connection) -> Result<(), Error> {
        match self.value_type {
            PropertyValueType::USmallInt => {
                let value = connection.get_info_u16(self.id).into_result(connection)?;
                self.value = PropertyValue::USmallInt(value);
            }
            PropertyValueType::UInt => {
                let value = connection.get_info_u32(self.id).into_result(connection)?;
                self.value = PropertyValue::UInt(value);
            }
            PropertyValueType::StringYesNo | PropertyValueType::StringAny => {
                let mut buf = Vec::with_capacity(128);
                connection
                    .get_info_string(self.id, &mut buf)
                    .into_result(connection)?;
                self.value = PropertyValue::String(String::from_utf16_lossy(&buf));
            }
        }
        self.value_read = true;
        Ok(())
    }
}

/// All registered properties of one connection, together with the derived queries the rest of
/// the crate asks of them.
#[derive(Debug, Default)]
pub struct SqlInfoProperties {
    props: RefCell<BTreeMap<u16, SqlInfoProperty>>,
}

impl SqlInfoProperties {
    /// Creates an empty registry. Call [`SqlInfoProperties::register_all`] to fill it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the properties available within the passed ODBC version. Ids introduced with
    /// ODBC 3 are skipped for version 2 environments.
    pub fn register_all(&self, odbc_version: OdbcVersion) {
        use InfoCategory::*;
        use PropertyValueType::*;

        let mut register = |id, name, category, value_type| {
            let mut props = self.props.borrow_mut();
            props.insert(id, SqlInfoProperty::new(InfoId(id), name, category, value_type));
        };

        // Driver
        register(InfoId::DATA_SOURCE_NAME.0, "SQL_DATA_SOURCE_NAME", Driver, StringAny);
        register(InfoId::DRIVER_NAME.0, "SQL_DRIVER_NAME", Driver, StringAny);
        register(InfoId::DRIVER_VER.0, "SQL_DRIVER_VER", Driver, StringAny);
        register(InfoId::DRIVER_ODBC_VER.0, "SQL_DRIVER_ODBC_VER", Driver, StringAny);
        register(InfoId::ODBC_VER.0, "SQL_ODBC_VER", Driver, StringAny);
        register(InfoId::SEARCH_PATTERN_ESCAPE.0, "SQL_SEARCH_PATTERN_ESCAPE", Driver, StringAny);
        register(InfoId::GETDATA_EXTENSIONS.0, "SQL_GETDATA_EXTENSIONS", Driver, UInt);
        register(
            InfoId::MAX_CONCURRENT_ACTIVITIES.0,
            "SQL_MAX_CONCURRENT_ACTIVITIES",
            Driver,
            USmallInt,
        );
        register(
            InfoId::MAX_DRIVER_CONNECTIONS.0,
            "SQL_MAX_DRIVER_CONNECTIONS",
            Driver,
            USmallInt,
        );
        register(InfoId::SERVER_NAME.0, "SQL_SERVER_NAME", Driver, StringAny);

        // DBMS
        register(InfoId::DBMS_NAME.0, "SQL_DBMS_NAME", Dbms, StringAny);
        register(InfoId::DBMS_VER.0, "SQL_DBMS_VER", Dbms, StringAny);
        register(InfoId::DATABASE_NAME.0, "SQL_DATABASE_NAME", Dbms, StringAny);

        // Data source
        register(InfoId::ACCESSIBLE_TABLES.0, "SQL_ACCESSIBLE_TABLES", DataSource, StringYesNo);
        register(
            InfoId::ACCESSIBLE_PROCEDURES.0,
            "SQL_ACCESSIBLE_PROCEDURES",
            DataSource,
            StringYesNo,
        );
        register(InfoId::CATALOG_TERM.0, "SQL_CATALOG_TERM", DataSource, StringAny);
        register(
            InfoId::CATALOG_NAME_SEPARATOR.0,
            "SQL_CATALOG_NAME_SEPARATOR",
            DataSource,
            StringAny,
        );
        register(InfoId::SCHEMA_TERM.0, "SQL_SCHEMA_TERM", DataSource, StringAny);
        register(InfoId::TABLE_TERM.0, "SQL_TABLE_TERM", DataSource, StringAny);
        register(InfoId::PROCEDURE_TERM.0, "SQL_PROCEDURE_TERM", DataSource, StringAny);
        register(InfoId::TXN_CAPABLE.0, "SQL_TXN_CAPABLE", DataSource, USmallInt);
        register(
            InfoId::TXN_ISOLATION_OPTION.0,
            "SQL_TXN_ISOLATION_OPTION",
            DataSource,
            UInt,
        );
        register(
            InfoId::DEFAULT_TXN_ISOLATION.0,
            "SQL_DEFAULT_TXN_ISOLATION",
            DataSource,
            UInt,
        );
        register(
            InfoId::DATA_SOURCE_READ_ONLY.0,
            "SQL_DATA_SOURCE_READ_ONLY",
            DataSource,
            StringYesNo,
        );
        register(InfoId::USER_NAME.0, "SQL_USER_NAME", DataSource, StringAny);
        register(InfoId::MULT_RESULT_SETS.0, "SQL_MULT_RESULT_SETS", DataSource, StringYesNo);
        register(
            InfoId::MULTIPLE_ACTIVE_TXN.0,
            "SQL_MULTIPLE_ACTIVE_TXN",
            DataSource,
            StringYesNo,
        );
        register(
            InfoId::CURSOR_COMMIT_BEHAVIOR.0,
            "SQL_CURSOR_COMMIT_BEHAVIOR",
            DataSource,
            USmallInt,
        );
        register(
            InfoId::CURSOR_ROLLBACK_BEHAVIOR.0,
            "SQL_CURSOR_ROLLBACK_BEHAVIOR",
            DataSource,
            USmallInt,
        );
        register(InfoId::SCROLL_OPTIONS.0, "SQL_SCROLL_OPTIONS", DataSource, UInt);
        register(InfoId::IDENTIFIER_CASE.0, "SQL_IDENTIFIER_CASE", DataSource, USmallInt);
        register(
            InfoId::IDENTIFIER_QUOTE_CHAR.0,
            "SQL_IDENTIFIER_QUOTE_CHAR",
            DataSource,
            StringAny,
        );
        register(
            InfoId::CONCAT_NULL_BEHAVIOR.0,
            "SQL_CONCAT_NULL_BEHAVIOR",
            DataSource,
            USmallInt,
        );
        register(InfoId::NULL_COLLATION.0, "SQL_NULL_COLLATION", DataSource, USmallInt);

        // Supported SQL
        register(InfoId::OUTER_JOINS.0, "SQL_OUTER_JOINS", SupportedSql, StringYesNo);
        register(
            InfoId::OUTER_JOIN_CAPABILITIES.0,
            "SQL_OUTER_JOIN_CAPABILITIES",
            SupportedSql,
            UInt,
        );
        register(
            InfoId::ORDER_BY_COLUMNS_IN_SELECT.0,
            "SQL_ORDER_BY_COLUMNS_IN_SELECT",
            SupportedSql,
            StringYesNo,
        );
        register(
            InfoId::SPECIAL_CHARACTERS.0,
            "SQL_SPECIAL_CHARACTERS",
            SupportedSql,
            StringAny,
        );
        register(
            InfoId::CORRELATION_NAME.0,
            "SQL_CORRELATION_NAME",
            SupportedSql,
            USmallInt,
        );
        register(
            InfoId::NON_NULLABLE_COLUMNS.0,
            "SQL_NON_NULLABLE_COLUMNS",
            SupportedSql,
            USmallInt,
        );
        register(InfoId::ALTER_TABLE.0, "SQL_ALTER_TABLE", SupportedSql, UInt);
        register(InfoId::PROCEDURES.0, "SQL_PROCEDURES", SupportedSql, StringYesNo);

        // SQL limits
        register(
            InfoId::MAX_CATALOG_NAME_LEN.0,
            "SQL_MAX_CATALOG_NAME_LEN",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_SCHEMA_NAME_LEN.0,
            "SQL_MAX_SCHEMA_NAME_LEN",
            SqlLimits,
            USmallInt,
        );
        register(InfoId::MAX_TABLE_NAME_LEN.0, "SQL_MAX_TABLE_NAME_LEN", SqlLimits, USmallInt);
        register(
            InfoId::MAX_COLUMN_NAME_LEN.0,
            "SQL_MAX_COLUMN_NAME_LEN",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_CURSOR_NAME_LEN.0,
            "SQL_MAX_CURSOR_NAME_LEN",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_PROCEDURE_NAME_LEN.0,
            "SQL_MAX_PROCEDURE_NAME_LEN",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_USER_NAME_LEN.0,
            "SQL_MAX_USER_NAME_LEN",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_COLUMNS_IN_GROUP_BY.0,
            "SQL_MAX_COLUMNS_IN_GROUP_BY",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_COLUMNS_IN_INDEX.0,
            "SQL_MAX_COLUMNS_IN_INDEX",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_COLUMNS_IN_ORDER_BY.0,
            "SQL_MAX_COLUMNS_IN_ORDER_BY",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_COLUMNS_IN_SELECT.0,
            "SQL_MAX_COLUMNS_IN_SELECT",
            SqlLimits,
            USmallInt,
        );
        register(
            InfoId::MAX_COLUMNS_IN_TABLE.0,
            "SQL_MAX_COLUMNS_IN_TABLE",
            SqlLimits,
            USmallInt,
        );
        register(InfoId::MAX_INDEX_SIZE.0, "SQL_MAX_INDEX_SIZE", SqlLimits, UInt);
        register(InfoId::MAX_ROW_SIZE.0, "SQL_MAX_ROW_SIZE", SqlLimits, UInt);
        register(InfoId::MAX_STATEMENT_LEN.0, "SQL_MAX_STATEMENT_LEN", SqlLimits, UInt);
        register(
            InfoId::MAX_TABLES_IN_SELECT.0,
            "SQL_MAX_TABLES_IN_SELECT",
            SqlLimits,
            USmallInt,
        );

        // Scalar functions
        register(
            InfoId::CONVERT_FUNCTIONS.0,
            "SQL_CONVERT_FUNCTIONS",
            ScalarFunction,
            UInt,
        );
        register(
            InfoId::NUMERIC_FUNCTIONS.0,
            "SQL_NUMERIC_FUNCTIONS",
            ScalarFunction,
            UInt,
        );
        register(InfoId::STRING_FUNCTIONS.0, "SQL_STRING_FUNCTIONS", ScalarFunction, UInt);
        register(InfoId::SYSTEM_FUNCTIONS.0, "SQL_SYSTEM_FUNCTIONS", ScalarFunction, UInt);
        register(
            InfoId::TIMEDATE_FUNCTIONS.0,
            "SQL_TIMEDATE_FUNCTIONS",
            ScalarFunction,
            UInt,
        );

        // Conversion targets
        register(InfoId::CONVERT_BIGINT.0, "SQL_CONVERT_BIGINT", Conversion, UInt);
        register(InfoId::CONVERT_BINARY.0, "SQL_CONVERT_BINARY", Conversion, UInt);
        register(InfoId::CONVERT_BIT.0, "SQL_CONVERT_BIT", Conversion, UInt);
        register(InfoId::CONVERT_CHAR.0, "SQL_CONVERT_CHAR", Conversion, UInt);
        register(InfoId::CONVERT_DATE.0, "SQL_CONVERT_DATE", Conversion, UInt);
        register(InfoId::CONVERT_DECIMAL.0, "SQL_CONVERT_DECIMAL", Conversion, UInt);
        register(InfoId::CONVERT_DOUBLE.0, "SQL_CONVERT_DOUBLE", Conversion, UInt);
        register(InfoId::CONVERT_FLOAT.0, "SQL_CONVERT_FLOAT", Conversion, UInt);
        register(InfoId::CONVERT_INTEGER.0, "SQL_CONVERT_INTEGER", Conversion, UInt);
        register(
            InfoId::CONVERT_LONGVARCHAR.0,
            "SQL_CONVERT_LONGVARCHAR",
            Conversion,
            UInt,
        );
        register(InfoId::CONVERT_NUMERIC.0, "SQL_CONVERT_NUMERIC", Conversion, UInt);
        register(InfoId::CONVERT_REAL.0, "SQL_CONVERT_REAL", Conversion, UInt);
        register(InfoId::CONVERT_SMALLINT.0, "SQL_CONVERT_SMALLINT", Conversion, UInt);
        register(InfoId::CONVERT_TIME.0, "SQL_CONVERT_TIME", Conversion, UInt);
        register(
            InfoId::CONVERT_TIMESTAMP.0,
            "SQL_CONVERT_TIMESTAMP",
            Conversion,
            UInt,
        );
        register(InfoId::CONVERT_TINYINT.0, "SQL_CONVERT_TINYINT", Conversion, UInt);
        register(
            InfoId::CONVERT_VARBINARY.0,
            "SQL_CONVERT_VARBINARY",
            Conversion,
            UInt,
        );
        register(InfoId::CONVERT_VARCHAR.0, "SQL_CONVERT_VARCHAR", Conversion, UInt);
        register(
            InfoId::CONVERT_LONGVARBINARY.0,
            "SQL_CONVERT_LONGVARBINARY",
            Conversion,
            UInt,
        );

        if odbc_version >= OdbcVersion::V3 {
            register(InfoId::CATALOG_NAME.0, "SQL_CATALOG_NAME", DataSource, StringYesNo);
            register(
                InfoId::DESCRIBE_PARAMETER.0,
                "SQL_DESCRIBE_PARAMETER",
                DataSource,
                StringYesNo,
            );
            register(
                InfoId::CURSOR_SENSITIVITY.0,
                "SQL_CURSOR_SENSITIVITY",
                DataSource,
                UInt,
            );
            register(InfoId::COLLATION_SEQ.0, "SQL_COLLATION_SEQ", DataSource, StringAny);
            register(InfoId::XOPEN_CLI_YEAR.0, "SQL_XOPEN_CLI_YEAR", Driver, StringAny);
            register(
                InfoId::MAX_IDENTIFIER_LEN.0,
                "SQL_MAX_IDENTIFIER_LEN",
                SqlLimits,
                USmallInt,
            );
        }
    }

    /// Reads all registered properties from the passed connection handle. Does not fail: a
    /// property the driver rejects is marked unsupported and a warning is logged.
    pub fn read_all(&self, connection: &Connection) {
        let ids: Vec<u16> = self.props.borrow().keys().copied().collect();
        for id in ids {
            let mut props = self.props.borrow_mut();
            let property = props.get_mut(&id).unwrap();
            if let Err(error) = property.read(connection) {
                warn!(
                    "Failed to read info property {} ({}), marking it unsupported: {}",
                    property.name, id, error
                );
                property.unsupported = true;
            }
        }
    }

    /// Reads a single property from the passed connection handle, unless it has already been
    /// read. If `force_update` is set the property is read unconditionally.
    pub fn ensure_property_read(
        &self,
        connection: &Connection,
        info_id: InfoId,
        force_update: bool,
    ) -> Result<(), Error> {
        let mut props = self.props.borrow_mut();
        let property = props
            .get_mut(&info_id.0)
            .ok_or_else(|| Error::NotFound(format!("Info property {} is not registered.", info_id.0)))?;
        if !property.value_read || force_update {
            property.read(connection)?;
        }
        Ok(())
    }

    /// Return a property by id. The property must have been registered before.
    pub fn property(&self, info_id: InfoId) -> Result<SqlInfoProperty, Error> {
        self.props
            .borrow()
            .get(&info_id.0)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Info property {} is not registered.", info_id.0)))
    }

    /// `true` if a property with the passed id is registered.
    pub fn is_registered(&self, info_id: InfoId) -> bool {
        self.props.borrow().contains_key(&info_id.0)
    }

    /// All properties of one category, ordered by name.
    pub fn subset(&self, category: InfoCategory) -> Vec<SqlInfoProperty> {
        let mut subset: Vec<_> = self
            .props
            .borrow()
            .values()
            .filter(|p| p.category == category)
            .cloned()
            .collect();
        subset.sort_by(|a, b| a.name.cmp(b.name));
        subset
    }

    /// Number of registered properties.
    pub fn property_count(&self) -> usize {
        self.props.borrow().len()
    }

    /// Drops all registered properties.
    pub fn reset(&self) {
        self.props.borrow_mut().clear();
    }

    fn value_u16(&self, info_id: InfoId) -> u16 {
        match self.props.borrow().get(&info_id.0).map(|p| &p.value) {
            Some(PropertyValue::USmallInt(v)) => *v,
            _ => 0,
        }
    }

    fn value_u32(&self, info_id: InfoId) -> u32 {
        match self.props.borrow().get(&info_id.0).map(|p| &p.value) {
            Some(PropertyValue::UInt(v)) => *v,
            _ => 0,
        }
    }

    fn value_string(&self, info_id: InfoId) -> String {
        match self.props.borrow().get(&info_id.0).map(|p| &p.value) {
            Some(PropertyValue::String(v)) => v.clone(),
            _ => String::new(),
        }
    }

    /// Value of the `SQL_DBMS_NAME` property.
    pub fn dbms_name(&self) -> String {
        self.value_string(InfoId::DBMS_NAME)
    }

    /// Value of the `SQL_DRIVER_NAME` property.
    pub fn driver_name(&self) -> String {
        self.value_string(InfoId::DRIVER_NAME)
    }

    /// Try to match the reported DBMS name to a known product.
    pub fn detect_dbms(&self) -> DatabaseProduct {
        DatabaseProduct::from_dbms_name(&self.dbms_name())
    }

    /// Parses the string value of `SQL_DRIVER_ODBC_VER` (`"##.##"`) into an [`OdbcVersion`].
    /// Returns [`OdbcVersion::Unknown`] if the string cannot be parsed.
    pub fn driver_odbc_version(&self) -> OdbcVersion {
        let value = self.value_string(InfoId::DRIVER_ODBC_VER);
        let mut parts = value.split('.');
        let major: u32 = match parts.next().and_then(|p| p.parse().ok()) {
            Some(m) => m,
            None => return OdbcVersion::Unknown,
        };
        let minor: u32 = match parts.next().and_then(|p| p.parse().ok()) {
            Some(m) => m,
            None => return OdbcVersion::Unknown,
        };
        match (major, minor) {
            (3.., 80..) => OdbcVersion::V3_8,
            (3.., _) => OdbcVersion::V3,
            (2, _) => OdbcVersion::V2,
            _ => OdbcVersion::Unknown,
        }
    }

    /// Checks that the value of `SQL_TXN_CAPABLE` is not `SQL_TC_NONE`.
    pub fn supports_transactions(&self) -> bool {
        // SQL_TC_NONE == 0
        self.value_u16(InfoId::TXN_CAPABLE) != 0
    }

    /// Bitmask of the isolation levels the driver supports (`SQL_TXN_ISOLATION_OPTION`).
    pub fn supported_isolation_levels(&self) -> u32 {
        self.value_u32(InfoId::TXN_ISOLATION_OPTION)
    }

    /// `true` if the data source has a notion of catalogs: the catalog term is non-empty and,
    /// from ODBC 3 on, `SQL_CATALOG_NAME` answers `"Y"`.
    pub fn supports_catalogs(&self) -> bool {
        let term_non_empty = !self.value_string(InfoId::CATALOG_TERM).is_empty();
        if self.is_registered(InfoId::CATALOG_NAME) {
            term_non_empty && self.value_string(InfoId::CATALOG_NAME) == "Y"
        } else {
            term_non_empty
        }
    }

    /// `true` if the data source has a notion of schemas. An empty schema term indicates no
    /// support.
    pub fn supports_schemas(&self) -> bool {
        !self.value_string(InfoId::SCHEMA_TERM).is_empty()
    }

    /// Vocabulary the data source uses for a schema, e.g. `"owner"`.
    pub fn schema_term(&self) -> String {
        self.value_string(InfoId::SCHEMA_TERM)
    }

    /// Vocabulary the data source uses for a catalog, e.g. `"database"`.
    pub fn catalog_term(&self) -> String {
        self.value_string(InfoId::CATALOG_TERM)
    }

    /// The escape character which turns `_` and `%` into literals within pattern value
    /// arguments.
    pub fn search_pattern_escape(&self) -> String {
        self.value_string(InfoId::SEARCH_PATTERN_ESCAPE)
    }

    /// Reported maximum length of catalog names, or a default of 128 if the driver reports `0`.
    pub fn max_catalog_name_len(&self) -> u16 {
        non_zero_or_default(self.value_u16(InfoId::MAX_CATALOG_NAME_LEN))
    }

    /// Reported maximum length of schema names, or a default of 128 if the driver reports `0`.
    pub fn max_schema_name_len(&self) -> u16 {
        non_zero_or_default(self.value_u16(InfoId::MAX_SCHEMA_NAME_LEN))
    }

    /// Reported maximum length of table names, or a default of 128 if the driver reports `0`.
    pub fn max_table_name_len(&self) -> u16 {
        non_zero_or_default(self.value_u16(InfoId::MAX_TABLE_NAME_LEN))
    }

    /// Reported maximum length of column names, or a default of 128 if the driver reports `0`.
    pub fn max_column_name_len(&self) -> u16 {
        non_zero_or_default(self.value_u16(InfoId::MAX_COLUMN_NAME_LEN))
    }

    #[cfg(test)]
    pub(crate) fn set_value_for_test(&self, info_id: InfoId, value: PropertyValue) {
        let mut props = self.props.borrow_mut();
        let property = props.get_mut(&info_id.0).expect("property must be registered");
        property.value = value;
        property.value_read = true;
    }
}

fn non_zero_or_default(reported: u16) -> u16 {
    if reported == 0 {
        MAX_NAME_LEN_DEFAULT
    } else {
        reported
    }
}

#[cfg(test)]
mod tests {
    use super::{PropertyValue, SqlInfoProperties};
    use crate::{environment::OdbcVersion, handles::InfoId, quirks::DatabaseProduct};

    fn registered() -> SqlInfoProperties {
        let props = SqlInfoProperties::new();
        props.register_all(OdbcVersion::V3_8);
        props
    }

    #[test]
    fn defaults_before_any_read() {
        let props = registered();
        assert_eq!(DatabaseProduct::Unknown, props.detect_dbms());
        assert_eq!(OdbcVersion::Unknown, props.driver_odbc_version());
        assert!(!props.supports_transactions());
        assert!(!props.supports_catalogs());
        assert!(!props.supports_schemas());
        // Name lengths fall back to the documented default when the driver reports 0.
        assert_eq!(128, props.max_table_name_len());
        assert_eq!(128, props.max_catalog_name_len());
    }

    #[test]
    fn driver_odbc_version_parsing() {
        let props = registered();
        let cases = [
            ("03.80", OdbcVersion::V3_8),
            ("03.81", OdbcVersion::V3_8),
            ("03.52", OdbcVersion::V3),
            ("02.00", OdbcVersion::V2),
            ("01.00", OdbcVersion::Unknown),
            ("garbage", OdbcVersion::Unknown),
            ("3", OdbcVersion::Unknown),
        ];
        for (text, expected) in cases {
            props.set_value_for_test(
                InfoId::DRIVER_ODBC_VER,
                PropertyValue::String(text.to_string()),
            );
            assert_eq!(expected, props.driver_odbc_version(), "parsing '{text}'");
        }
    }

    #[test]
    fn catalog_support_requires_term_and_name() {
        let props = registered();
        props.set_value_for_test(
            InfoId::CATALOG_TERM,
            PropertyValue::String("database".to_string()),
        );
        // SQL_CATALOG_NAME still answers "N".
        assert!(!props.supports_catalogs());
        props.set_value_for_test(InfoId::CATALOG_NAME, PropertyValue::String("Y".to_string()));
        assert!(props.supports_catalogs());
    }

    #[test]
    fn schema_support_follows_term() {
        let props = registered();
        assert!(!props.supports_schemas());
        props.set_value_for_test(InfoId::SCHEMA_TERM, PropertyValue::String("owner".to_string()));
        assert!(props.supports_schemas());
    }

    #[test]
    fn transaction_support_follows_txn_capable() {
        let props = registered();
        assert!(!props.supports_transactions());
        // SQL_TC_DML
        props.set_value_for_test(InfoId::TXN_CAPABLE, PropertyValue::USmallInt(1));
        assert!(props.supports_transactions());
    }

    #[test]
    fn odbc2_environment_skips_odbc3_ids() {
        let props = SqlInfoProperties::new();
        props.register_all(OdbcVersion::V2);
        assert!(!props.is_registered(InfoId::CATALOG_NAME));
        assert!(props.is_registered(InfoId::DBMS_NAME));
    }
}
