//! Entry points of the ODBC C API which `odbc-sys` either does not declare or declares with a
//! signature too narrow for this crate.
//!
//! `SQLGetInfoW` is bound with a plain `u16` info id: the info property registry works with the
//! full set of `SQL_*` info ids while the `InfoType` enumeration of `odbc-sys` only covers a
//! subset of them. The catalog functions for primary keys, special columns and type info are not
//! declared by `odbc-sys` at all. The symbols resolve through the driver manager library
//! `odbc-sys` links anyway.

use odbc_sys::{HDbc, HStmt, Pointer, SqlReturn};

/// Identifies a piece of driver or data source information obtainable through `SQLGetInfoW`.
///
/// The constants carry the values of the corresponding `SQL_*` defines of the ODBC headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InfoId(pub u16);

impl InfoId {
    pub const MAX_DRIVER_CONNECTIONS: InfoId = InfoId(0);
    pub const MAX_CONCURRENT_ACTIVITIES: InfoId = InfoId(1);
    pub const DATA_SOURCE_NAME: InfoId = InfoId(2);
    pub const DRIVER_NAME: InfoId = InfoId(6);
    pub const DRIVER_VER: InfoId = InfoId(7);
    pub const ODBC_VER: InfoId = InfoId(10);
    pub const SERVER_NAME: InfoId = InfoId(13);
    pub const SEARCH_PATTERN_ESCAPE: InfoId = InfoId(14);
    pub const DATABASE_NAME: InfoId = InfoId(16);
    pub const DBMS_NAME: InfoId = InfoId(17);
    pub const DBMS_VER: InfoId = InfoId(18);
    pub const ACCESSIBLE_TABLES: InfoId = InfoId(19);
    pub const ACCESSIBLE_PROCEDURES: InfoId = InfoId(20);
    pub const PROCEDURE_TERM: InfoId = InfoId(21);
    pub const CONCAT_NULL_BEHAVIOR: InfoId = InfoId(22);
    pub const CURSOR_COMMIT_BEHAVIOR: InfoId = InfoId(23);
    pub const CURSOR_ROLLBACK_BEHAVIOR: InfoId = InfoId(24);
    pub const DATA_SOURCE_READ_ONLY: InfoId = InfoId(25);
    pub const DEFAULT_TXN_ISOLATION: InfoId = InfoId(26);
    pub const IDENTIFIER_CASE: InfoId = InfoId(28);
    pub const IDENTIFIER_QUOTE_CHAR: InfoId = InfoId(29);
    pub const MAX_COLUMN_NAME_LEN: InfoId = InfoId(30);
    pub const MAX_CURSOR_NAME_LEN: InfoId = InfoId(31);
    pub const MAX_SCHEMA_NAME_LEN: InfoId = InfoId(32);
    pub const MAX_PROCEDURE_NAME_LEN: InfoId = InfoId(33);
    pub const MAX_CATALOG_NAME_LEN: InfoId = InfoId(34);
    pub const MAX_TABLE_NAME_LEN: InfoId = InfoId(35);
    pub const MULT_RESULT_SETS: InfoId = InfoId(36);
    pub const MULTIPLE_ACTIVE_TXN: InfoId = InfoId(37);
    pub const OUTER_JOINS: InfoId = InfoId(38);
    pub const SCHEMA_TERM: InfoId = InfoId(39);
    pub const PROCEDURES: InfoId = InfoId(40);
    pub const CATALOG_NAME_SEPARATOR: InfoId = InfoId(41);
    pub const CATALOG_TERM: InfoId = InfoId(42);
    pub const SCROLL_CONCURRENCY: InfoId = InfoId(43);
    pub const SCROLL_OPTIONS: InfoId = InfoId(44);
    pub const TABLE_TERM: InfoId = InfoId(45);
    pub const TXN_CAPABLE: InfoId = InfoId(46);
    pub const USER_NAME: InfoId = InfoId(47);
    pub const CONVERT_FUNCTIONS: InfoId = InfoId(48);
    pub const NUMERIC_FUNCTIONS: InfoId = InfoId(49);
    pub const STRING_FUNCTIONS: InfoId = InfoId(50);
    pub const SYSTEM_FUNCTIONS: InfoId = InfoId(51);
    pub const TIMEDATE_FUNCTIONS: InfoId = InfoId(52);
    pub const CONVERT_BIGINT: InfoId = InfoId(53);
    pub const CONVERT_BINARY: InfoId = InfoId(54);
    pub const CONVERT_BIT: InfoId = InfoId(55);
    pub const CONVERT_CHAR: InfoId = InfoId(56);
    pub const CONVERT_DATE: InfoId = InfoId(57);
    pub const CONVERT_DECIMAL: InfoId = InfoId(58);
    pub const CONVERT_DOUBLE: InfoId = InfoId(59);
    pub const CONVERT_FLOAT: InfoId = InfoId(60);
    pub const CONVERT_INTEGER: InfoId = InfoId(61);
    pub const CONVERT_LONGVARCHAR: InfoId = InfoId(62);
    pub const CONVERT_NUMERIC: InfoId = InfoId(63);
    pub const CONVERT_REAL: InfoId = InfoId(64);
    pub const CONVERT_SMALLINT: InfoId = InfoId(65);
    pub const CONVERT_TIME: InfoId = InfoId(66);
    pub const CONVERT_TIMESTAMP: InfoId = InfoId(67);
    pub const CONVERT_TINYINT: InfoId = InfoId(68);
    pub const CONVERT_VARBINARY: InfoId = InfoId(69);
    pub const CONVERT_VARCHAR: InfoId = InfoId(70);
    pub const CONVERT_LONGVARBINARY: InfoId = InfoId(71);
    pub const TXN_ISOLATION_OPTION: InfoId = InfoId(72);
    pub const CORRELATION_NAME: InfoId = InfoId(74);
    pub const NON_NULLABLE_COLUMNS: InfoId = InfoId(75);
    pub const DRIVER_ODBC_VER: InfoId = InfoId(77);
    pub const GETDATA_EXTENSIONS: InfoId = InfoId(81);
    pub const NULL_COLLATION: InfoId = InfoId(85);
    pub const ALTER_TABLE: InfoId = InfoId(86);
    pub const ORDER_BY_COLUMNS_IN_SELECT: InfoId = InfoId(90);
    pub const SPECIAL_CHARACTERS: InfoId = InfoId(94);
    pub const MAX_COLUMNS_IN_GROUP_BY: InfoId = InfoId(97);
    pub const MAX_COLUMNS_IN_INDEX: InfoId = InfoId(98);
    pub const MAX_COLUMNS_IN_ORDER_BY: InfoId = InfoId(99);
    pub const MAX_COLUMNS_IN_SELECT: InfoId = InfoId(100);
    pub const MAX_COLUMNS_IN_TABLE: InfoId = InfoId(101);
    pub const MAX_INDEX_SIZE: InfoId = InfoId(102);
    pub const MAX_ROW_SIZE: InfoId = InfoId(104);
    pub const MAX_STATEMENT_LEN: InfoId = InfoId(105);
    pub const MAX_TABLES_IN_SELECT: InfoId = InfoId(106);
    pub const MAX_USER_NAME_LEN: InfoId = InfoId(107);
    pub const OUTER_JOIN_CAPABILITIES: InfoId = InfoId(115);
    pub const XOPEN_CLI_YEAR: InfoId = InfoId(10000);
    pub const CURSOR_SENSITIVITY: InfoId = InfoId(10001);
    pub const DESCRIBE_PARAMETER: InfoId = InfoId(10002);
    pub const CATALOG_NAME: InfoId = InfoId(10003);
    pub const COLLATION_SEQ: InfoId = InfoId(10004);
    pub const MAX_IDENTIFIER_LEN: InfoId = InfoId(10005);
}

/// `SQL_ATTR_TRACE`. Process level driver manager tracing switch.
pub const ATTR_TRACE: i32 = 104;
/// `SQL_ATTR_TRACEFILE`. Path of the driver manager trace file.
pub const ATTR_TRACEFILE: i32 = 105;
/// `SQL_ATTR_TXN_ISOLATION`. Transaction isolation level of a connection.
pub const ATTR_TXN_ISOLATION: i32 = 108;
/// `SQL_ATTR_CURSOR_SCROLLABLE`. Whether cursors on a statement support positioned fetches.
pub const ATTR_CURSOR_SCROLLABLE: i32 = -1;
/// `SQL_ATTR_METADATA_ID`. Whether catalog arguments are treated as identifiers or patterns.
pub const ATTR_METADATA_ID: i32 = 10014;
/// `SQL_ATTR_APP_ROW_DESC`.
pub const ATTR_APP_ROW_DESC: i32 = 10010;
/// `SQL_ATTR_APP_PARAM_DESC`.
pub const ATTR_APP_PARAM_DESC: i32 = 10011;

/// Value of `SQL_ATTR_CURSOR_SCROLLABLE` for forward only cursors (`SQL_NONSCROLLABLE`).
pub const NONSCROLLABLE: usize = 0;
/// Value of `SQL_ATTR_CURSOR_SCROLLABLE` for scrollable cursors (`SQL_SCROLLABLE`).
pub const SCROLLABLE: usize = 1;

// The `W` suffixed wide variants, linked through the driver manager. The attribute accessors are
// also declared by `odbc-sys` with enum typed attribute arguments of identical representation.
#[allow(clashing_extern_declarations)]
extern "system" {
    pub fn SQLGetInfoW(
        connection_handle: HDbc,
        info_type: u16,
        info_value_ptr: Pointer,
        buffer_length: i16,
        string_length_ptr: *mut i16,
    ) -> SqlReturn;

    pub fn SQLPrimaryKeysW(
        statement_handle: HStmt,
        catalog_name: *const u16,
        catalog_name_length: i16,
        schema_name: *const u16,
        schema_name_length: i16,
        table_name: *const u16,
        table_name_length: i16,
    ) -> SqlReturn;

    pub fn SQLSpecialColumnsW(
        statement_handle: HStmt,
        identifier_type: u16,
        catalog_name: *const u16,
        catalog_name_length: i16,
        schema_name: *const u16,
        schema_name_length: i16,
        table_name: *const u16,
        table_name_length: i16,
        scope: u16,
        nullable: u16,
    ) -> SqlReturn;

    pub fn SQLGetTypeInfoW(statement_handle: HStmt, data_type: i16) -> SqlReturn;

    pub fn SQLFetchScroll(
        statement_handle: HStmt,
        fetch_orientation: odbc_sys::FetchOrientation,
        fetch_offset: isize,
    ) -> SqlReturn;

    // Attribute accessors bound with a plain `i32` attribute argument. The enumerations
    // `odbc-sys` types these with do not know the attributes this crate manages (scrollable
    // cursors, metadata id, transaction isolation, driver manager tracing).
    pub fn SQLSetConnectAttrW(
        connection_handle: HDbc,
        attribute: i32,
        value: Pointer,
        string_length: i32,
    ) -> SqlReturn;

    pub fn SQLGetConnectAttrW(
        connection_handle: HDbc,
        attribute: i32,
        value: Pointer,
        buffer_length: i32,
        string_length_ptr: *mut i32,
    ) -> SqlReturn;

    pub fn SQLSetStmtAttrW(
        statement_handle: HStmt,
        attribute: i32,
        value: Pointer,
        string_length: i32,
    ) -> SqlReturn;

    pub fn SQLGetStmtAttrW(
        statement_handle: HStmt,
        attribute: i32,
        value: Pointer,
        buffer_length: i32,
        string_length_ptr: *mut i32,
    ) -> SqlReturn;
}

/// Argument to [`SQLGetTypeInfoW`] requesting information about every SQL type the data source
/// supports.
pub const ALL_TYPES: i16 = 0;
