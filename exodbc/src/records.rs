//! Strongly typed records over the rows of the ODBC catalog result sets.
//!
//! Each record type reads itself from the current row of a positioned result set with
//! `SQLGetData`, sizing its string buffers from the name length properties of the connection.
//! Every field the ODBC specification allows to be NULL is carried as an `Option`.

use std::fmt;

use crate::{
    error::Error,
    handles::Statement,
    info::SqlInfoProperties,
    quirks::DatabaseProduct,
};

/// Buffer size used to fetch table types and similar short enumeration strings.
const MAX_TABLE_TYPE_LEN: usize = 128;
/// Buffer size used to fetch remark columns.
const MAX_REMARKS_LEN: usize = 512;
/// Buffer size used to fetch type names, literal prefixes and similar driver vocabulary.
const MAX_TYPE_NAME_LEN: usize = 128;

fn required_string(
    statement: &Statement,
    column_number: u16,
    max_len: usize,
    column: &str,
) -> Result<String, Error> {
    statement
        .get_data_string(column_number, max_len)
        .into_result(statement)?
        .ok_or_else(|| Error::NullValue {
            column: column.to_string(),
        })
}

fn required_i16(statement: &Statement, column_number: u16, column: &str) -> Result<i16, Error> {
    statement
        .get_data_i16(column_number)
        .into_result(statement)?
        .ok_or_else(|| Error::NullValue {
            column: column.to_string(),
        })
}

fn required_i32(statement: &Statement, column_number: u16, column: &str) -> Result<i32, Error> {
    statement
        .get_data_i32(column_number)
        .into_result(statement)?
        .ok_or_else(|| Error::NullValue {
            column: column.to_string(),
        })
}

/// One row of a `SQLTables` result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    catalog: Option<String>,
    schema: Option<String>,
    name: String,
    table_type: String,
    remarks: Option<String>,
    dbms: DatabaseProduct,
}

impl TableInfo {
    /// Reads all columns from the current row of the positioned result set over `statement`.
    pub fn from_result_set(
        statement: &Statement,
        props: &SqlInfoProperties,
    ) -> Result<Self, Error> {
        let catalog = statement
            .get_data_string(1, props.max_catalog_name_len() as usize)
            .into_result(statement)?;
        let schema = statement
            .get_data_string(2, props.max_schema_name_len() as usize)
            .into_result(statement)?;
        let name = required_string(
            statement,
            3,
            props.max_table_name_len() as usize,
            "TABLE_NAME",
        )?;
        let table_type = statement
            .get_data_string(4, MAX_TABLE_TYPE_LEN)
            .into_result(statement)?
            .unwrap_or_default();
        let remarks = statement
            .get_data_string(5, MAX_REMARKS_LEN)
            .into_result(statement)?;
        Ok(TableInfo {
            catalog,
            schema,
            name,
            table_type,
            remarks,
            dbms: props.detect_dbms(),
        })
    }

    /// Constructor used to build table infos from components, e.g. in tests or when the caller
    /// already knows the table coordinates.
    pub fn new(
        catalog: Option<String>,
        schema: Option<String>,
        name: String,
        table_type: String,
        remarks: Option<String>,
        dbms: DatabaseProduct,
    ) -> Self {
        TableInfo {
            catalog,
            schema,
            name,
            table_type,
            remarks,
            dbms,
        }
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_type(&self) -> &str {
        &self.table_type
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// Computes the identifier to use for this table within a query. Access expects the bare
    /// table name, Excel wants the name wrapped in brackets, everything else gets the fully
    /// qualified form built from the components available.
    pub fn query_name(&self) -> String {
        assert!(!self.name.is_empty());

        match self.dbms {
            DatabaseProduct::Access => self.name.clone(),
            DatabaseProduct::Excel => format!("[{}]", self.name),
            _ => {
                let mut parts = Vec::new();
                if let Some(catalog) = &self.catalog {
                    parts.push(catalog.as_str());
                }
                if let Some(schema) = &self.schema {
                    parts.push(schema.as_str());
                }
                parts.push(&self.name);
                parts.join(".")
            }
        }
    }

    /// Splits a fully qualified identifier as produced by [`TableInfo::query_name`] back into
    /// its `(catalog, schema, name)` components.
    ///
    /// The inverse only holds for DBMS families using dotted qualification; Access and Excel
    /// names come back as a bare name. A two-part identifier is interpreted as `schema.name`,
    /// matching how [`TableInfo::query_name`] drops an absent catalog.
    pub fn parse(query_name: &str) -> (Option<&str>, Option<&str>, &str) {
        let mut components = query_name.rsplit('.');
        // `rsplit` yields at least one element, even for the empty string.
        let name = components.next().unwrap();
        let schema = components.next();
        let catalog = components.next();
        (catalog, schema, name)
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: '{}'; Schema: '{}'; Catalog: '{}'; Type: '{}'",
            self.name,
            self.schema.as_deref().unwrap_or("NULL"),
            self.catalog.as_deref().unwrap_or("NULL"),
            self.table_type
        )
    }
}

/// One row of a `SQLColumns` result set. The field set mirrors the eighteen columns the call
/// defines, ordered by ordinal position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table_name: String,
    pub column_name: String,
    pub data_type: i16,
    pub type_name: String,
    pub column_size: Option<i32>,
    pub buffer_length: Option<i32>,
    pub decimal_digits: Option<i16>,
    pub num_prec_radix: Option<i16>,
    pub nullable: i16,
    pub remarks: Option<String>,
    pub column_default: Option<String>,
    pub sql_data_type: i16,
    pub sql_datetime_sub: Option<i16>,
    pub char_octet_length: Option<i32>,
    pub ordinal_position: i32,
    pub is_nullable: Option<String>,
}

impl ColumnInfo {
    /// Reads all columns from the current row of the positioned result set over `statement`.
    pub fn from_result_set(
        statement: &Statement,
        props: &SqlInfoProperties,
    ) -> Result<Self, Error> {
        Ok(ColumnInfo {
            catalog: statement
                .get_data_string(1, props.max_catalog_name_len() as usize)
                .into_result(statement)?,
            schema: statement
                .get_data_string(2, props.max_schema_name_len() as usize)
                .into_result(statement)?,
            table_name: required_string(
                statement,
                3,
                props.max_table_name_len() as usize,
                "TABLE_NAME",
            )?,
            column_name: required_string(
                statement,
                4,
                props.max_column_name_len() as usize,
                "COLUMN_NAME",
            )?,
            data_type: required_i16(statement, 5, "DATA_TYPE")?,
            type_name: required_string(statement, 6, MAX_TYPE_NAME_LEN, "TYPE_NAME")?,
            column_size: statement.get_data_i32(7).into_result(statement)?,
            buffer_length: statement.get_data_i32(8).into_result(statement)?,
            decimal_digits: statement.get_data_i16(9).into_result(statement)?,
            num_prec_radix: statement.get_data_i16(10).into_result(statement)?,
            nullable: required_i16(statement, 11, "NULLABLE")?,
            remarks: statement
                .get_data_string(12, MAX_REMARKS_LEN)
                .into_result(statement)?,
            column_default: statement
                .get_data_string(13, MAX_REMARKS_LEN)
                .into_result(statement)?,
            sql_data_type: required_i16(statement, 14, "SQL_DATA_TYPE")?,
            sql_datetime_sub: statement.get_data_i16(15).into_result(statement)?,
            char_octet_length: statement.get_data_i32(16).into_result(statement)?,
            ordinal_position: required_i32(statement, 17, "ORDINAL_POSITION")?,
            is_nullable: statement.get_data_string(18, 4).into_result(statement)?,
        })
    }

    /// The name to use for this column within a query.
    pub fn query_name(&self) -> &str {
        &self.column_name
    }
}

/// One row of a `SQLPrimaryKeys` result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyInfo {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table_name: String,
    pub column_name: String,
    /// Column sequence number within the key, starting at 1.
    pub key_sequence: i16,
    pub primary_key_name: Option<String>,
}

impl PrimaryKeyInfo {
    /// Reads all columns from the current row of the positioned result set over `statement`.
    pub fn from_result_set(
        statement: &Statement,
        props: &SqlInfoProperties,
    ) -> Result<Self, Error> {
        Ok(PrimaryKeyInfo {
            catalog: statement
                .get_data_string(1, props.max_catalog_name_len() as usize)
                .into_result(statement)?,
            schema: statement
                .get_data_string(2, props.max_schema_name_len() as usize)
                .into_result(statement)?,
            table_name: required_string(
                statement,
                3,
                props.max_table_name_len() as usize,
                "TABLE_NAME",
            )?,
            column_name: required_string(
                statement,
                4,
                props.max_column_name_len() as usize,
                "COLUMN_NAME",
            )?,
            key_sequence: required_i16(statement, 5, "KEY_SEQ")?,
            primary_key_name: statement
                .get_data_string(6, MAX_TYPE_NAME_LEN)
                .into_result(statement)?,
        })
    }
}

/// Scope for which a row id returned by `SQLSpecialColumns` stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowIdScope {
    /// Valid only while the cursor is positioned on the row (`SQL_SCOPE_CURROW`).
    Cursor,
    /// Valid for the duration of the transaction (`SQL_SCOPE_TRANSACTION`).
    Transaction,
    /// Valid across transaction boundaries (`SQL_SCOPE_SESSION`).
    Session,
}

impl RowIdScope {
    /// The wire value of the scope, as passed to and answered by `SQLSpecialColumns`.
    pub fn to_i16(self) -> i16 {
        match self {
            RowIdScope::Cursor => 0,
            RowIdScope::Transaction => 1,
            RowIdScope::Session => 2,
        }
    }

    fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(RowIdScope::Cursor),
            1 => Some(RowIdScope::Transaction),
            2 => Some(RowIdScope::Session),
            _ => None,
        }
    }
}

/// Whether a special column is a pseudo column, like Oracle's `ROWID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PseudoColumn {
    #[default]
    Unknown,
    NotPseudo,
    Pseudo,
}

impl PseudoColumn {
    fn from_i16(value: i16) -> Self {
        match value {
            1 => PseudoColumn::NotPseudo,
            2 => PseudoColumn::Pseudo,
            _ => PseudoColumn::Unknown,
        }
    }
}

/// Which set of special columns to ask `SQLSpecialColumns` for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierType {
    /// The optimal set of columns identifying a row uniquely (`SQL_BEST_ROWID`).
    RowUnique,
    /// Columns updated automatically when any value in the row changes (`SQL_ROWVER`).
    AutoUpdated,
}

impl IdentifierType {
    pub fn to_u16(self) -> u16 {
        match self {
            IdentifierType::RowUnique => 1,
            IdentifierType::AutoUpdated => 2,
        }
    }
}

/// One row of a `SQLSpecialColumns` result set.
///
/// The `SCOPE` column is documented to be NULL for row version requests, so the record carries
/// the scope as an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialColumnInfo {
    pub scope: Option<RowIdScope>,
    pub column_name: String,
    pub data_type: i16,
    pub type_name: String,
    pub column_size: Option<i32>,
    pub buffer_length: Option<i32>,
    pub decimal_digits: Option<i16>,
    pub pseudo_column: PseudoColumn,
}

impl SpecialColumnInfo {
    /// Reads all columns from the current row of the positioned result set over `statement`.
    pub fn from_result_set(
        statement: &Statement,
        props: &SqlInfoProperties,
    ) -> Result<Self, Error> {
        let scope = statement
            .get_data_i16(1)
            .into_result(statement)?
            .and_then(RowIdScope::from_i16);
        Ok(SpecialColumnInfo {
            scope,
            column_name: required_string(
                statement,
                2,
                props.max_column_name_len() as usize,
                "COLUMN_NAME",
            )?,
            data_type: required_i16(statement, 3, "DATA_TYPE")?,
            type_name: required_string(statement, 4, MAX_TYPE_NAME_LEN, "TYPE_NAME")?,
            column_size: statement.get_data_i32(5).into_result(statement)?,
            buffer_length: statement.get_data_i32(6).into_result(statement)?,
            decimal_digits: statement.get_data_i16(7).into_result(statement)?,
            pseudo_column: statement
                .get_data_i16(8)
                .into_result(statement)?
                .map(PseudoColumn::from_i16)
                .unwrap_or_default(),
        })
    }
}

/// One row of a `SQLGetTypeInfo` result set, describing one SQL type the data source supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTypeInfo {
    pub type_name: String,
    pub data_type: i16,
    pub column_size: Option<i32>,
    pub literal_prefix: Option<String>,
    pub literal_suffix: Option<String>,
    pub create_params: Option<String>,
    pub nullable: i16,
    pub case_sensitive: i16,
    pub searchable: i16,
    pub unsigned_attribute: Option<i16>,
    pub fixed_prec_scale: i16,
    pub auto_unique_value: Option<i16>,
    pub local_type_name: Option<String>,
    pub minimum_scale: Option<i16>,
    pub maximum_scale: Option<i16>,
    pub sql_data_type: i16,
    pub sql_datetime_sub: Option<i16>,
    pub num_prec_radix: Option<i32>,
    pub interval_precision: Option<i16>,
}

impl SqlTypeInfo {
    /// Reads all columns from the current row of the positioned result set over `statement`.
    pub fn from_result_set(statement: &Statement) -> Result<Self, Error> {
        Ok(SqlTypeInfo {
            type_name: required_string(statement, 1, MAX_TYPE_NAME_LEN, "TYPE_NAME")?,
            data_type: required_i16(statement, 2, "DATA_TYPE")?,
            column_size: statement.get_data_i32(3).into_result(statement)?,
            literal_prefix: statement
                .get_data_string(4, MAX_TYPE_NAME_LEN)
                .into_result(statement)?,
            literal_suffix: statement
                .get_data_string(5, MAX_TYPE_NAME_LEN)
                .into_result(statement)?,
            create_params: statement
                .get_data_string(6, MAX_TYPE_NAME_LEN)
                .into_result(statement)?,
            nullable: required_i16(statement, 7, "NULLABLE")?,
            case_sensitive: required_i16(statement, 8, "CASE_SENSITIVE")?,
            searchable: required_i16(statement, 9, "SEARCHABLE")?,
            unsigned_attribute: statement.get_data_i16(10).into_result(statement)?,
            fixed_prec_scale: required_i16(statement, 11, "FIXED_PREC_SCALE")?,
            auto_unique_value: statement.get_data_i16(12).into_result(statement)?,
            local_type_name: statement
                .get_data_string(13, MAX_TYPE_NAME_LEN)
                .into_result(statement)?,
            minimum_scale: statement.get_data_i16(14).into_result(statement)?,
            maximum_scale: statement.get_data_i16(15).into_result(statement)?,
            sql_data_type: required_i16(statement, 16, "SQL_DATA_TYPE")?,
            sql_datetime_sub: statement.get_data_i16(17).into_result(statement)?,
            num_prec_radix: statement.get_data_i32(18).into_result(statement)?,
            interval_precision: statement.get_data_i16(19).into_result(statement)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PseudoColumn, RowIdScope, TableInfo};
    use crate::quirks::DatabaseProduct;

    fn table(dbms: DatabaseProduct) -> TableInfo {
        TableInfo::new(
            Some("exodbc".to_string()),
            Some("dbo".to_string()),
            "T1".to_string(),
            "TABLE".to_string(),
            None,
            dbms,
        )
    }

    #[test]
    fn query_name_is_fully_qualified_by_default() {
        assert_eq!("exodbc.dbo.T1", table(DatabaseProduct::MsSqlServer).query_name());
    }

    #[test]
    fn query_name_components_survive_a_round_trip() {
        let info = table(DatabaseProduct::Db2);
        let name = info.query_name();
        let (catalog, schema, parsed_name) = TableInfo::parse(&name);
        assert_eq!(info.catalog(), catalog);
        assert_eq!(info.schema(), schema);
        assert_eq!(info.name(), parsed_name);
    }

    #[test]
    fn parse_inverts_query_name_without_catalog() {
        let info = TableInfo::new(
            None,
            Some("dbo".to_string()),
            "T1".to_string(),
            "TABLE".to_string(),
            None,
            DatabaseProduct::MsSqlServer,
        );
        let name = info.query_name();
        let (catalog, schema, parsed_name) = TableInfo::parse(&name);
        assert_eq!(info.catalog(), catalog);
        assert_eq!(info.schema(), schema);
        assert_eq!(info.name(), parsed_name);
    }

    #[test]
    fn parse_of_a_bare_name_has_no_qualifiers() {
        assert_eq!((None, None, "T1"), TableInfo::parse("T1"));
    }

    #[test]
    fn access_uses_the_bare_name() {
        assert_eq!("T1", table(DatabaseProduct::Access).query_name());
    }

    #[test]
    fn excel_brackets_the_name() {
        assert_eq!("[T1]", table(DatabaseProduct::Excel).query_name());
    }

    #[test]
    fn missing_qualifiers_are_skipped() {
        let info = TableInfo::new(
            None,
            Some("dbo".to_string()),
            "T1".to_string(),
            "TABLE".to_string(),
            None,
            DatabaseProduct::MsSqlServer,
        );
        assert_eq!("dbo.T1", info.query_name());
    }

    #[test]
    fn row_id_scope_wire_values() {
        assert_eq!(Some(RowIdScope::Transaction), RowIdScope::from_i16(1));
        assert_eq!(None, RowIdScope::from_i16(9));
        assert_eq!(2, RowIdScope::Session.to_i16());
    }

    #[test]
    fn pseudo_column_defaults_to_unknown() {
        assert_eq!(PseudoColumn::Unknown, PseudoColumn::from_i16(42));
        assert_eq!(PseudoColumn::Pseudo, PseudoColumn::from_i16(2));
    }
}
