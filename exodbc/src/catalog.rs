use std::{cell::Cell, rc::Rc};

use log::warn;

use crate::{
    error::Error,
    handles::{self, CursorClose, SqlText, Statement},
    info::SqlInfoProperties,
    records::{
        ColumnInfo, IdentifierType, PrimaryKeyInfo, RowIdScope, SpecialColumnInfo, SqlTypeInfo,
        TableInfo,
    },
    statement::close_cursor,
};

/// How the string arguments of the catalog functions are interpreted by the driver. Mirrors the
/// two values of the `SQL_ATTR_METADATA_ID` statement attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMode {
    /// Arguments are pattern value or ordinary arguments: `_` matches one character, `%` any
    /// sequence of characters, an empty string only the empty string.
    PatternOrOrdinary,
    /// Arguments are identifiers: case folded if unquoted and matched literally.
    Identifier,
}

/// Provides access to the catalog functions of a database.
///
/// The catalog owns a statement handle dedicated to metadata calls, so catalog lookups never
/// interfere with the statements the application executes. The value of `SQL_ATTR_METADATA_ID`
/// is cached to avoid setting the attribute on every call.
pub struct DatabaseCatalog {
    statement: Rc<Statement>,
    props: Rc<SqlInfoProperties>,
    mode: Cell<MetadataMode>,
}

impl DatabaseCatalog {
    pub(crate) fn new(
        connection: &Rc<handles::Connection>,
        props: Rc<SqlInfoProperties>,
    ) -> Result<Self, Error> {
        let statement = connection
            .allocate_statement()
            .into_result(connection.as_ref())?;
        // Determine the mode the statement starts out in. Drivers not supporting the attribute
        // work like pattern mode.
        let mode = match statement.metadata_id().into_result(statement.as_ref()) {
            Ok(true) => MetadataMode::Identifier,
            Ok(false) => MetadataMode::PatternOrOrdinary,
            Err(error) => {
                warn!(
                    "Failed to read SQL_ATTR_METADATA_ID, assuming pattern arguments: {error}"
                );
                MetadataMode::PatternOrOrdinary
            }
        };
        Ok(DatabaseCatalog {
            statement,
            props,
            mode: Cell::new(mode),
        })
    }

    /// The cached metadata mode of the dedicated statement.
    pub fn metadata_mode(&self) -> MetadataMode {
        self.mode.get()
    }

    fn set_metadata_mode(&self, mode: MetadataMode) -> Result<(), Error> {
        if self.mode.get() == mode {
            return Ok(());
        }
        self.statement
            .set_metadata_id(mode == MetadataMode::Identifier)
            .into_result(self.statement.as_ref())?;
        self.mode.set(mode);
        Ok(())
    }

    /// Searches for tables. This is the primitive all other table lookups build on.
    ///
    /// In pattern mode `_` matches one character and `%` any sequence; a `None` argument means
    /// "all". `table_type` may hold a comma separated list of types, the empty string matches
    /// all types. If the connection does not support catalogs or schemas, the respective
    /// argument is ignored.
    pub fn search_tables(
        &self,
        table_name: Option<&str>,
        schema_name: Option<&str>,
        catalog_name: Option<&str>,
        table_type: &str,
        mode: MetadataMode,
    ) -> Result<Vec<TableInfo>, Error> {
        self.set_metadata_mode(mode)?;
        let schema_name = if self.props.supports_schemas() {
            schema_name
        } else {
            None
        };
        let catalog_name = if self.props.supports_catalogs() {
            catalog_name
        } else {
            None
        };

        let table = table_name.map(SqlText::new);
        let schema = schema_name.map(SqlText::new);
        let catalog = catalog_name.map(SqlText::new);
        let table_type = if table_type.is_empty() {
            None
        } else {
            Some(SqlText::new(table_type))
        };

        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        self.statement
            .tables(
                catalog.as_ref(),
                schema.as_ref(),
                table.as_ref(),
                table_type.as_ref(),
            )
            .into_result(self.statement.as_ref())?;

        let mut tables = Vec::new();
        while self
            .statement
            .fetch()
            .into_result_option(self.statement.as_ref())?
            .is_some()
        {
            tables.push(TableInfo::from_result_set(&self.statement, &self.props)?);
        }
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        Ok(tables)
    }

    /// Searches for tables by name pattern only; schema and catalog are treated as "all".
    pub fn search_tables_by_name(&self, table_name: &str) -> Result<Vec<TableInfo>, Error> {
        self.search_tables(
            Some(table_name),
            None,
            None,
            "",
            MetadataMode::PatternOrOrdinary,
        )
    }

    /// Searches for tables qualified by a schema or catalog name. The qualifier is routed to
    /// the schema argument if the data source supports schemas, to the catalog argument if it
    /// supports catalogs instead, and dropped otherwise.
    pub fn search_tables_qualified(
        &self,
        table_name: &str,
        schema_or_catalog: &str,
    ) -> Result<Vec<TableInfo>, Error> {
        let (schema, catalog) = if self.props.supports_schemas() {
            (Some(schema_or_catalog), None)
        } else if self.props.supports_catalogs() {
            (None, Some(schema_or_catalog))
        } else {
            (None, None)
        };
        self.search_tables(
            Some(table_name),
            schema,
            catalog,
            "",
            MetadataMode::PatternOrOrdinary,
        )
    }

    /// Searches with pattern arguments and raises [`Error::NotFound`] unless exactly one table
    /// matches.
    pub fn find_one_table(
        &self,
        table_name: &str,
        schema_name: Option<&str>,
        catalog_name: Option<&str>,
    ) -> Result<TableInfo, Error> {
        let mut tables = self.search_tables(
            Some(table_name),
            schema_name,
            catalog_name,
            "",
            MetadataMode::PatternOrOrdinary,
        )?;
        if tables.len() != 1 {
            return Err(Error::NotFound(format!(
                "Expected exactly one table matching '{}', found {}.",
                table_name,
                tables.len()
            )));
        }
        Ok(tables.remove(0))
    }

    /// Reads the column information of `table`, ordered by ordinal position.
    ///
    /// The catalog name is passed as an ordinary argument; schema and table name are pattern
    /// value arguments and therefore escaped before the call.
    pub fn read_column_info(&self, table: &TableInfo) -> Result<Vec<ColumnInfo>, Error> {
        self.set_metadata_mode(MetadataMode::PatternOrOrdinary)?;
        let catalog = table.catalog().map(SqlText::new);
        let schema = table
            .schema()
            .map(|schema| SqlText::new(&self.escape_pattern(schema)));
        let name = SqlText::new(&self.escape_pattern(table.name()));

        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        self.statement
            .columns(catalog.as_ref(), schema.as_ref(), Some(&name), None)
            .into_result(self.statement.as_ref())?;

        let mut columns = Vec::new();
        while self
            .statement
            .fetch()
            .into_result_option(self.statement.as_ref())?
            .is_some()
        {
            columns.push(ColumnInfo::from_result_set(&self.statement, &self.props)?);
        }
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;

        // The result is defined to be ordered by ordinal position, starting at one. A driver
        // violating this would silently corrupt buffer creation, better to fail loud.
        for (index, column) in columns.iter().enumerate() {
            assert!(
                column.ordinal_position == index as i32 + 1,
                "SQLColumns returned rows out of ordinal order"
            );
        }
        Ok(columns)
    }

    /// Reads the primary key columns of `table`, ordered by key sequence.
    ///
    /// Access has no notion of primary keys in its ODBC driver; asking for them is a
    /// programming error there.
    pub fn read_primary_keys(&self, table: &TableInfo) -> Result<Vec<PrimaryKeyInfo>, Error> {
        assert!(
            self.props.detect_dbms() != crate::quirks::DatabaseProduct::Access,
            "SQLPrimaryKeys is not supported on Access"
        );
        self.set_metadata_mode(MetadataMode::PatternOrOrdinary)?;
        let catalog = table.catalog().map(SqlText::new);
        let schema = table.schema().map(SqlText::new);
        let name = SqlText::new(table.name());

        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        self.statement
            .primary_keys(catalog.as_ref(), schema.as_ref(), &name)
            .into_result(self.statement.as_ref())?;

        let mut keys = Vec::new();
        while self
            .statement
            .fetch()
            .into_result_option(self.statement.as_ref())?
            .is_some()
        {
            keys.push(PrimaryKeyInfo::from_result_set(&self.statement, &self.props)?);
        }
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        keys.sort_by_key(|key| key.key_sequence);
        Ok(keys)
    }

    /// Reads the special columns of `table`: either the optimal row identifier or the columns
    /// updated automatically with every change, depending on `identifier_type`.
    pub fn read_special_columns(
        &self,
        table: &TableInfo,
        identifier_type: IdentifierType,
        scope: RowIdScope,
        include_nullable: bool,
    ) -> Result<Vec<SpecialColumnInfo>, Error> {
        self.set_metadata_mode(MetadataMode::PatternOrOrdinary)?;
        let catalog = table.catalog().map(SqlText::new);
        let schema = table.schema().map(SqlText::new);
        let name = SqlText::new(table.name());

        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        self.statement
            .special_columns(
                identifier_type.to_u16(),
                catalog.as_ref(),
                schema.as_ref(),
                &name,
                scope.to_i16() as u16,
                include_nullable,
            )
            .into_result(self.statement.as_ref())?;

        let mut columns = Vec::new();
        while self
            .statement
            .fetch()
            .into_result_option(self.statement.as_ref())?
            .is_some()
        {
            columns.push(SpecialColumnInfo::from_result_set(
                &self.statement,
                &self.props,
            )?);
        }
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        Ok(columns)
    }

    /// Reads the information about all SQL types the data source supports.
    pub fn read_sql_type_info(&self) -> Result<Vec<SqlTypeInfo>, Error> {
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        self.statement
            .type_info()
            .into_result(self.statement.as_ref())?;
        let mut types = Vec::new();
        while self
            .statement
            .fetch()
            .into_result_option(self.statement.as_ref())?
            .is_some()
        {
            types.push(SqlTypeInfo::from_result_set(&self.statement)?);
        }
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        Ok(types)
    }

    /// Lists the catalogs of the data source.
    pub fn list_catalogs(&self) -> Result<Vec<String>, Error> {
        // SQL_ALL_CATALOGS: "%" with empty schema and table name.
        self.list_single_column(Some("%"), Some(""), Some(""), None, 1)
    }

    /// Lists the schemas of the data source.
    pub fn list_schemas(&self) -> Result<Vec<String>, Error> {
        // SQL_ALL_SCHEMAS: "%" as schema with empty catalog and table name.
        self.list_single_column(Some(""), Some("%"), Some(""), None, 2)
    }

    /// Lists the table types the data source knows.
    pub fn list_table_types(&self) -> Result<Vec<String>, Error> {
        // SQL_ALL_TABLE_TYPES: "%" as table type with empty names.
        self.list_single_column(Some(""), Some(""), Some(""), Some("%"), 4)
    }

    fn list_single_column(
        &self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
        table_type: Option<&str>,
        column_number: u16,
    ) -> Result<Vec<String>, Error> {
        self.set_metadata_mode(MetadataMode::PatternOrOrdinary)?;
        let catalog = catalog_name.map(SqlText::new);
        let schema = schema_name.map(SqlText::new);
        let table = table_name.map(SqlText::new);
        let table_type = table_type.map(SqlText::new);

        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        self.statement
            .tables(
                catalog.as_ref(),
                schema.as_ref(),
                table.as_ref(),
                table_type.as_ref(),
            )
            .into_result(self.statement.as_ref())?;

        let max_len = self
            .props
            .max_catalog_name_len()
            .max(self.props.max_schema_name_len()) as usize;
        let mut values = Vec::new();
        while self
            .statement
            .fetch()
            .into_result_option(self.statement.as_ref())?
            .is_some()
        {
            if let Some(value) = self
                .statement
                .get_data_string(column_number, max_len)
                .into_result(self.statement.as_ref())?
            {
                if !value.is_empty() {
                    values.push(value);
                }
            }
        }
        close_cursor(&self.statement, CursorClose::IgnoreNotOpen)?;
        Ok(values)
    }

    /// Prefixes every `_` and `%` within `input` with the search pattern escape of the driver,
    /// turning `input` into a pattern matching exactly itself.
    pub fn escape_pattern(&self, input: &str) -> String {
        escape_search_pattern(input, &self.props.search_pattern_escape())
    }

    pub(crate) fn statement_handle(&self) -> &Rc<Statement> {
        &self.statement
    }
}

/// Prefixes every `_` and `%` within `input` with `escape`. An empty escape string leaves the
/// input unchanged, since the driver then offers no way to match the wildcards literally.
pub fn escape_search_pattern(input: &str, escape: &str) -> String {
    if escape.is_empty() {
        return input.to_string();
    }
    let mut escaped = String::with_capacity(input.len());
    for character in input.chars() {
        if character == '_' || character == '%' {
            escaped.push_str(escape);
        }
        escaped.push(character);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_search_pattern;

    #[test]
    fn wildcards_are_prefixed_with_the_escape() {
        assert_eq!("10\\%\\_raw", escape_search_pattern("10%_raw", "\\"));
    }

    #[test]
    fn input_without_wildcards_is_unchanged() {
        assert_eq!("TestTable", escape_search_pattern("TestTable", "\\"));
    }

    #[test]
    fn empty_escape_leaves_the_input_alone() {
        assert_eq!("10%_raw", escape_search_pattern("10%_raw", ""));
    }
}
