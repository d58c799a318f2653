//! Knowledge about the behavior of concrete DBMS families, kept in one place.
//!
//! Several code paths of this crate have to act differently depending on the product behind the
//! driver. Instead of scattering `if product == ...` checks, the deviations are described here
//! and the rest of the crate asks for the described capability.

use odbc_sys::SqlDataType;

/// The DBMS families this crate knows workarounds for. Detected by a case insensitive substring
/// match on the `SQL_DBMS_NAME` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseProduct {
    /// Anything not recognized. No workarounds are applied.
    #[default]
    Unknown,
    /// Microsoft SQL Server
    MsSqlServer,
    /// MySQL
    MySql,
    /// IBM DB2
    Db2,
    /// Microsoft Excel (via the Excel ODBC driver)
    Excel,
    /// Microsoft Access
    Access,
    /// PostgreSQL
    PostgreSql,
}

impl DatabaseProduct {
    /// Match the reported DBMS name to a known product.
    pub fn from_dbms_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("microsoft sql server") {
            DatabaseProduct::MsSqlServer
        } else if lower.contains("mysql") {
            DatabaseProduct::MySql
        } else if lower.contains("db2") {
            DatabaseProduct::Db2
        } else if lower.contains("excel") {
            DatabaseProduct::Excel
        } else if lower.contains("access") {
            DatabaseProduct::Access
        } else if lower.contains("postgresql") {
            DatabaseProduct::PostgreSql
        } else {
            DatabaseProduct::Unknown
        }
    }
}

/// A (non exhaustive) description of the non conformant behavior of ODBC drivers. Separates the
/// knowledge which driver behaves oddly in which way from the decision how to deal with it.
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Quirks {
    /// The driver errors out on `SQLDescribeParam`. Parameter descriptions must be synthesized
    /// from the buffer bound by the application instead.
    pub no_describe_param: bool,
    /// `SQLDescribeParam` works in general, but not for decimal and numeric parameters. Observed
    /// with MySQL.
    pub no_describe_param_for_numeric: bool,
    /// The driver has no notion of primary keys and fails `SQLPrimaryKeys`. Observed with
    /// Access.
    pub no_primary_keys: bool,
    /// The driver rejects the `SQL_ATTR_CURSOR_SCROLLABLE` attribute. Only forward-only cursors
    /// work. Observed with Access and PostgreSQL.
    pub no_scrollable_cursors: bool,
}

impl Quirks {
    /// A new instance describing an ODBC driver without quirks.
    pub fn new() -> Self {
        Quirks {
            no_describe_param: false,
            no_describe_param_for_numeric: false,
            no_primary_keys: false,
            no_scrollable_cursors: false,
        }
    }

    /// Fill quirks based on the detected product.
    pub fn from_product(product: DatabaseProduct) -> Self {
        let mut quirks = Quirks::new();
        match product {
            DatabaseProduct::Access => {
                quirks.no_describe_param = true;
                quirks.no_primary_keys = true;
                quirks.no_scrollable_cursors = true;
            }
            DatabaseProduct::Excel => {
                quirks.no_describe_param = true;
            }
            DatabaseProduct::MySql => {
                quirks.no_describe_param_for_numeric = true;
            }
            DatabaseProduct::PostgreSql => {
                quirks.no_scrollable_cursors = true;
            }
            _ => (),
        }
        quirks
    }

    /// `true` if a parameter description for the given SQL type should be asked from the driver,
    /// `false` if it must be synthesized from the application buffer.
    pub fn use_describe_param(&self, sql_type: SqlDataType) -> bool {
        if self.no_describe_param {
            return false;
        }
        let is_numeric = matches!(sql_type, SqlDataType::NUMERIC | SqlDataType::DECIMAL);
        !(is_numeric && self.no_describe_param_for_numeric)
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{DatabaseProduct, Quirks};
    use odbc_sys::SqlDataType;

    #[test]
    fn detect_products_case_insensitive() {
        assert_eq!(
            DatabaseProduct::MsSqlServer,
            DatabaseProduct::from_dbms_name("Microsoft SQL Server")
        );
        assert_eq!(DatabaseProduct::MySql, DatabaseProduct::from_dbms_name("MYSQL"));
        assert_eq!(
            DatabaseProduct::Db2,
            DatabaseProduct::from_dbms_name("DB2/LINUXX8664")
        );
        assert_eq!(DatabaseProduct::Excel, DatabaseProduct::from_dbms_name("EXCEL"));
        assert_eq!(DatabaseProduct::Access, DatabaseProduct::from_dbms_name("ACCESS"));
        assert_eq!(
            DatabaseProduct::PostgreSql,
            DatabaseProduct::from_dbms_name("PostgreSQL")
        );
        assert_eq!(
            DatabaseProduct::Unknown,
            DatabaseProduct::from_dbms_name("SQLite")
        );
    }

    #[test]
    fn access_suppresses_describe_param() {
        let quirks = Quirks::from_product(DatabaseProduct::Access);
        assert!(!quirks.use_describe_param(SqlDataType::INTEGER));
        assert!(quirks.no_primary_keys);
    }

    #[test]
    fn mysql_suppresses_describe_param_only_for_numeric() {
        let quirks = Quirks::from_product(DatabaseProduct::MySql);
        assert!(quirks.use_describe_param(SqlDataType::INTEGER));
        assert!(!quirks.use_describe_param(SqlDataType::NUMERIC));
        assert!(!quirks.use_describe_param(SqlDataType::DECIMAL));
    }
}
