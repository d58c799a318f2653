use std::rc::Rc;

use log::{debug, error, warn};
use odbc_sys::{DriverConnectOption, HWnd};

use crate::{
    buffers::Sql2BufferTypeMap,
    catalog::DatabaseCatalog,
    environment::{Environment, OdbcVersion},
    error::Error,
    handles::{self, CursorClose, OutputStringBuffer, SqlText, State},
    info::SqlInfoProperties,
    quirks::{DatabaseProduct, Quirks},
    records::SqlTypeInfo,
    statement::close_cursor,
};

/// Whether transactions are committed by the driver after every statement, or explicitly by the
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// The current mode has not been determined yet.
    #[default]
    Unknown,
    /// Every statement is committed immediately (`SQL_AUTOCOMMIT_ON`).
    Auto,
    /// Transactions end through [`Database::commit_trans`] or [`Database::rollback_trans`]
    /// (`SQL_AUTOCOMMIT_OFF`).
    Manual,
}

/// Transaction isolation levels of `SQL_ATTR_TXN_ISOLATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    Unknown,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// The `SQL_TXN_*` bit representing this level.
    pub fn mask(self) -> u32 {
        match self {
            IsolationLevel::ReadUncommitted => 1,
            IsolationLevel::ReadCommitted => 2,
            IsolationLevel::RepeatableRead => 4,
            IsolationLevel::Serializable => 8,
            IsolationLevel::Unknown => 0,
        }
    }

    fn from_mask(mask: u32) -> Self {
        match mask {
            1 => IsolationLevel::ReadUncommitted,
            2 => IsolationLevel::ReadCommitted,
            4 => IsolationLevel::RepeatableRead,
            8 => IsolationLevel::Serializable,
            _ => IsolationLevel::Unknown,
        }
    }
}

/// Controls how [`Database::exec_sql`] treats a statement affecting no rows.
///
/// DB2 answers `SQL_NO_DATA` for a `DELETE` with a `WHERE` clause matching nothing; callers
/// which need to know select [`ExecFailMode::FailOnNoData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecFailMode {
    /// Treat `SQL_NO_DATA` as success.
    #[default]
    NotFailOnNoData,
    /// Raise [`Error::NoData`] on `SQL_NO_DATA`.
    FailOnNoData,
}

/// A connection to an ODBC data source.
///
/// Opening the database loads its [`SqlInfoProperties`], detects the DBMS family, switches to
/// manual commit mode if the driver supports transactions, and instantiates the
/// [`DatabaseCatalog`]. Closing (or dropping) a database in manual commit mode rolls back any
/// open transaction first.
pub struct Database {
    env_version: OdbcVersion,
    connection: Rc<handles::Connection>,
    props: Rc<SqlInfoProperties>,
    catalog: Option<DatabaseCatalog>,
    exec_statement: Option<Rc<handles::Statement>>,
    sql2buf: Option<Rc<Sql2BufferTypeMap>>,
    type_info: Vec<SqlTypeInfo>,
    dbms: DatabaseProduct,
    quirks: Quirks,
    commit_mode: CommitMode,
    is_open: bool,
    opened_with_connection_string: bool,
    dsn: String,
    user: String,
    auth: String,
    connection_in_str: String,
    connection_out_str: String,
}

impl Database {
    /// Allocates a connection handle from the environment. The database is not connected yet,
    /// call one of the open methods next.
    pub fn new(environment: &Environment) -> Result<Self, Error> {
        let connection = environment
            .handle()
            .allocate_connection()
            .into_result(environment.handle().as_ref())?;
        Ok(Database {
            env_version: environment.version(),
            connection: Rc::new(connection),
            props: Rc::new(SqlInfoProperties::new()),
            catalog: None,
            exec_statement: None,
            sql2buf: None,
            type_info: Vec::new(),
            dbms: DatabaseProduct::Unknown,
            quirks: Quirks::new(),
            commit_mode: CommitMode::Unknown,
            is_open: false,
            opened_with_connection_string: false,
            dsn: String::new(),
            user: String::new(),
            auth: String::new(),
            connection_in_str: String::new(),
            connection_out_str: String::new(),
        })
    }

    /// Opens the connection using `SQLConnect` with the passed data source name, user and
    /// authentication string.
    pub fn open(&mut self, dsn: &str, user: &str, auth: &str) -> Result<(), Error> {
        assert!(!self.is_open, "database is already open");
        self.connection
            .connect(&SqlText::new(dsn), &SqlText::new(user), &SqlText::new(auth))
            .into_result(self.connection.as_ref())?;
        self.dsn = dsn.to_string();
        self.user = user.to_string();
        self.auth = auth.to_string();
        self.opened_with_connection_string = false;
        self.finish_open()
    }

    /// Connect using a prepared connection string. Returns the output connection string the
    /// driver answered with.
    pub fn open_with_connection_string(&mut self, connection_string: &str) -> Result<String, Error> {
        // No window handle, no prompting.
        unsafe { self.open_with_connection_string_impl(connection_string, std::ptr::null_mut()) }
    }

    /// Connect using a connection string, allowing the driver to prompt for missing pieces.
    ///
    /// # Safety
    ///
    /// `parent_window` must either be a valid window handle or `NULL`.
    pub unsafe fn open_with_connection_string_and_window(
        &mut self,
        connection_string: &str,
        parent_window: HWnd,
    ) -> Result<String, Error> {
        self.open_with_connection_string_impl(connection_string, parent_window)
    }

    unsafe fn open_with_connection_string_impl(
        &mut self,
        connection_string: &str,
        parent_window: HWnd,
    ) -> Result<String, Error> {
        assert!(!self.is_open, "database is already open");
        let mut completed = OutputStringBuffer::with_buffer_size(1024);
        let completion = if parent_window.is_null() {
            DriverConnectOption::NoPrompt
        } else {
            DriverConnectOption::Complete
        };
        match self
            .connection
            .driver_connect(
                &SqlText::new(connection_string),
                parent_window,
                &mut completed,
                completion,
            )
            .into_result_option(self.connection.as_ref())?
        {
            Some(()) => (),
            // `SQL_NO_DATA` means the user aborted the dialog.
            None => return Err(Error::AbortedConnectionStringCompletion),
        }
        self.connection_in_str = connection_string.to_string();
        self.connection_out_str = completed.to_utf8();
        self.opened_with_connection_string = true;
        self.finish_open()?;
        Ok(self.connection_out_str.clone())
    }

    /// Shared tail of all open variants. On failure every partially allocated resource is
    /// released again and the connection is disconnected.
    fn finish_open(&mut self) -> Result<(), Error> {
        self.is_open = true;
        if let Err(error) = self.load_connection_state() {
            self.catalog = None;
            self.exec_statement = None;
            self.props = Rc::new(SqlInfoProperties::new());
            self.type_info.clear();
            if let Err(disconnect_error) = self
                .connection
                .disconnect()
                .into_result(self.connection.as_ref())
            {
                error!("Failed to disconnect after failed open: {disconnect_error}");
            }
            self.is_open = false;
            return Err(error);
        }
        Ok(())
    }

    fn load_connection_state(&mut self) -> Result<(), Error> {
        // 1. Load all registered info properties from the connection.
        self.props = Rc::new(SqlInfoProperties::new());
        self.props.register_all(self.env_version);
        self.props.read_all(&self.connection);

        // 2. An application asking for a newer ODBC version than the driver speaks is worth a
        //    warning, but no failure.
        let driver_version = self.props.driver_odbc_version();
        if driver_version != OdbcVersion::Unknown && self.env_version > driver_version {
            warn!(
                "Environment declares ODBC version {} but the driver only supports {}.",
                self.env_version, driver_version
            );
        }

        // 3. Instantiate a default SQL type to buffer type map if the application has not set
        //    its own.
        if self.sql2buf.is_none() {
            self.sql2buf = Some(Rc::new(Sql2BufferTypeMap::default_map(self.env_version)));
        }

        // 4. Detect the DBMS product behind the driver.
        self.dbms = self.props.detect_dbms();
        self.quirks = Quirks::from_product(self.dbms);
        debug!("Detected DBMS product {:?}.", self.dbms);

        // 5. Allocate the statement for ExecSql and instantiate the catalog with its own one.
        self.exec_statement = Some(
            self.connection
                .allocate_statement()
                .into_result(self.connection.as_ref())?,
        );
        self.catalog = Some(DatabaseCatalog::new(&self.connection, self.props.clone())?);

        // 6. Apply the initial connection attributes: driver manager tracing stays off for the
        //    freshly opened connection unless the application asks for it later.
        self.connection
            .set_trace(false)
            .into_result(self.connection.as_ref())?;

        // 7. Determine the commit mode the connection came up in and prefer manual commits on
        //    databases which support transactions.
        self.commit_mode = self.read_commit_mode()?;
        if self.props.supports_transactions() && self.commit_mode != CommitMode::Manual {
            self.set_commit_mode(CommitMode::Manual)?;
        }

        // 8. Load the SQL type info vector.
        self.type_info = self.catalog.as_ref().unwrap().read_sql_type_info()?;

        Ok(())
    }

    /// `true` if one of the open calls succeeded and the database has not been closed since.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Rolls back in manual commit mode, releases the owned statements, clears the info
    /// properties and disconnects. Calling it on a database which is not open does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        if !self.is_open {
            return Ok(());
        }
        if self.commit_mode == CommitMode::Manual {
            self.rollback_trans()?;
        }
        // Children first: catalog statement and exec statement before the connection.
        self.catalog = None;
        self.exec_statement = None;
        self.type_info.clear();
        self.props.reset();
        self.connection
            .disconnect()
            .into_result(self.connection.as_ref())?;
        self.is_open = false;
        Ok(())
    }

    /// Executes `sql` on the dedicated exec statement of this database. Any open cursor on that
    /// statement is closed first.
    pub fn exec_sql(&self, sql: &str, mode: ExecFailMode) -> Result<(), Error> {
        assert!(self.is_open, "database must be open to execute SQL");
        assert!(!sql.is_empty());
        let statement = self.exec_statement.as_ref().unwrap();
        close_cursor(statement, CursorClose::IgnoreNotOpen)?;
        // The exec statement never has parameters bound to it.
        let result = unsafe { statement.exec_direct(&SqlText::new(sql)) };
        match result.into_result_option(statement.as_ref())? {
            Some(()) => Ok(()),
            None => match mode {
                ExecFailMode::NotFailOnNoData => Ok(()),
                ExecFailMode::FailOnNoData => Err(Error::NoData {
                    function: "SQLExecDirectW",
                }),
            },
        }
    }

    /// Commits all transactions associated with this connection.
    pub fn commit_trans(&self) -> Result<(), Error> {
        self.connection
            .commit()
            .into_result(self.connection.as_ref())
    }

    /// Rolls back all transactions associated with this connection.
    pub fn rollback_trans(&self) -> Result<(), Error> {
        self.connection
            .rollback()
            .into_result(self.connection.as_ref())
    }

    /// Queries the driver for the current autocommit state and refreshes the cached mode.
    pub fn read_commit_mode(&mut self) -> Result<CommitMode, Error> {
        let mode = if self
            .connection
            .autocommit()
            .into_result(self.connection.as_ref())?
        {
            CommitMode::Auto
        } else {
            CommitMode::Manual
        };
        self.commit_mode = mode;
        Ok(mode)
    }

    /// The cached commit mode. Use [`Database::read_commit_mode`] to refresh it.
    pub fn commit_mode(&self) -> CommitMode {
        self.commit_mode
    }

    /// Switches between auto and manual commit mode. Any ongoing transaction is rolled back
    /// first.
    pub fn set_commit_mode(&mut self, mode: CommitMode) -> Result<(), Error> {
        assert!(mode != CommitMode::Unknown);
        if self.commit_mode == mode {
            return Ok(());
        }
        self.rollback_trans()?;
        self.connection
            .set_autocommit(mode == CommitMode::Auto)
            .into_result(self.connection.as_ref())?;
        self.commit_mode = mode;
        Ok(())
    }

    /// Queries the driver for the isolation level of the connection.
    pub fn read_transaction_isolation(&self) -> Result<IsolationLevel, Error> {
        let mask = self
            .connection
            .transaction_isolation()
            .into_result(self.connection.as_ref())?;
        Ok(IsolationLevel::from_mask(mask))
    }

    /// Sets the isolation level of the connection. Open cursors on the owned statements are
    /// closed, and in manual commit mode the ongoing transaction is rolled back first.
    pub fn set_transaction_isolation(&mut self, level: IsolationLevel) -> Result<(), Error> {
        assert!(self.is_open, "database must be open to set isolation level");
        assert!(level != IsolationLevel::Unknown);
        if let Some(statement) = &self.exec_statement {
            close_cursor(statement, CursorClose::IgnoreNotOpen)?;
        }
        if let Some(catalog) = &self.catalog {
            close_cursor(catalog.statement_handle(), CursorClose::IgnoreNotOpen)?;
        }
        if self.commit_mode == CommitMode::Manual {
            self.rollback_trans()?;
        }
        self.connection
            .set_transaction_isolation(level.mask())
            .into_result(self.connection.as_ref())
    }

    /// `true` if the driver reports the passed isolation level as supported.
    pub fn can_set_transaction_isolation(&self, level: IsolationLevel) -> bool {
        self.props.supported_isolation_levels() & level.mask() != 0
    }

    /// Probes whether the driver accepts the scrollable cursor attribute on a statement.
    /// Access and PostgreSQL are known to deny it, they are answered without a probe.
    pub fn detect_dbms_scrollable_cursor_support(&self) -> Result<bool, Error> {
        assert!(self.is_open);
        if self.quirks.no_scrollable_cursors {
            return Ok(false);
        }
        let statement = self
            .connection
            .allocate_statement()
            .into_result(self.connection.as_ref())?;
        match statement
            .set_cursor_scrollable(true)
            .into_result(statement.as_ref())
        {
            Ok(()) => Ok(true),
            Err(error)
                if error.has_sqlstate(State::OPTIONAL_FEATURE_NOT_IMPLEMENTED)
                    || error.has_sqlstate(State::INVALID_ATTRIBUTE_IDENTIFIER) =>
            {
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// The info properties read during open.
    pub fn properties(&self) -> &SqlInfoProperties {
        &self.props
    }

    /// The detected DBMS product.
    pub fn dbms(&self) -> DatabaseProduct {
        self.dbms
    }

    /// The workarounds applying to the detected DBMS product.
    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    /// The catalog of this database. Only available while the database is open.
    pub fn catalog(&self) -> &DatabaseCatalog {
        assert!(self.is_open, "database must be open to access its catalog");
        self.catalog.as_ref().unwrap()
    }

    /// The map used to allocate buffers for columns of queried result sets.
    pub fn sql2buffer_map(&self) -> Rc<Sql2BufferTypeMap> {
        self.sql2buf
            .clone()
            .unwrap_or_else(|| Rc::new(Sql2BufferTypeMap::default_map(self.env_version)))
    }

    /// Replaces the map used to allocate buffers for queried result sets.
    pub fn set_sql2buffer_map(&mut self, map: Rc<Sql2BufferTypeMap>) {
        self.sql2buf = Some(map);
    }

    /// The SQL types the data source reported during open.
    pub fn type_info(&self) -> &[SqlTypeInfo] {
        &self.type_info
    }

    /// `true` if the data source reported the passed type code, either as ODBC 2 or ODBC 3
    /// variant, in its type info.
    pub fn is_sql_type_supported(&self, sql_type: i16) -> bool {
        assert!(self.is_open);
        self.type_info
            .iter()
            .any(|info| info.data_type == sql_type || info.sql_data_type == sql_type)
    }

    /// Data source name passed to [`Database::open`].
    pub fn data_source_name(&self) -> &str {
        assert!(!self.opened_with_connection_string);
        &self.dsn
    }

    /// User name passed to [`Database::open`].
    pub fn username(&self) -> &str {
        assert!(!self.opened_with_connection_string);
        &self.user
    }

    /// Authentication string passed to [`Database::open`].
    pub fn authentication(&self) -> &str {
        assert!(!self.opened_with_connection_string);
        &self.auth
    }

    /// Connection string passed to [`Database::open_with_connection_string`].
    pub fn connection_in_str(&self) -> &str {
        assert!(self.opened_with_connection_string);
        &self.connection_in_str
    }

    /// Output connection string the driver answered during open.
    pub fn connection_out_str(&self) -> &str {
        assert!(self.opened_with_connection_string);
        assert!(self.is_open);
        &self.connection_out_str
    }

    /// `true` if the database was opened through a connection string rather than a DSN.
    pub fn opened_with_connection_string(&self) -> bool {
        self.opened_with_connection_string
    }

    pub(crate) fn connection(&self) -> &Rc<handles::Connection> {
        &self.connection
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Never propagate from the destructor. A rollback in manual mode is attempted, failures
        // end up in the log.
        if self.is_open {
            if let Err(error) = self.close() {
                error!("Failed to close database during drop: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IsolationLevel;

    #[test]
    fn isolation_level_masks_follow_the_odbc_bits() {
        assert_eq!(1, IsolationLevel::ReadUncommitted.mask());
        assert_eq!(2, IsolationLevel::ReadCommitted.mask());
        assert_eq!(4, IsolationLevel::RepeatableRead.mask());
        assert_eq!(8, IsolationLevel::Serializable.mask());
    }

    #[test]
    fn isolation_level_mask_round_trip() {
        for level in [
            IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable,
        ] {
            assert_eq!(level, IsolationLevel::from_mask(level.mask()));
        }
    }
}
