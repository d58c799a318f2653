use std::rc::Rc;

use log::{debug, error, warn};
use odbc_sys::FetchOrientation;

use crate::{
    buffers::ColumnBuffer,
    database::Database,
    error::{Error, NotSupportedKind},
    handles::{
        ColumnDescription, CursorClose, ParameterDescription, SqlText, State, Statement,
    },
    quirks::Quirks,
};

/// Close the cursor of `statement`, optionally tolerating that none is open.
///
/// The `24000` (invalid cursor state) diagnostic is swallowed in
/// [`CursorClose::IgnoreNotOpen`] mode, every other failure is raised.
pub(crate) fn close_cursor(statement: &Statement, mode: CursorClose) -> Result<(), Error> {
    match statement.close_cursor().into_result(statement) {
        Err(error)
            if mode == CursorClose::IgnoreNotOpen
                && error.has_sqlstate(State::INVALID_CURSOR_STATE) =>
        {
            Ok(())
        }
        other => other,
    }
}

/// Executes SQL statements and binds column and parameter buffers to them.
///
/// The statement moves through a small state machine: it starts uninitialized, becomes ready
/// through [`ExecutableStatement::init`], optionally prepared through
/// [`ExecutableStatement::prepare`], and opens a result set through one of the execute methods.
/// [`ExecutableStatement::reset`] returns it to the uninitialized state, releasing all bindings
/// on the way.
pub struct ExecutableStatement {
    statement: Option<Rc<Statement>>,
    quirks: Quirks,
    is_prepared: bool,
    scrollable_cursor: bool,
    bound_columns: bool,
    bound_params: bool,
}

impl Default for ExecutableStatement {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutableStatement {
    /// An uninitialized statement. Call [`ExecutableStatement::init`] before using it.
    pub fn new() -> Self {
        ExecutableStatement {
            statement: None,
            quirks: Quirks::new(),
            is_prepared: false,
            scrollable_cursor: false,
            bound_columns: false,
            bound_params: false,
        }
    }

    /// A statement initialized against `database`, with a forward-only cursor.
    pub fn with_database(database: &Database) -> Result<Self, Error> {
        Self::with_database_and_cursor(database, false)
    }

    /// A statement initialized against `database`. `scrollable_cursor` requests positioned
    /// fetches beyond [`ExecutableStatement::select_next`].
    pub fn with_database_and_cursor(
        database: &Database,
        scrollable_cursor: bool,
    ) -> Result<Self, Error> {
        let mut statement = Self::new();
        statement.init(database, scrollable_cursor)?;
        Ok(statement)
    }

    /// Allocates the statement handle and applies the cursor options.
    ///
    /// If the driver does not implement the scrollable cursor attribute and only a forward-only
    /// cursor was asked for, the failure is logged and forward-only is assumed. If a scrollable
    /// cursor was asked for the failure is raised.
    pub fn init(&mut self, database: &Database, scrollable_cursor: bool) -> Result<(), Error> {
        assert!(self.statement.is_none(), "statement is already initialized");
        assert!(database.is_open(), "database must be open");

        let statement = database
            .connection()
            .allocate_statement()
            .into_result(database.connection().as_ref())?;
        self.statement = Some(statement);
        self.quirks = database.quirks().clone();

        match self.apply_cursor_options(scrollable_cursor) {
            Ok(()) => Ok(()),
            Err(error) => {
                let optional_feature = error.has_sqlstate(State::OPTIONAL_FEATURE_NOT_IMPLEMENTED)
                    || error.has_sqlstate(State::INVALID_ATTRIBUTE_IDENTIFIER);
                if optional_feature && !scrollable_cursor {
                    warn!(
                        "Driver does not support the scrollable cursor attribute, assuming \
                        forward-only cursors: {error}"
                    );
                    self.scrollable_cursor = false;
                    Ok(())
                } else {
                    // Back into the state before init was called.
                    self.reset_after_failed_init();
                    Err(error)
                }
            }
        }
    }

    fn apply_cursor_options(&mut self, scrollable_cursor: bool) -> Result<(), Error> {
        let statement = self.statement.as_ref().unwrap();
        // Read the active value first and only change it if a change is required.
        let current = statement
            .cursor_scrollable()
            .into_result(statement.as_ref())?;
        if current != scrollable_cursor {
            statement
                .set_cursor_scrollable(scrollable_cursor)
                .into_result(statement.as_ref())?;
        }
        self.scrollable_cursor = scrollable_cursor;
        Ok(())
    }

    fn reset_after_failed_init(&mut self) {
        self.statement = None;
        self.is_prepared = false;
        self.scrollable_cursor = false;
        self.bound_columns = false;
        self.bound_params = false;
    }

    /// Releases all bindings and the statement handle, returning to the uninitialized state.
    /// Calling it again afterwards does nothing.
    pub fn reset(&mut self) -> Result<(), Error> {
        if let Some(statement) = &self.statement {
            if self.bound_columns {
                statement.unbind_cols().into_result(statement.as_ref())?;
                self.bound_columns = false;
            }
            if self.bound_params {
                statement.reset_params().into_result(statement.as_ref())?;
                self.bound_params = false;
            }
        }
        self.reset_after_failed_init();
        Ok(())
    }

    /// `true` between a successful [`ExecutableStatement::init`] and
    /// [`ExecutableStatement::reset`].
    pub fn is_initialized(&self) -> bool {
        self.statement.is_some()
    }

    /// `true` if a prepared statement exists on the driver side.
    pub fn is_prepared(&self) -> bool {
        self.is_prepared
    }

    /// `true` if positioned fetches besides `select_next` are available.
    pub fn is_scrollable(&self) -> bool {
        self.scrollable_cursor
    }

    /// Executes `sql` directly. Any pending result set is discarded first.
    ///
    /// Returns `false` if the data source answered `SQL_NO_DATA`, e.g. for a searched update
    /// affecting no rows.
    pub fn execute_direct(&mut self, sql: &str) -> Result<bool, Error> {
        let statement = self.expect_statement();
        assert!(!sql.is_empty());
        close_cursor(statement, CursorClose::IgnoreNotOpen)?;
        if self.is_prepared {
            // Direct execution silently drops the prepared plan on the driver side, make our
            // bookkeeping follow.
            debug!("Direct execution invalidates the prepared statement.");
            self.is_prepared = false;
        }
        let statement = self.expect_statement();
        let result = unsafe { statement.exec_direct(&SqlText::new(sql)) };
        Ok(result.into_result_option(statement.as_ref())?.is_some())
    }

    /// Sends `sql` to the data source for preparation. Parameter markers (`?`) may be included.
    pub fn prepare(&mut self, sql: &str) -> Result<(), Error> {
        let statement = self.expect_statement();
        assert!(!sql.is_empty());
        statement
            .prepare(&SqlText::new(sql))
            .into_result(statement.as_ref())?;
        self.is_prepared = true;
        Ok(())
    }

    /// Executes the statement prepared by [`ExecutableStatement::prepare`], using the values
    /// currently held by the bound parameter buffers. Any pending result set is discarded
    /// first.
    ///
    /// Returns `false` if the data source answered `SQL_NO_DATA`.
    pub fn execute(&mut self) -> Result<bool, Error> {
        assert!(self.is_prepared, "execute requires a prepared statement");
        let statement = self.expect_statement();
        close_cursor(statement, CursorClose::IgnoreNotOpen)?;
        let result = unsafe { statement.execute() };
        Ok(result.into_result_option(statement.as_ref())?.is_some())
    }

    /// Binds `buffer` to the result set column `column_number` (starting at 1).
    pub fn bind_column(&mut self, buffer: &ColumnBuffer, column_number: u16) -> Result<(), Error> {
        assert!(column_number >= 1);
        let statement = self.expect_statement().clone();
        buffer.bind_as_column(&statement, column_number)?;
        self.bound_columns = true;
        Ok(())
    }

    /// Binds `buffer` as input parameter `parameter_number` (starting at 1).
    ///
    /// The parameter description is asked from the driver if a prepared statement exists and
    /// the driver is known to answer; otherwise it is synthesized from the buffer's own column
    /// properties. A failing `SQLDescribeParam` falls back to the synthesized description, too.
    pub fn bind_parameter(
        &mut self,
        buffer: &ColumnBuffer,
        parameter_number: u16,
    ) -> Result<(), Error> {
        assert!(parameter_number >= 1);
        let statement = self.expect_statement().clone();
        let ask_driver =
            self.is_prepared && self.quirks.use_describe_param(buffer.properties().sql_type);
        let description = if ask_driver {
            match statement
                .describe_param(parameter_number)
                .into_result(statement.as_ref())
            {
                Ok(description) => description,
                Err(error) => {
                    warn!(
                        "SQLDescribeParam failed for parameter {parameter_number}, falling back \
                        to the buffer description: {error}"
                    );
                    buffer.parameter_description()
                }
            }
        } else {
            buffer.parameter_description()
        };
        buffer.bind_as_parameter(&statement, parameter_number, &description)?;
        self.bound_params = true;
        Ok(())
    }

    /// Releases all column bindings. Buffers bound to this statement are notified.
    pub fn unbind_columns(&mut self) -> Result<(), Error> {
        let statement = self.expect_statement();
        statement.unbind_cols().into_result(statement.as_ref())?;
        self.bound_columns = false;
        Ok(())
    }

    /// Releases all parameter bindings. Buffers bound to this statement are notified.
    pub fn unbind_params(&mut self) -> Result<(), Error> {
        let statement = self.expect_statement();
        statement.reset_params().into_result(statement.as_ref())?;
        self.bound_params = false;
        Ok(())
    }

    /// Fetches the next row. `false` past the end of the result set.
    pub fn select_next(&mut self) -> Result<bool, Error> {
        let statement = self.expect_statement();
        Ok(statement
            .fetch()
            .into_result_option(statement.as_ref())?
            .is_some())
    }

    /// Fetches the previous row. Requires a scrollable cursor.
    pub fn select_prev(&mut self) -> Result<bool, Error> {
        self.fetch_scroll(FetchOrientation::Prior, 0)
    }

    /// Fetches the first row of the result set. Requires a scrollable cursor.
    pub fn select_first(&mut self) -> Result<bool, Error> {
        self.fetch_scroll(FetchOrientation::First, 0)
    }

    /// Fetches the last row of the result set. Requires a scrollable cursor.
    pub fn select_last(&mut self) -> Result<bool, Error> {
        self.fetch_scroll(FetchOrientation::Last, 0)
    }

    /// Fetches the row at `position` (starting at 1). Requires a scrollable cursor.
    pub fn select_absolute(&mut self, position: isize) -> Result<bool, Error> {
        self.fetch_scroll(FetchOrientation::Absolute, position)
    }

    /// Fetches the row `offset` rows away from the current one. Requires a scrollable cursor.
    pub fn select_relative(&mut self, offset: isize) -> Result<bool, Error> {
        self.fetch_scroll(FetchOrientation::Relative, offset)
    }

    fn fetch_scroll(
        &mut self,
        orientation: FetchOrientation,
        offset: isize,
    ) -> Result<bool, Error> {
        let statement = self.expect_statement();
        if !self.scrollable_cursor {
            return Err(Error::NotSupported {
                kind: NotSupportedKind::Feature,
                code: 0,
                message: "Positioned fetches require a scrollable cursor, but this statement \
                    uses a forward-only cursor."
                    .to_string(),
            });
        }
        Ok(statement
            .fetch_scroll(orientation, offset)
            .into_result_option(statement.as_ref())?
            .is_some())
    }

    /// Closes any open result set. Succeeds if no cursor is open.
    pub fn select_close(&mut self) -> Result<(), Error> {
        let statement = self.expect_statement();
        close_cursor(statement, CursorClose::IgnoreNotOpen)
    }

    /// Describes the parameter marker `parameter_number` of the prepared statement.
    pub fn describe_parameter(&self, parameter_number: u16) -> Result<ParameterDescription, Error> {
        assert!(parameter_number >= 1);
        let statement = self.expect_statement();
        statement
            .describe_param(parameter_number)
            .into_result(statement.as_ref())
    }

    /// Describes the result set column `column_number`.
    pub fn describe_column(&self, column_number: u16) -> Result<ColumnDescription, Error> {
        assert!(column_number >= 1);
        let statement = self.expect_statement();
        statement
            .describe_col(column_number)
            .into_result(statement.as_ref())
    }

    /// Number of columns of the pending result set, or zero if there is none.
    pub fn num_result_cols(&self) -> Result<i16, Error> {
        let statement = self.expect_statement();
        statement
            .num_result_cols()
            .into_result(statement.as_ref())
    }

    /// Number of rows affected by the last insert, update or delete.
    pub fn row_count(&self) -> Result<isize, Error> {
        let statement = self.expect_statement();
        statement.row_count().into_result(statement.as_ref())
    }

    fn expect_statement(&self) -> &Rc<Statement> {
        self.statement
            .as_ref()
            .expect("statement must be initialized")
    }
}

impl Drop for ExecutableStatement {
    fn drop(&mut self) {
        // Release remaining bindings, the subscribers are notified. Never propagate from a
        // destructor.
        if let Some(statement) = &self.statement {
            if self.bound_params {
                let result = statement.reset_params();
                if result.is_err() {
                    result.log_diagnostics(statement.as_ref());
                    error!("Failed to reset parameters while dropping a statement.");
                }
            }
            if self.bound_columns {
                let result = statement.unbind_cols();
                if result.is_err() {
                    result.log_diagnostics(statement.as_ref());
                    error!("Failed to unbind columns while dropping a statement.");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutableStatement;

    #[test]
    fn reset_of_an_uninitialized_statement_is_a_no_op() {
        let mut statement = ExecutableStatement::new();
        statement.reset().unwrap();
        statement.reset().unwrap();
        assert!(!statement.is_initialized());
        assert!(!statement.is_prepared());
    }
}
