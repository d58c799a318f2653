use super::{
    as_handle::AsHandle,
    buffer::{clamp_small_int, mut_buf_ptr},
    column_description::{ColumnDescription, Nullability},
    data_type::DataType,
    descriptor::{Descriptor, DescriptorKind},
    drop_handle,
    functions::{
        self, ALL_TYPES, ATTR_APP_PARAM_DESC, ATTR_APP_ROW_DESC, ATTR_CURSOR_SCROLLABLE,
        ATTR_METADATA_ID, NONSCROLLABLE, SCROLLABLE,
    },
    sql_result::{ExtSqlReturn, SqlResult},
    sql_text::SqlText,
    Connection,
};
use odbc_sys::{
    CDataType, FetchOrientation, FreeStmtOption, HDesc, HStmt, Handle, HandleType, Len, ParamType,
    Pointer, SQLBindCol, SQLBindParameter, SQLCloseCursor, SQLColumnsW, SQLDescribeColW,
    SQLDescribeParam, SQLExecDirectW, SQLExecute, SQLFetch, SQLFreeStmt, SQLGetData,
    SQLNumResultCols, SQLPrepareW, SQLRowCount, SQLTablesW, SqlDataType, NO_TOTAL, NULL_DATA,
};
use std::{
    cell::{Cell, RefCell},
    ptr::{null, null_mut},
    rc::{Rc, Weak},
};

/// Events a statement handle publishes to its subscribers. Both correspond to a driver side
/// release of bindings through `SQLFreeStmt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementEvent {
    /// All column bindings of the statement have been released.
    ColumnsUnbound,
    /// All parameter bindings of the statement have been released.
    ParamsReset,
}

/// Implemented by everything which wants to be notified when a statement releases its bindings.
/// Column buffers use this to drop their binding bookkeeping.
pub trait StatementEventListener {
    /// Called after the driver side release, before the broadcasting call returns. The listener
    /// may unsubscribe itself during the callback.
    fn statement_event(&self, statement: &Statement, event: StatementEvent);
}

/// Identifies one subscription on one statement handle. Returned by [`Statement::subscribe`] and
/// redeemed with [`Statement::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(u64);

struct ListenerEntry {
    token: u64,
    event: StatementEvent,
    listener: Weak<dyn StatementEventListener>,
}

/// Describes a parameter marker associated with a prepared SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescription {
    /// Indicates whether the parameter may be NULL.
    pub nullability: Nullability,
    /// The SQL Type associated with that parameter.
    pub data_type: DataType,
}

/// Controls how closing a cursor deals with the case of no cursor being open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorClose {
    /// Raise the `24000` diagnostic of the driver.
    Fail,
    /// Swallow the invalid cursor state diagnostic, succeed if no cursor was open.
    IgnoreNotOpen,
}

/// Wraps a valid (i.e. successfully allocated) ODBC statement handle.
///
/// Besides owning the native handle the wrapper maintains the observer list for the
/// columns-unbound and params-reset events, which the column buffers of this crate use to keep
/// their binding bookkeeping consistent with the driver state.
pub struct Statement {
    handle: HStmt,
    _parent: Rc<Connection>,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_token: Cell<u64>,
}

unsafe impl AsHandle for Statement {
    fn as_handle(&self) -> Handle {
        Handle(self.handle.0)
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Stmt
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        unsafe {
            drop_handle(Handle(self.handle.0), HandleType::Stmt);
        }
    }
}

impl Statement {
    /// # Safety
    ///
    /// `handle` must be a valid (successfully allocated) statement handle allocated from
    /// `parent`.
    pub unsafe fn new(handle: HStmt, parent: Rc<Connection>) -> Self {
        Self {
            handle,
            _parent: parent,
            listeners: RefCell::new(Vec::new()),
            next_token: Cell::new(0),
        }
    }

    /// Provides access to the raw ODBC statement handle.
    pub fn as_raw(&self) -> HStmt {
        self.handle
    }

    /// Register `listener` for `event`. The listener is referenced weakly; a dead listener is
    /// dropped from the list on the next broadcast.
    pub fn subscribe(
        &self,
        event: StatementEvent,
        listener: Weak<dyn StatementEventListener>,
    ) -> SubscriptionToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.listeners.borrow_mut().push(ListenerEntry {
            token,
            event,
            listener,
        });
        SubscriptionToken(token)
    }

    /// Remove the subscription identified by `token`. Unknown tokens are ignored, so observers
    /// may unsubscribe after a broadcast already removed their entry.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.listeners
            .borrow_mut()
            .retain(|entry| entry.token != token.0);
    }

    /// Notify all subscribers of `event` and drop their entries. The snapshot of the listener
    /// list is taken before any callback runs, so listeners re-entering `subscribe` or
    /// `unsubscribe` during the broadcast are safe.
    fn broadcast(&self, event: StatementEvent) {
        let snapshot: Vec<_> = {
            let mut listeners = self.listeners.borrow_mut();
            let subscribed = listeners
                .iter()
                .filter(|entry| entry.event == event)
                .filter_map(|entry| entry.listener.upgrade())
                .collect();
            // All bindings for this event are gone on the driver side, the entries are stale.
            listeners.retain(|entry| entry.event != event);
            subscribed
        };
        for listener in snapshot {
            listener.statement_event(self, event);
        }
    }

    /// Executes a statement, using the current values of the parameter marker variables if any
    /// parameters exist in the statement. `SQLExecDirect` is the fastest way to submit an SQL
    /// statement for one-time execution.
    ///
    /// # Safety
    ///
    /// While `self` is always guaranteed to be a valid allocated handle, this function may
    /// dereference bound parameters. It is the callers responsibility to ensure these are still
    /// valid.
    pub unsafe fn exec_direct(&self, statement_text: &SqlText) -> SqlResult<()> {
        SQLExecDirectW(
            self.handle,
            statement_text.ptr(),
            statement_text.len_char().try_into().unwrap(),
        )
        .into_sql_result("SQLExecDirectW")
    }

    /// Send an SQL statement to the data source for preparation. The application can include one
    /// or more parameter markers (`?`) in the SQL statement.
    pub fn prepare(&self, statement_text: &SqlText) -> SqlResult<()> {
        unsafe {
            SQLPrepareW(
                self.handle,
                statement_text.ptr(),
                statement_text.len_char().try_into().unwrap(),
            )
        }
        .into_sql_result("SQLPrepareW")
    }

    /// Executes a statement prepared by `prepare`. After the application processes or discards
    /// the results from a call to `execute`, the application can call `execute` again with new
    /// parameter values.
    ///
    /// # Safety
    ///
    /// This function may dereference bound parameters. It is the callers responsibility to ensure
    /// these are still valid.
    pub unsafe fn execute(&self) -> SqlResult<()> {
        SQLExecute(self.handle).into_sql_result("SQLExecute")
    }

    /// Returns the next row of the result set. `NoData` past the last row.
    pub fn fetch(&self) -> SqlResult<()> {
        unsafe { SQLFetch(self.handle) }.into_sql_result("SQLFetch")
    }

    /// Positioned fetch on a scrollable cursor. `NoData` if the position is outside the result
    /// set.
    pub fn fetch_scroll(&self, orientation: FetchOrientation, offset: isize) -> SqlResult<()> {
        unsafe { functions::SQLFetchScroll(self.handle, orientation, offset) }
            .into_sql_result("SQLFetchScroll")
    }

    /// Close an open cursor. Yields the `24000` diagnostic if none is open.
    pub fn close_cursor(&self) -> SqlResult<()> {
        unsafe { SQLCloseCursor(self.handle) }.into_sql_result("SQLCloseCursor")
    }

    /// Release all column buffers bound by `bind_col`, then notify the subscribers of
    /// [`StatementEvent::ColumnsUnbound`].
    pub fn unbind_cols(&self) -> SqlResult<()> {
        let result = unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Unbind) }
            .into_sql_result("SQLFreeStmt");
        if !result.is_err() {
            self.broadcast(StatementEvent::ColumnsUnbound);
        }
        result
    }

    /// Sets the `SQL_DESC_COUNT` field of the APD to 0, releasing all parameter buffers bound to
    /// this statement handle, then notify the subscribers of [`StatementEvent::ParamsReset`].
    pub fn reset_params(&self) -> SqlResult<()> {
        let result = unsafe { SQLFreeStmt(self.handle, FreeStmtOption::ResetParams) }
            .into_sql_result("SQLFreeStmt");
        if !result.is_err() {
            self.broadcast(StatementEvent::ParamsReset);
        }
        result
    }

    /// Binds application data buffers to columns in the result set.
    ///
    /// # Safety
    ///
    /// It is the callers responsibility to make sure the bound buffers live until they are no
    /// longer bound.
    pub unsafe fn bind_col(
        &self,
        column_number: u16,
        target_type: CDataType,
        target_value: Pointer,
        target_length: Len,
        indicator: *mut Len,
    ) -> SqlResult<()> {
        SQLBindCol(
            self.handle,
            column_number,
            target_type,
            target_value,
            target_length,
            indicator,
        )
        .into_sql_result("SQLBindCol")
    }

    /// Binds a buffer holding a single input parameter to a parameter marker in an SQL statement.
    ///
    /// # Safety
    ///
    /// It is up to the caller to ensure the lifetimes of the bound parameter buffers.
    pub unsafe fn bind_input_parameter(
        &self,
        parameter_number: u16,
        value_type: CDataType,
        parameter_type: DataType,
        value_ptr: Pointer,
        buffer_length: Len,
        indicator: *mut Len,
    ) -> SqlResult<()> {
        SQLBindParameter(
            self.handle,
            parameter_number,
            ParamType::Input,
            value_type,
            parameter_type.data_type(),
            parameter_type.column_size(),
            parameter_type.decimal_digits(),
            value_ptr,
            buffer_length,
            indicator,
        )
        .into_sql_result("SQLBindParameter")
    }

    /// Fetch a column description using the column index (starting at `1`).
    pub fn describe_col(&self, column_number: u16) -> SqlResult<ColumnDescription> {
        let mut name = vec![0u16; 256];
        let mut name_length: i16 = 0;
        let mut data_type = SqlDataType::UNKNOWN_TYPE;
        let mut column_size = 0;
        let mut decimal_digits = 0;
        let mut nullability = odbc_sys::Nullability::UNKNOWN;

        let result = unsafe {
            SQLDescribeColW(
                self.handle,
                column_number,
                mut_buf_ptr(&mut name),
                clamp_small_int(name.len()),
                &mut name_length,
                &mut data_type,
                &mut column_size,
                &mut decimal_digits,
                &mut nullability,
            )
        }
        .into_sql_result("SQLDescribeColW");
        if result.is_err() {
            return result.map(|()| ColumnDescription::default());
        }

        if name_length + 1 > clamp_small_int(name.len()) {
            // Buffer is too small to hold the name, retry with a larger one.
            name.resize(name_length as usize + 1, 0);
            let result = unsafe {
                SQLDescribeColW(
                    self.handle,
                    column_number,
                    mut_buf_ptr(&mut name),
                    clamp_small_int(name.len()),
                    &mut name_length,
                    &mut data_type,
                    &mut column_size,
                    &mut decimal_digits,
                    &mut nullability,
                )
            }
            .into_sql_result("SQLDescribeColW");
            if result.is_err() {
                return result.map(|()| ColumnDescription::default());
            }
        }
        name.truncate(name_length as usize);

        result.map(|()| ColumnDescription {
            name: String::from_utf16_lossy(&name),
            data_type: DataType::new(data_type, column_size as usize, decimal_digits),
            nullability: Nullability::new(nullability),
        })
    }

    /// Describes the parameter marker associated with a prepared SQL statement.
    ///
    /// * `parameter_number`: Parameter marker number ordered sequentially in increasing parameter
    ///   order, starting at 1.
    pub fn describe_param(&self, parameter_number: u16) -> SqlResult<ParameterDescription> {
        let mut data_type = SqlDataType::UNKNOWN_TYPE;
        let mut parameter_size = 0;
        let mut decimal_digits = 0;
        let mut nullability = odbc_sys::Nullability::UNKNOWN;
        unsafe {
            SQLDescribeParam(
                self.handle,
                parameter_number,
                &mut data_type,
                &mut parameter_size,
                &mut decimal_digits,
                &mut nullability,
            )
        }
        .into_sql_result("SQLDescribeParam")
        .on_success(|| ParameterDescription {
            data_type: DataType::new(data_type, parameter_size as usize, decimal_digits),
            nullability: Nullability::new(nullability),
        })
    }

    /// Number of columns in the result set.
    ///
    /// Can also be used to check whether or not a result set has been created at all.
    pub fn num_result_cols(&self) -> SqlResult<i16> {
        let mut out: i16 = 0;
        unsafe { SQLNumResultCols(self.handle, &mut out) }
            .into_sql_result("SQLNumResultCols")
            .on_success(|| out)
    }

    /// Number of rows affected by the last `UPDATE`, `INSERT` or `DELETE` statement.
    pub fn row_count(&self) -> SqlResult<isize> {
        let mut out: Len = 0;
        unsafe { SQLRowCount(self.handle, &mut out) }
            .into_sql_result("SQLRowCount")
            .on_success(|| out)
    }

    /// Enables or disables scrollable cursors for subsequent result sets of this statement.
    pub fn set_cursor_scrollable(&self, scrollable: bool) -> SqlResult<()> {
        let value = if scrollable { SCROLLABLE } else { NONSCROLLABLE };
        unsafe {
            functions::SQLSetStmtAttrW(
                self.handle,
                ATTR_CURSOR_SCROLLABLE,
                value as Pointer,
                0,
            )
        }
        .into_sql_result("SQLSetStmtAttrW")
    }

    /// Reads the current value of the `SQL_ATTR_CURSOR_SCROLLABLE` attribute.
    pub fn cursor_scrollable(&self) -> SqlResult<bool> {
        let mut value: usize = 0;
        unsafe {
            functions::SQLGetStmtAttrW(
                self.handle,
                ATTR_CURSOR_SCROLLABLE,
                &mut value as *mut usize as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetStmtAttrW")
        .on_success(|| value == SCROLLABLE)
    }

    /// Controls how the catalog functions treat their string arguments. `true` treats them as
    /// identifiers, `false` as pattern value or ordinary arguments.
    pub fn set_metadata_id(&self, identifier: bool) -> SqlResult<()> {
        let value: usize = if identifier { 1 } else { 0 };
        unsafe {
            functions::SQLSetStmtAttrW(self.handle, ATTR_METADATA_ID, value as Pointer, 0)
        }
        .into_sql_result("SQLSetStmtAttrW")
    }

    /// Reads the current value of the `SQL_ATTR_METADATA_ID` attribute.
    pub fn metadata_id(&self) -> SqlResult<bool> {
        let mut value: usize = 0;
        unsafe {
            functions::SQLGetStmtAttrW(
                self.handle,
                ATTR_METADATA_ID,
                &mut value as *mut usize as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetStmtAttrW")
        .on_success(|| value == 1)
    }

    /// Borrow one of the implicitly allocated application descriptors of this statement.
    pub fn descriptor(&self, kind: DescriptorKind) -> SqlResult<Descriptor<'_>> {
        let attribute = match kind {
            DescriptorKind::Row => ATTR_APP_ROW_DESC,
            DescriptorKind::Param => ATTR_APP_PARAM_DESC,
        };
        let mut hdesc: HDesc = HDesc(null_mut());
        unsafe {
            functions::SQLGetStmtAttrW(
                self.handle,
                attribute,
                &mut hdesc as *mut HDesc as Pointer,
                0,
                null_mut(),
            )
            .into_sql_result("SQLGetStmtAttrW")
            .on_success(|| Descriptor::new(hdesc))
        }
    }

    /// `SQLTables`. Each catalog argument may be `None` for "all". An open cursor over the result
    /// set exists after a successful call.
    pub fn tables(
        &self,
        catalog_name: Option<&SqlText>,
        schema_name: Option<&SqlText>,
        table_name: Option<&SqlText>,
        table_type: Option<&SqlText>,
    ) -> SqlResult<()> {
        unsafe {
            SQLTablesW(
                self.handle,
                arg_ptr(catalog_name),
                arg_len(catalog_name),
                arg_ptr(schema_name),
                arg_len(schema_name),
                arg_ptr(table_name),
                arg_len(table_name),
                arg_ptr(table_type),
                arg_len(table_type),
            )
        }
        .into_sql_result("SQLTablesW")
    }

    /// `SQLColumns`. The catalog argument is ordinary, schema, table and column names are pattern
    /// value arguments.
    pub fn columns(
        &self,
        catalog_name: Option<&SqlText>,
        schema_name: Option<&SqlText>,
        table_name: Option<&SqlText>,
        column_name: Option<&SqlText>,
    ) -> SqlResult<()> {
        unsafe {
            SQLColumnsW(
                self.handle,
                arg_ptr(catalog_name),
                arg_len(catalog_name),
                arg_ptr(schema_name),
                arg_len(schema_name),
                arg_ptr(table_name),
                arg_len(table_name),
                arg_ptr(column_name),
                arg_len(column_name),
            )
        }
        .into_sql_result("SQLColumnsW")
    }

    /// `SQLPrimaryKeys`. All arguments are identifier arguments.
    pub fn primary_keys(
        &self,
        catalog_name: Option<&SqlText>,
        schema_name: Option<&SqlText>,
        table_name: &SqlText,
    ) -> SqlResult<()> {
        unsafe {
            functions::SQLPrimaryKeysW(
                self.handle,
                arg_ptr(catalog_name),
                arg_len(catalog_name),
                arg_ptr(schema_name),
                arg_len(schema_name),
                table_name.ptr(),
                table_name.len_char().try_into().unwrap(),
            )
        }
        .into_sql_result("SQLPrimaryKeysW")
    }

    /// `SQLSpecialColumns`.
    ///
    /// * `identifier_type`: `SQL_BEST_ROWID` (1) or `SQL_ROWVER` (2).
    /// * `scope`: Minimum required scope of the rowid, one of the `SQL_SCOPE_*` values.
    /// * `nullable`: Whether to include columns which can hold NULL.
    pub fn special_columns(
        &self,
        identifier_type: u16,
        catalog_name: Option<&SqlText>,
        schema_name: Option<&SqlText>,
        table_name: &SqlText,
        scope: u16,
        nullable: bool,
    ) -> SqlResult<()> {
        unsafe {
            functions::SQLSpecialColumnsW(
                self.handle,
                identifier_type,
                arg_ptr(catalog_name),
                arg_len(catalog_name),
                arg_ptr(schema_name),
                arg_len(schema_name),
                table_name.ptr(),
                table_name.len_char().try_into().unwrap(),
                scope,
                // SQL_NO_NULLS / SQL_NULLABLE
                if nullable { 1 } else { 0 },
            )
        }
        .into_sql_result("SQLSpecialColumnsW")
    }

    /// `SQLGetTypeInfo` for all SQL types the data source supports.
    pub fn type_info(&self) -> SqlResult<()> {
        unsafe { functions::SQLGetTypeInfoW(self.handle, ALL_TYPES) }
            .into_sql_result("SQLGetTypeInfoW")
    }

    /// Read a string column of the current row as UTF-8. `max_len` is the expected maximum
    /// length in characters; longer values are truncated by the driver and the `01004`
    /// diagnostic is tolerated. `None` if the value is NULL.
    pub fn get_data_string(&self, column_number: u16, max_len: usize) -> SqlResult<Option<String>> {
        let mut buffer = vec![0u16; max_len + 1];
        let mut indicator: Len = 0;
        let result = unsafe {
            SQLGetData(
                self.handle,
                column_number,
                CDataType::WChar,
                mut_buf_ptr(&mut buffer) as Pointer,
                (buffer.len() * 2).try_into().unwrap(),
                &mut indicator,
            )
        }
        .into_sql_result("SQLGetData");
        if result.is_err() {
            return result.map(|()| None);
        }
        result.map(|()| match indicator {
            NULL_DATA => None,
            NO_TOTAL => {
                // Length unknown, rely on the terminating zero written by the driver.
                let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
                Some(String::from_utf16_lossy(&buffer[..end]))
            }
            n => {
                let characters = (n as usize / 2).min(max_len);
                Some(String::from_utf16_lossy(&buffer[..characters]))
            }
        })
    }

    /// Read a 16 bit integer column of the current row. `None` if the value is NULL.
    pub fn get_data_i16(&self, column_number: u16) -> SqlResult<Option<i16>> {
        let mut value: i16 = 0;
        let mut indicator: Len = 0;
        unsafe {
            SQLGetData(
                self.handle,
                column_number,
                CDataType::SShort,
                &mut value as *mut i16 as Pointer,
                0,
                &mut indicator,
            )
        }
        .into_sql_result("SQLGetData")
        .on_success(|| (indicator != NULL_DATA).then_some(value))
    }

    /// Read a 32 bit integer column of the current row. `None` if the value is NULL.
    pub fn get_data_i32(&self, column_number: u16) -> SqlResult<Option<i32>> {
        let mut value: i32 = 0;
        let mut indicator: Len = 0;
        unsafe {
            SQLGetData(
                self.handle,
                column_number,
                CDataType::SLong,
                &mut value as *mut i32 as Pointer,
                0,
                &mut indicator,
            )
        }
        .into_sql_result("SQLGetData")
        .on_success(|| (indicator != NULL_DATA).then_some(value))
    }

    /// Number of active binding subscriptions. Used by tests and debug output.
    pub fn subscription_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

fn arg_ptr(text: Option<&SqlText>) -> *const u16 {
    text.map_or_else(null, |t| t.ptr())
}

fn arg_len(text: Option<&SqlText>) -> i16 {
    text.map_or(0, |t| t.len_char().try_into().unwrap())
}
