use super::{
    as_handle::AsHandle,
    buffer::{clamp_small_int, mut_buf_ptr},
    drop_handle,
    functions::{self, InfoId, ATTR_TXN_ISOLATION},
    sql_result::{ExtSqlReturn, SqlResult},
    sql_text::{OutputStringBuffer, SqlText},
    Environment, Statement,
};
use log::debug;
use odbc_sys::{
    CompletionType, ConnectionAttribute, DriverConnectOption, HDbc, HStmt, HWnd, Handle,
    HandleType, Pointer, SQLAllocHandle, SQLConnectW, SQLDisconnect, SQLDriverConnectW, SQLEndTran,
    SQLSetConnectAttrW,
};
use std::{ffi::c_void, mem::size_of, ptr::null_mut, rc::Rc};

/// The connection handle references storage of all information about the connection to the data
/// source, including status, transaction state, and error information.
///
/// The wrapper keeps the [`Environment`] it has been allocated from alive, so the parent handle
/// can never be freed before this one.
pub struct Connection {
    handle: HDbc,
    _parent: Rc<Environment>,
}

unsafe impl AsHandle for Connection {
    fn as_handle(&self) -> Handle {
        Handle(self.handle.0)
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Dbc
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            drop_handle(Handle(self.handle.0), HandleType::Dbc);
        }
    }
}

impl Connection {
    /// # Safety
    ///
    /// Call this method only with a valid (successfully allocated) ODBC connection handle
    /// allocated from `parent`.
    pub unsafe fn new(handle: HDbc, parent: Rc<Environment>) -> Self {
        Self {
            handle,
            _parent: parent,
        }
    }

    /// Establishes a connection to a driver and a data source.
    ///
    /// # Arguments
    ///
    /// * `data_source_name` - Data source name. The data might be located on the same computer as
    ///   the program, or on another computer somewhere on a network.
    /// * `user` - User identifier.
    /// * `pwd` - Authentication string (typically the password).
    pub fn connect(&self, data_source_name: &SqlText, user: &SqlText, pwd: &SqlText) -> SqlResult<()> {
        unsafe {
            SQLConnectW(
                self.handle,
                data_source_name.ptr(),
                data_source_name.len_char().try_into().unwrap(),
                user.ptr(),
                user.len_char().try_into().unwrap(),
                pwd.ptr(),
                pwd.len_char().try_into().unwrap(),
            )
        }
        .into_sql_result("SQLConnectW")
    }

    /// An alternative to `connect` for connecting with a connection string. Allows for completing
    /// a connection string with a GUI prompt on windows.
    ///
    /// # Safety
    ///
    /// `parent_window` must either be a valid window handle or `NULL`.
    pub unsafe fn driver_connect(
        &self,
        connection_string: &SqlText,
        parent_window: HWnd,
        completed_connection_string: &mut OutputStringBuffer,
        driver_completion: DriverConnectOption,
    ) -> SqlResult<()> {
        SQLDriverConnectW(
            self.handle,
            parent_window,
            connection_string.ptr(),
            connection_string.len_char().try_into().unwrap(),
            completed_connection_string.mut_buf_ptr(),
            completed_connection_string.buf_len(),
            completed_connection_string.mut_actual_len_ptr(),
            driver_completion,
        )
        .into_sql_result("SQLDriverConnectW")
    }

    /// Disconnect from an ODBC data source.
    pub fn disconnect(&self) -> SqlResult<()> {
        unsafe { SQLDisconnect(self.handle) }.into_sql_result("SQLDisconnect")
    }

    /// Allocate a new statement handle. The resulting [`Statement`] keeps this connection alive
    /// through the passed `Rc`.
    pub fn allocate_statement(self: &Rc<Self>) -> SqlResult<Rc<Statement>> {
        let mut handle = Handle(null_mut());
        unsafe {
            SQLAllocHandle(HandleType::Stmt, self.as_handle(), &mut handle)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| {
                    let handle = HStmt(handle.0);
                    debug!("SQLAllocHandle allocated statement (Stmt) handle '{:?}'", handle);
                    Rc::new(Statement::new(handle, self.clone()))
                })
        }
    }

    /// Specify the transaction mode. By default, ODBC transactions are in auto-commit mode.
    /// Switching from manual-commit mode to auto-commit mode automatically commits any open
    /// transaction on the connection.
    pub fn set_autocommit(&self, enabled: bool) -> SqlResult<()> {
        let val = if enabled { 1usize } else { 0usize };
        unsafe {
            SQLSetConnectAttrW(
                self.handle,
                ConnectionAttribute::AUTOCOMMIT,
                val as Pointer,
                0, // will be ignored according to ODBC spec
            )
        }
        .into_sql_result("SQLSetConnectAttrW")
    }

    /// Queries the `SQL_ATTR_AUTOCOMMIT` attribute. `true` means auto-commit is active.
    pub fn autocommit(&self) -> SqlResult<bool> {
        let mut value = 0usize;
        unsafe {
            odbc_sys::SQLGetConnectAttrW(
                self.handle,
                ConnectionAttribute::AUTOCOMMIT,
                &mut value as *mut usize as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetConnectAttrW")
        .on_success(|| value != 0)
    }

    /// To commit a transaction in manual-commit mode.
    pub fn commit(&self) -> SqlResult<()> {
        unsafe { SQLEndTran(HandleType::Dbc, self.as_handle(), CompletionType::Commit) }
            .into_sql_result("SQLEndTran")
    }

    /// Roll back a transaction in manual-commit mode.
    pub fn rollback(&self) -> SqlResult<()> {
        unsafe { SQLEndTran(HandleType::Dbc, self.as_handle(), CompletionType::Rollback) }
            .into_sql_result("SQLEndTran")
    }

    /// Switches the `SQL_ATTR_TRACE` attribute of this connection on or off. The driver manager
    /// writes a trace of every call on the connection while the attribute is enabled.
    pub fn set_trace(&self, enabled: bool) -> SqlResult<()> {
        // SQL_OPT_TRACE_ON / SQL_OPT_TRACE_OFF
        let value = if enabled { 1usize } else { 0usize };
        unsafe {
            functions::SQLSetConnectAttrW(
                self.handle,
                functions::ATTR_TRACE,
                value as Pointer,
                0,
            )
        }
        .into_sql_result("SQLSetConnectAttrW")
    }

    /// Sets the `SQL_ATTR_TXN_ISOLATION` attribute. `mask` is one of the `SQL_TXN_*` isolation
    /// bits.
    pub fn set_transaction_isolation(&self, mask: u32) -> SqlResult<()> {
        unsafe {
            functions::SQLSetConnectAttrW(
                self.handle,
                ATTR_TXN_ISOLATION,
                mask as usize as Pointer,
                0,
            )
        }
        .into_sql_result("SQLSetConnectAttrW")
    }

    /// Reads the `SQL_ATTR_TXN_ISOLATION` attribute.
    pub fn transaction_isolation(&self) -> SqlResult<u32> {
        let mut value: u32 = 0;
        unsafe {
            functions::SQLGetConnectAttrW(
                self.handle,
                ATTR_TXN_ISOLATION,
                &mut value as *mut u32 as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetConnectAttrW")
        .on_success(|| value)
    }

    /// Indicates the state of the connection. If `true` the connection has been lost. If `false`,
    /// the connection is still active.
    pub fn is_dead(&self) -> SqlResult<bool> {
        let mut value = 0usize;
        unsafe {
            odbc_sys::SQLGetConnectAttrW(
                self.handle,
                ConnectionAttribute::CONNECTION_DEAD,
                &mut value as *mut usize as *mut c_void,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetConnectAttrW")
        .on_success(|| value == 1)
    }

    /// Read a 16 bit unsigned integer piece of information about the driver or data source.
    pub fn get_info_u16(&self, info_id: InfoId) -> SqlResult<u16> {
        let mut value = 0u16;
        unsafe {
            functions::SQLGetInfoW(
                self.handle,
                info_id.0,
                &mut value as *mut u16 as Pointer,
                // Buffer length should not be required in this case, according to the ODBC
                // documentation. However, in practice some drivers (such as Microsoft Access)
                // require it to be specified explicitly here, otherwise they return an error
                // without diagnostics.
                size_of::<*mut u16>() as i16,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetInfoW")
        .on_success(|| value)
    }

    /// Read a 32 bit unsigned integer piece of information about the driver or data source.
    pub fn get_info_u32(&self, info_id: InfoId) -> SqlResult<u32> {
        let mut value = 0u32;
        unsafe {
            functions::SQLGetInfoW(
                self.handle,
                info_id.0,
                &mut value as *mut u32 as Pointer,
                size_of::<*mut u32>() as i16,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetInfoW")
        .on_success(|| value)
    }

    /// Read a string piece of information about the driver or data source, into `buf`.
    ///
    /// The read is two-phased: if the preallocated buffer turns out to be too small, it is grown
    /// to the size reported by the driver and the information is requested again. A truncation
    /// reported on the second pass is tolerated.
    pub fn get_info_string(&self, info_id: InfoId, buf: &mut Vec<u16>) -> SqlResult<()> {
        // String length in bytes, not characters. Terminating zero is excluded.
        let mut string_length_in_bytes: i16 = 0;
        // Use all the capacity `buf` has to offer.
        buf.resize(buf.capacity().max(1), 0);

        let result = unsafe {
            functions::SQLGetInfoW(
                self.handle,
                info_id.0,
                mut_buf_ptr(buf) as Pointer,
                (buf.len() * 2).try_into().unwrap(),
                &mut string_length_in_bytes as *mut i16,
            )
        }
        .into_sql_result("SQLGetInfoW");
        if result.is_err() {
            return result;
        }

        if clamp_small_int(buf.len() * 2) < string_length_in_bytes + 2 {
            buf.resize((string_length_in_bytes / 2 + 1).try_into().unwrap(), 0);
            let result = unsafe {
                functions::SQLGetInfoW(
                    self.handle,
                    info_id.0,
                    mut_buf_ptr(buf) as Pointer,
                    (buf.len() * 2).try_into().unwrap(),
                    &mut string_length_in_bytes as *mut i16,
                )
            }
            .into_sql_result("SQLGetInfoW");
            if result.is_err() {
                return result;
            }
        }

        // Resize buffer to exact string length without terminating zero.
        buf.resize(((string_length_in_bytes + 1) / 2).try_into().unwrap(), 0);
        SqlResult::Success(())
    }

    /// Provides access to the raw ODBC connection handle.
    pub fn as_raw(&self) -> HDbc {
        self.handle
    }
}
