use super::{
    as_handle::AsHandle,
    drop_handle,
    functions::{self, ATTR_TRACE, ATTR_TRACEFILE},
    sql_result::{ExtSqlReturn, SqlResult},
    sql_text::SqlText,
    Connection,
};
use log::debug;
use odbc_sys::{
    AttrConnectionPooling, AttrOdbcVersion, EnvironmentAttribute, FetchOrientation, HDbc, HEnv,
    Handle, HandleType, SQLAllocHandle, SQLDataSourcesW, SQLSetEnvAttr,
};
use std::{ptr::null_mut, rc::Rc};

/// An `Environment` is a global context, in which to access data.
///
/// Associated with an `Environment` is any information that is global in nature, such as:
///
/// * The `Environment`'s state
/// * The current environment-level diagnostics
/// * The handles of connections currently allocated on the environment
/// * The current setting of each environment attribute
#[derive(Debug)]
pub struct Environment {
    /// Invariant: Should always point to a valid ODBC Environment
    handle: HEnv,
}

unsafe impl AsHandle for Environment {
    fn as_handle(&self) -> Handle {
        Handle(self.handle.0)
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Env
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        unsafe {
            drop_handle(Handle(self.handle.0), HandleType::Env);
        }
    }
}

impl Environment {
    /// An allocated ODBC Environment handle
    pub fn new() -> SqlResult<Self> {
        let mut handle = Handle(null_mut());
        let result: SqlResult<()> =
            unsafe { SQLAllocHandle(HandleType::Env, Handle(null_mut()), &mut handle) }
                .into_sql_result("SQLAllocHandle");
        result.on_success(|| Environment {
            handle: HEnv(handle.0),
        })
    }

    /// Declares which version of the ODBC API we want to use. This is the first thing that should
    /// be done with any ODBC environment.
    pub fn declare_version(&self, version: i32) -> SqlResult<()> {
        unsafe {
            SQLSetEnvAttr(
                self.handle,
                EnvironmentAttribute::OdbcVersion,
                version as odbc_sys::Pointer,
                0,
            )
        }
        .into_sql_result("SQLSetEnvAttr")
    }

    /// Enable or disable (default) connection pooling for ODBC connections. Call this function
    /// before creating the ODBC environment for which you want to enable connection pooling, it
    /// is a process level attribute of the driver manager.
    ///
    /// # Safety
    ///
    /// > An ODBC driver must be fully thread-safe, and connections must not have thread affinity
    /// > to support connection pooling. This means the driver is able to handle a call on any
    /// > thread at any time and is able to connect on one thread, to use the connection on another
    /// > thread, and to disconnect on a third thread.
    pub unsafe fn set_connection_pooling(scheme: AttrConnectionPooling) -> SqlResult<()> {
        SQLSetEnvAttr(
            HEnv(null_mut()),
            EnvironmentAttribute::ConnectionPooling,
            scheme.into(),
            odbc_sys::IS_INTEGER,
        )
        .into_sql_result("SQLSetEnvAttr")
    }

    /// Set the path of the file the driver manager writes its trace into. The attribute is
    /// process wide, a null connection handle is passed to the driver manager.
    pub fn set_tracefile(path: &str) -> SqlResult<()> {
        let path = SqlText::new(path);
        unsafe {
            functions::SQLSetConnectAttrW(
                HDbc(null_mut()),
                ATTR_TRACEFILE,
                path.ptr() as odbc_sys::Pointer,
                (path.len_char() * 2).try_into().unwrap(),
            )
        }
        .into_sql_result("SQLSetConnectAttrW")
    }

    /// Enable or disable driver manager tracing for the whole process.
    pub fn set_trace(enabled: bool) -> SqlResult<()> {
        // SQL_OPT_TRACE_ON / SQL_OPT_TRACE_OFF
        let value = if enabled { 1usize } else { 0usize };
        unsafe {
            functions::SQLSetConnectAttrW(
                HDbc(null_mut()),
                ATTR_TRACE,
                value as odbc_sys::Pointer,
                0,
            )
        }
        .into_sql_result("SQLSetConnectAttrW")
    }

    /// Allocate a new connection handle. The resulting `Connection` keeps this environment alive
    /// through the passed `Rc`.
    pub fn allocate_connection(self: &Rc<Self>) -> SqlResult<Connection> {
        let mut handle = Handle(null_mut());
        unsafe {
            SQLAllocHandle(HandleType::Dbc, self.as_handle(), &mut handle)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| {
                    let handle = HDbc(handle.0);
                    debug!("SQLAllocHandle allocated connection (Dbc) handle '{:?}'", handle);
                    Connection::new(handle, self.clone())
                })
        }
    }

    /// Provides access to the raw ODBC environment handle.
    pub fn as_raw(&self) -> HEnv {
        self.handle
    }

    /// List data sources, one at a time. Returns `NoData` to indicate the end of the list.
    ///
    /// # Parameters
    ///
    /// * `direction`: Determines whether the Driver Manager fetches the next data source in the
    ///   list ([`FetchOrientation::Next`]) or whether the search starts from the beginning of the
    ///   list ([`FetchOrientation::First`], [`FetchOrientation::FirstSystem`],
    ///   [`FetchOrientation::FirstUser`]).
    /// * `buffer_name`: Filled with the name of the data source.
    /// * `buffer_description`: Filled with a description of the data source (i.e. the driver
    ///   name).
    ///
    /// Use [`Environment::data_source_buffer_len`] to determine the required buffer lengths.
    pub fn data_source_buffer_fill(
        &self,
        direction: FetchOrientation,
        buffer_name: &mut [u16],
        buffer_description: &mut [u16],
    ) -> SqlResult<()> {
        unsafe {
            SQLDataSourcesW(
                self.handle,
                direction,
                buffer_name.as_mut_ptr(),
                buffer_name.len().try_into().unwrap(),
                null_mut(),
                buffer_description.as_mut_ptr(),
                buffer_description.len().try_into().unwrap(),
                null_mut(),
            )
        }
        .into_sql_result("SQLDataSourcesW")
    }

    /// Determine the required buffer sizes for [`Environment::data_source_buffer_fill`].
    ///
    /// # Return
    ///
    /// `(server name length, description length)`. Length is in characters minus terminating
    /// zero.
    pub fn data_source_buffer_len(&self, direction: FetchOrientation) -> SqlResult<(i16, i16)> {
        // Lengths in characters minus terminating zero
        let mut length_name: i16 = 0;
        let mut length_description: i16 = 0;
        unsafe {
            SQLDataSourcesW(
                self.handle,
                direction,
                null_mut(),
                0,
                &mut length_name,
                null_mut(),
                0,
                &mut length_description,
            )
        }
        .into_sql_result("SQLDataSourcesW")
        .on_success(|| (length_name, length_description))
    }
}
