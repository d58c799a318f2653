//! Wrappers around the four ODBC handle kinds.
//!
//! Two decisions are baked into this module:
//!
//! * Warnings emitted by the driver are logged with `log`.
//! * The Unicode (wide) variants of the ODBC API are used throughout.
//!
//! Each wrapper owns exactly one native handle, allocated against its parent
//! wrapper, and frees it on drop. Parents are kept alive through an `Rc`, so
//! a child handle can never outlive the handle it was allocated from.

mod as_handle;
mod buffer;
mod column_description;
mod connection;
mod data_type;
mod descriptor;
mod diagnostics;
mod environment;
mod functions;
mod logging;
mod sql_result;
mod sql_text;
mod statement;

pub use self::{
    as_handle::AsHandle,
    column_description::{ColumnDescription, Nullability},
    connection::Connection,
    data_type::DataType,
    descriptor::{Descriptor, DescriptorKind},
    diagnostics::{collect_diagnostics, Record, State},
    environment::Environment,
    functions::InfoId,
    logging::log_diagnostics,
    sql_result::{ExtSqlReturn, SqlResult},
    sql_text::{OutputStringBuffer, SqlText, SzBuffer},
    statement::{
        CursorClose, ParameterDescription, Statement, StatementEvent, StatementEventListener,
        SubscriptionToken,
    },
};

use log::debug;
use odbc_sys::{Handle, HandleType, SQLFreeHandle, SqlReturn};
use std::thread::panicking;

/// Helper function freeing a handle and panicking on errors. Yet if the drop is triggered during
/// another panic, the function will simply ignore errors from failed drops.
///
/// # Safety
///
/// `handle` Must be a valid ODBC handle and `handle_type` must match its type.
pub unsafe fn drop_handle(handle: Handle, handle_type: HandleType) {
    match SQLFreeHandle(handle_type, handle) {
        SqlReturn::SUCCESS => {
            debug!(
                "SQLFreeHandle dropped {:?} of type {:?}.",
                handle, handle_type
            );
        }
        other => {
            // Avoid panicking, if we already have a panic. We don't want to mask the
            // original error.
            if !panicking() {
                panic!("SQLFreeHandle failed with error code: {:?}", other.0)
            }
        }
    }
}
