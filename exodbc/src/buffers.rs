//! Typed column buffers and their binding protocol.
//!
//! A buffer owns the application memory the driver reads parameters from and writes column
//! values into, together with the length indicator describing the value. Buffers are handed out
//! as `Rc`s: binding one to a statement stores a weak back reference and a subscription on the
//! statement's unbind events, so driver side state and buffer side bookkeeping can never drift
//! apart, and a dropped buffer releases any binding it still holds.

mod column_buffer;
mod fixed_sized;
mod indicator;
mod opaque;
mod sql_to_buffer_map;
mod string_column;
mod text_column;

pub use self::{
    column_buffer::ColumnBuffer,
    fixed_sized::{
        BigIntColumn, DateColumn, DoubleColumn, FixedColumn, FixedSizedCType, LongColumn,
        NumericColumn, RealColumn, ShortColumn, TimeColumn, TimestampColumn, UBigIntColumn,
        ULongColumn, UShortColumn,
    },
    indicator::Indicator,
    opaque::OpaqueColumn,
    sql_to_buffer_map::Sql2BufferTypeMap,
    string_column::StringColumnWrapper,
    text_column::{BinaryColumn, CharColumn, TextChar, TextColumn, WCharColumn},
};

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use log::error;
use odbc_sys::SqlDataType;

use crate::handles::{Statement, StatementEvent, SubscriptionToken};

/// Intended usage of a column buffer. Any subset may be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnFlags(u32);

impl ColumnFlags {
    pub const NONE: ColumnFlags = ColumnFlags(0);
    /// The buffer participates in `SELECT` statements, i.e. it is bound as a result column.
    pub const SELECT: ColumnFlags = ColumnFlags(1);
    /// The buffer participates in `UPDATE` statements as a parameter.
    pub const UPDATE: ColumnFlags = ColumnFlags(2);
    /// The buffer participates in `INSERT` statements as a parameter.
    pub const INSERT: ColumnFlags = ColumnFlags(4);
    /// The column may hold NULL values. Only buffers with this flag may be set to NULL.
    pub const NULLABLE: ColumnFlags = ColumnFlags(8);
    /// The column is part of the primary key of its table.
    pub const PRIMARY_KEY: ColumnFlags = ColumnFlags(16);

    /// `SELECT`, `UPDATE` and `INSERT` combined.
    pub const READ_WRITE: ColumnFlags = ColumnFlags(1 | 2 | 4);

    pub fn contains(self, other: ColumnFlags) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for ColumnFlags {
    type Output = ColumnFlags;

    fn bitor(self, rhs: ColumnFlags) -> ColumnFlags {
        ColumnFlags(self.0 | rhs.0)
    }
}

/// Properties describing the database column a buffer transports values for. Used to synthesize
/// parameter descriptions and to bind numeric buffers through the descriptor fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProperties {
    /// The identifier under which the column is referenced within queries.
    pub query_name: String,
    /// SQL type of the column on the data source.
    pub sql_type: SqlDataType,
    /// Size of the column as used for parameter binding. Precision for numeric types, length for
    /// character and binary types.
    pub column_size: usize,
    /// Decimal digits as used for parameter binding. Scale for numeric types.
    pub decimal_digits: i16,
}

impl ColumnProperties {
    pub fn new(query_name: impl Into<String>, sql_type: SqlDataType) -> Self {
        ColumnProperties {
            query_name: query_name.into(),
            sql_type,
            column_size: 0,
            decimal_digits: 0,
        }
    }
}

struct BindingEntry {
    statement: Weak<Statement>,
    token: SubscriptionToken,
    event: StatementEvent,
}

/// Tracks on which statement handles a buffer is currently bound, as column or parameter.
///
/// Dropping the registry (i.e. dropping the buffer) releases any binding still referencing a
/// live statement. Failures during that release are logged, never raised.
#[derive(Default)]
pub(crate) struct BindingRegistry {
    entries: RefCell<Vec<BindingEntry>>,
}

impl BindingRegistry {
    pub fn register(
        &self,
        statement: &Rc<Statement>,
        token: SubscriptionToken,
        event: StatementEvent,
    ) {
        self.entries.borrow_mut().push(BindingEntry {
            statement: Rc::downgrade(statement),
            token,
            event,
        });
    }

    /// Forget all entries for `statement` and `event`. Called when the statement broadcasts the
    /// event: the driver side binding is already gone at this point.
    pub fn forget_event(&self, statement: &Statement, event: StatementEvent) {
        self.entries.borrow_mut().retain(|entry| {
            let same_statement = entry
                .statement
                .upgrade()
                .is_some_and(|stmt| std::ptr::eq(Rc::as_ptr(&stmt), statement));
            !(same_statement && entry.event == event)
        });
    }

    /// Number of active bindings. A buffer with count zero is bound nowhere.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// `true` if any entry references `statement`.
    pub fn is_bound_to(&self, statement: &Statement) -> bool {
        self.entries.borrow().iter().any(|entry| {
            entry
                .statement
                .upgrade()
                .is_some_and(|stmt| std::ptr::eq(Rc::as_ptr(&stmt), statement))
        })
    }

    fn release_all(&self) {
        let entries = self.entries.take();
        for entry in entries {
            let Some(statement) = entry.statement.upgrade() else {
                continue;
            };
            // First disconnect the subscription, then release the binding on the driver side.
            // The release broadcasts to the remaining subscribers of the statement, but no
            // longer to us.
            statement.unsubscribe(entry.token);
            let result = match entry.event {
                StatementEvent::ColumnsUnbound => statement.unbind_cols(),
                StatementEvent::ParamsReset => statement.reset_params(),
            };
            if result.is_err() {
                result.log_diagnostics(statement.as_ref());
                error!("Failed to release buffer binding while dropping a column buffer.");
            }
        }
    }
}

impl Drop for BindingRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
