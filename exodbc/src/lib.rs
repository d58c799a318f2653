//! # About
//!
//! `exodbc` is a typed, safe object model over ODBC (Open Database Connectivity). It connects
//! to any ODBC conformant data source, introspects schema and driver capabilities, executes SQL
//! and binds application buffers to result columns and parameters, with forward-only or
//! scrollable cursors.
//!
//! The usual flow: create an [`Environment`], create a [`Database`] from it and open the
//! connection, then obtain [`ExecutableStatement`]s and the [`DatabaseCatalog`], bind
//! [`buffers::ColumnBuffer`]s, execute and iterate rows. Handles and bindings release
//! themselves in reverse order on drop.

mod catalog;
mod database;
mod environment;
mod error;
mod info;
mod quirks;
mod records;
mod statement;

pub mod buffers;
pub mod conversion;
pub mod handles;

pub use self::{
    catalog::{escape_search_pattern, DatabaseCatalog, MetadataMode},
    database::{CommitMode, Database, ExecFailMode, IsolationLevel},
    environment::{DataSourceInfo, Environment, ListMode, OdbcVersion},
    error::{ConversionDirection, Error, NotSupportedKind},
    handles::{ColumnDescription, DataType, InfoId, Nullability, ParameterDescription, State},
    info::{InfoCategory, PropertyValue, PropertyValueType, SqlInfoProperties, SqlInfoProperty},
    quirks::{DatabaseProduct, Quirks},
    records::{
        ColumnInfo, IdentifierType, PrimaryKeyInfo, PseudoColumn, RowIdScope, SpecialColumnInfo,
        SqlTypeInfo, TableInfo,
    },
    statement::ExecutableStatement,
};

/// Reexports `odbc-sys` as sys to enable applications to always use the same version as this
/// crate.
pub use odbc_sys as sys;
