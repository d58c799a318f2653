use std::fmt::Write as _;

use thiserror::Error as ThisError;

use crate::handles::{collect_diagnostics, log_diagnostics, AsHandle, Record, SqlResult, State};

/// Tells what kind of thing a [`Error::NotSupported`] complains about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSupportedKind {
    /// An `SQL_C_*` buffer type code.
    SqlCType,
    /// An `SQL_*` data source type code.
    SqlType,
    /// A capability the driver or this crate does not offer, e.g. scrollable cursors on a
    /// forward-only statement. `code` is zero for this kind.
    Feature,
}

/// Direction of a failed text recoding at the unicode boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionDirection {
    Utf8ToUtf16,
    Utf16ToUtf8,
}

impl std::fmt::Display for ConversionDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionDirection::Utf8ToUtf16 => write!(f, "UTF-8 to UTF-16"),
            ConversionDirection::Utf16ToUtf8 => write!(f, "UTF-16 to UTF-8"),
        }
    }
}

/// Error type of this crate. Driver call failures carry the complete list of diagnostic records
/// the driver associated with the failing call.
#[derive(Debug, ThisError)]
pub enum Error {
    /// No diagnostics available. This is usually the case if allocation of the ODBC environment
    /// itself fails. In that case no object exists to obtain the diagnostic record from.
    #[error("No Diagnostics available. ODBC function '{function}' reported an error.")]
    NoDiagnostics {
        /// ODBC API call which failed without diagnostics.
        function: &'static str,
    },
    /// SQL error returned by a low level ODBC function call. The diagnostic records of the
    /// failing handle are captured.
    #[error("ODBC emitted an error calling '{function}':\n{}", format_records(.records))]
    Diagnostics {
        /// All diagnostic records the driver queued for the failing call, in order.
        records: Vec<Record>,
        /// ODBC API call which produced the diagnostic records.
        function: &'static str,
    },
    /// A user dialog to complete the connection string has been aborted.
    #[error("The dialog shown to provide or complete the connection string has been aborted.")]
    AbortedConnectionStringCompletion,
    /// Failure to set the ODBC version on the environment. Driver manager is likely too old.
    #[error(
        "The ODBC driver manager does not seem to support the requested ODBC version. Most \
        likely you need to update unixODBC if you run on Linux. Diagnostic record returned by \
        SQLSetEnvAttr:\n{0}"
    )]
    UnsupportedOdbcApiVersion(Record),
    /// The driver answered `SQL_NO_DATA` where the caller required data, e.g. a `DELETE`
    /// affecting no rows executed with [`crate::ExecFailMode::FailOnNoData`].
    #[error("ODBC function '{function}' returned no data.")]
    NoData {
        /// ODBC API call which returned no data.
        function: &'static str,
    },
    /// An argument violated the contract of the called function.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
    /// A type code has been passed which this crate or the driver cannot handle.
    #[error("Not supported {kind:?} code: {code}. {message}")]
    NotSupported {
        kind: NotSupportedKind,
        code: i16,
        message: String,
    },
    /// The operation is not allowed in the current state.
    #[error("Operation not allowed: {0}")]
    NotAllowed(String),
    /// A lookup yielded no (or no unambiguous) result.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The functionality has not been implemented.
    #[error("Not implemented.")]
    NotImplemented,
    /// A NULL value has been encountered where the caller asked for a value.
    #[error("Column '{column}' is NULL.")]
    NullValue {
        /// Query name of the column holding NULL.
        column: String,
    },
    /// Another error has been wrapped, e.g. a buffer access through a mismatching wrapper.
    #[error("Wrapped error: {inner}")]
    Wrapper {
        #[source]
        inner: Box<Error>,
    },
    /// Recoding text at the unicode boundary failed.
    #[error("Conversion {direction} failed: {message}")]
    Conversion {
        direction: ConversionDirection,
        message: String,
    },
}

impl Error {
    /// `true` if this error is a driver call failure and any of its diagnostic records carries
    /// the given SQLSTATE. Callers match on states like `HYC00` to recover from optional
    /// features a driver does not implement.
    pub fn has_sqlstate(&self, state: State) -> bool {
        match self {
            Error::Diagnostics { records, .. } => records.iter().any(|r| r.state == state),
            _ => false,
        }
    }

    /// Wraps this error into [`Error::Wrapper`].
    pub fn wrap(self) -> Error {
        Error::Wrapper {
            inner: Box::new(self),
        }
    }
}

fn format_records(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "{record}");
    }
    out
}

// Defined here rather than in the `sql_result` module to keep the `handles` module entirely
// agnostic about the top level `Error` type.
impl<T> SqlResult<T> {
    /// Translates the result of an ODBC function into a `Result`, collecting diagnostics from
    /// `handle` on failure. `SQL_NO_DATA` is treated as a failure; use
    /// [`SqlResult::into_result_option`] where it is an expected outcome.
    pub fn into_result(self, handle: &dyn AsHandle) -> Result<T, Error> {
        match self {
            SqlResult::NoData { function } => Err(Error::NoData { function }),
            other => {
                // `NoData` is excluded above, so a successful conversion always holds a value.
                other.into_result_option(handle).map(|value| value.unwrap())
            }
        }
    }

    /// Translates the result of an ODBC function into a `Result`, mapping `SQL_NO_DATA` to
    /// `None`.
    pub fn into_result_option(self, handle: &dyn AsHandle) -> Result<Option<T>, Error> {
        match self {
            // The function has been executed successfully. Holds result.
            SqlResult::Success(value) => Ok(Some(value)),
            // The function has been executed successfully. There have been warnings.
            SqlResult::SuccessWithInfo(value) => {
                log_diagnostics(handle);
                Ok(Some(value))
            }
            SqlResult::NoData { .. } => Ok(None),
            SqlResult::Error { function } => {
                let records = collect_diagnostics(handle);
                if records.is_empty() {
                    Err(Error::NoDiagnostics { function })
                } else {
                    for record in &records {
                        log::warn!("{record}");
                    }
                    Err(Error::Diagnostics { records, function })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, State};
    use crate::handles::Record;

    #[test]
    fn sqlstate_predicate_inspects_all_records() {
        let error = Error::Diagnostics {
            records: vec![
                Record {
                    state: State(*b"01000"),
                    ..Record::default()
                },
                Record {
                    state: State::OPTIONAL_FEATURE_NOT_IMPLEMENTED,
                    ..Record::default()
                },
            ],
            function: "SQLSetStmtAttrW",
        };
        assert!(error.has_sqlstate(State::OPTIONAL_FEATURE_NOT_IMPLEMENTED));
        assert!(!error.has_sqlstate(State::INVALID_CURSOR_STATE));
    }

    #[test]
    fn sqlstate_predicate_is_false_for_other_kinds() {
        let error = Error::NotImplemented;
        assert!(!error.has_sqlstate(State::INVALID_CURSOR_STATE));
    }
}
