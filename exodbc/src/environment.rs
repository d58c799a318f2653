use std::rc::Rc;

use odbc_sys::{AttrConnectionPooling, FetchOrientation};

use crate::{
    error::Error,
    handles::{self, SqlResult},
};

/// The ODBC versions an application can declare towards the driver manager, plus the unknown
/// state answered by drivers which report something unparsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OdbcVersion {
    Unknown,
    V2,
    V3,
    V3_8,
}

impl OdbcVersion {
    fn to_attr(self) -> i32 {
        match self {
            // SQL_OV_ODBC2
            OdbcVersion::V2 => 2,
            OdbcVersion::V3 => odbc_sys::AttrOdbcVersion::Odbc3 as i32,
            OdbcVersion::V3_8 => odbc_sys::AttrOdbcVersion::Odbc3_80 as i32,
            OdbcVersion::Unknown => {
                panic!("OdbcVersion::Unknown cannot be declared towards the driver manager")
            }
        }
    }
}

impl std::fmt::Display for OdbcVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OdbcVersion::Unknown => write!(f, "unknown"),
            OdbcVersion::V2 => write!(f, "2.0"),
            OdbcVersion::V3 => write!(f, "3.0"),
            OdbcVersion::V3_8 => write!(f, "3.8"),
        }
    }
}

/// Which data sources [`Environment::list_data_sources`] enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// User and system data sources.
    All,
    /// Only data sources from the user configuration.
    User,
    /// Only data sources from the system configuration.
    System,
}

/// One entry of the data source enumeration of the driver manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceInfo {
    /// Name of the data source, as used to connect to it.
    pub name: String,
    /// Description of the data source, i.e. the name of its driver.
    pub driver: String,
}

/// An ODBC environment with a declared ODBC version. Every [`crate::Database`] needs one.
pub struct Environment {
    environment: Rc<handles::Environment>,
    version: OdbcVersion,
}

impl Environment {
    /// Allocates a new ODBC environment and declares the given ODBC version on it.
    pub fn new(version: OdbcVersion) -> Result<Self, Error> {
        let environment = match handles::Environment::new() {
            SqlResult::Success(env) | SqlResult::SuccessWithInfo(env) => env,
            _ => {
                // There is no handle to collect diagnostics from if even the allocation of the
                // environment fails.
                return Err(Error::NoDiagnostics {
                    function: "SQLAllocHandle",
                });
            }
        };
        environment
            .declare_version(version.to_attr())
            .into_result(&environment)
            .map_err(|error| match error {
                Error::Diagnostics { records, .. } => {
                    Error::UnsupportedOdbcApiVersion(records.into_iter().next().unwrap())
                }
                other => other,
            })?;
        Ok(Self {
            environment: Rc::new(environment),
            version,
        })
    }

    /// The ODBC version declared at allocation time.
    pub fn version(&self) -> OdbcVersion {
        self.version
    }

    /// Enable or disable (default) connection pooling at the driver manager level. Call this
    /// before the first environment of the process is allocated.
    ///
    /// # Safety
    ///
    /// The driver must be fully thread-safe to support pooled connections, which the driver
    /// manager cannot verify.
    pub unsafe fn set_connection_pooling(scheme: AttrConnectionPooling) -> Result<(), Error> {
        no_handle_result(handles::Environment::set_connection_pooling(scheme))
    }

    /// Set the path of the file the driver manager writes its trace into. Process wide.
    pub fn set_tracefile(path: &str) -> Result<(), Error> {
        no_handle_result(handles::Environment::set_tracefile(path))
    }

    /// Enable or disable driver manager tracing. Process wide.
    pub fn set_trace(enabled: bool) -> Result<(), Error> {
        no_handle_result(handles::Environment::set_trace(enabled))
    }

    /// Enumerates the data sources configured for the driver manager.
    pub fn list_data_sources(&self, mode: ListMode) -> Result<Vec<DataSourceInfo>, Error> {
        let mut sources = Vec::new();
        let mut direction = match mode {
            ListMode::All => FetchOrientation::First,
            ListMode::User => FetchOrientation::FirstUser,
            ListMode::System => FetchOrientation::FirstSystem,
        };
        loop {
            let (len_name, len_desc) = match self
                .environment
                .data_source_buffer_len(direction)
                .into_result_option(self.environment.as_ref())?
            {
                Some(lengths) => lengths,
                None => break,
            };
            let mut name = vec![0u16; len_name.max(0) as usize + 1];
            let mut description = vec![0u16; len_desc.max(0) as usize + 1];
            match self
                .environment
                .data_source_buffer_fill(direction, &mut name, &mut description)
                .into_result_option(self.environment.as_ref())?
            {
                Some(()) => (),
                None => break,
            }
            name.truncate(len_name.max(0) as usize);
            description.truncate(len_desc.max(0) as usize);
            sources.push(DataSourceInfo {
                name: String::from_utf16_lossy(&name),
                driver: String::from_utf16_lossy(&description),
            });
            direction = FetchOrientation::Next;
        }
        Ok(sources)
    }

    pub(crate) fn handle(&self) -> &Rc<handles::Environment> {
        &self.environment
    }
}

fn no_handle_result<T>(result: SqlResult<T>) -> Result<T, Error> {
    match result {
        SqlResult::Success(value) | SqlResult::SuccessWithInfo(value) => Ok(value),
        SqlResult::NoData { function } => Err(Error::NoData { function }),
        SqlResult::Error { function } => Err(Error::NoDiagnostics { function }),
    }
}

#[cfg(test)]
mod tests {
    use super::OdbcVersion;

    #[test]
    fn versions_are_ordered() {
        assert!(OdbcVersion::V3_8 > OdbcVersion::V3);
        assert!(OdbcVersion::V3 > OdbcVersion::V2);
        assert!(OdbcVersion::V2 > OdbcVersion::Unknown);
    }

    #[test]
    fn display_matches_cli_vocabulary() {
        assert_eq!("3.8", OdbcVersion::V3_8.to_string());
        assert_eq!("2.0", OdbcVersion::V2.to_string());
    }
}
