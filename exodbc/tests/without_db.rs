//! Tests which only require a driver manager, but no data source to connect to.

use exodbc::{Environment, ListMode, OdbcVersion};
use lazy_static::lazy_static;
use std::sync::Mutex;

lazy_static! {
    /// Creating environments concurrently from multiple tests stresses the driver manager more
    /// than any application would; serialize them.
    static ref SERIALIZE_ENV: Mutex<()> = Mutex::new(());
}

#[test]
fn create_environment() {
    let _guard = SERIALIZE_ENV.lock().unwrap();
    Environment::new(OdbcVersion::V3_8).unwrap();
}

#[test]
fn create_odbc2_environment() {
    let _guard = SERIALIZE_ENV.lock().unwrap();
    Environment::new(OdbcVersion::V2).unwrap();
}

#[test]
fn list_data_sources() {
    let _guard = SERIALIZE_ENV.lock().unwrap();
    let environment = Environment::new(OdbcVersion::V3).unwrap();
    // The list may well be empty on a fresh system, the enumeration itself must work for all
    // three modes.
    environment.list_data_sources(ListMode::All).unwrap();
    environment.list_data_sources(ListMode::User).unwrap();
    environment.list_data_sources(ListMode::System).unwrap();
}
