//! End to end scenarios against a real data source.
//!
//! These tests are skipped unless the environment variable `EXODBC_TEST_CONNECTION_STRING`
//! names an ODBC connection string, e.g.
//! `Driver={ODBC Driver 18 for SQL Server};Server=localhost;UID=SA;PWD=...`.

use exodbc::{
    buffers::{CharColumn, ColumnBuffer, ColumnFlags, LongColumn, TimestampColumn},
    conversion::init_timestamp,
    CommitMode, Database, Environment, ExecFailMode, MetadataMode, OdbcVersion,
};
use lazy_static::lazy_static;
use std::sync::Mutex;

lazy_static! {
    static ref SERIALIZE: Mutex<()> = Mutex::new(());
}

fn open_database() -> Option<Database> {
    let connection_string = std::env::var("EXODBC_TEST_CONNECTION_STRING").ok()?;
    let environment = Environment::new(OdbcVersion::V3_8).unwrap();
    let mut database = Database::new(&environment).unwrap();
    database
        .open_with_connection_string(&connection_string)
        .unwrap();
    Some(database)
}

fn reopen(database: &mut Database) {
    let connection_string = std::env::var("EXODBC_TEST_CONNECTION_STRING").unwrap();
    database.close().unwrap();
    database
        .open_with_connection_string(&connection_string)
        .unwrap();
}

/// Drops the table if an earlier run left it behind, then creates it empty.
fn recreate_table(database: &Database, table: &str) {
    let _ = database.exec_sql(&format!("DROP TABLE {table}"), ExecFailMode::NotFailOnNoData);
    database
        .exec_sql(
            &format!(
                "CREATE TABLE {table} (id INT NOT NULL PRIMARY KEY, name VARCHAR(16), \
                 lastUpdate TIMESTAMP)"
            ),
            ExecFailMode::NotFailOnNoData,
        )
        .unwrap();
    if database.commit_mode() == CommitMode::Manual {
        database.commit_trans().unwrap();
    }
}

fn count_rows(database: &Database, query: &str) -> i32 {
    let mut statement = exodbc::ExecutableStatement::with_database(database).unwrap();
    statement.execute_direct(query).unwrap();
    let count = LongColumn::new("count", ColumnFlags::SELECT);
    statement
        .bind_column(&ColumnBuffer::Long(count.clone()), 1)
        .unwrap();
    assert!(statement.select_next().unwrap());
    let value = count.value().unwrap();
    statement.select_close().unwrap();
    value
}

#[test]
fn open_insert_commit_and_re_read() {
    let _guard = SERIALIZE.lock().unwrap();
    let Some(database) = open_database() else {
        return;
    };
    recreate_table(&database, "t_exodbc_rw");

    database
        .exec_sql(
            "INSERT INTO t_exodbc_rw VALUES (101, 'Cat', '1993-10-24 21:12:04')",
            ExecFailMode::NotFailOnNoData,
        )
        .unwrap();
    database
        .exec_sql(
            "INSERT INTO t_exodbc_rw VALUES (102, 'Dog', '2011-08-01 04:02:06')",
            ExecFailMode::NotFailOnNoData,
        )
        .unwrap();
    database.commit_trans().unwrap();

    assert_eq!(2, count_rows(&database, "SELECT COUNT(*) FROM t_exodbc_rw"));

    let mut statement = exodbc::ExecutableStatement::with_database(&database).unwrap();
    statement
        .execute_direct("SELECT id, name, lastUpdate FROM t_exodbc_rw ORDER BY id")
        .unwrap();
    let id = LongColumn::new("id", ColumnFlags::SELECT);
    let name = CharColumn::new(17, "name", ColumnFlags::SELECT | ColumnFlags::NULLABLE);
    let last_update = TimestampColumn::new(
        "lastUpdate",
        ColumnFlags::SELECT | ColumnFlags::NULLABLE,
    );
    statement
        .bind_column(&ColumnBuffer::Long(id.clone()), 1)
        .unwrap();
    statement
        .bind_column(&ColumnBuffer::Char(name.clone()), 2)
        .unwrap();
    statement
        .bind_column(&ColumnBuffer::Timestamp(last_update.clone()), 3)
        .unwrap();

    assert!(statement.select_next().unwrap());
    assert_eq!(101, id.value().unwrap());
    assert_eq!(b"Cat".to_vec(), name.value().unwrap());
    let expected = init_timestamp(21, 12, 4, 0, 24, 10, 1993);
    assert_eq!(expected, last_update.value().unwrap());

    assert!(statement.select_next().unwrap());
    assert_eq!(102, id.value().unwrap());
    assert_eq!(b"Dog".to_vec(), name.value().unwrap());

    assert!(!statement.select_next().unwrap());
}

#[test]
fn uncommitted_insert_is_rolled_back_on_close() {
    let _guard = SERIALIZE.lock().unwrap();
    let Some(mut database) = open_database() else {
        return;
    };
    if database.commit_mode() != CommitMode::Manual {
        // Without transaction support there is nothing to verify here.
        return;
    }
    recreate_table(&database, "t_exodbc_txn");

    database
        .exec_sql(
            "INSERT INTO t_exodbc_txn VALUES (101, NULL, NULL)",
            ExecFailMode::NotFailOnNoData,
        )
        .unwrap();
    // No commit. Closing rolls the insert back.
    reopen(&mut database);
    assert_eq!(0, count_rows(&database, "SELECT COUNT(*) FROM t_exodbc_txn"));

    database
        .exec_sql(
            "INSERT INTO t_exodbc_txn VALUES (101, NULL, NULL)",
            ExecFailMode::NotFailOnNoData,
        )
        .unwrap();
    database.commit_trans().unwrap();
    reopen(&mut database);
    assert_eq!(1, count_rows(&database, "SELECT COUNT(*) FROM t_exodbc_txn"));
}

#[test]
fn prepared_parameters_are_reusable() {
    let _guard = SERIALIZE.lock().unwrap();
    let Some(database) = open_database() else {
        return;
    };
    recreate_table(&database, "t_exodbc_params");

    let mut statement = exodbc::ExecutableStatement::with_database(&database).unwrap();
    statement
        .prepare("INSERT INTO t_exodbc_params VALUES (?, ?, ?)")
        .unwrap();

    let id = LongColumn::new("id", ColumnFlags::INSERT);
    let name = CharColumn::new(17, "name", ColumnFlags::INSERT | ColumnFlags::NULLABLE);
    let last_update = TimestampColumn::new(
        "lastUpdate",
        ColumnFlags::INSERT | ColumnFlags::NULLABLE,
    );
    statement
        .bind_parameter(&ColumnBuffer::Long(id.clone()), 1)
        .unwrap();
    statement
        .bind_parameter(&ColumnBuffer::Char(name.clone()), 2)
        .unwrap();
    statement
        .bind_parameter(&ColumnBuffer::Timestamp(last_update.clone()), 3)
        .unwrap();

    for offset in 0..10 {
        id.set_value(300 + offset);
        name.set_value(format!("name{offset}").as_bytes()).unwrap();
        last_update.set_value(init_timestamp(12, 0, 0, 0, 1, 1, 2000));
        statement.execute().unwrap();
    }
    if database.commit_mode() == CommitMode::Manual {
        database.commit_trans().unwrap();
    }

    assert_eq!(
        10,
        count_rows(
            &database,
            "SELECT COUNT(*) FROM t_exodbc_params WHERE id BETWEEN 300 AND 309"
        )
    );
}

#[test]
fn catalog_finds_created_table_via_patterns() {
    let _guard = SERIALIZE.lock().unwrap();
    let Some(database) = open_database() else {
        return;
    };
    recreate_table(&database, "t_exodbc_cat");

    let tables = database
        .catalog()
        .search_tables(
            Some("t_exodbc_ca_"),
            None,
            None,
            "",
            MetadataMode::PatternOrOrdinary,
        )
        .unwrap();
    assert!(tables.iter().any(|table| table.name() == "t_exodbc_cat"));

    let info = database
        .catalog()
        .find_one_table("t_exodbc_cat", None, None)
        .unwrap();
    let columns = database.catalog().read_column_info(&info).unwrap();
    assert_eq!(3, columns.len());
    assert_eq!("id", columns[0].column_name);
    assert_eq!(1, columns[0].ordinal_position);
}

#[test]
fn scrollable_cursor_moves_to_first_row() {
    let _guard = SERIALIZE.lock().unwrap();
    let Some(database) = open_database() else {
        return;
    };
    if !database.detect_dbms_scrollable_cursor_support().unwrap() {
        return;
    }
    recreate_table(&database, "t_exodbc_scroll");
    for row in 1..=5 {
        database
            .exec_sql(
                &format!("INSERT INTO t_exodbc_scroll VALUES ({row}, NULL, NULL)"),
                ExecFailMode::NotFailOnNoData,
            )
            .unwrap();
    }
    if database.commit_mode() == CommitMode::Manual {
        database.commit_trans().unwrap();
    }

    let mut statement =
        exodbc::ExecutableStatement::with_database_and_cursor(&database, true).unwrap();
    statement
        .execute_direct("SELECT id FROM t_exodbc_scroll ORDER BY id")
        .unwrap();
    let id = LongColumn::new("id", ColumnFlags::SELECT);
    statement
        .bind_column(&ColumnBuffer::Long(id.clone()), 1)
        .unwrap();

    assert!(statement.select_last().unwrap());
    assert_eq!(5, id.value().unwrap());
    assert!(statement.select_prev().unwrap());
    assert!(statement.select_prev().unwrap());
    assert!(statement.select_prev().unwrap());
    assert_eq!(2, id.value().unwrap());
    assert!(statement.select_first().unwrap());
    assert_eq!(1, id.value().unwrap());
}
