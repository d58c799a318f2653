//! exodbcexec: execute SQL against an ODBC data source and inspect the results.
//!
//! Reads lines from standard input. Lines beginning with `!` are commands, everything else is
//! passed to the driver as SQL. See `--help` and `!help`.

mod commands;

use std::io::{self, BufRead};
use std::process::exit;

use exodbc::{
    buffers::ColumnBuffer, Database, Environment, ExecutableStatement, InfoCategory,
    MetadataMode, OdbcVersion,
};
use log::{info, warn};

use commands::{print_help, Command};

const EXIT_OK: i32 = 0;
const EXIT_HELP: i32 = -1;
const EXIT_BAD_ARGS: i32 = 2;
const EXIT_SQL_ERROR: i32 = 10;
const EXIT_UNEXPECTED: i32 = 20;
const EXIT_ODBC_ERROR: i32 = 1;

struct Options {
    dsn: Option<String>,
    user: String,
    password: String,
    connection_string: Option<String>,
    silent: bool,
    odbc_version: OdbcVersion,
    forward_only_cursors: bool,
    exit_on_error: bool,
    log_level: usize,
}

fn print_usage() {
    println!(
        "Usage: exodbcexec [OPTION]... [-DSN <dsn> [-U <user>] [-P <pass>] | -CS <connectionString>]"
    );
    println!();
    println!("Opens a connection to a database to execute SQL against it.");
    println!("Requires a Data Source Name (DSN) or a Connection String (CS) to connect.");
    println!();
    println!("To connect using a DSN use the arguments:");
    println!(" -DSN      <dsn>         Data Source Name");
    println!(" -U        <user>        Username. Optional.");
    println!(" -P        <pass>        Password. Optional.");
    println!();
    println!("To connect using a CS use the argument:");
    println!(" -CS       <cs>          Connection String");
    println!();
    println!("OPTION can be:");
    println!(" --silent                Hides all output.");
    println!(" --odbcVersion <version> ODBC version to use: '2', '3' or '3.8'. Default is '3'.");
    println!(" --forwardOnlyCursors    Disables '!prev', '!first' and '!last'; only '!next'");
    println!("                         can be used to iterate records.");
    println!(" --exitOnError           Exit with a non-zero status if SQL execution or any SQL");
    println!("                         related call fails. Default is to log and continue.");
    println!(" --logLevel <level>      'Debug', 'Info', 'Warning' or 'Error'. Default 'Info'.");
    println!(" --help                  Show this text and return with -1.");
}

/// Outcome of a failed argument parse: either the user asked for help, or the arguments are
/// invalid.
enum ParseError {
    Help,
    Invalid(String),
}

impl From<String> for ParseError {
    fn from(message: String) -> Self {
        ParseError::Invalid(message)
    }
}

fn parse_options(arguments: &[String]) -> Result<Options, ParseError> {
    let mut options = Options {
        dsn: None,
        user: String::new(),
        password: String::new(),
        connection_string: None,
        silent: false,
        odbc_version: OdbcVersion::V3,
        forward_only_cursors: false,
        exit_on_error: false,
        log_level: 2,
    };
    let mut index = 0;
    let mut value_of = |index: &mut usize, key: &str| -> Result<String, String> {
        *index += 1;
        arguments
            .get(*index)
            .cloned()
            .ok_or_else(|| format!("Argument {key} requires a value"))
    };
    while index < arguments.len() {
        let argument = arguments[index].as_str();
        match argument {
            "--help" => return Err(ParseError::Help),
            "-DSN" => options.dsn = Some(value_of(&mut index, "-DSN")?),
            "-U" => options.user = value_of(&mut index, "-U")?,
            "-P" => options.password = value_of(&mut index, "-P")?,
            "-CS" => options.connection_string = Some(value_of(&mut index, "-CS")?),
            "--silent" => options.silent = true,
            "--forwardOnlyCursors" => options.forward_only_cursors = true,
            "--exitOnError" => options.exit_on_error = true,
            "--odbcVersion" => {
                options.odbc_version = match value_of(&mut index, "--odbcVersion")?.as_str() {
                    "2" => OdbcVersion::V2,
                    "3" => OdbcVersion::V3,
                    "3.8" => OdbcVersion::V3_8,
                    other => return Err(format!("Unknown ODBC version '{other}'").into()),
                }
            }
            "--logLevel" => {
                options.log_level = match value_of(&mut index, "--logLevel")?.as_str() {
                    "Error" => 0,
                    "Warning" => 1,
                    "Info" => 2,
                    "Debug" => 3,
                    other => return Err(format!("Unknown log level '{other}'").into()),
                }
            }
            unknown => return Err(format!("Unknown argument '{unknown}'").into()),
        }
        index += 1;
    }
    if options.dsn.is_none() && options.connection_string.is_none() {
        return Err(ParseError::Invalid("Either -DSN or -CS must be given".to_string()));
    }
    if options.dsn.is_some() && options.connection_string.is_some() {
        return Err(ParseError::Invalid("-DSN and -CS are mutually exclusive".to_string()));
    }
    Ok(options)
}

/// The interactive state: one database, one statement for user SQL, and the buffers bound to
/// the current result set.
struct ExodbcExec {
    database: Database,
    statement: ExecutableStatement,
    buffers: Vec<ColumnBuffer>,
    exit_on_error: bool,
}

impl ExodbcExec {
    fn new(database: Database, forward_only: bool, exit_on_error: bool) -> Result<Self, exodbc::Error> {
        let statement = if forward_only {
            ExecutableStatement::with_database(&database)?
        } else {
            // Prefer a scrollable cursor, fall back to forward-only drivers gracefully.
            match ExecutableStatement::with_database_and_cursor(&database, true) {
                Ok(statement) => statement,
                Err(error) => {
                    warn!("Scrollable cursors unavailable, falling back to forward-only: {error}");
                    ExecutableStatement::with_database(&database)?
                }
            }
        };
        Ok(ExodbcExec {
            database,
            statement,
            buffers: Vec::new(),
            exit_on_error,
        })
    }

    /// Runs the read-eval-print loop. Returns the process exit code.
    fn run(&mut self) -> i32 {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let outcome = if let Some(first) = trimmed.chars().next() {
                if first == '!' {
                    match Command::parse(trimmed) {
                        Ok(Command::Exit) => return EXIT_OK,
                        Ok(command) => self.execute_command(command),
                        Err(message) => {
                            warn!("{message}");
                            Ok(())
                        }
                    }
                } else {
                    self.execute_sql(trimmed)
                }
            } else {
                Ok(())
            };
            if let Err(error) = outcome {
                if self.exit_on_error {
                    eprintln!("{error}");
                    return EXIT_SQL_ERROR;
                }
                warn!("{error}");
            }
        }
        EXIT_OK
    }

    fn execute_sql(&mut self, sql: &str) -> Result<(), exodbc::Error> {
        self.buffers.clear();
        self.statement.execute_direct(sql)?;
        let columns = self.statement.num_result_cols()?;
        if columns > 0 {
            self.bind_result_columns(columns as u16)?;
            info!("Result set with {columns} columns. Use !next and !printCurrent.");
        } else if let Ok(count) = self.statement.row_count() {
            info!("{count} rows affected.");
        }
        Ok(())
    }

    /// Allocates one buffer per result column, using the database's SQL type to buffer type
    /// map, and binds them.
    fn bind_result_columns(&mut self, columns: u16) -> Result<(), exodbc::Error> {
        let map = self.database.sql2buffer_map();
        for column_number in 1..=columns {
            let description = self.statement.describe_column(column_number)?;
            let buffer = map.create_buffer(&description)?;
            self.statement.bind_column(&buffer, column_number)?;
            self.buffers.push(buffer);
        }
        Ok(())
    }

    fn execute_command(&mut self, command: Command) -> Result<(), exodbc::Error> {
        match command {
            // Exit is handled by the loop.
            Command::Exit => Ok(()),
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::SelectNext => {
                let moved = self.statement.select_next()?;
                self.moved(moved)
            }
            Command::SelectPrev => {
                let moved = self.statement.select_prev()?;
                self.moved(moved)
            }
            Command::SelectFirst => {
                let moved = self.statement.select_first()?;
                self.moved(moved)
            }
            Command::SelectLast => {
                let moved = self.statement.select_last()?;
                self.moved(moved)
            }
            Command::PrintCurrent => {
                self.print_current_row();
                Ok(())
            }
            Command::PrintAll => {
                self.print_header();
                while self.statement.select_next()? {
                    self.print_current_row();
                }
                Ok(())
            }
            Command::CommitTrans => self.database.commit_trans(),
            Command::RollbackTrans => self.database.rollback_trans(),
            Command::Find {
                name,
                schema,
                catalog,
                table_type,
                print_columns,
            } => self.find(&name, schema.as_deref(), catalog.as_deref(), &table_type, print_columns),
            Command::ListTypes => {
                for type_info in self.database.catalog().read_sql_type_info()? {
                    println!(
                        "{} (SQL type {}, column size {})",
                        type_info.type_name,
                        type_info.data_type,
                        type_info
                            .column_size
                            .map_or("NULL".to_string(), |size| size.to_string()),
                    );
                }
                Ok(())
            }
            Command::ListSchemas => {
                for schema in self.database.catalog().list_schemas()? {
                    println!("{schema}");
                }
                Ok(())
            }
            Command::ListCatalogs => {
                for catalog in self.database.catalog().list_catalogs()? {
                    println!("{catalog}");
                }
                Ok(())
            }
            Command::DbInfo => {
                self.print_db_info();
                Ok(())
            }
        }
    }

    fn moved(&self, any_row: bool) -> Result<(), exodbc::Error> {
        if any_row {
            self.print_current_row();
        } else {
            info!("No data.");
        }
        Ok(())
    }

    fn print_header(&self) {
        if self.buffers.is_empty() {
            return;
        }
        let names: Vec<&str> = self.buffers.iter().map(|b| b.query_name()).collect();
        println!("{}", names.join(" | "));
    }

    fn print_current_row(&self) {
        if self.buffers.is_empty() {
            info!("No columns bound. Execute a SELECT statement first.");
            return;
        }
        let values: Vec<String> = self
            .buffers
            .iter()
            .map(|buffer| {
                buffer
                    .string_value()
                    .unwrap_or_else(|| "NULL".to_string())
            })
            .collect();
        println!("{}", values.join(" | "));
    }

    fn find(
        &self,
        name: &str,
        schema: Option<&str>,
        catalog: Option<&str>,
        table_type: &str,
        print_columns: bool,
    ) -> Result<(), exodbc::Error> {
        let tables = self.database.catalog().search_tables(
            Some(name),
            schema,
            catalog,
            table_type,
            MetadataMode::PatternOrOrdinary,
        )?;
        info!("Found {} tables.", tables.len());
        for table in &tables {
            println!("{table}");
            if print_columns {
                for column in self.database.catalog().read_column_info(table)? {
                    println!(
                        "  {} {} ({})",
                        column.ordinal_position, column.column_name, column.type_name
                    );
                }
            }
        }
        Ok(())
    }

    fn print_db_info(&self) {
        let categories = [
            ("Driver", InfoCategory::Driver),
            ("DBMS", InfoCategory::Dbms),
            ("Data Source", InfoCategory::DataSource),
            ("Supported SQL", InfoCategory::SupportedSql),
            ("SQL Limits", InfoCategory::SqlLimits),
            ("Scalar Functions", InfoCategory::ScalarFunction),
            ("Conversion", InfoCategory::Conversion),
        ];
        for (title, category) in categories {
            println!("===== {title} =====");
            for property in self.database.properties().subset(category) {
                let value = if property.unsupported() {
                    "(unsupported)".to_string()
                } else {
                    property.value().to_display_string()
                };
                println!("{}: {}", property.name(), value);
            }
        }
    }
}

fn connect(options: &Options) -> Result<Database, exodbc::Error> {
    let environment = Environment::new(options.odbc_version)?;
    let mut database = Database::new(&environment)?;
    if let Some(dsn) = &options.dsn {
        database.open(dsn, &options.user, &options.password)?;
        info!("Connected to data source '{dsn}'.");
    } else {
        let connection_string = options.connection_string.as_ref().unwrap();
        let out_string = database.open_with_connection_string(connection_string)?;
        info!("Connected, output connection string: {out_string}");
    }
    Ok(database)
}

fn main() {
    let arguments: Vec<String> = std::env::args().skip(1).collect();
    if arguments.is_empty() {
        print_usage();
        exit(EXIT_BAD_ARGS);
    }
    let options = match parse_options(&arguments) {
        Ok(options) => options,
        Err(ParseError::Help) => {
            print_usage();
            exit(EXIT_HELP);
        }
        Err(ParseError::Invalid(message)) => {
            eprintln!("{message}");
            print_usage();
            exit(EXIT_BAD_ARGS);
        }
    };

    stderrlog::new()
        .module(module_path!())
        .module("exodbc")
        .quiet(options.silent)
        .verbosity(options.log_level)
        .init()
        .expect("failed to initialize logging");

    let code = match run(&options) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error}");
            if error.downcast_ref::<exodbc::Error>().is_some() {
                EXIT_ODBC_ERROR
            } else {
                EXIT_UNEXPECTED
            }
        }
    };
    exit(code);
}

fn run(options: &Options) -> Result<i32, anyhow::Error> {
    let database = connect(options)?;
    let mut exec = ExodbcExec::new(database, options.forward_only_cursors, options.exit_on_error)?;
    Ok(exec.run())
}

#[cfg(test)]
mod tests {
    use super::{parse_options, EXIT_BAD_ARGS, EXIT_HELP, EXIT_OK, EXIT_SQL_ERROR, EXIT_UNEXPECTED};
    use exodbc::OdbcVersion;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn dsn_with_credentials() {
        let options = parse_options(&args(&["-DSN", "exodbc", "-U", "sa", "-P", "secret"])).unwrap();
        assert_eq!(Some("exodbc".to_string()), options.dsn);
        assert_eq!("sa", options.user);
        assert_eq!("secret", options.password);
        assert!(!options.exit_on_error);
    }

    #[test]
    fn connection_string_and_flags() {
        let options = parse_options(&args(&[
            "-CS",
            "Driver={SQLite3};Database=test.db",
            "--forwardOnlyCursors",
            "--exitOnError",
            "--odbcVersion",
            "3.8",
            "--logLevel",
            "Debug",
        ]))
        .unwrap();
        assert!(options.connection_string.is_some());
        assert!(options.forward_only_cursors);
        assert!(options.exit_on_error);
        assert_eq!(OdbcVersion::V3_8, options.odbc_version);
        assert_eq!(3, options.log_level);
    }

    #[test]
    fn source_is_required_and_exclusive() {
        assert!(parse_options(&args(&["--silent"])).is_err());
        assert!(parse_options(&args(&["-DSN", "a", "-CS", "b"])).is_err());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(parse_options(&args(&["-DSN", "a", "--odbcVersion", "4"])).is_err());
        assert!(parse_options(&args(&["-DSN", "a", "--logLevel", "Verbose"])).is_err());
        assert!(parse_options(&args(&["-DSN"])).is_err());
    }

    #[test]
    fn exit_codes_match_the_interface_contract() {
        assert_eq!(0, EXIT_OK);
        assert_eq!(-1, EXIT_HELP);
        assert_eq!(2, EXIT_BAD_ARGS);
        assert_eq!(10, EXIT_SQL_ERROR);
        assert_eq!(20, EXIT_UNEXPECTED);
    }
}
