//! Parsing of the `!` commands the interactive loop understands.

/// A command entered as a `!` line. Everything else read from standard input is SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    PrintCurrent,
    PrintAll,
    CommitTrans,
    RollbackTrans,
    Find {
        name: String,
        schema: Option<String>,
        catalog: Option<String>,
        table_type: String,
        print_columns: bool,
    },
    ListTypes,
    ListSchemas,
    ListCatalogs,
    DbInfo,
}

impl Command {
    /// Parses a line starting with `!`. Aliases are case sensitive.
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or("");
        let command = match keyword {
            "!exit" | "!e" | "!quit" | "!q" => Command::Exit,
            "!help" | "!h" => Command::Help,
            "!next" | "!sn" => Command::SelectNext,
            "!prev" | "!sp" => Command::SelectPrev,
            "!first" | "!sf" => Command::SelectFirst,
            "!last" | "!sl" => Command::SelectLast,
            "!printCurrent" | "!pc" => Command::PrintCurrent,
            "!printAll" | "!pa" => Command::PrintAll,
            "!commitTrans" | "!ct" => Command::CommitTrans,
            "!rollbackTrans" | "!rt" => Command::RollbackTrans,
            "!listTypes" | "!lt" => Command::ListTypes,
            "!listSchemas" | "!ls" => Command::ListSchemas,
            "!listCatalogs" | "!lc" => Command::ListCatalogs,
            "!dbInfo" => Command::DbInfo,
            "!find" | "!f" => {
                let mut print_columns = false;
                let mut positional: Vec<String> = Vec::new();
                for argument in parts {
                    if argument == "-pc" {
                        print_columns = true;
                    } else {
                        positional.push(argument.to_string());
                    }
                }
                let mut positional = positional.into_iter();
                let name = positional
                    .next()
                    .ok_or_else(|| "!find requires at least a table name".to_string())?;
                return Ok(Command::Find {
                    name,
                    schema: positional.next(),
                    catalog: positional.next(),
                    table_type: positional.next().unwrap_or_default(),
                    print_columns,
                });
            }
            unknown => return Err(format!("Unknown command '{unknown}', try !help")),
        };
        if parts.next().is_some() {
            return Err(format!("Command '{keyword}' takes no arguments"));
        }
        Ok(command)
    }
}

pub fn print_help() {
    println!("Commands (everything not starting with '!' is executed as SQL):");
    println!(" !exit, !e, !quit, !q        Exit");
    println!(" !help, !h                   Show this help");
    println!(" !next, !sn                  Fetch the next row of the open result set");
    println!(" !prev, !sp                  Fetch the previous row (scrollable cursors only)");
    println!(" !first, !sf                 Fetch the first row (scrollable cursors only)");
    println!(" !last, !sl                  Fetch the last row (scrollable cursors only)");
    println!(" !printCurrent, !pc          Print the values of the bound columns");
    println!(" !printAll, !pa              Fetch and print all remaining rows");
    println!(" !commitTrans, !ct           Commit the open transaction");
    println!(" !rollbackTrans, !rt         Roll back the open transaction");
    println!(" !find, !f name [schema] [catalog] [type] [-pc]");
    println!("                             Search tables. -pc also prints their columns");
    println!(" !listTypes, !lt             List the SQL types of the data source");
    println!(" !listSchemas, !ls           List schemas");
    println!(" !listCatalogs, !lc          List catalogs");
    println!(" !dbInfo                     Dump the info properties of the connection");
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn aliases_resolve_to_the_same_command() {
        for alias in ["!exit", "!e", "!quit", "!q"] {
            assert_eq!(Command::Exit, Command::parse(alias).unwrap());
        }
        assert_eq!(Command::SelectNext, Command::parse("!sn").unwrap());
        assert_eq!(Command::SelectPrev, Command::parse("!prev").unwrap());
        assert_eq!(Command::PrintCurrent, Command::parse("!pc").unwrap());
        assert_eq!(Command::PrintAll, Command::parse("!printAll").unwrap());
        assert_eq!(Command::CommitTrans, Command::parse("!ct").unwrap());
        assert_eq!(Command::RollbackTrans, Command::parse("!rollbackTrans").unwrap());
        assert_eq!(Command::ListTypes, Command::parse("!lt").unwrap());
        assert_eq!(Command::DbInfo, Command::parse("!dbInfo").unwrap());
    }

    #[test]
    fn aliases_are_case_sensitive() {
        assert!(Command::parse("!EXIT").is_err());
        assert!(Command::parse("!printcurrent").is_err());
    }

    #[test]
    fn find_parses_positional_arguments_and_flag() {
        let command = Command::parse("!find T_1 dbo master TABLE -pc").unwrap();
        assert_eq!(
            Command::Find {
                name: "T_1".to_string(),
                schema: Some("dbo".to_string()),
                catalog: Some("master".to_string()),
                table_type: "TABLE".to_string(),
                print_columns: true,
            },
            command
        );
    }

    #[test]
    fn find_requires_a_name() {
        assert!(Command::parse("!find").is_err());
        let command = Command::parse("!f T%").unwrap();
        assert_eq!(
            Command::Find {
                name: "T%".to_string(),
                schema: None,
                catalog: None,
                table_type: String::new(),
                print_columns: false,
            },
            command
        );
    }

    #[test]
    fn commands_reject_stray_arguments() {
        assert!(Command::parse("!exit now").is_err());
        assert!(Command::parse("!unknown").is_err());
    }
}
