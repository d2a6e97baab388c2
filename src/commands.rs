//! Backslash commands of the administration shell
//!
//! Each command maps onto one operation of the core modules. Errors are
//! printed at this boundary and never escape it — a failed command leaves
//! the shell running. Schema reads degrade to an empty listing here, since
//! they only populate the display.

use std::error::Error as StdError;
use std::path::Path;

use inquire::Confirm;
use tracing::warn;

use crate::ai_sql::{GeneratedScript, SqlAssistant};
use crate::config::Config;
use crate::csv_import::{self, CsvImporter};
use crate::executor::{ExecutionOutcome, StatementExecutor};
use crate::format;
use crate::schema::SchemaInspector;
use crate::table_ops::{TableOps, ALLOWED_COLUMN_TYPES};

/// Everything a command can touch, wired once at startup.
pub struct CommandContext {
    pub inspector: SchemaInspector,
    pub executor: StatementExecutor,
    pub table_ops: TableOps,
    pub importer: CsvImporter,
    pub assistant: SqlAssistant,
    pub preview_rows: u32,
    pub auto_execute: bool,
}

impl CommandContext {
    pub fn new(pool: sqlx::MySqlPool, config: &Config, assistant: SqlAssistant) -> Self {
        Self {
            inspector: SchemaInspector::new(pool.clone()),
            executor: StatementExecutor::new(pool.clone(), config.statement_timeout_secs),
            table_ops: TableOps::new(pool.clone()),
            importer: CsvImporter::new(pool),
            assistant,
            preview_rows: config.preview_rows,
            auto_execute: config.ai.auto_execute,
        }
    }
}

/// Registry of all backslash commands
pub struct CommandRegistry;

impl CommandRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Execute one command line. Returns `Ok(true)` when the shell should
    /// exit.
    pub async fn execute(
        &self,
        command: &str,
        ctx: &CommandContext,
    ) -> Result<bool, Box<dyn StdError>> {
        let mut parts = command.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();

        match cmd {
            "\\q" => Ok(true),
            "\\h" => {
                print_help();
                Ok(false)
            }
            "\\dt" => {
                list_tables(ctx).await;
                Ok(false)
            }
            "\\d" => {
                if args.is_empty() {
                    list_tables(ctx).await;
                } else {
                    describe_table(ctx, args).await;
                }
                Ok(false)
            }
            "\\types" => {
                println!("Allowed column types: {}", ALLOWED_COLUMN_TYPES.join(", "));
                Ok(false)
            }
            "\\ct" => {
                if args.is_empty() {
                    eprintln!("Usage: \\ct <table>");
                    return Ok(false);
                }
                match ctx.table_ops.create_table(args).await {
                    Ok(()) => println!(
                        "Table '{args}' created with an Id column. Use \\ac to add columns."
                    ),
                    Err(e) => eprintln!("Error creating table '{args}': {e}"),
                }
                Ok(false)
            }
            "\\drop" => {
                if args.is_empty() {
                    eprintln!("Usage: \\drop <table>");
                    return Ok(false);
                }
                if !confirm(&format!("Drop table '{args}'? This cannot be undone.")) {
                    println!("Cancelled.");
                    return Ok(false);
                }
                match ctx.table_ops.drop_table(args).await {
                    Ok(()) => println!("Table '{args}' dropped."),
                    Err(e) => eprintln!("Error dropping table '{args}': {e}"),
                }
                Ok(false)
            }
            "\\ac" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.len() != 3 {
                    eprintln!("Usage: \\ac <table> <column> <type>   (see \\types)");
                    return Ok(false);
                }
                match ctx.table_ops.add_column(parts[0], parts[1], parts[2]).await {
                    Ok(()) => println!("Column '{}' added to '{}'.", parts[1], parts[0]),
                    Err(e) => eprintln!("Error adding column: {e}"),
                }
                Ok(false)
            }
            "\\dc" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.len() != 2 {
                    eprintln!("Usage: \\dc <table> <column>");
                    return Ok(false);
                }
                match ctx.table_ops.drop_column(parts[0], parts[1]).await {
                    Ok(()) => println!("Column '{}' dropped from '{}'.", parts[1], parts[0]),
                    Err(e) => eprintln!("Error dropping column: {e}"),
                }
                Ok(false)
            }
            "\\rc" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.len() != 4 {
                    eprintln!("Usage: \\rc <table> <old> <new> <type>   (see \\types)");
                    return Ok(false);
                }
                match ctx
                    .table_ops
                    .change_column(parts[0], parts[1], parts[2], parts[3])
                    .await
                {
                    Ok(()) => println!(
                        "Column '{}' renamed to '{}' on '{}'.",
                        parts[1], parts[2], parts[0]
                    ),
                    Err(e) => eprintln!("Error changing column: {e}"),
                }
                Ok(false)
            }
            "\\import" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.len() != 2 {
                    eprintln!("Usage: \\import <file.csv> <existing-table>");
                    return Ok(false);
                }
                import_csv(ctx, parts[0], parts[1], false).await;
                Ok(false)
            }
            "\\importnew" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.len() != 2 {
                    eprintln!("Usage: \\importnew <file.csv> <new-table>");
                    return Ok(false);
                }
                import_csv(ctx, parts[0], parts[1], true).await;
                Ok(false)
            }
            "\\ai" => {
                if args.is_empty() {
                    eprintln!("Usage: \\ai <describe the statement you want>");
                    return Ok(false);
                }
                ai_statement(ctx, args, false).await;
                Ok(false)
            }
            "\\ait" => {
                if args.is_empty() {
                    eprintln!("Usage: \\ait <describe the table you want>");
                    return Ok(false);
                }
                ai_statement(ctx, args, true).await;
                Ok(false)
            }
            "\\gen" => {
                let parts: Vec<&str> = args.split_whitespace().collect();
                if parts.is_empty() || parts.len() > 2 {
                    eprintln!("Usage: \\gen <table> [rows]");
                    return Ok(false);
                }
                let rows = match parts.get(1) {
                    Some(n) => match n.parse::<usize>() {
                        Ok(n) if n > 0 => n,
                        _ => {
                            eprintln!("Row count must be a positive number.");
                            return Ok(false);
                        }
                    },
                    None => ctx.assistant.default_rows(),
                };
                generate_rows(ctx, parts[0], rows).await;
                Ok(false)
            }
            _ => {
                eprintln!("Unknown command: {cmd}. Type \\h for help.");
                Ok(false)
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  \\dt                          - List tables");
    println!("  \\d <table>                   - Show columns and a data preview");
    println!("  \\ct <table>                  - Create a table (Id column only)");
    println!("  \\drop <table>                - Drop a table");
    println!("  \\ac <table> <col> <type>     - Add a column");
    println!("  \\dc <table> <col>            - Drop a column");
    println!("  \\rc <table> <old> <new> <type> - Rename/retype a column");
    println!("  \\types                       - List allowed column types");
    println!("  \\import <file> <table>       - Import a CSV into an existing table");
    println!("  \\importnew <file> <table>    - Create a table from a CSV and import it");
    println!("  \\ai <request>                - Generate and run one SQL statement");
    println!("  \\ait <description>           - Generate and run a CREATE TABLE statement");
    println!("  \\gen <table> [rows]          - Generate and insert sample rows");
    println!("  \\h                           - Show this help message");
    println!("  \\q                           - Quit");
}

async fn list_tables(ctx: &CommandContext) {
    // Schema display is best-effort: errors degrade to an empty listing.
    let tables = match ctx.inspector.tables().await {
        Ok(tables) => tables,
        Err(e) => {
            eprintln!("Error listing tables: {e}");
            Vec::new()
        }
    };

    if tables.is_empty() {
        println!("No tables found.");
    } else {
        for table in tables {
            println!("{table}");
        }
    }
}

async fn describe_table(ctx: &CommandContext, table: &str) {
    let columns = match ctx.inspector.columns(table).await {
        Ok(columns) => columns,
        Err(e) => {
            eprintln!("Error reading structure of '{table}': {e}");
            Vec::new()
        }
    };

    if columns.is_empty() {
        println!("Table '{table}' has no columns or does not exist.");
        return;
    }
    print!("{}", format::format_columns(&columns));

    match ctx.inspector.preview(table, ctx.preview_rows).await {
        Ok(grid) if grid.is_empty() => println!("(no rows)"),
        Ok(grid) => print!("{}", format::format_grid(&grid)),
        Err(e) => eprintln!("Error reading data of '{table}': {e}"),
    }
}

async fn import_csv(ctx: &CommandContext, file: &str, table: &str, new_table: bool) {
    let payload = match csv_import::parse_csv_file(Path::new(file)) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Error parsing CSV file: {e}");
            return;
        }
    };

    let imported = if new_table {
        ctx.importer.import_new(table, &payload).await
    } else {
        ctx.importer.import_existing(table, &payload).await
    };

    match imported {
        Ok(rows) => println!("Imported {rows} rows into '{table}'."),
        Err(e) => eprintln!("Error importing data: {e}"),
    }
}

async fn ai_statement(ctx: &CommandContext, request: &str, create_table: bool) {
    let generated = if create_table {
        ctx.assistant.create_table(request).await
    } else {
        ctx.assistant.statement(request).await
    };
    let script = match generated {
        Ok(script) => script,
        Err(e) => {
            warn!(error = %e, "generation failed");
            eprintln!("{}", e.user_message());
            return;
        }
    };

    if script.is_empty() {
        // Legitimate empty outcome, distinct from a hard failure.
        println!("The model produced no statement for that request.");
        return;
    }

    show_script(&script);
    if !ctx.auto_execute && !confirm("Execute this statement?") {
        println!("Cancelled.");
        return;
    }

    match ctx.executor.execute(&script.statements, false).await {
        Ok(outcomes) => report_outcomes(&outcomes),
        Err(e) => eprintln!("Execution failed: {e}"),
    }
}

async fn generate_rows(ctx: &CommandContext, table: &str, rows: usize) {
    let columns = match ctx.inspector.columns(table).await {
        Ok(columns) => columns,
        Err(e) => {
            eprintln!("Could not read columns of '{table}': {e}");
            return;
        }
    };
    if columns.is_empty() {
        eprintln!("Table '{table}' has no columns or does not exist.");
        return;
    }

    let script = match ctx.assistant.insert_rows(table, &columns, rows).await {
        Ok(script) => script,
        Err(e) => {
            warn!(error = %e, "generation failed");
            eprintln!("{}", e.user_message());
            return;
        }
    };

    if script.is_empty() {
        println!("The model produced no INSERT statements.");
        return;
    }

    // Unattended runs apply each INSERT independently so one bad row does
    // not sink the batch; the reviewed path commits the whole script or
    // nothing.
    if ctx.auto_execute {
        match ctx.executor.execute(&script.statements, false).await {
            Ok(outcomes) => report_outcomes(&outcomes),
            Err(e) => eprintln!("Execution failed: {e}"),
        }
        return;
    }

    show_script(&script);
    if !confirm(&format!(
        "Execute {} INSERT statement(s) against '{table}' in one transaction?",
        script.statements.len()
    )) {
        println!("Cancelled.");
        return;
    }

    match ctx.executor.execute(&script.statements, true).await {
        Ok(outcomes) => report_outcomes(&outcomes),
        Err(e) => eprintln!("Execution failed, nothing was committed: {e}"),
    }
}

fn show_script(script: &GeneratedScript) {
    println!("Generated SQL:");
    for statement in &script.statements {
        println!("  {statement}");
    }
}

fn report_outcomes(outcomes: &[ExecutionOutcome]) {
    let failed = outcomes.iter().filter(|o| !o.succeeded).count();
    if failed > 0 {
        print!("{}", format::format_outcomes(outcomes));
    }
    println!(
        "{} statement(s) executed, {} failed.",
        outcomes.len() - failed,
        failed
    );
}

fn confirm(question: &str) -> bool {
    match Confirm::new(question).with_default(false).prompt() {
        Ok(answer) => answer,
        Err(e) => {
            // Non-interactive session or closed terminal: treat as declined.
            eprintln!("Confirmation unavailable ({e}); not executing.");
            false
        }
    }
}
