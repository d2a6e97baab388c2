//! Tabular rendering of results for the shell

use prettytable::{Cell, Row, Table};

use crate::executor::ExecutionOutcome;
use crate::schema::ColumnDescriptor;

/// Render a grid whose first row is the header. Empty input renders nothing.
pub fn format_grid(data: &[Vec<String>]) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_titles(Row::new(data[0].iter().map(|c| Cell::new(c)).collect()));
    for row in data.iter().skip(1) {
        table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }
    table.to_string()
}

/// Render column metadata as a name/type grid.
pub fn format_columns(columns: &[ColumnDescriptor]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_titles(Row::new(vec![Cell::new("Column"), Cell::new("Type")]));
    for column in columns {
        table.add_row(Row::new(vec![
            Cell::new(&column.name),
            Cell::new(&column.type_name),
        ]));
    }
    table.to_string()
}

/// Render per-statement execution results.
pub fn format_outcomes(outcomes: &[ExecutionOutcome]) -> String {
    let mut table = Table::new();
    table.set_titles(Row::new(vec![Cell::new("Statement"), Cell::new("Result")]));
    for outcome in outcomes {
        let result = if outcome.succeeded {
            "OK".to_string()
        } else {
            format!("FAILED: {}", outcome.error.as_deref().unwrap_or("unknown error"))
        };
        table.add_row(Row::new(vec![
            Cell::new(&outcome.statement),
            Cell::new(&result),
        ]));
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_renders_nothing() {
        assert_eq!(format_grid(&[]), "");
    }

    #[test]
    fn grid_contains_header_and_cells() {
        let data = vec![
            vec!["id".to_string(), "name".to_string()],
            vec!["1".to_string(), "Ada".to_string()],
        ];
        let rendered = format_grid(&data);
        assert!(rendered.contains("id"));
        assert!(rendered.contains("Ada"));
    }

    #[test]
    fn outcomes_show_failures_with_messages() {
        let outcomes = vec![ExecutionOutcome {
            statement: "INSERT INTO t VALUES (1);".to_string(),
            succeeded: false,
            error: Some("duplicate key".to_string()),
        }];
        let rendered = format_outcomes(&outcomes);
        assert!(rendered.contains("FAILED: duplicate key"));
    }
}
