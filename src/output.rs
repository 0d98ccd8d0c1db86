//! Plain-text rendering for the command line.
//!
//! Result sets are drawn as bordered tables with auto-sized columns; the
//! navigation tree is drawn as indented labels.

use crate::connection::ConnectionRegistry;
use crate::db::Value;
use crate::navigation::{NavigationTree, NodeId};
use crate::query::ResultSet;

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Spaces per tree level.
const TREE_INDENT: usize = 2;

/// Renders a result set as a table, or a placeholder when it is empty.
pub fn render_result(result: Option<&ResultSet>) -> String {
    let Some(result) = result.filter(|r| !r.columns.is_empty()) else {
        return "(no results)".to_string();
    };

    let widths = column_widths(result);
    let separator = separator_line(&widths);

    let mut lines = vec![separator.clone()];
    lines.push(table_line(
        result.columns.iter().map(|c| (c.as_str(), false)),
        &widths,
    ));
    lines.push(separator.clone());
    for row in &result.rows {
        let cells: Vec<(String, bool)> = row
            .iter()
            .map(|v| (v.to_display_string(), is_numeric(v)))
            .collect();
        lines.push(table_line(
            cells.iter().map(|(s, right)| (s.as_str(), *right)),
            &widths,
        ));
    }
    lines.push(separator);

    if !result.is_status_table() {
        let count = result.rows.len();
        lines.push(format!("({count} row{})", if count == 1 { "" } else { "s" }));
    }
    lines.join("\n")
}

fn column_widths(result: &ResultSet) -> Vec<usize> {
    let mut widths: Vec<usize> = result
        .columns
        .iter()
        .map(|c| c.chars().count().max(MIN_COLUMN_WIDTH))
        .collect();

    for row in &result.rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(value.to_display_string().chars().count());
        }
    }

    widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
}

fn separator_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn table_line<'a>(cells: impl Iterator<Item = (&'a str, bool)>, widths: &[usize]) -> String {
    let mut line = String::from("|");
    let mut cells = cells;
    for width in widths {
        let (text, right) = cells.next().unwrap_or(("", false));
        let text = truncate(text, *width);
        if right {
            line.push_str(&format!(" {text:>width$} |"));
        } else {
            line.push_str(&format!(" {text:<width$} |"));
        }
    }
    line
}

/// Truncates to `max_width` characters, ending in `...` when cut.
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{kept}...")
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_))
}

/// Renders the nodes below `from` as indented labels.
pub fn render_tree(tree: &NavigationTree, from: NodeId) -> String {
    tree.walk(from)
        .into_iter()
        .map(|(depth, node)| format!("{}{}", " ".repeat(depth * TREE_INDENT), node.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per registered connection: label and masked identity.
pub fn render_connections(registry: &ConnectionRegistry) -> String {
    if registry.is_empty() {
        return "No saved connections.".to_string();
    }

    registry
        .iter()
        .map(|c| format!("{}  {}", c.label(), c.connector().connection_identity()))
        .collect::<Vec<_>>()
        .join("\n")
}
