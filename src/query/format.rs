//! SQL pretty-printing.
//!
//! A pure text transform: keywords are upper-cased and clauses put on their
//! own indented lines. Formatting already formatted text returns it
//! unchanged.

use sqlformat::{FormatOptions, Indent, QueryParams};

/// Upper bound on reformatting passes before giving up on a fixed point.
const MAX_PASSES: usize = 8;

/// Formats `sql` with `indent` spaces per level.
///
/// sqlformat does not always reproduce its own output (a `BETWEEN .. AND`
/// split across lines is joined again on the next pass), so the text is
/// reformatted until it stops changing.
pub fn format_sql(sql: &str, indent: u8) -> String {
    let options = FormatOptions {
        indent: Indent::Spaces(indent),
        uppercase: Some(true),
        lines_between_queries: 1,
        ..Default::default()
    };

    let mut current = sql.trim().to_string();
    for _ in 0..MAX_PASSES {
        if current.is_empty() {
            break;
        }
        let next = sqlformat::format(&current, &QueryParams::None, &options)
            .trim()
            .to_string();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
