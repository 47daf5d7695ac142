use crate::config::LayoutConfig;
use crate::parser::table::{region_cells, Segment};
use crate::parser::PageLayout;

/// Render a cell grid as an aligned pipe table.
///
/// The first row is the header and is followed by a dash separator.  Every
/// column is padded to the width of its widest cell, but never narrower than
/// `min_width`.  Pipes inside cells are escaped.  An empty grid renders as an
/// empty string.
pub fn render_table(rows: &[Vec<String>], min_width: usize) -> String {
    let num_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if num_cols == 0 {
        return String::new();
    }

    let escaped: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            (0..num_cols)
                .map(|i| row.get(i).map(|c| escape_cell(c)).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..num_cols)
        .map(|i| {
            escaped
                .iter()
                .map(|row| row[i].chars().count())
                .max()
                .unwrap_or(0)
                .max(min_width)
        })
        .collect();

    let mut lines = Vec::with_capacity(escaped.len() + 1);
    for (idx, row) in escaped.iter().enumerate() {
        lines.push(format_row(row.iter().map(String::as_str), &widths));
        if idx == 0 {
            let dashes: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
            lines.push(format_row(dashes.iter().map(String::as_str), &widths));
        }
    }
    lines.join("\n")
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{:<w$}", cell, w = w))
        .collect();
    format!("| {} |", padded.join(" | "))
}

/// Escape a pipe so it cannot be read as a cell delimiter.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Render an accepted page: each table region as a pipe table, every other
/// row as its joined text, one line per row in page order.
pub fn render_page(layout: &PageLayout, config: &LayoutConfig) -> String {
    let mut lines: Vec<String> = Vec::new();
    for segment in layout.segments() {
        match segment {
            Segment::Table(rows) => {
                let grid = region_cells(rows, &layout.model, config.column_snap);
                lines.push(render_table(&grid, config.min_cell_width));
            }
            Segment::Text(row) => lines.push(row.row.text.clone()),
        }
    }
    lines.join("\n")
}
