use serde::Serialize;

use super::columns::{ClassifiedRow, ColumnModel};
use super::rows::group_words_into_rows;
use crate::config::LayoutConfig;
use crate::types::Word;

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// A maximal run of consecutive table rows, as a half-open range of row
/// indices on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableRegion {
    pub start: usize,
    pub end: usize,
}

impl TableRegion {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One piece of a page in reading order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment<'a> {
    /// The rows of one table region.
    Table(&'a [ClassifiedRow]),
    /// A single row outside every region.
    Text(&'a ClassifiedRow),
}

/// Split the classified rows into maximal runs of table rows.
///
/// Regions come back in page order, never overlap, and are never adjacent.
pub fn find_regions(rows: &[ClassifiedRow]) -> Vec<TableRegion> {
    let mut regions = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, row) in rows.iter().enumerate() {
        match (row.is_table_row, start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                regions.push(TableRegion { start: s, end: idx });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        regions.push(TableRegion {
            start: s,
            end: rows.len(),
        });
    }
    regions
}

/// Interleave table regions with the text rows around them.  Every row
/// appears in exactly one segment.
pub fn segments<'a>(rows: &'a [ClassifiedRow], regions: &[TableRegion]) -> Vec<Segment<'a>> {
    let mut out = Vec::new();
    let mut idx = 0;
    let mut pending = regions.iter().peekable();

    while idx < rows.len() {
        match pending.peek() {
            Some(region) if region.start == idx => {
                out.push(Segment::Table(&rows[region.start..region.end]));
                idx = region.end;
                pending.next();
            }
            _ => {
                out.push(Segment::Text(&rows[idx]));
                idx += 1;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Distribute a row's words over the model's columns.
///
/// Words sharing a column are joined with a single space in left-to-right
/// order.  The result always has one entry per boundary.
pub fn extract_cells(words: &[Word], model: &ColumnModel, snap: f32) -> Vec<String> {
    let mut cells = vec![String::new(); model.len()];
    for word in words {
        let cell = &mut cells[model.column_for(word.x0, snap)];
        if !cell.is_empty() {
            cell.push(' ');
        }
        cell.push_str(&word.text);
    }
    cells
}

/// Cell grid of one table region.
pub fn region_cells(rows: &[ClassifiedRow], model: &ColumnModel, snap: f32) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| extract_cells(&r.row.words, model, snap))
        .collect()
}

// ---------------------------------------------------------------------------
// Standalone word-grid tables
// ---------------------------------------------------------------------------

/// Find a single borderless table on a page by clustering every word start.
///
/// This is a simpler detector than the page column model: all x positions
/// are clustered with a fixed gap, each word goes to its nearest column
/// start, and rows with fewer than two filled cells are dropped.  Pages with
/// too few or too many columns, too few rows, or mostly long (prose) cells
/// yield no tables.  Returns zero or one table as a list of rows of cells.
pub fn extract_tables_from_words(words: &[Word], config: &LayoutConfig) -> Vec<Vec<Vec<String>>> {
    let simple = &config.simple_tables;
    if words.is_empty() {
        return Vec::new();
    }

    let mut positions: Vec<f32> = words.iter().map(|w| w.x0).collect();
    positions.sort_by(f32::total_cmp);
    let mut column_starts: Vec<f32> = Vec::new();
    for x in positions {
        match column_starts.last() {
            Some(&last) if x - last <= simple.column_gap => {}
            _ => column_starts.push(x),
        }
    }

    if column_starts.len() < simple.min_columns || column_starts.len() > simple.max_columns {
        return Vec::new();
    }

    let mut table: Vec<Vec<String>> = Vec::new();
    for (_, row_words) in group_words_into_rows(words, config.row_tolerance) {
        let mut cells = vec![String::new(); column_starts.len()];
        for word in &row_words {
            let cell = &mut cells[nearest_column(word.x0, &column_starts)];
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(&word.text);
        }
        if cells.iter().filter(|c| !c.trim().is_empty()).count() >= 2 {
            table.push(cells);
        }
    }

    if table.len() < simple.min_rows {
        return Vec::new();
    }

    let filled: Vec<&str> = table
        .iter()
        .flatten()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    let long = filled
        .iter()
        .filter(|c| c.chars().count() > simple.long_cell_chars)
        .count();
    if !filled.is_empty() && long as f32 / filled.len() as f32 > simple.max_long_cell_ratio {
        log::debug!(
            "word-grid table rejected: {} of {} cells are long",
            long,
            filled.len()
        );
        return Vec::new();
    }

    vec![table]
}

/// Index of the column start closest to `x`; the leftmost wins ties.
fn nearest_column(x: f32, column_starts: &[f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, &start) in column_starts.iter().enumerate() {
        let dist = (x - start).abs();
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::columns::{build_column_model, classify_rows};
    use super::super::rows::{build_row, build_rows};
    use super::*;

    // -- helpers to build test data ----------------------------------------

    fn word(text: &str, x0: f32, top: f32) -> Word {
        Word::new(text, x0, x0 + text.len() as f32 * 5.0, top)
    }

    fn classified(flags: &[bool]) -> Vec<ClassifiedRow> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &is_table_row)| ClassifiedRow {
                row: build_row(
                    i as f32 * 10.0,
                    vec![word(&format!("r{}", i), 50.0, 0.0)],
                    612.0,
                    &LayoutConfig::default(),
                ),
                is_table_row,
            })
            .collect()
    }

    fn three_column_model() -> ColumnModel {
        let config = LayoutConfig::default();
        let rows = vec![
            build_row(
                0.0,
                vec![word("a", 50.0, 0.0), word("b", 200.0, 0.0), word("c", 350.0, 0.0)],
                612.0,
                &config,
            );
            3
        ];
        build_column_model(&rows, 612.0, &config).unwrap()
    }

    // -- find_regions ------------------------------------------------------

    #[test]
    fn regions_are_maximal_runs() {
        let rows = classified(&[false, true, true, false, true, false, false]);
        assert_eq!(
            find_regions(&rows),
            vec![
                TableRegion { start: 1, end: 3 },
                TableRegion { start: 4, end: 5 },
            ]
        );
    }

    #[test]
    fn region_running_to_end_of_page() {
        let rows = classified(&[false, true, true]);
        assert_eq!(find_regions(&rows), vec![TableRegion { start: 1, end: 3 }]);
    }

    #[test]
    fn no_regions_without_table_rows() {
        assert!(find_regions(&classified(&[false, false])).is_empty());
        assert!(find_regions(&[]).is_empty());
    }

    // -- segments ----------------------------------------------------------

    #[test]
    fn segments_cover_every_row_in_order() {
        let rows = classified(&[false, true, true, false, true]);
        let regions = find_regions(&rows);
        let segs = segments(&rows, &regions);

        let shape: Vec<(char, usize)> = segs
            .iter()
            .map(|s| match s {
                Segment::Table(rs) => ('T', rs.len()),
                Segment::Text(_) => ('x', 1),
            })
            .collect();
        assert_eq!(shape, vec![('x', 1), ('T', 2), ('x', 1), ('T', 1)]);
        let covered: usize = shape.iter().map(|(_, n)| n).sum();
        assert_eq!(covered, rows.len());
    }

    // -- extract_cells -----------------------------------------------------

    #[test]
    fn cells_one_per_boundary() {
        let model = three_column_model();
        let cells = extract_cells(&[word("only", 50.0, 0.0)], &model, 20.0);
        assert_eq!(cells, vec!["only", "", ""]);
    }

    #[test]
    fn cells_join_words_in_same_column() {
        let model = three_column_model();
        let words = vec![
            word("Widget", 50.0, 0.0),
            word("Deluxe", 90.0, 0.0),
            word("4", 205.0, 0.0),
            word("$9.99", 352.0, 0.0),
        ];
        assert_eq!(
            extract_cells(&words, &model, 20.0),
            vec!["Widget Deluxe", "4", "$9.99"]
        );
    }

    #[test]
    fn cells_snap_forward_near_next_boundary() {
        let model = three_column_model();
        // 185 is within 20 of the second boundary at 200.
        let cells = extract_cells(&[word("x", 185.0, 0.0)], &model, 20.0);
        assert_eq!(cells, vec!["", "x", ""]);
    }

    #[test]
    fn region_cells_from_pipeline() {
        let config = LayoutConfig::default();
        let words = vec![
            word("Item", 50.0, 100.0),
            word("Qty", 200.0, 100.0),
            word("Price", 350.0, 100.0),
            word("Bolt", 50.0, 120.0),
            word("10", 200.0, 120.0),
            word("0.25", 350.0, 120.0),
        ];
        let rows = build_rows(&words, 612.0, &config);
        let model = build_column_model(&rows, 612.0, &config).unwrap();
        let rows = classify_rows(rows, &model, &config);
        let regions = find_regions(&rows);
        assert_eq!(regions.len(), 1);
        let region = regions[0];
        let grid = region_cells(&rows[region.start..region.end], &model, config.column_snap);
        assert_eq!(
            grid,
            vec![vec!["Item", "Qty", "Price"], vec!["Bolt", "10", "0.25"]]
        );
    }

    // -- extract_tables_from_words -----------------------------------------

    fn invoice_words() -> Vec<Word> {
        let mut words = Vec::new();
        let lines = [
            ["Item", "Qty", "Total"],
            ["Bolts", "100", "$25.00"],
            ["Nuts", "200", "$18.00"],
            ["Washers", "50", "$4.50"],
        ];
        for (i, line) in lines.iter().enumerate() {
            let top = 100.0 + i as f32 * 20.0;
            words.push(word(line[0], 50.0, top));
            words.push(word(line[1], 220.0, top));
            words.push(word(line[2], 380.0, top));
        }
        words
    }

    #[test]
    fn word_grid_finds_invoice_table() {
        let tables = extract_tables_from_words(&invoice_words(), &LayoutConfig::default());
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.len(), 4);
        assert_eq!(table[0], vec!["Item", "Qty", "Total"]);
        assert_eq!(table[3], vec!["Washers", "50", "$4.50"]);
    }

    #[test]
    fn word_grid_drops_single_cell_rows() {
        let mut words = invoice_words();
        words.push(word("Thank you for your business", 50.0, 300.0));
        let tables = extract_tables_from_words(&words, &LayoutConfig::default());
        assert_eq!(tables[0].len(), 4);
    }

    #[test]
    fn word_grid_needs_enough_rows() {
        let words: Vec<Word> = invoice_words().into_iter().take(6).collect();
        assert!(extract_tables_from_words(&words, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn word_grid_rejects_too_few_columns() {
        let words = vec![
            word("a", 50.0, 100.0),
            word("b", 220.0, 100.0),
            word("c", 50.0, 120.0),
            word("d", 220.0, 120.0),
            word("e", 50.0, 140.0),
            word("f", 220.0, 140.0),
        ];
        assert!(extract_tables_from_words(&words, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn word_grid_rejects_too_many_columns() {
        let mut words = Vec::new();
        for c in 0..11 {
            for r in 0..3 {
                words.push(word("v", 30.0 + c as f32 * 50.0, 100.0 + r as f32 * 20.0));
            }
        }
        assert!(extract_tables_from_words(&words, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn word_grid_rejects_prose() {
        let prose = "the quick brown fox jumps over the lazy dog";
        let mut words = Vec::new();
        for i in 0..3 {
            let top = 100.0 + i as f32 * 20.0;
            words.push(Word::new(prose, 50.0, 260.0, top));
            words.push(word("1", 300.0, top));
            words.push(word("2", 400.0, top));
        }
        // 3 of 9 filled cells are long: exactly one third, above the 30% cap.
        assert!(extract_tables_from_words(&words, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn word_grid_empty_page() {
        assert!(extract_tables_from_words(&[], &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn nearest_column_prefers_leftmost_on_tie() {
        assert_eq!(nearest_column(100.0, &[50.0, 150.0]), 0);
        assert_eq!(nearest_column(140.0, &[50.0, 150.0]), 1);
    }
}
