//! Word extraction and page layout analysis.

pub mod backend;
pub mod columns;
pub mod layout;
pub mod rows;
pub mod table;

use crate::config::LayoutConfig;
use crate::types::Word;

use columns::{ClassifiedRow, ColumnModel, Rejection};
use table::{Segment, TableRegion};

/// A page accepted as a form: its classified rows, the column model they
/// were classified against, and the table regions among them.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub rows: Vec<ClassifiedRow>,
    pub model: ColumnModel,
    pub regions: Vec<TableRegion>,
}

impl PageLayout {
    pub fn table_rows(&self) -> usize {
        self.regions.iter().map(TableRegion::len).sum()
    }

    /// Rows in reading order, grouped into tables and loose text rows.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        table::segments(&self.rows, &self.regions)
    }
}

/// Run row grouping, the column model and row classification over one
/// page's words.
///
/// Returns the layout when the page reads as a form, or the reason it does
/// not.
pub fn analyze_page(
    words: &[Word],
    page_width: f32,
    config: &LayoutConfig,
) -> Result<PageLayout, Rejection> {
    if words.is_empty() {
        return Err(Rejection::NoWords);
    }

    let rows = rows::build_rows(words, page_width, config);
    let model = columns::build_column_model(&rows, page_width, config)?;
    let rows = columns::classify_rows(rows, &model, config);
    columns::check_table_row_fraction(&rows, config)?;
    let regions = table::find_regions(&rows);

    Ok(PageLayout {
        rows,
        model,
        regions,
    })
}
