//! Page-global column model.
//!
//! Candidate table rows (three or more x-groups, not prose) pool their
//! x-group starts.  The pool's gap distribution sets an adaptive clustering
//! tolerance, the pool is clustered into column boundaries, and the result
//! is checked against density and count limits.  With a model in hand every
//! row gets its final table-row flag.

use serde::Serialize;
use thiserror::Error;

use super::rows::Row;
use crate::config::LayoutConfig;
use crate::types::Word;

/// Why a page was judged not to be a form.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("page has no words")]
    NoWords,
    #[error("no row has enough separated columns")]
    NoCandidateRows,
    #[error("only one column boundary")]
    SingleColumn,
    #[error("average column width {avg_width:.1}pt is too narrow")]
    NarrowColumns { avg_width: f32 },
    #[error("{per_inch:.1} columns per inch is too dense")]
    TooDense { per_inch: f32 },
    #[error("{count} columns exceed the cap of {cap}")]
    TooManyColumns { count: usize, cap: usize },
    #[error("only {table_rows} of {total_rows} rows align with the columns")]
    TooFewTableRows { table_rows: usize, total_rows: usize },
}

/// Ordered column boundaries of one page.
///
/// Boundaries are strictly increasing and more than `tolerance` apart; a
/// model always has at least two of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnModel {
    boundaries: Vec<f32>,
    tolerance: f32,
}

impl ColumnModel {
    pub fn boundaries(&self) -> &[f32] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// The clustering tolerance the boundaries were built with.
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Column index for a word starting at `x0`: the first column whose
    /// successor boundary lies more than `snap` beyond `x0`, else the last.
    pub fn column_for(&self, x0: f32, snap: f32) -> usize {
        self.boundaries
            .windows(2)
            .position(|pair| x0 < pair[1] - snap)
            .unwrap_or(self.boundaries.len().saturating_sub(1))
    }

    /// Number of distinct boundaries the words align with.  Each word counts
    /// toward the first boundary within `tolerance` of its start only.
    pub fn aligned_columns(&self, words: &[Word], tolerance: f32) -> usize {
        let mut hit = vec![false; self.boundaries.len()];
        for word in words {
            if let Some(idx) = self
                .boundaries
                .iter()
                .position(|&b| (word.x0 - b).abs() < tolerance)
            {
                hit[idx] = true;
            }
        }
        hit.into_iter().filter(|&h| h).count()
    }
}

/// A row together with its final classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub row: Row,
    pub is_table_row: bool,
}

/// Sorted x-group starts of every candidate table row.
pub fn pool_candidate_positions(rows: &[Row], config: &LayoutConfig) -> Vec<f32> {
    let mut pool: Vec<f32> = rows
        .iter()
        .filter(|r| r.num_columns() >= config.min_candidate_columns && !r.is_paragraph)
        .flat_map(|r| r.x_groups.iter().copied())
        .collect();
    pool.sort_by(f32::total_cmp);
    pool
}

/// Clustering tolerance derived from the gaps between pooled positions.
///
/// Gaps at or below the noise floor are ignored.  With enough remaining
/// gaps the configured percentile is used, clamped to the configured range;
/// otherwise the fixed fallback applies.
pub fn adaptive_tolerance(sorted_positions: &[f32], config: &LayoutConfig) -> f32 {
    let mut gaps: Vec<f32> = sorted_positions
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|&gap| gap > config.gap_noise_floor)
        .collect();

    if gaps.is_empty() || gaps.len() < config.min_gaps_for_percentile {
        return config.tolerance_fallback;
    }

    gaps.sort_by(f32::total_cmp);
    let idx = ((gaps.len() as f64 * config.tolerance_percentile) as usize).min(gaps.len() - 1);
    gaps[idx].clamp(config.tolerance_min, config.tolerance_max)
}

/// Cluster sorted positions: a position more than `tolerance` past the last
/// accepted boundary becomes a new boundary.
pub fn cluster_boundaries(sorted_positions: &[f32], tolerance: f32) -> Vec<f32> {
    let mut boundaries: Vec<f32> = Vec::new();
    for &x in sorted_positions {
        match boundaries.last() {
            Some(&last) if x - last <= tolerance => {}
            _ => boundaries.push(x),
        }
    }
    boundaries
}

/// Build the page's column model, or explain why the page is not tabular.
pub fn build_column_model(
    rows: &[Row],
    page_width: f32,
    config: &LayoutConfig,
) -> Result<ColumnModel, Rejection> {
    let pool = pool_candidate_positions(rows, config);
    if pool.is_empty() {
        return Err(Rejection::NoCandidateRows);
    }

    let tolerance = adaptive_tolerance(&pool, config);
    let boundaries = cluster_boundaries(&pool, tolerance);

    let (first, last) = match boundaries.as_slice() {
        [first, .., last] => (*first, *last),
        _ => return Err(Rejection::SingleColumn),
    };

    let count = boundaries.len();
    let content_width = last - first;
    let avg_width = content_width / count as f32;
    if avg_width < config.min_avg_column_width {
        return Err(Rejection::NarrowColumns { avg_width });
    }

    let per_inch = count as f32 / (content_width / 72.0);
    if per_inch > config.max_columns_per_inch {
        return Err(Rejection::TooDense { per_inch });
    }

    let cap = config.max_columns_for(page_width);
    if count > cap {
        return Err(Rejection::TooManyColumns { count, cap });
    }

    Ok(ColumnModel {
        boundaries,
        tolerance,
    })
}

/// Final table-row decision for every row against the page's model.
///
/// Paragraph and numbering-prefix rows are never table rows; any other row
/// is one when its words align with enough distinct boundaries.
pub fn classify_rows(
    rows: Vec<Row>,
    model: &ColumnModel,
    config: &LayoutConfig,
) -> Vec<ClassifiedRow> {
    rows.into_iter()
        .map(|row| {
            let is_table_row = !row.is_paragraph
                && !row.has_numbering_prefix
                && model.aligned_columns(&row.words, config.alignment_tolerance)
                    >= config.min_aligned_columns;
            ClassifiedRow { row, is_table_row }
        })
        .collect()
}

/// Reject the page when too small a share of its rows are table rows.
pub fn check_table_row_fraction(
    rows: &[ClassifiedRow],
    config: &LayoutConfig,
) -> Result<(), Rejection> {
    let total_rows = rows.len();
    let table_rows = rows.iter().filter(|r| r.is_table_row).count();
    if total_rows == 0 || (table_rows as f32 / total_rows as f32) < config.min_table_row_fraction {
        return Err(Rejection::TooFewTableRows {
            table_rows,
            total_rows,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::rows::build_row;
    use super::*;

    fn word(text: &str, x0: f32) -> Word {
        Word::new(text, x0, x0 + text.len() as f32 * 5.0, 0.0)
    }

    fn row_at(xs: &[f32]) -> Row {
        let words = xs.iter().map(|&x| word("val", x)).collect();
        build_row(0.0, words, 612.0, &LayoutConfig::default())
    }

    fn model(boundaries: &[f32]) -> ColumnModel {
        ColumnModel {
            boundaries: boundaries.to_vec(),
            tolerance: 35.0,
        }
    }

    // -- pooling ------------------------------------------------------------

    #[test]
    fn pool_skips_rows_with_too_few_groups() {
        let rows = vec![row_at(&[50.0, 200.0]), row_at(&[50.0, 200.0, 350.0])];
        let pool = pool_candidate_positions(&rows, &LayoutConfig::default());
        assert_eq!(pool, vec![50.0, 200.0, 350.0]);
    }

    #[test]
    fn pool_skips_paragraph_rows() {
        let mut row = row_at(&[50.0, 200.0, 350.0]);
        row.is_paragraph = true;
        assert!(pool_candidate_positions(&[row], &LayoutConfig::default()).is_empty());
    }

    // -- adaptive tolerance -------------------------------------------------

    #[test]
    fn tolerance_falls_back_with_few_gaps() {
        let config = LayoutConfig::default();
        assert_eq!(adaptive_tolerance(&[50.0, 200.0, 350.0], &config), 35.0);
        assert_eq!(adaptive_tolerance(&[], &config), 35.0);
    }

    #[test]
    fn tolerance_ignores_noise_gaps() {
        // Only two gaps exceed the 5pt noise floor.
        let config = LayoutConfig::default();
        let positions = [50.0, 52.0, 54.0, 100.0, 103.0, 140.0];
        assert_eq!(adaptive_tolerance(&positions, &config), 35.0);
    }

    #[test]
    fn tolerance_uses_seventieth_percentile() {
        // Gaps: 30, 40, 45, 48 -> index floor(4 * 0.7) = 2 -> 45.
        let positions = [0.0, 30.0, 70.0, 115.0, 163.0];
        assert_eq!(adaptive_tolerance(&positions, &LayoutConfig::default()), 45.0);
    }

    #[test]
    fn tolerance_percentile_index_truncates_in_double_precision() {
        // 90 gaps of 26, 27, .. 115: floor(90 * 0.7) = 62 -> 88.
        let positions: Vec<f32> = (0..=90u32)
            .scan(0.0f32, |x, i| {
                if i > 0 {
                    *x += 25.0 + i as f32;
                }
                Some(*x)
            })
            .collect();
        let config = LayoutConfig {
            tolerance_max: 200.0,
            ..LayoutConfig::default()
        };
        assert_eq!(adaptive_tolerance(&positions, &config), 88.0);

        // 10 gaps of 26, 27, .. 35: floor(10 * 0.7) = 7 -> 33.
        let short: Vec<f32> = positions.iter().copied().take(11).collect();
        assert_eq!(adaptive_tolerance(&short, &config), 33.0);
    }

    #[test]
    fn tolerance_clamped_to_range() {
        let config = LayoutConfig::default();
        let wide = [0.0, 100.0, 200.0, 300.0, 400.0];
        assert_eq!(adaptive_tolerance(&wide, &config), 50.0);
        let tight = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(adaptive_tolerance(&tight, &config), 25.0);
    }

    // -- clustering ---------------------------------------------------------

    #[test]
    fn cluster_boundaries_compares_with_last_boundary() {
        let positions = [50.0, 60.0, 80.0, 90.0, 200.0];
        // 60 and 80 are within 35 of 50; 90 is not.
        assert_eq!(cluster_boundaries(&positions, 35.0), vec![50.0, 90.0, 200.0]);
    }

    // -- build_column_model -------------------------------------------------

    #[test]
    fn model_from_three_aligned_columns() {
        let rows = vec![
            row_at(&[50.0, 200.0, 350.0]),
            row_at(&[50.0, 200.0, 350.0]),
            row_at(&[52.0, 201.0, 349.0]),
        ];
        let model = build_column_model(&rows, 612.0, &LayoutConfig::default()).unwrap();
        assert_eq!(model.boundaries(), &[50.0, 200.0, 349.0]);
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn model_rejects_page_without_candidates() {
        let rows = vec![row_at(&[50.0]), row_at(&[50.0, 300.0])];
        assert_eq!(
            build_column_model(&rows, 612.0, &LayoutConfig::default()),
            Err(Rejection::NoCandidateRows)
        );
    }

    #[test]
    fn model_rejects_single_boundary() {
        let mut config = LayoutConfig::default();
        config.x_group_gap = 5.0;
        config.tolerance_fallback = 100.0;
        let words = vec![word("a", 50.0), word("b", 60.0), word("c", 70.0)];
        let rows = vec![build_row(0.0, words, 612.0, &config)];
        assert_eq!(
            build_column_model(&rows, 612.0, &config),
            Err(Rejection::SingleColumn)
        );
    }

    #[test]
    fn model_rejects_narrow_columns() {
        // Four boundaries over 75pt.
        let mut config = LayoutConfig::default();
        config.x_group_gap = 10.0;
        config.tolerance_fallback = 20.0;
        config.min_gaps_for_percentile = usize::MAX;
        let words = [0.0, 25.0, 50.0, 75.0].iter().map(|&x| word("v", x)).collect();
        let rows = vec![build_row(0.0, words, 612.0, &config)];
        match build_column_model(&rows, 612.0, &config) {
            Err(Rejection::NarrowColumns { avg_width }) => {
                assert!((avg_width - 18.75).abs() < 0.01)
            }
            other => panic!("expected NarrowColumns, got {:?}", other),
        }
    }

    #[test]
    fn model_rejects_dense_columns() {
        let mut config = LayoutConfig::default();
        config.min_avg_column_width = 1.0;
        // Three columns over 140pt is about 1.5 per inch.
        config.max_columns_per_inch = 1.0;
        let rows = vec![row_at(&[50.0, 120.0, 190.0])];
        assert!(matches!(
            build_column_model(&rows, 612.0, &config),
            Err(Rejection::TooDense { .. })
        ));
    }

    #[test]
    fn model_rejects_too_many_columns() {
        let mut config = LayoutConfig::default();
        config.base_max_columns = 2;
        config.min_max_columns = 2;
        let rows = vec![row_at(&[50.0, 200.0, 350.0])];
        assert_eq!(
            build_column_model(&rows, 612.0, &config),
            Err(Rejection::TooManyColumns { count: 3, cap: 2 })
        );
    }

    // -- ColumnModel helpers ------------------------------------------------

    #[test]
    fn column_for_uses_boundary_ranges() {
        let m = model(&[50.0, 200.0, 350.0]);
        assert_eq!(m.column_for(50.0, 20.0), 0);
        assert_eq!(m.column_for(179.0, 20.0), 0);
        // Within the snap distance of the next boundary.
        assert_eq!(m.column_for(185.0, 20.0), 1);
        assert_eq!(m.column_for(340.0, 20.0), 2);
        assert_eq!(m.column_for(999.0, 20.0), 2);
    }

    #[test]
    fn aligned_columns_counts_distinct_boundaries() {
        let m = model(&[50.0, 200.0, 350.0]);
        let words = vec![word("a", 55.0), word("b", 60.0), word("c", 210.0)];
        assert_eq!(m.aligned_columns(&words, 40.0), 2);
        let far = vec![word("a", 120.0), word("b", 280.0)];
        assert_eq!(m.aligned_columns(&far, 40.0), 0);
    }

    #[test]
    fn aligned_columns_first_match_wins() {
        // 80 is within 40 of both 50 and 100; only 50 counts.
        let m = model(&[50.0, 100.0]);
        assert_eq!(m.aligned_columns(&[word("a", 80.0)], 40.0), 1);
    }

    // -- classify_rows ------------------------------------------------------

    #[test]
    fn classify_marks_aligned_rows() {
        let m = model(&[50.0, 200.0, 350.0]);
        let rows = vec![row_at(&[50.0, 200.0]), row_at(&[120.0])];
        let classified = classify_rows(rows, &m, &LayoutConfig::default());
        assert!(classified[0].is_table_row);
        assert!(!classified[1].is_table_row);
    }

    #[test]
    fn classify_never_marks_numbering_rows() {
        let m = model(&[50.0, 200.0, 350.0]);
        let words = vec![word(".1", 50.0), word("General", 200.0)];
        let row = build_row(0.0, words, 612.0, &LayoutConfig::default());
        let classified = classify_rows(vec![row], &m, &LayoutConfig::default());
        assert!(!classified[0].is_table_row);
    }

    #[test]
    fn classify_never_marks_paragraph_rows() {
        let m = model(&[50.0, 200.0, 350.0]);
        let mut row = row_at(&[50.0, 200.0, 350.0]);
        row.is_paragraph = true;
        let classified = classify_rows(vec![row], &m, &LayoutConfig::default());
        assert!(!classified[0].is_table_row);
    }

    #[test]
    fn fraction_gate() {
        let config = LayoutConfig::default();
        let make = |flags: &[bool]| -> Vec<ClassifiedRow> {
            flags
                .iter()
                .map(|&is_table_row| ClassifiedRow {
                    row: row_at(&[50.0]),
                    is_table_row,
                })
                .collect()
        };
        assert!(check_table_row_fraction(&make(&[true, false, false, false, false]), &config).is_ok());
        assert_eq!(
            check_table_row_fraction(&make(&[true, false, false, false, false, false]), &config),
            Err(Rejection::TooFewTableRows {
                table_rows: 1,
                total_rows: 6
            })
        );
        assert!(check_table_row_fraction(&[], &config).is_err());
    }
}
