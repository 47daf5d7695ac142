//! Calibration constants for layout reconstruction.
//!
//! Every threshold the engine uses lives here so that a corpus with different
//! proportions (A4 reports, landscape ledgers) can be re-tuned from a TOML
//! file without touching code.  The defaults were tuned on US-letter business
//! forms.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Knobs for turning glyph runs into words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordOptions {
    /// Runs on the same line separated by at most this many points are
    /// merged into one word.
    pub x_tolerance: f32,
    /// Runs whose tops differ by at most this many points share a line.
    pub y_tolerance: f32,
    /// Keep blank characters inside words instead of splitting on them.
    pub keep_blank_chars: bool,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
            keep_blank_chars: true,
        }
    }
}

/// Tuning knobs for the stand-alone invoice table extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleTableConfig {
    /// Word left edges further apart than this start a new column.
    pub column_gap: f32,
    pub min_columns: usize,
    pub max_columns: usize,
    /// Minimum number of rows (header included) with two or more filled cells.
    pub min_rows: usize,
    /// Cells longer than this many characters count as prose.
    pub long_cell_chars: usize,
    /// Maximum share of long cells before the table is rejected.
    pub max_long_cell_ratio: f32,
}

impl Default for SimpleTableConfig {
    fn default() -> Self {
        Self {
            column_gap: 20.0,
            min_columns: 3,
            max_columns: 10,
            min_rows: 3,
            long_cell_chars: 30,
            max_long_cell_ratio: 0.3,
        }
    }
}

/// Thresholds for row classification, column modelling and rendering.
///
/// All distances are in PDF points (1/72 inch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub words: WordOptions,
    /// Vertical bucket size used to group words into rows.
    pub row_tolerance: f32,
    /// A row wider than this fraction of the page ...
    pub paragraph_width_ratio: f32,
    /// ... and longer than this many characters is prose.
    pub paragraph_min_chars: usize,
    /// Word starts closer than this belong to the same x-group.
    pub x_group_gap: f32,
    /// Rows need at least this many x-groups to feed the column pool.
    pub min_candidate_columns: usize,
    /// Gaps between pooled positions at or below this are ignored.
    pub gap_noise_floor: f32,
    /// Below this many significant gaps the fallback tolerance is used.
    pub min_gaps_for_percentile: usize,
    /// Percentile of the sorted gap list used as clustering tolerance.
    pub tolerance_percentile: f64,
    pub tolerance_min: f32,
    pub tolerance_max: f32,
    pub tolerance_fallback: f32,
    /// Average column width below this means dense running text.
    pub min_avg_column_width: f32,
    /// Column density above this means narrow multi-column prose.
    pub max_columns_per_inch: f32,
    /// Column cap on a page of `reference_page_width`; scaled linearly.
    pub base_max_columns: usize,
    /// The scaled column cap never drops below this.
    pub min_max_columns: usize,
    pub reference_page_width: f32,
    /// A word within this distance of a boundary aligns with it.
    pub alignment_tolerance: f32,
    /// Distinct aligned boundaries needed for a table row.
    pub min_aligned_columns: usize,
    /// Share of rows that must be table rows for the page to count as a form.
    pub min_table_row_fraction: f32,
    /// Words starting this close before the next boundary already belong to it.
    pub column_snap: f32,
    /// Narrowest rendered column, wide enough for the `---` separator.
    pub min_cell_width: usize,
    /// Page width assumed when the page carries no usable MediaBox.
    pub default_page_width: f32,
    pub simple_tables: SimpleTableConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            words: WordOptions::default(),
            row_tolerance: 5.0,
            paragraph_width_ratio: 0.55,
            paragraph_min_chars: 60,
            x_group_gap: 50.0,
            min_candidate_columns: 3,
            gap_noise_floor: 5.0,
            min_gaps_for_percentile: 3,
            tolerance_percentile: 0.70,
            tolerance_min: 25.0,
            tolerance_max: 50.0,
            tolerance_fallback: 35.0,
            min_avg_column_width: 30.0,
            max_columns_per_inch: 10.0,
            base_max_columns: 20,
            min_max_columns: 15,
            reference_page_width: 612.0,
            alignment_tolerance: 40.0,
            min_aligned_columns: 2,
            min_table_row_fraction: 0.2,
            column_snap: 20.0,
            min_cell_width: 3,
            default_page_width: 612.0,
            simple_tables: SimpleTableConfig::default(),
        }
    }
}

impl LayoutConfig {
    /// Parse a (possibly partial) TOML document.  Missing keys keep their
    /// default values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: LayoutConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("row_tolerance", self.row_tolerance),
            ("x_group_gap", self.x_group_gap),
            ("tolerance_min", self.tolerance_min),
            ("tolerance_fallback", self.tolerance_fallback),
            ("alignment_tolerance", self.alignment_tolerance),
            ("reference_page_width", self.reference_page_width),
            ("default_page_width", self.default_page_width),
            ("max_columns_per_inch", self.max_columns_per_inch),
            ("simple_tables.column_gap", self.simple_tables.column_gap),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if self.tolerance_min > self.tolerance_max {
            return Err(ConfigError::Invalid(format!(
                "tolerance_min ({}) exceeds tolerance_max ({})",
                self.tolerance_min, self.tolerance_max
            )));
        }

        let fractions = [
            ("paragraph_width_ratio", self.paragraph_width_ratio),
            ("tolerance_percentile", self.tolerance_percentile as f32),
            ("min_table_row_fraction", self.min_table_row_fraction),
            (
                "simple_tables.max_long_cell_ratio",
                self.simple_tables.max_long_cell_ratio,
            ),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.simple_tables.min_columns > self.simple_tables.max_columns {
            return Err(ConfigError::Invalid(
                "simple_tables.min_columns exceeds simple_tables.max_columns".into(),
            ));
        }

        Ok(())
    }

    /// Column cap for a page of the given width.
    pub fn max_columns_for(&self, page_width: f32) -> usize {
        let scaled =
            (self.base_max_columns as f32 * (page_width / self.reference_page_width)).round();
        (scaled.max(0.0) as usize).max(self.min_max_columns)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LayoutConfig::from_toml_str(
            r#"
            alignment_tolerance = 30.0

            [words]
            x_tolerance = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.alignment_tolerance, 30.0);
        assert_eq!(config.words.x_tolerance, 1.5);
        assert_eq!(config.words.y_tolerance, 3.0);
        assert_eq!(config.row_tolerance, 5.0);
        assert_eq!(config.simple_tables, SimpleTableConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = LayoutConfig::from_toml_str("").unwrap();
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn test_inverted_clamp_rejected() {
        let err = LayoutConfig::from_toml_str("tolerance_min = 60.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_fraction_out_of_range_rejected() {
        let err = LayoutConfig::from_toml_str("min_table_row_fraction = 1.5").unwrap_err();
        assert!(err.to_string().contains("min_table_row_fraction"));
    }

    #[test]
    fn test_non_positive_tolerance_rejected() {
        assert!(LayoutConfig::from_toml_str("row_tolerance = 0.0").is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = LayoutConfig::from_toml_str("row_tolerance = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "column_snap = 12.0").unwrap();

        let config = LayoutConfig::load(file.path()).unwrap();
        assert_eq!(config.column_snap, 12.0);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = LayoutConfig::load(Path::new("/nonexistent/pdfmd.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_max_columns_scales_with_width() {
        let config = LayoutConfig::default();
        assert_eq!(config.max_columns_for(612.0), 20);
        assert_eq!(config.max_columns_for(1224.0), 40);
        // Narrow pages never go below the floor.
        assert_eq!(config.max_columns_for(300.0), 15);
    }
}
