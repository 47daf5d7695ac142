//! Row grouping and local row features.
//!
//! Words are bucketed into visual rows by their top coordinate, then each
//! row gets the features that do not depend on the rest of the page: span
//! width, joined text, x-groups, and the paragraph / numbering flags.
//! Whether a row is a table row is decided later, once the page's column
//! model exists (see [`super::columns::classify_rows`]).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::LayoutConfig;
use crate::types::Word;

/// A visual row of words with its page-independent features.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Bucketed top coordinate shared by every word in the row.
    pub y: f32,
    /// Words sorted left to right.
    pub words: Vec<Word>,
    /// Word texts joined by single spaces.
    pub text: String,
    /// Right edge of the last word minus left edge of the first.
    pub line_width: f32,
    /// Start positions of horizontally separated word clusters.
    pub x_groups: Vec<f32>,
    /// Long, wide line of running text.
    pub is_paragraph: bool,
    /// First word is a bare enumerator such as `.1`.
    pub has_numbering_prefix: bool,
}

impl Row {
    pub fn num_columns(&self) -> usize {
        self.x_groups.len()
    }
}

/// `true` for a bare decimal enumerator: a dot followed by digits only.
pub fn is_numbering_prefix(text: &str) -> bool {
    static RE_NUMBERING: OnceLock<Regex> = OnceLock::new();
    let re = RE_NUMBERING.get_or_init(|| Regex::new(r"^\.\d+$").unwrap());
    re.is_match(text)
}

/// Bucket words into rows by `round(top / tolerance)`, ties to even.
///
/// Rows come back top to bottom with their words sorted by left edge.  Each
/// entry carries the bucket's representative y (`index * tolerance`).
pub fn group_words_into_rows(words: &[Word], tolerance: f32) -> Vec<(f32, Vec<Word>)> {
    let mut buckets: BTreeMap<i64, Vec<Word>> = BTreeMap::new();
    for word in words {
        let key = (word.top / tolerance).round_ties_even() as i64;
        buckets.entry(key).or_default().push(word.clone());
    }

    buckets
        .into_iter()
        .map(|(key, mut row_words)| {
            row_words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            (key as f32 * tolerance, row_words)
        })
        .collect()
}

/// Cluster sorted word starts: a position more than `gap` past the start of
/// the current cluster opens a new one.
pub fn x_groups(words: &[Word], gap: f32) -> Vec<f32> {
    let mut positions: Vec<f32> = words.iter().map(|w| w.x0).collect();
    positions.sort_by(f32::total_cmp);

    let mut groups: Vec<f32> = Vec::new();
    for x in positions {
        match groups.last() {
            Some(&last) if x - last <= gap => {}
            _ => groups.push(x),
        }
    }
    groups
}

/// Compute the local features of one row.  `words` must be sorted by `x0`.
pub fn build_row(y: f32, words: Vec<Word>, page_width: f32, config: &LayoutConfig) -> Row {
    let line_width = match (words.first(), words.last()) {
        (Some(first), Some(last)) => last.x1 - first.x0,
        _ => 0.0,
    };
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let is_paragraph = line_width > page_width * config.paragraph_width_ratio
        && text.chars().count() > config.paragraph_min_chars;
    let has_numbering_prefix = words
        .first()
        .is_some_and(|w| is_numbering_prefix(w.text.trim()));
    let x_groups = x_groups(&words, config.x_group_gap);

    Row {
        y,
        words,
        text,
        line_width,
        x_groups,
        is_paragraph,
        has_numbering_prefix,
    }
}

/// Group a page's words into rows and compute every row's local features.
pub fn build_rows(words: &[Word], page_width: f32, config: &LayoutConfig) -> Vec<Row> {
    group_words_into_rows(words, config.row_tolerance)
        .into_iter()
        .map(|(y, row_words)| build_row(y, row_words, page_width, config))
        .collect()
}
