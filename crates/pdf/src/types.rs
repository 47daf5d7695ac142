use std::fmt;

use serde::{Deserialize, Serialize};

/// A run of text with its horizontal extent and top edge, in PDF points
/// measured from the top-left corner of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f32, x1: f32, top: f32) -> Self {
        Word {
            text: text.into(),
            x0,
            x1,
            top,
        }
    }
}

/// The positioned words of one page together with the page width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageWords {
    pub width: f32,
    pub words: Vec<Word>,
}

/// Whether a page was reconstructed as a form or handed to plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Form,
    Plain,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Form => write!(f, "form"),
            PageKind::Plain => write!(f, "plain"),
        }
    }
}

/// Running count of form and plain pages across a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTally {
    pub form_pages: usize,
    pub plain_pages: usize,
}

impl PageTally {
    pub fn record(&mut self, kind: PageKind) {
        match kind {
            PageKind::Form => self.form_pages += 1,
            PageKind::Plain => self.plain_pages += 1,
        }
    }

    /// Plain pages dominate: per-page output should be discarded in favour
    /// of whole-document linear extraction.
    pub fn prefers_linear(&self) -> bool {
        self.plain_pages > self.form_pages && self.plain_pages > 0
    }
}

/// An extraction strategy, in the order the converter tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Word-position analysis per page with plain-text fallback per page.
    LayoutAware,
    /// Whole-document linear text extraction.
    Linear,
}

impl Strategy {
    pub const ORDER: [Strategy; 2] = [Strategy::LayoutAware, Strategy::Linear];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::LayoutAware => write!(f, "layout-aware"),
            Strategy::Linear => write!(f, "linear"),
        }
    }
}

/// What the layout pass decided about one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based page number.
    pub page: usize,
    pub kind: PageKind,
    pub rows: usize,
    pub table_rows: usize,
    pub columns: usize,
    pub tables: usize,
    /// Why the page was not treated as a form, if it was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The outcome of converting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub markdown: String,
    /// The strategy whose output was used; `None` when every strategy came
    /// back empty or failed.
    pub strategy: Option<Strategy>,
    pub tally: PageTally,
    pub pages: Vec<PageReport>,
}
