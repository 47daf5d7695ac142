//! Document-level conversion policy.
//!
//! A document is converted by trying an ordered list of [`Strategy`] values
//! and keeping the first one that produces text:
//!
//! 1. [`Strategy::LayoutAware`] analyses every page on its own.  Form pages
//!    contribute their rendered tables, plain pages their page text.  When
//!    plain pages outnumber form pages the per-page output is discarded and
//!    the next strategy runs instead.
//! 2. [`Strategy::Linear`] extracts the text of the whole byte stream.
//!
//! A strategy that fails or produces only whitespace hands over to the next
//! one; when none is left the result is empty, which is the normal outcome
//! for scanned documents without a text layer.  The numbering merge runs
//! over whichever text was kept.

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::parser::{analyze_page, rows, table};
use crate::render::cleanup::merge_numbering_lines;
use crate::render::markdown::render_page;
use crate::types::{Conversion, PageKind, PageReport, PageTally, PageWords, Strategy};
use crate::PdfError;

#[cfg(feature = "lopdf")]
pub use self::lopdf_impl::{LopdfLayoutLoader, LopdfTextExtractor};

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Opens a document for per-page word extraction.
pub trait LayoutLoader {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn LayoutDocument>, PdfError>;
}

/// A loaded document that yields positioned words page by page.
///
/// Page indices are 0-based.
pub trait LayoutDocument {
    fn page_count(&self) -> usize;

    fn page_words(&self, index: usize) -> Result<PageWords, PdfError>;

    /// Plain reading-order text of one page.
    fn page_text(&self, index: usize) -> Result<String, PdfError>;
}

/// Extracts the flat text of a whole document.
pub trait LinearExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, PdfError>;
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

struct Backends {
    layout: Box<dyn LayoutLoader>,
    linear: Box<dyn LinearExtractor>,
}

/// Converts PDF bytes to Markdown text.
pub struct Converter {
    config: LayoutConfig,
    backends: Option<Backends>,
}

/// Tables found by the word-grid extractor on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTables {
    /// 1-based page number.
    pub page: usize,
    pub tables: Vec<Vec<Vec<String>>>,
}

/// Per-page output of the layout-aware pass.
struct LayoutPass {
    tally: PageTally,
    pages: Vec<PageReport>,
    chunks: Vec<String>,
}

impl Converter {
    /// A converter over the built-in lopdf collaborators.
    ///
    /// Without the `lopdf` feature there are no collaborators and every
    /// conversion fails with [`PdfError::MissingDependency`].
    pub fn new(config: LayoutConfig) -> Self {
        #[cfg(feature = "lopdf")]
        let backends = Some(Backends {
            layout: Box::new(LopdfLayoutLoader::new(config.words.clone())),
            linear: Box::new(LopdfTextExtractor),
        });
        #[cfg(not(feature = "lopdf"))]
        let backends = None;

        Self { config, backends }
    }

    pub fn with_backends(
        config: LayoutConfig,
        layout: Box<dyn LayoutLoader>,
        linear: Box<dyn LinearExtractor>,
    ) -> Self {
        Self {
            config,
            backends: Some(Backends { layout, linear }),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    fn backends(&self) -> Result<&Backends, PdfError> {
        self.backends
            .as_ref()
            .ok_or(PdfError::MissingDependency { feature: "lopdf" })
    }

    /// Convert a whole document.
    ///
    /// Extraction failures never surface here; they only move conversion on
    /// to the next strategy.  The one error is a missing extraction backend.
    pub fn convert(&self, bytes: &[u8]) -> Result<Conversion, PdfError> {
        let backends = self.backends()?;
        let mut tally = PageTally::default();
        let mut pages = Vec::new();

        for strategy in Strategy::ORDER {
            let text = match strategy {
                Strategy::LayoutAware => match self.layout_pass(backends.layout.as_ref(), bytes) {
                    Ok(pass) => {
                        tally = pass.tally;
                        pages = pass.pages;
                        if tally.prefers_linear() {
                            log::info!(
                                "{} plain pages outnumber {} form pages; extracting linearly",
                                tally.plain_pages,
                                tally.form_pages
                            );
                            continue;
                        }
                        pass.chunks.join("\n\n").trim().to_string()
                    }
                    Err(e) => {
                        log::warn!("{} extraction failed: {}", strategy, e);
                        continue;
                    }
                },
                Strategy::Linear => match backends.linear.extract(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("{} extraction failed: {}", strategy, e);
                        continue;
                    }
                },
            };

            if text.trim().is_empty() {
                log::info!("{} extraction produced no text", strategy);
                continue;
            }

            log::info!("using {} output", strategy);
            return Ok(Conversion {
                markdown: merge_numbering_lines(&text),
                strategy: Some(strategy),
                tally,
                pages,
            });
        }

        log::info!("no strategy produced text; output is empty");
        Ok(Conversion {
            markdown: String::new(),
            strategy: None,
            tally,
            pages,
        })
    }

    /// Run the word-grid table extractor over every page.
    ///
    /// Pages whose words cannot be extracted are skipped.
    pub fn word_tables(&self, bytes: &[u8]) -> Result<Vec<PageTables>, PdfError> {
        let doc = self.backends()?.layout.load(bytes)?;
        let mut out = Vec::new();
        for index in 0..doc.page_count() {
            match doc.page_words(index) {
                Ok(page) => out.push(PageTables {
                    page: index + 1,
                    tables: table::extract_tables_from_words(&page.words, &self.config),
                }),
                Err(e) => log::warn!("page {}: {}", index + 1, e),
            }
        }
        Ok(out)
    }

    fn layout_pass(&self, loader: &dyn LayoutLoader, bytes: &[u8]) -> Result<LayoutPass, PdfError> {
        let doc = loader.load(bytes)?;
        let mut pass = LayoutPass {
            tally: PageTally::default(),
            pages: Vec::with_capacity(doc.page_count()),
            chunks: Vec::new(),
        };

        for index in 0..doc.page_count() {
            let number = index + 1;
            let page = match doc.page_words(index) {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("page {}: word extraction failed: {}", number, e);
                    let report = self.plain_page(doc.as_ref(), index, &mut pass.chunks);
                    pass.tally.record(PageKind::Plain);
                    pass.pages.push(PageReport {
                        reason: Some(e.to_string()),
                        ..report
                    });
                    continue;
                }
            };

            let width = if page.width > 0.0 {
                page.width
            } else {
                self.config.default_page_width
            };

            match analyze_page(&page.words, width, &self.config) {
                Ok(layout) => {
                    log::debug!(
                        "page {}: form, {} rows, {} columns (tolerance {:.1}), {} tables",
                        number,
                        layout.rows.len(),
                        layout.model.len(),
                        layout.model.tolerance(),
                        layout.regions.len()
                    );
                    let content = render_page(&layout, &self.config);
                    if !content.trim().is_empty() {
                        pass.chunks.push(content);
                    }
                    pass.tally.record(PageKind::Form);
                    pass.pages.push(PageReport {
                        page: number,
                        kind: PageKind::Form,
                        rows: layout.rows.len(),
                        table_rows: layout.table_rows(),
                        columns: layout.model.len(),
                        tables: layout.regions.len(),
                        reason: None,
                    });
                }
                Err(rejection) => {
                    log::debug!("page {}: plain, {}", number, rejection);
                    let report = self.plain_page(doc.as_ref(), index, &mut pass.chunks);
                    pass.tally.record(PageKind::Plain);
                    pass.pages.push(PageReport {
                        rows: rows::group_words_into_rows(&page.words, self.config.row_tolerance)
                            .len(),
                        reason: Some(rejection.to_string()),
                        ..report
                    });
                }
            }
        }

        Ok(pass)
    }

    /// Append a plain page's trimmed text, if it has any.
    fn plain_page(&self, doc: &dyn LayoutDocument, index: usize, chunks: &mut Vec<String>) -> PageReport {
        match doc.page_text(index) {
            Ok(text) if !text.trim().is_empty() => chunks.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => log::warn!("page {}: text extraction failed: {}", index + 1, e),
        }
        PageReport {
            page: index + 1,
            kind: PageKind::Plain,
            rows: 0,
            table_rows: 0,
            columns: 0,
            tables: 0,
            reason: None,
        }
    }
}

// ---------------------------------------------------------------------------
// lopdf collaborators
// ---------------------------------------------------------------------------

#[cfg(feature = "lopdf")]
mod lopdf_impl {
    use super::{LayoutDocument, LayoutLoader, LinearExtractor};
    use crate::config::WordOptions;
    use crate::parser::backend::{LopdfBackend, PageId, PdfBackend};
    use crate::parser::layout::{extract_page_words, page_text};
    use crate::types::PageWords;
    use crate::PdfError;

    /// Loads documents with [`LopdfBackend`] and extracts words with the
    /// text-state machine in [`crate::parser::layout`].
    pub struct LopdfLayoutLoader {
        options: WordOptions,
    }

    impl LopdfLayoutLoader {
        pub fn new(options: WordOptions) -> Self {
            Self { options }
        }
    }

    impl LayoutLoader for LopdfLayoutLoader {
        fn load(&self, bytes: &[u8]) -> Result<Box<dyn LayoutDocument>, PdfError> {
            let backend = LopdfBackend::load_bytes(bytes)?;
            let pages = backend.pages().into_iter().collect();
            Ok(Box::new(LopdfLayoutDocument {
                backend,
                pages,
                options: self.options.clone(),
            }))
        }
    }

    struct LopdfLayoutDocument {
        backend: LopdfBackend,
        /// (1-based page number, object id) in page order.
        pages: Vec<(u32, PageId)>,
        options: WordOptions,
    }

    impl LopdfLayoutDocument {
        fn page(&self, index: usize) -> Result<(u32, PageId), PdfError> {
            self.pages
                .get(index)
                .copied()
                .ok_or_else(|| PdfError::Parse(format!("page index {} out of range", index)))
        }
    }

    impl LayoutDocument for LopdfLayoutDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_words(&self, index: usize) -> Result<PageWords, PdfError> {
            let (_, id) = self.page(index)?;
            extract_page_words(&self.backend, id, &self.options)
        }

        fn page_text(&self, index: usize) -> Result<String, PdfError> {
            let (number, id) = self.page(index)?;
            match extract_page_words(&self.backend, id, &self.options) {
                Ok(page) => Ok(page_text(&page.words, self.options.y_tolerance)),
                Err(e) => {
                    log::debug!("page {}: {}; using lopdf text", number, e);
                    self.backend.extract_pages_text(&[number])
                }
            }
        }
    }

    /// Whole-document text through `lopdf::Document::extract_text`.
    pub struct LopdfTextExtractor;

    impl LinearExtractor for LopdfTextExtractor {
        fn extract(&self, bytes: &[u8]) -> Result<String, PdfError> {
            LopdfBackend::load_bytes(bytes)?.extract_text()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
