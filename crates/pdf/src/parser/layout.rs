//! Positioned word extraction.
//!
//! Walks a page's content stream with a simplified PDF text-state machine and
//! turns the resulting text spans into [`Word`]s: runs of text with a left
//! edge, a right edge and a top coordinate measured from the top of the page.
//! I/O lives behind the [`PdfBackend`] trait; everything below is pure.
//!
//! # Pipeline
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  Word[]  ->  plain page text
//!   (per page)      extract       spans_to_words   page_text
//! ```

use super::backend::{get_number_from_value, PageId, PdfBackend, PdfValue, DEFAULT_PAGE_SIZE};
use crate::config::WordOptions;
use crate::types::{PageWords, Word};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single run of text at a specific position on the page, in PDF user
/// space (origin at the bottom-left corner).
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Approximate character width as a fraction of font size when no better
/// metric is available.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Merged runs separated by at least this much get a space between them.
const MIN_WORD_GAP: f32 = 1.5;

/// The identity 2x3 text matrix: [a, b, c, d, tx, ty].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Mutable state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key).
    font_key: Vec<u8>,
    font_size: f32,
    /// Elements [a, b, c, d, tx, ty] of the current text matrix.
    text_matrix: [f32; 6],
    /// Text line matrix -- set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Rendered size: `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    /// Horizontal scale of the text matrix, applied to glyph advances.
    fn matrix_scale_x(&self) -> f32 {
        (self.text_matrix[0].powi(2) + self.text_matrix[1].powi(2)).sqrt()
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }

    fn char_advance(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }
}

/// Estimated rendered width of `text` in user space.
///
/// Glyph widths arrays are not consulted; every character is assumed to be
/// half an em wide.
fn estimate_text_width(text: &str, state: &TextState) -> f32 {
    text.chars().count() as f32 * state.char_advance() * state.matrix_scale_x()
}

/// Advance the text matrix after rendering `text`.
fn advance_after_show(text: &str, state: &mut TextState) {
    let mut total_dx: f32 = 0.0;
    for ch in text.chars() {
        total_dx += state.char_advance() + state.char_spacing;
        if ch == ' ' {
            total_dx += state.word_spacing;
        }
    }
    state.advance_x(total_dx);
}

fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                super::backend::decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Public API: span extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce a flat list of
/// [`TextSpan`]s.
///
/// Handled operators:
///
/// | Operator | Action |
/// |----------|--------|
/// | `BT`     | Begin text object -- reset matrices |
/// | `Tf`     | Set font and size |
/// | `Tm`     | Set text matrix directly |
/// | `Td` `TD` `T*` | Move to a new line |
/// | `TL` `Tc` `Tw` `Tz` `Ts` | Text state parameters |
/// | `Tj` `TJ` `'` `"` | Show text |
pub fn extract_page_spans(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<TextSpan>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut state = TextState::default();
    let mut spans: Vec<TextSpan> = Vec::new();

    for op in &ops {
        let first_number = || op.operands.first().and_then(get_number_from_value);
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => handle_tf(&op.operands, &mut state),
            "Tm" => handle_tm(&op.operands, &mut state),
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.translate_line(0.0, -state.leading),
            "TL" => {
                if let Some(v) = first_number() {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = first_number() {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = first_number() {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = first_number() {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = first_number() {
                    state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    handle_tj_array(arr, backend, page_id, &mut state, &mut spans);
                }
            }
            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, &mut state, &mut spans);
                }
            }
            "\"" => {
                // " aw ac string  =>  set Tw, Tc, T*, Tj
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    emit_show_string(&op.operands[2], backend, page_id, &mut state, &mut spans);
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn handle_tf(operands: &[PdfValue], state: &mut TextState) {
    if operands.len() < 2 {
        return;
    }
    let key = match &operands[0] {
        PdfValue::Name(n) | PdfValue::Str(n) => n.clone(),
        _ => return,
    };
    state.font_key = key;
    state.font_size = get_number_from_value(&operands[1]).unwrap_or(0.0);
}

fn handle_tm(operands: &[PdfValue], state: &mut TextState) {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    if let &[a, b, c, d, e, f] = vals.as_slice() {
        state.text_matrix = [a, b, c, d, e, f];
        state.line_matrix = state.text_matrix;
    }
}

/// Decode an operand, push a span for it and advance the text position.
fn emit_show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    spans.push(TextSpan {
        width: estimate_text_width(&text, state),
        x: state.x(),
        y: state.y() + state.text_rise,
        font_size: state.effective_font_size(),
        text: text.clone(),
    });
    advance_after_show(&text, state);
}

/// Process a `TJ` array of strings and kerning adjustments (thousandths of
/// a text-space unit).  Large negative adjustments become spaces.
fn handle_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    state: &mut TextState,
    spans: &mut Vec<TextSpan>,
) {
    let mut buf = String::new();
    let start_x = state.x();
    let span_y = state.y() + state.text_rise;

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &state.font_key);
                buf.push_str(&fragment);
                advance_after_show(&fragment, state);
            }
            val => {
                if let Some(adj) = get_number_from_value(val) {
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
                    if dx > state.char_advance() * 0.3 && !buf.is_empty() {
                        buf.push(' ');
                    }
                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if trimmed.trim_start().is_empty() {
        return;
    }
    let leading_blanks = trimmed.chars().take_while(|c| c.is_whitespace()).count();
    let text = trimmed.trim_start();
    spans.push(TextSpan {
        text: text.to_string(),
        x: start_x + leading_blanks as f32 * state.char_advance() * state.matrix_scale_x(),
        y: span_y,
        width: estimate_text_width(text, state),
        font_size: state.effective_font_size(),
    });
}

// ---------------------------------------------------------------------------
// Public API: spans -> words
// ---------------------------------------------------------------------------

/// Convert spans to top-left-origin words, merging runs that sit on the same
/// line and touch within `options.x_tolerance`.
///
/// The result is in reading order: lines top to bottom, words left to right.
pub fn spans_to_words(spans: &[TextSpan], page_height: f32, options: &WordOptions) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.text.trim().is_empty() {
            continue;
        }
        let top = page_height - (span.y + span.font_size);
        if options.keep_blank_chars {
            words.push(Word::new(span.text.trim(), span.x, span.x + span.width, top));
        } else {
            words.extend(split_on_blanks(span, top));
        }
    }

    let mut merged: Vec<Word> = Vec::with_capacity(words.len());
    for line in cluster_lines(words, options.y_tolerance) {
        let start = merged.len();
        for word in line {
            if merged.len() > start {
                if let Some(prev) = merged.last_mut() {
                    let gap = word.x0 - prev.x1;
                    if gap <= options.x_tolerance {
                        if gap >= MIN_WORD_GAP && options.keep_blank_chars {
                            prev.text.push(' ');
                        }
                        prev.text.push_str(&word.text);
                        prev.x1 = prev.x1.max(word.x1);
                        continue;
                    }
                }
            }
            merged.push(word);
        }
    }
    merged
}

/// Split a span at whitespace, placing each piece proportionally along the
/// span's width.
fn split_on_blanks(span: &TextSpan, top: f32) -> Vec<Word> {
    let total = span.text.chars().count().max(1) as f32;
    let per_char = span.width / total;

    let mut out = Vec::new();
    let mut current = String::new();
    let mut start_idx = 0usize;
    for (idx, ch) in span.text.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                let x0 = span.x + start_idx as f32 * per_char;
                let x1 = span.x + idx as f32 * per_char;
                out.push(Word::new(std::mem::take(&mut current), x0, x1, top));
            }
            start_idx = idx + 1;
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        let x0 = span.x + start_idx as f32 * per_char;
        out.push(Word::new(current, x0, span.x + span.width, top));
    }
    out
}

/// Group words whose tops are within `y_tolerance` of the line's first word.
/// Lines are ordered top to bottom, words inside a line left to right.
fn cluster_lines(mut words: Vec<Word>, y_tolerance: f32) -> Vec<Vec<Word>> {
    words.sort_by(|a, b| {
        a.top
            .total_cmp(&b.top)
            .then_with(|| a.x0.total_cmp(&b.x0))
    });

    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut line_top = f32::NEG_INFINITY;
    for word in words {
        match lines.last_mut() {
            Some(line) if (word.top - line_top).abs() <= y_tolerance => line.push(word),
            _ => {
                line_top = word.top;
                lines.push(vec![word]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    lines
}

/// Plain reading-order text of a page: words on a line joined by single
/// spaces, lines joined by newlines.
pub fn page_text(words: &[Word], y_tolerance: f32) -> String {
    cluster_lines(words.to_vec(), y_tolerance)
        .iter()
        .map(|line| {
            line.iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Public API: per-page extraction
// ---------------------------------------------------------------------------

/// Extract the positioned words of one page together with its width.
///
/// Pages without a usable MediaBox are treated as US letter.
pub fn extract_page_words(
    backend: &dyn PdfBackend,
    page_id: PageId,
    options: &WordOptions,
) -> Result<PageWords, PdfError> {
    let (width, height) = backend.page_dimensions(page_id).unwrap_or_else(|e| {
        log::debug!("page {:?}: {}; assuming US letter", page_id, e);
        DEFAULT_PAGE_SIZE
    });
    let spans = extract_page_spans(backend, page_id)?;
    Ok(PageWords {
        width,
        words: spans_to_words(&spans, height, options),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
