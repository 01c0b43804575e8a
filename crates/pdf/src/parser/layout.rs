//! Text extraction and line grouping.
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  TextLine[]
//!   (per page)      extract         group_spans_into_lines
//! ```
//!
//! Glyph widths are not read from the font programs; span widths are
//! estimated from the font size, which is enough to decide where word gaps
//! fall.

use super::backend::{get_number_from_value, ContentOp, PageId, PdfBackend, PdfValue};
use crate::PdfError;

/// A run of text drawn at one position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

/// Spans sharing (approximately) one baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

/// Baselines closer than this (in points) belong to the same line.
const Y_TOLERANCE: f32 = 1.0;

/// Average glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Horizontal gap (in points) from which adjacent spans get a space.
const MIN_WORD_GAP: f32 = 1.5;

/// Kerning in a `TJ` array wider than this fraction of a glyph is a word gap.
const TJ_SPACE_RATIO: f32 = 0.3;

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Text state tracked while walking a content stream.
#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
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
        self.text_matrix[5] + self.text_rise
    }

    /// Rendered size: `font_size * sqrt(b^2 + d^2)` of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn glyph_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// `Td`: translate the line matrix and restart the text matrix from it.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Advance past `text` and return the displacement.
    fn advance_after_show(&mut self, text: &str) -> f32 {
        let glyph = self.glyph_width();
        let dx: f32 = text
            .chars()
            .map(|ch| {
                let space = if ch == ' ' { self.word_spacing } else { 0.0 };
                glyph + self.char_spacing + space
            })
            .sum();
        self.advance_x(dx);
        dx
    }
}

/// Everything a show operator needs besides the state.
struct ShowContext<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
}

impl ShowContext<'_> {
    fn decode(&self, val: &PdfValue, state: &TextState) -> String {
        match val {
            PdfValue::Str(bytes) => self.backend.decode_text(self.page, &state.font_key, bytes),
            _ => String::new(),
        }
    }
}

fn set_font(op: &ContentOp, state: &mut TextState) {
    if let Some(PdfValue::Name(key)) = op.operands.first() {
        state.font_key = key.clone();
        state.font_size = op.number(1).unwrap_or(0.0);
    }
}

fn set_matrix(op: &ContentOp, state: &mut TextState) {
    let vals: Vec<f32> = op.operands.iter().take(6).filter_map(get_number_from_value).collect();
    if let [a, b, c, d, e, f] = vals[..] {
        state.text_matrix = [a, b, c, d, e, f];
        state.line_matrix = state.text_matrix;
    }
}

fn show_string(operand: &PdfValue, ctx: &ShowContext, state: &mut TextState, spans: &mut Vec<TextSpan>) {
    let text = ctx.decode(operand, state);
    if text.is_empty() {
        return;
    }
    let (x, y) = (state.x(), state.y());
    let font_size = state.effective_font_size();
    let width = state.advance_after_show(&text);
    spans.push(TextSpan {
        text,
        x,
        y,
        width,
        font_size,
    });
}

/// `TJ`: strings interleaved with kerning in thousandths of a text unit.
/// Large negative kerning is how many producers encode word gaps.
fn show_array(arr: &[PdfValue], ctx: &ShowContext, state: &mut TextState, spans: &mut Vec<TextSpan>) {
    let mut buf = String::new();
    let (x, y) = (state.x(), state.y());
    let start = x;
    let font_size = state.effective_font_size();

    for elem in arr {
        if let Some(adj) = get_number_from_value(elem) {
            let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;
            if dx > state.glyph_width() * TJ_SPACE_RATIO && !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            state.advance_x(dx);
        } else {
            let fragment = ctx.decode(elem, state);
            state.advance_after_show(&fragment);
            buf.push_str(&fragment);
        }
    }

    let text = buf.trim_end();
    if text.is_empty() {
        return;
    }
    spans.push(TextSpan {
        text: text.to_string(),
        x,
        y,
        width: state.x() - start,
        font_size,
    });
}

/// Walk one page's content stream and collect its text spans.
///
/// Handles `BT ET Tf Tm Td TD T* TL Tc Tw Tz Ts Tj TJ ' "`; everything else
/// is ignored.
pub fn extract_page_spans(backend: &dyn PdfBackend, page: PageId) -> Result<Vec<TextSpan>, PdfError> {
    let ops = backend.page_ops(page)?;
    let ctx = ShowContext { backend, page };

    let mut state = TextState::default();
    let mut spans = Vec::new();

    for op in &ops {
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => set_font(op, &mut state),
            "Tm" => set_matrix(op, &mut state),
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => state.leading = op.number(0).unwrap_or(state.leading),
            "Tc" => state.char_spacing = op.number(0).unwrap_or(state.char_spacing),
            "Tw" => state.word_spacing = op.number(0).unwrap_or(state.word_spacing),
            "Tz" => state.horiz_scale = op.number(0).map_or(state.horiz_scale, |v| v / 100.0),
            "Ts" => state.text_rise = op.number(0).unwrap_or(state.text_rise),
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    show_string(operand, &ctx, &mut state, &mut spans);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    show_array(arr, &ctx, &mut state, &mut spans);
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = op.operands.first() {
                    show_string(operand, &ctx, &mut state, &mut spans);
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    state.word_spacing = op.number(0).unwrap_or(state.word_spacing);
                    state.char_spacing = op.number(1).unwrap_or(state.char_spacing);
                    state.next_line();
                    show_string(&op.operands[2], &ctx, &mut state, &mut spans);
                }
            }
            _ => {}
        }
    }

    Ok(spans)
}

/// Group spans into lines, top of the page first.
///
/// Spans whose baselines are within [`Y_TOLERANCE`] share a line. Inside a
/// line spans are ordered by X; a space separates spans that are at least
/// [`MIN_WORD_GAP`] apart.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();

    for span in spans {
        let same_line = current
            .first()
            .is_some_and(|first| (span.y - first.y).abs() <= Y_TOLERANCE);
        if !same_line && !current.is_empty() {
            lines.push(assemble_line(std::mem::take(&mut current)));
        }
        current.push(span);
    }

    if !current.is_empty() {
        lines.push(assemble_line(current));
    }

    lines
}

fn assemble_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut text = String::new();
    let mut prev_end: Option<f32> = None;
    for span in &spans {
        if let Some(end) = prev_end {
            let gap = span.x - end;
            if gap >= MIN_WORD_GAP && !text.ends_with(' ') && !span.text.starts_with(' ') {
                text.push(' ');
            }
        }
        text.push_str(&span.text);
        prev_end = Some(span.x + span.width);
    }

    let font_size = spans.iter().map(|s| s.font_size).fold(0.0, f32::max);
    TextLine {
        text,
        x: spans.first().map_or(0.0, |s| s.x),
        y: spans.first().map_or(0.0, |s| s.y),
        font_size,
    }
}

/// Spans of every page, keyed by 1-based page number.
pub fn extract_all_pages(backend: &dyn PdfBackend) -> Result<Vec<(u32, Vec<TextSpan>)>, PdfError> {
    let pages = backend.pages();
    let mut result = Vec::with_capacity(pages.len());
    for (number, id) in pages {
        result.push((number, extract_page_spans(backend, id)?));
    }
    Ok(result)
}
