use crate::parser::layout::TextLine;
use crate::render::cleanup::cleanup_text;

/// A vertical gap larger than this multiple of the upper line's font size
/// separates paragraphs with a blank line.
const PARAGRAPH_GAP_FACTOR: f32 = 1.5;

/// Render the lines of one page as plain text.
pub fn render_page(lines: &[TextLine]) -> String {
    let mut out = String::new();
    let mut prev: Option<&TextLine> = None;

    for line in lines {
        if let Some(above) = prev {
            out.push('\n');
            let size = if above.font_size > 0.0 { above.font_size } else { line.font_size };
            if above.y - line.y > size * PARAGRAPH_GAP_FACTOR {
                out.push('\n');
            }
        }
        out.push_str(&line.text);
        prev = Some(line);
    }

    cleanup_text(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, y: f32) -> TextLine {
        TextLine {
            text: text.to_string(),
            x: 72.0,
            y,
            font_size: 12.0,
        }
    }

    #[test]
    fn test_consecutive_lines() {
        let lines = [line("first", 700.0), line("second", 686.0)];
        assert_eq!(render_page(&lines), "first\nsecond");
    }

    #[test]
    fn test_paragraph_gap() {
        let lines = [line("first", 700.0), line("second", 686.0), line("next", 640.0)];
        assert_eq!(render_page(&lines), "first\nsecond\n\nnext");
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(render_page(&[]), "");
    }

    #[test]
    fn test_cleanup_applied() {
        assert_eq!(render_page(&[line("\u{FB01}ne  ", 10.0)]), "fine");
    }
}
