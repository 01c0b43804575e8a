//! Parsing of the OCR engine's tab-separated output.
//!
//! Tesseract's `tsv` config emits one row per layout element (page, block,
//! paragraph, line, word) with an axis-aligned `left, top, width, height` box
//! in page-image pixels. Only word rows carry recognized text; those become
//! [`Detection`]s in the order the engine wrote them.

use thiserror::Error;

use crate::lines::{BoundingBox, Detection};

/// Layout level of a word row.
const WORD_LEVEL: u32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum TsvError {
    #[error("TSV output is empty")]
    Empty,
    #[error("TSV header is missing column `{0}`")]
    MissingColumn(&'static str),
    #[error("TSV line {line}: invalid value `{value}` in column `{column}`")]
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },
}

/// Column positions resolved from the header row.
struct Columns {
    level: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    conf: usize,
    text: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, TsvError> {
        let names: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| *n == name)
                .ok_or(TsvError::MissingColumn(name))
        };

        Ok(Columns {
            level: find("level")?,
            left: find("left")?,
            top: find("top")?,
            width: find("width")?,
            height: find("height")?,
            conf: find("conf")?,
            text: find("text")?,
        })
    }
}

fn number(
    fields: &[&str],
    index: usize,
    line: usize,
    column: &'static str,
) -> Result<f64, TsvError> {
    let raw = fields.get(index).copied().unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| TsvError::InvalidValue {
        line,
        column,
        value: raw.to_string(),
    })
}

/// Parse TSV output into word detections.
///
/// Rows that are not words, carry blank text, or have a negative confidence
/// (Tesseract's marker for "no recognition") are skipped. Confidence is
/// reported on a 0-100 scale and passed through unchanged.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Detection>, TsvError> {
    let mut rows = tsv.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = rows.next().ok_or(TsvError::Empty)?;
    let columns = Columns::from_header(header)?;

    let mut detections = Vec::new();
    for (index, row) in rows {
        let line = index + 1;
        let fields: Vec<&str> = row.split('\t').collect();

        let level = number(&fields, columns.level, line, "level")?;
        if level as u32 != WORD_LEVEL {
            continue;
        }

        let text = fields.get(columns.text).copied().unwrap_or("");
        if text.trim().is_empty() {
            continue;
        }

        let conf = number(&fields, columns.conf, line, "conf")?;
        if conf < 0.0 {
            continue;
        }

        let bbox = BoundingBox::from_rect(
            number(&fields, columns.left, line, "left")?,
            number(&fields, columns.top, line, "top")?,
            number(&fields, columns.width, line, "width")?,
            number(&fields, columns.height, line, "height")?,
        );

        detections.push(Detection::new(bbox, text, conf));
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::reconstruct_lines;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn fixture(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out
    }

    #[test]
    fn test_parse_words() {
        let tsv = fixture(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t1700\t2200\t-1\t",
            "4\t1\t1\t1\t1\t0\t100\t94\t300\t14\t-1\t",
            "5\t1\t1\t1\t1\t1\t100\t94\t120\t12\t96.5\tHello",
            "5\t1\t1\t1\t1\t2\t230\t96\t130\t12\t91.0\tWorld",
        ]);

        let detections = parse_tsv(&tsv).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "Hello");
        assert_eq!(detections[0].confidence, 96.5);
        assert_eq!(detections[0].bounding_box.left_mid_y(), 100.0);
        assert_eq!(detections[1].bounding_box.top_right().x, 360.0);
    }

    #[test]
    fn test_skips_blank_and_unrecognized_words() {
        let tsv = fixture(&[
            "5\t1\t1\t1\t1\t1\t10\t10\t5\t5\t-1\tghost",
            "5\t1\t1\t1\t1\t2\t20\t10\t5\t5\t88\t   ",
            "5\t1\t1\t1\t1\t3\t30\t10\t5\t5\t88",
            "5\t1\t1\t1\t1\t4\t40\t10\t5\t5\t88\tkept",
        ]);
        let detections = parse_tsv(&tsv).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].text, "kept");
    }

    #[test]
    fn test_columns_resolved_by_name() {
        let tsv = "text\tconf\theight\twidth\ttop\tleft\tlevel\nword\t70\t10\t20\t5\t1\t5\n";
        let detections = parse_tsv(tsv).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bounding_box.top_left().x, 1.0);
        assert_eq!(detections[0].bounding_box.bottom_left().y, 15.0);
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_tsv(""), Err(TsvError::Empty));
        assert_eq!(parse_tsv("\n\n"), Err(TsvError::Empty));
    }

    #[test]
    fn test_header_only() {
        assert!(parse_tsv(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column() {
        let err = parse_tsv("level\tleft\ttop\twidth\theight\ttext\n").unwrap_err();
        assert_eq!(err, TsvError::MissingColumn("conf"));
    }

    #[test]
    fn test_invalid_number() {
        let tsv = fixture(&["5\t1\t1\t1\t1\t1\tabc\t10\t5\t5\t90\tword"]);
        match parse_tsv(&tsv).unwrap_err() {
            TsvError::InvalidValue {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, "left");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_feeds_line_reconstruction() {
        let tsv = fixture(&[
            "5\t1\t1\t1\t1\t1\t100\t94\t120\t12\t96\tHello",
            "5\t1\t1\t1\t1\t2\t230\t96\t130\t12\t91\tWorld",
            "5\t1\t1\t1\t2\t1\t100\t124\t140\t12\t93\tSecond",
            "5\t1\t1\t1\t2\t2\t250\t125\t90\t12\t90\tLine",
        ]);
        let detections = parse_tsv(&tsv).unwrap();
        assert_eq!(
            reconstruct_lines(&detections),
            vec!["Hello World", "Second Line"]
        );
    }
}
