use std::path::{Path, PathBuf};

use pdf::DocumentMetadata;
use pdftxt_core::input::sniff;

use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct App {
    /// Path to the PDF file
    path: PathBuf,

    /// Print the metadata as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let bytes = std::fs::read(&app.path).with_context(|| f!("reading {}", app.path.display()))?;

    let meta = read_metadata(&bytes, &app.path)?;
    log::debug!("read metadata of {} ({} bytes)", app.path.display(), bytes.len());
    if global.verbose {
        eprintln!("{} is a {}-page PDF", app.path.display(), meta.page_count);
    }

    if app.json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        metadata_table(&app.path, &meta).printstd();
    }

    Ok(())
}

/// Metadata of `bytes`, which must be a PDF.
fn read_metadata(bytes: &[u8], path: &Path) -> Result<DocumentMetadata> {
    let input = sniff(bytes, &path.to_string_lossy()).map_err(Error::from)?;
    if !input.is_pdf() {
        return Err(eyre!("{} is a {input}, not a PDF", path.display()));
    }

    Ok(pdf::info(bytes).map_err(Error::from)?)
}

/// Rows for the file, the page count and whichever Info entries are set.
fn metadata_table(path: &Path, meta: &DocumentMetadata) -> prettytable::Table {
    let mut table = new_table();
    table.add_row(prettytable::row!["File", path.display()]);
    table.add_row(prettytable::row!["Pages", meta.page_count]);
    for (label, value) in [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Creator", &meta.creator),
        ("Producer", &meta.producer),
    ] {
        if let Some(value) = value {
            table.add_row(prettytable::row![label, value]);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{one_page_pdf, titled_pdf};

    fn cells(table: &prettytable::Table) -> Vec<Vec<String>> {
        table
            .row_iter()
            .map(|row| row.iter().map(|cell| cell.get_content()).collect())
            .collect()
    }

    #[test]
    fn test_read_metadata() {
        let meta = read_metadata(&titled_pdf("x", "Minutes"), Path::new("minutes.pdf")).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Minutes"));
        assert_eq!(meta.producer.as_deref(), Some("pdftxt tests"));
        assert_eq!(meta.page_count, 1);
    }

    #[test]
    fn test_rejects_images() {
        let mut png = Vec::new();
        image::GrayImage::new(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let err = read_metadata(&png, Path::new("scan.png")).unwrap_err();
        assert!(err.to_string().contains("not a PDF"), "{err}");
    }

    #[test]
    fn test_rejects_unknown_bytes() {
        assert!(read_metadata(b"plain text", Path::new("notes")).is_err());
    }

    #[test]
    fn test_table_skips_missing_entries() {
        let meta = read_metadata(&one_page_pdf("x"), Path::new("a.pdf")).unwrap();
        assert_eq!(
            cells(&metadata_table(Path::new("a.pdf"), &meta)),
            vec![vec!["File", "a.pdf"], vec!["Pages", "1"]]
        );
    }

    #[test]
    fn test_table_lists_info_entries() {
        let meta = read_metadata(&titled_pdf("x", "Minutes"), Path::new("m.pdf")).unwrap();
        assert_eq!(
            cells(&metadata_table(Path::new("m.pdf"), &meta)),
            vec![
                vec!["File", "m.pdf"],
                vec!["Pages", "1"],
                vec!["Title", "Minutes"],
                vec!["Producer", "pdftxt tests"],
            ]
        );
    }

    #[test]
    fn test_json_output() {
        let meta = read_metadata(&titled_pdf("x", "Minutes"), Path::new("m.pdf")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string_pretty(&meta).unwrap()).unwrap();
        assert_eq!(json["title"], "Minutes");
        assert_eq!(json["author"], serde_json::Value::Null);
        assert_eq!(json["page_count"], 1);
    }
}
