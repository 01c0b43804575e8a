use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use pdftxt_core::pages::page_file_name;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::prelude::*;

pub const ZIP_FILE_NAME: &str = "pdf_to_txt.zip";

/// Whether `name` is a file this module writes.
fn is_output_file(name: &str) -> bool {
    name == ZIP_FILE_NAME
        || name
            .strip_prefix("page_")
            .and_then(|rest| rest.strip_suffix(".txt"))
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Write one `page_<i>.txt` per page into `dir`.
///
/// The directory is created when missing. Page files and archives left by a
/// previous run are removed first; anything else in `dir` is left alone.
pub fn write_pages<S: AsRef<str>>(dir: &Path, pages: &[S]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| f!("creating {}", dir.display()))?;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && entry.file_name().to_str().is_some_and(is_output_file) {
            std::fs::remove_file(entry.path())?;
        }
    }

    let mut files = Vec::with_capacity(pages.len());
    for (index, text) in pages.iter().enumerate() {
        let path = dir.join(page_file_name(index));
        std::fs::write(&path, text.as_ref()).with_context(|| f!("writing {}", path.display()))?;
        files.push(path);
    }

    log::debug!("wrote {} page files to {}", files.len(), dir.display());
    Ok(files)
}

/// Deflate-compressed archive holding one `page_<i>.txt` entry per page.
pub fn zip_pages<S: AsRef<str>>(pages: &[S]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (index, text) in pages.iter().enumerate() {
        zip.start_file(page_file_name(index), options)?;
        zip.write_all(text.as_ref().as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Write the page files and their archive to `dir`, returning the archive
/// path.
pub fn write_zip<S: AsRef<str>>(dir: &Path, pages: &[S]) -> Result<PathBuf> {
    write_pages(dir, pages)?;
    let path = dir.join(ZIP_FILE_NAME);
    std::fs::write(&path, zip_pages(pages)?).with_context(|| f!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn read_entries(bytes: Vec<u8>) -> Vec<(String, String)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut text = String::new();
                file.read_to_string(&mut text).unwrap();
                (file.name().to_string(), text)
            })
            .collect()
    }

    #[test]
    fn test_write_pages() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("file_pages");

        let files = write_pages(&out, &["first", "zweite Seite \u{00FC}"]).unwrap();

        assert_eq!(files, vec![out.join("page_0.txt"), out.join("page_1.txt")]);
        assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), "zweite Seite \u{00FC}");
    }

    #[test]
    fn test_write_pages_removes_stale_output_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page_0.txt", "page_7.txt", ZIP_FILE_NAME, "notes.txt", "page_x.txt"] {
            std::fs::write(dir.path().join(name), "old").unwrap();
        }

        write_pages(dir.path(), &["new"]).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["notes.txt", "page_0.txt", "page_x.txt"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("page_0.txt")).unwrap(), "new");
    }

    #[test]
    fn test_zip_pages() {
        let bytes = zip_pages(&["one", "two"]).unwrap();
        assert_eq!(
            read_entries(bytes),
            vec![
                ("page_0.txt".to_string(), "one".to_string()),
                ("page_1.txt".to_string(), "two".to_string()),
            ]
        );
    }

    #[test]
    fn test_zip_no_pages() {
        let pages: [&str; 0] = [];
        assert!(read_entries(zip_pages(&pages).unwrap()).is_empty());
    }

    #[test]
    fn test_write_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), &["only page"]).unwrap();

        assert_eq!(path, dir.path().join(ZIP_FILE_NAME));
        assert!(dir.path().join("page_0.txt").exists());
        let entries = read_entries(std::fs::read(&path).unwrap());
        assert_eq!(entries, vec![("page_0.txt".to_string(), "only page".to_string())]);
    }

    #[test]
    fn test_is_output_file() {
        assert!(is_output_file("page_0.txt"));
        assert!(is_output_file("page_12.txt"));
        assert!(is_output_file(ZIP_FILE_NAME));
        assert!(!is_output_file("page_.txt"));
        assert!(!is_output_file("page_1.md"));
        assert!(!is_output_file("readme.txt"));
    }
}
