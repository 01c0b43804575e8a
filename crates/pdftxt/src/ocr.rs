//! External OCR tooling: poppler's `pdftoppm` to rasterize PDF pages and
//! `tesseract` to recognize words on each page image.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use pdftxt_core::lines::Detection;
use pdftxt_core::tsv::parse_tsv;
use regex::Regex;

use crate::prelude::Error;

/// Renders PDF pages to image files.
pub trait Rasterizer: Send + Sync {
    /// Rasterize every page of `pdf` into `dir`, returning the images in
    /// page order.
    fn rasterize(&self, pdf: &[u8], dpi: u32, dir: &Path) -> Result<Vec<PathBuf>, Error>;
}

/// Recognizes words in a page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path, language: &str) -> Result<Vec<Detection>, Error>;
}

/// Resolve a configured program name or path to an executable.
fn locate(program: &Path, tool: &'static str) -> Result<PathBuf, Error> {
    which::which(program).map_err(|_| Error::ToolMissing { tool })
}

fn run(mut command: Command, tool: &'static str) -> Result<Output, Error> {
    log::debug!("running {command:?}");
    let output = command.output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ToolFailed {
            tool,
            stderr: stderr.trim().lines().last().unwrap_or("exited unsuccessfully").to_string(),
        });
    }
    Ok(output)
}

/// `pdftoppm -r <dpi> -png`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    program: PathBuf,
}

impl Pdftoppm {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl Rasterizer for Pdftoppm {
    fn rasterize(&self, pdf: &[u8], dpi: u32, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let program = locate(&self.program, "pdftoppm")?;

        let input = dir.join("input.pdf");
        std::fs::write(&input, pdf)?;

        let mut command = Command::new(program);
        command
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(&input)
            .arg(dir.join("page"));
        run(command, "pdftoppm")?;

        let images = page_images(dir)?;
        log::debug!("pdftoppm produced {} page images", images.len());
        Ok(images)
    }
}

/// Page number of a `pdftoppm` output file: `page-7.png`, `page-007.png`.
fn page_number(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// `pdftoppm` zero-pads page numbers to the width of the page count, so
/// files are ordered by their parsed number rather than by name.
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut numbered = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(number) = page_number(&path) {
            numbered.push((number, path));
        }
    }
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

/// `tesseract <image> stdout -l <language> tsv`.
#[derive(Debug, Clone)]
pub struct Tesseract {
    program: PathBuf,
}

impl Tesseract {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Tesseract {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for Tesseract {
    fn recognize(&self, image: &Path, language: &str) -> Result<Vec<Detection>, Error> {
        validate_language(language)?;
        let program = locate(&self.program, "tesseract")?;

        let mut command = Command::new(program);
        command.arg(image).arg("stdout").arg("-l").arg(language).arg("tsv");
        let output = run(command, "tesseract")?;

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv(&tsv)?)
    }
}

/// Tesseract language codes joined by `+`, e.g. `eng`, `chi_sim+eng`.
pub fn validate_language(language: &str) -> Result<(), Error> {
    static RE_LANGUAGE: OnceLock<Regex> = OnceLock::new();
    let re = RE_LANGUAGE.get_or_init(|| Regex::new(r"^[A-Za-z_]+(\+[A-Za-z_]+)*$").unwrap());
    if re.is_match(language) {
        Ok(())
    } else {
        Err(Error::InvalidLanguage(language.to_string()))
    }
}

/// Decode an uploaded image and write it to `dir` as a PNG the OCR engine
/// can read regardless of the original format.
pub fn normalize_image(bytes: &[u8], dir: &Path) -> Result<PathBuf, Error> {
    let image = image::load_from_memory(bytes)?;
    let path = dir.join("page-1.png");
    image.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}
