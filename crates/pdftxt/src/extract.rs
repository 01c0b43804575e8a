use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use pdftxt_core::cache::{cache_key, ExtractionCache};
use pdftxt_core::input::{sniff, InputKind};
use pdftxt_core::lines::{group_lines, LineOptions, LineOrder, LINE_THRESHOLD};
use pdftxt_core::pages::{
    page_text, render_report, Extraction, ExtractionMethod, ExtractionMode, ExtractionParams,
};

use crate::ocr::{normalize_image, validate_language, OcrEngine, Pdftoppm, Rasterizer, Tesseract};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct App {
    /// Path to the PDF or image file
    path: PathBuf,

    #[clap(flatten)]
    options: ExtractOptions,

    /// Directory to write `page_<i>.txt` files into
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write `pdf_to_txt.zip` into the output directory
    #[arg(long, requires = "output")]
    zip: bool,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Options shared by every command that extracts text.
#[derive(Debug, Clone, clap::Args)]
pub struct ExtractOptions {
    /// Extraction method
    #[arg(long, value_enum, env = "PDFTXT_METHOD", default_value = "layout")]
    pub method: Method,

    /// OCR language code(s), e.g. `eng` or `eng+deu`
    #[arg(long, env = "PDFTXT_LANG", default_value = "eng")]
    pub lang: String,

    /// Rasterization resolution for OCR
    #[arg(long, env = "PDFTXT_DPI", default_value_t = 200)]
    pub dpi: u32,

    /// Keep pages separate or collapse them into one text
    #[arg(long, value_enum, default_value = "pages")]
    pub mode: Mode,

    /// Order OCR lines top to bottom instead of by first appearance
    #[arg(long)]
    pub sort_lines: bool,

    /// Vertical distance, in pixels, that starts a new OCR line
    #[arg(long, default_value_t = LINE_THRESHOLD, value_parser = parse_line_threshold)]
    pub line_threshold: f64,

    #[clap(flatten)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Method {
    Layout,
    Ocr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Pages,
    Document,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ToolPaths {
    /// Tesseract binary
    #[arg(long, env = "PDFTXT_TESSERACT", default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// Poppler's pdftoppm binary
    #[arg(long, env = "PDFTXT_PDFTOPPM", default_value = "pdftoppm")]
    pub pdftoppm: PathBuf,
}

/// A line threshold must be a finite, non-negative distance.
pub fn parse_line_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value.parse().map_err(|e| f!("{e}"))?;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(f!("expected a finite distance of at least 0, got {value}"));
    }
    Ok(threshold)
}

impl From<Method> for ExtractionMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Layout => ExtractionMethod::Layout,
            Method::Ocr => ExtractionMethod::Ocr,
        }
    }
}

impl From<Mode> for ExtractionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Pages => ExtractionMode::Pages,
            Mode::Document => ExtractionMode::Document,
        }
    }
}

impl ExtractOptions {
    pub fn params(&self) -> ExtractionParams {
        ExtractionParams {
            method: self.method.into(),
            mode: self.mode.into(),
            language: self.lang.clone(),
            dpi: self.dpi,
            lines: LineOptions {
                threshold: self.line_threshold,
                order: if self.sort_lines {
                    LineOrder::Anchor
                } else {
                    LineOrder::FirstAppearance
                },
            },
        }
    }
}

/// The external collaborators an extraction may need.
pub struct Tools {
    pub rasterizer: Box<dyn Rasterizer>,
    pub ocr: Box<dyn OcrEngine>,
    /// Draw a progress bar on stderr while recognizing pages.
    pub progress: bool,
}

impl Tools {
    pub fn system(paths: &ToolPaths) -> Self {
        Self {
            rasterizer: Box::new(Pdftoppm::new(&paths.pdftoppm)),
            ocr: Box::new(Tesseract::new(&paths.tesseract)),
            progress: false,
        }
    }
}

/// Extract the text of an uploaded file.
///
/// `file_name` is only consulted when the content type cannot be told from
/// the bytes.
pub fn extract(
    bytes: &[u8],
    file_name: &str,
    params: &ExtractionParams,
    tools: &Tools,
) -> Result<Extraction, Error> {
    let input = sniff(bytes, file_name)?;
    log::info!(
        "extracting {file_name:?} ({input}, {} bytes) with {}",
        bytes.len(),
        params.method
    );

    let extraction = match (params.method, input) {
        (ExtractionMethod::Layout, InputKind::Pdf) => {
            Extraction::new(ExtractionMethod::Layout, pdf::extract_pages(bytes)?)
        }
        (ExtractionMethod::Layout, input) => {
            return Err(Error::UnsupportedMethod {
                method: params.method,
                input,
            })
        }
        (ExtractionMethod::Ocr, input) => ocr(bytes, input, params, tools)?,
    };
    log::info!("extracted {} pages", extraction.page_count);

    Ok(match params.mode {
        ExtractionMode::Pages => extraction,
        ExtractionMode::Document => extraction.into_document(),
    })
}

fn ocr(
    bytes: &[u8],
    input: InputKind,
    params: &ExtractionParams,
    tools: &Tools,
) -> Result<Extraction, Error> {
    validate_language(&params.language)?;

    let dir = tempfile::tempdir()?;
    let images = match input {
        InputKind::Pdf => tools.rasterizer.rasterize(bytes, params.dpi, dir.path())?,
        InputKind::Image(_) => vec![normalize_image(bytes, dir.path())?],
    };

    let progress = if tools.progress {
        let bar = ProgressBar::new(images.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.cyan} OCR {pos}/{len} {wide_bar}") {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut pages = Vec::with_capacity(images.len());
    for image in &images {
        let detections = tools.ocr.recognize(image, &params.language)?;
        let lines: Vec<String> = group_lines(&detections, &params.lines)
            .into_iter()
            .map(|line| line.text)
            .collect();
        log::debug!(
            "{}: {} words in {} lines",
            image.display(),
            detections.len(),
            lines.len()
        );
        pages.push(page_text(&lines));
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(Extraction::new(ExtractionMethod::Ocr, pages))
}

/// [`extract`] through a shared cache keyed by content and parameters.
///
/// The lock is not held while extracting, so identical concurrent uploads
/// may both run; the last one to finish wins the slot.
pub fn extract_cached(
    bytes: &[u8],
    file_name: &str,
    params: &ExtractionParams,
    tools: &Tools,
    cache: &Mutex<ExtractionCache>,
) -> Result<Extraction, Error> {
    let key = cache_key(bytes, params);

    if let Some(hit) = lock(cache).get(&key) {
        log::debug!("cache hit {key}");
        return Ok(hit.clone());
    }
    log::debug!("cache miss {key}");

    let extraction = extract(bytes, file_name, params, tools)?;
    lock(cache).insert(key, extraction.clone());
    Ok(extraction)
}

/// A poisoned cache only means another request panicked mid-insert; the LRU
/// itself stays consistent.
fn lock(cache: &Mutex<ExtractionCache>) -> std::sync::MutexGuard<'_, ExtractionCache> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let bytes = std::fs::read(&app.path).with_context(|| f!("reading {}", app.path.display()))?;
    let file_name = app
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let params = app.options.params();
    let mut tools = Tools::system(&app.options.tools);
    tools.progress = global.verbose;

    if global.verbose {
        eprintln!("Extracting {} with the {} method", app.path.display(), params.method);
    }

    let extraction =
        tokio::task::spawn_blocking(move || extract(&bytes, &file_name, &params, &tools)).await??;

    if let Some(dir) = &app.output {
        let files = crate::archive::write_pages(dir, &extraction.pages)?;
        if global.verbose {
            eprintln!("Wrote {} page files to {}", files.len(), dir.display());
        }
        if app.zip {
            let path = crate::archive::write_zip(dir, &extraction.pages)?;
            if global.verbose {
                eprintln!("Wrote {}", path.display());
            }
        }
    }

    match app.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&extraction)?),
        OutputFormat::Text => anstream::print!("{}", render_report(&extraction)),
    }

    Ok(())
}
