//! Upload form served over HTTP.
//!
//! `GET /` renders the form, `POST /extract` takes a multipart upload and
//! answers with the extracted text in the requested format.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use pdftxt_core::cache::ExtractionCache;
use pdftxt_core::input::sniff;
use pdftxt_core::lines::{LineOptions, LineOrder, LINE_THRESHOLD};
use pdftxt_core::pages::{render_report, Extraction, ExtractionMethod, ExtractionMode, ExtractionParams};
use tower_http::cors::{Any, CorsLayer};

use crate::archive::{zip_pages, ZIP_FILE_NAME};
use crate::extract::{extract_cached, parse_line_threshold, ToolPaths, Tools};
use crate::prelude::{eprintln, *};

#[derive(Debug, clap::Args)]
pub struct App {
    /// Host to bind to
    #[arg(long, env = "PDFTXT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PDFTXT_PORT", default_value_t = 8501)]
    port: u16,

    /// Number of extraction results kept in memory
    #[arg(long, default_value_t = 32)]
    cache_size: usize,

    /// Largest accepted upload, in megabytes
    #[arg(long, default_value_t = 50)]
    max_upload_mb: usize,

    /// Rasterization resolution for OCR
    #[arg(long, env = "PDFTXT_DPI", default_value_t = 200)]
    dpi: u32,

    /// Vertical distance, in pixels, that starts a new OCR line
    #[arg(long, default_value_t = LINE_THRESHOLD, value_parser = parse_line_threshold)]
    line_threshold: f64,

    #[clap(flatten)]
    tools: ToolPaths,
}

/// Shared by every request.
pub struct AppState {
    pub tools: Tools,
    pub cache: Mutex<ExtractionCache>,
    /// Starting point for the parameters of each upload.
    pub defaults: ExtractionParams,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let addr = f!("{}:{}", app.host, app.port);

    let state = Arc::new(AppState {
        tools: Tools::system(&app.tools),
        cache: Mutex::new(ExtractionCache::new(app.cache_size)),
        defaults: ExtractionParams {
            dpi: app.dpi,
            lines: LineOptions {
                threshold: app.line_threshold,
                ..LineOptions::default()
            },
            ..ExtractionParams::default()
        },
    });

    let app_router = router(state, upload_limit(app.max_upload_mb));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("listening on http://{addr}");
    if global.verbose {
        eprintln!("Upload form: http://{}/", addr);
        eprintln!("Extract endpoint: http://{}/extract", addr);
    }

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

/// `--max-upload-mb` in bytes, clamped instead of overflowing.
fn upload_limit(megabytes: usize) -> usize {
    megabytes.saturating_mul(1024 * 1024)
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/extract", post(extract_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Keeps the status axum picked for the failure, e.g. 413 once the upload
    /// goes past the body limit.
    fn multipart(context: &str, err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: f!("{context}: {}", err.body_text()),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            log::error!("extraction failed: {err}");
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

// ---------------------------------------------------------------------------
// Upload form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    Html,
    Text,
    Json,
    Zip,
}

impl ResponseFormat {
    fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "zip" => Ok(Self::Zip),
            other => Err(ApiError::bad_request(f!("Unknown format: {other}"))),
        }
    }
}

/// A parsed `POST /extract` request.
#[derive(Debug)]
struct Upload {
    bytes: Vec<u8>,
    file_name: String,
    params: ExtractionParams,
    format: ResponseFormat,
}

fn parse_method(value: &str) -> Result<ExtractionMethod, ApiError> {
    match value {
        "layout" => Ok(ExtractionMethod::Layout),
        "ocr" => Ok(ExtractionMethod::Ocr),
        other => Err(ApiError::bad_request(f!("Unknown method: {other}"))),
    }
}

fn parse_mode(value: &str) -> Result<ExtractionMode, ApiError> {
    match value {
        "pages" => Ok(ExtractionMode::Pages),
        "document" => Ok(ExtractionMode::Document),
        other => Err(ApiError::bad_request(f!("Unknown mode: {other}"))),
    }
}

async fn read_upload(mut multipart: Multipart, defaults: &ExtractionParams) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut params = defaults.clone();
    let mut format = ResponseFormat::Html;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::multipart("Failed to read upload", e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::multipart("Failed to read file data", e))?;
            log::debug!("received {file_name:?} ({} bytes)", data.len());
            file = Some((file_name, data.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::multipart(&f!("Failed to read field {name}"), e))?;
        let value = value.trim();
        match name.as_str() {
            "method" => params.method = parse_method(value)?,
            "mode" => params.mode = parse_mode(value)?,
            "lang" if !value.is_empty() => params.language = value.to_string(),
            "sort_lines" => {
                params.lines.order = if matches!(value, "" | "off" | "false") {
                    LineOrder::FirstAppearance
                } else {
                    LineOrder::Anchor
                }
            }
            "format" => format = ResponseFormat::parse(value)?,
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    Ok(Upload {
        bytes,
        file_name,
        params,
        format,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn extract_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = read_upload(multipart, &state.defaults).await?;
    let format = upload.format;
    log::info!(
        "POST /extract {:?} method={} format={format:?}",
        upload.file_name,
        upload.params.method
    );

    let (upload, extraction) = tokio::task::spawn_blocking(move || {
        let extraction = extract_cached(
            &upload.bytes,
            &upload.file_name,
            &upload.params,
            &state.tools,
            &state.cache,
        );
        (upload, extraction)
    })
    .await
    .map_err(|e| ApiError::internal(f!("Task join error: {e}")))?;
    let extraction = extraction?;

    match format {
        ResponseFormat::Text => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            render_report(&extraction),
        )
            .into_response()),
        ResponseFormat::Json => Ok(Json(extraction).into_response()),
        ResponseFormat::Zip => {
            let archive = zip_pages(&extraction.pages).map_err(|e| ApiError::internal(e.to_string()))?;
            Ok((
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        f!("attachment; filename=\"{ZIP_FILE_NAME}\""),
                    ),
                ],
                archive,
            )
                .into_response())
        }
        ResponseFormat::Html => {
            let archive = zip_pages(&extraction.pages).map_err(|e| ApiError::internal(e.to_string()))?;
            let is_pdf = sniff(&upload.bytes, &upload.file_name).is_ok_and(|kind| kind.is_pdf());
            let preview = is_pdf.then_some(upload.bytes.as_slice());
            Ok(Html(render_result_page(&extraction, preview, &archive)).into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>PDF to Text Converter</title>
</head>
<body>
<h1>PDF to Text Converter</h1>
<form action="/extract" method="post" enctype="multipart/form-data">
  <p><label>Choose a PDF file or scanned image <input type="file" name="file" accept=".pdf,image/*" required></label></p>
  <fieldset>
    <legend>Extraction method</legend>
    <label><input type="radio" name="method" value="layout" checked> PDF text</label>
    <label><input type="radio" name="method" value="ocr"> OCR</label>
  </fieldset>
  <p><label>OCR language code <input type="text" name="lang" value="eng"></label></p>
  <p><label><input type="checkbox" name="sort_lines"> Order OCR lines top to bottom</label></p>
  <p>
    <label>Output
      <select name="format">
        <option value="html" selected>Page</option>
        <option value="text">Plain text</option>
        <option value="json">JSON</option>
        <option value="zip">ZIP of page files</option>
      </select>
    </label>
  </p>
  <p><button type="submit">Extract text</button></p>
</form>
</body>
</html>
"#;

fn render_result_page(extraction: &Extraction, pdf: Option<&[u8]>, archive: &[u8]) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut html = String::from(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>PDF to Text Converter</title>\n</head>\n<body>\n<h1>PDF to Text Converter</h1>\n",
    );

    if let Some(pdf) = pdf {
        html.push_str(&f!(
            "<iframe src=\"data:application/pdf;base64,{}\" width=\"700\" height=\"1000\" type=\"application/pdf\"></iframe>\n",
            engine.encode(pdf)
        ));
    }

    html.push_str(&f!("<p>The pdf file has {} pages</p>\n", extraction.page_count));
    for (index, text) in extraction.pages.iter().enumerate() {
        html.push_str(&f!(
            "<h2>Page {}:</h2>\n<pre>{}</pre>\n",
            index + 1,
            html_escape::encode_text(text)
        ));
    }

    html.push_str(&f!(
        "<p><a download=\"{ZIP_FILE_NAME}\" href=\"data:application/zip;base64,{}\">Download ZIP</a></p>\n",
        engine.encode(archive)
    ));
    html.push_str("<p><a href=\"/\">Convert another file</a></p>\n</body>\n</html>\n");
    html
}
