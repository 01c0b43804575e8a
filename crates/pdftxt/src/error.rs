use pdftxt_core::input::{InputError, InputKind};
use pdftxt_core::pages::ExtractionMethod;
use pdftxt_core::tsv::TsvError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{tool} was not found; install it or point --{tool} at the binary")]
    ToolMissing { tool: &'static str },

    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: &'static str, stderr: String },

    #[error("The {method} method cannot read a {input}")]
    UnsupportedMethod {
        method: ExtractionMethod,
        input: InputKind,
    },

    #[error("Invalid OCR language: {0:?}")]
    InvalidLanguage(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Cannot decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Pdf(#[from] pdf::PdfError),

    #[error("Unreadable OCR output: {0}")]
    Tsv(#[from] TsvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is caused by the uploaded file or the request,
    /// rather than by the host's tools.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::UnsupportedMethod { .. }
            | Error::InvalidLanguage(_)
            | Error::Input(_)
            | Error::Image(_) => true,
            Error::Pdf(err) => !matches!(err, pdf::PdfError::Io(_)),
            Error::ToolMissing { .. } | Error::ToolFailed { .. } | Error::Tsv(_) | Error::Io(_) => {
                false
            }
        }
    }
}
