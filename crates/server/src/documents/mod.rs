//! Proposal rendering: layout from core, HTML through Tera, PDF through wkhtmltopdf.

pub mod images;
pub mod render;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub use images::{embed_document_images, HttpImageFetcher, ImageFetcher};
pub use render::{Branding, DocumentRenderer};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("image fetch failed: {0}")]
    ImageFetch(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Html(String),
}

impl RenderedDocument {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "application/pdf",
            Self::Html(_) => "text/html; charset=utf-8",
        }
    }

    pub fn into_response(self, quote_number: &str) -> Response {
        let content_type = self.content_type();
        match self {
            Self::Pdf(bytes) => (
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"proposal-{quote_number}.pdf\""),
                    ),
                ],
                bytes,
            )
                .into_response(),
            Self::Html(html) => ([(header::CONTENT_TYPE, content_type.to_string())], html).into_response(),
        }
    }
}
