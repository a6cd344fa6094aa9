//! Request-scoped error taxonomy.
//!
//! Every failure a handler can hit is one of these variants. They carry a
//! human-readable message; the HTTP status, error code and suggestions are
//! derived from the variant when the error reaches the request boundary.

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

use crate::app_log;
use crate::web::types::StandardErrorResponse;

pub type CvResult<T> = std::result::Result<T, CvToolError>;

#[derive(Debug, Error)]
pub enum CvToolError {
    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    UnparsablePdf(String),

    #[error("Could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("{0}")]
    Generation(String),

    #[error("{0}")]
    Render(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CvToolError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::MissingInput(_) | Self::InvalidFormat(_) | Self::Validation(_) => {
                Status::BadRequest
            }
            Self::UnparsablePdf(_) => Status::UnprocessableEntity,
            Self::Fetch { .. } => Status::BadGateway,
            Self::Generation(_) => Status::BadGateway,
            Self::Render(_) => Status::InternalServerError,
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Conflict(_) => Status::Conflict,
            Self::ServiceUnavailable(_) => Status::ServiceUnavailable,
            Self::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "MISSING_INPUT",
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::UnparsablePdf(_) => "UNPARSABLE_PDF",
            Self::Fetch { .. } => "FETCH_ERROR",
            Self::Generation(_) => "GENERATION_ERROR",
            Self::Render(_) => "RENDER_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            Self::MissingInput(_) => &[
                "Fill in at least your name, a summary, one experience or your skills",
                "Paste the job description text if the link could not be read",
            ],
            Self::InvalidFormat(_) => &[
                "Upload a PDF or a JSON profile export",
                "Check that the JSON follows the profile or JSON Resume layout",
            ],
            Self::UnparsablePdf(_) => &[
                "Try a text-based PDF (for example the LinkedIn 'Save to PDF' export)",
                "Scanned documents need to be run through OCR first",
            ],
            Self::Fetch { .. } => &[
                "Check that the link is public and reachable",
                "Paste the page text instead of the link",
            ],
            Self::Generation(_) => &["Try again in a few moments"],
            Self::Render(_) => &[
                "Try again or pick another template",
                "Contact support if the problem persists",
            ],
            Self::NotFound(_) => &["Check the identifier or generate a new CV"],
            Self::Unauthorized(_) => &["Log in and try again"],
            Self::Validation(_) => &["Check the request fields and try again"],
            Self::Conflict(_) => &["Log in with the existing account instead"],
            Self::ServiceUnavailable(_) => &["The server administrator must configure the AI service"],
            Self::Internal(_) => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        hints.iter().map(|s| s.to_string()).collect()
    }

    /// Message shown to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_response(&self) -> StandardErrorResponse {
        StandardErrorResponse::new(self.public_message(), self.code().to_string(), self.suggestions())
    }
}

impl From<sqlx::Error> for CvToolError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("Database operation failed"))
    }
}

impl<'r> Responder<'r, 'static> for CvToolError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        match &self {
            Self::Render(_) | Self::Internal(_) => {
                app_log!(error, "{} {} failed: {:#}", request.method(), request.uri(), self)
            }
            _ => app_log!(
                warn,
                "{} {} rejected with {}: {}",
                request.method(),
                request.uri(),
                self.code(),
                self
            ),
        }

        let status = self.status();
        let mut response = Json(self.to_response()).respond_to(request)?;
        response.set_status(status);
        Ok(response)
    }
}
