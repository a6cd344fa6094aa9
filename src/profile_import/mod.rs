// src/profile_import/mod.rs
//! Profile ingestion from uploaded files.

pub mod heuristics;
pub mod json_import;
pub mod llm_structuring;
pub mod pdf_text;

use std::sync::Arc;
use tracing::Instrument;

use crate::core::service_client::LanguageModel;
use crate::error::{CvResult, CvToolError};
use crate::types::Profile;
use crate::utils::get_file_extension;
use crate::{app_log, app_span};

pub use json_import::parse_profile_json;
pub use pdf_text::{LibraryExtractor, PdfTextExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Json,
    Pdf,
}

/// Decide how to read an upload from its declared type, file name and bytes.
pub fn detect_kind(
    mime_type: Option<&str>,
    filename: Option<&str>,
    bytes: &[u8],
) -> CvResult<UploadKind> {
    let mime = mime_type.unwrap_or("").to_lowercase();
    let ext = filename.and_then(get_file_extension).unwrap_or_default();

    if mime.contains("pdf") || ext == "pdf" || bytes.starts_with(b"%PDF") {
        return Ok(UploadKind::Pdf);
    }
    if mime.contains("json") || ext == "json" {
        return Ok(UploadKind::Json);
    }
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first == Some(&b'{') {
        return Ok(UploadKind::Json);
    }

    Err(CvToolError::InvalidFormat(format!(
        "Unsupported file type{}. Upload a PDF or a JSON profile export.",
        if ext.is_empty() {
            String::new()
        } else {
            format!(" .{}", ext)
        }
    )))
}

pub struct ProfileImporter {
    llm: Option<Arc<dyn LanguageModel>>,
    extractor: Arc<dyn PdfTextExtractor>,
}

impl ProfileImporter {
    pub fn new(llm: Option<Arc<dyn LanguageModel>>, extractor: Arc<dyn PdfTextExtractor>) -> Self {
        Self { llm, extractor }
    }

    /// Parse an uploaded file into a profile.
    pub async fn parse(
        &self,
        bytes: Vec<u8>,
        mime_type: Option<&str>,
        filename: Option<&str>,
    ) -> CvResult<Profile> {
        if bytes.is_empty() {
            return Err(CvToolError::InvalidFormat("The uploaded file is empty".to_string()));
        }

        let kind = detect_kind(mime_type, filename, &bytes)?;
        let span = app_span!("profile_import", kind = ?kind, size = bytes.len());

        async move {
            match kind {
                UploadKind::Json => parse_profile_json(&bytes),
                UploadKind::Pdf => self.parse_pdf(bytes).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn parse_pdf(&self, bytes: Vec<u8>) -> CvResult<Profile> {
        let text = pdf_text::extract_pdf_text(self.extractor.clone(), bytes).await?;
        app_log!(info, "Extracted {} characters from PDF", text.chars().count());

        if let Some(llm) = &self.llm {
            match llm_structuring::structure_with_model(llm.as_ref(), &text).await {
                Ok(profile) => return Ok(profile),
                Err(e) => app_log!(warn, "AI structuring failed, using heuristics: {}", e),
            }
        } else {
            app_log!(info, "AI service not configured, using heuristics only");
        }

        Ok(heuristics::structure_text(&text))
    }
}
