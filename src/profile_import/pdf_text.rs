// src/profile_import/pdf_text.rs
//! Text extraction from uploaded PDFs, with a second extraction pass for
//! documents the default pass reads as (nearly) empty.

use std::sync::Arc;

use crate::app_log;
use crate::error::{CvResult, CvToolError};

/// Below this the default pass is considered a miss and the layout pass runs.
pub const MIN_TEXT_LENGTH: usize = 30;
/// Below this nothing usable was extracted.
pub const EMPTY_TEXT_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Font-aware extraction through `pdf-extract`.
    Default,
    /// Page-by-page content-stream walk through `lopdf`.
    Layout,
}

pub trait PdfTextExtractor: Send + Sync {
    fn extract(&self, pdf_bytes: &[u8], mode: ExtractionMode) -> anyhow::Result<String>;
}

pub struct LibraryExtractor;

impl PdfTextExtractor for LibraryExtractor {
    fn extract(&self, pdf_bytes: &[u8], mode: ExtractionMode) -> anyhow::Result<String> {
        match mode {
            ExtractionMode::Default => pdf_extract::extract_text_from_mem(pdf_bytes)
                .map_err(|e| anyhow::anyhow!("pdf-extract failed: {}", e)),
            ExtractionMode::Layout => {
                let document = lopdf::Document::load_mem(pdf_bytes)
                    .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;
                let mut pages = Vec::new();
                for page_number in document.get_pages().keys() {
                    match document.extract_text(&[*page_number]) {
                        Ok(text) => pages.push(text),
                        Err(e) => app_log!(debug, "Layout extraction failed on page {}: {}", page_number, e),
                    }
                }
                Ok(pages.join("\n"))
            }
        }
    }
}

/// Run one extraction pass off the async runtime. A failing or panicking
/// extractor yields empty text.
async fn run_pass(
    extractor: Arc<dyn PdfTextExtractor>,
    bytes: Arc<Vec<u8>>,
    mode: ExtractionMode,
) -> String {
    let outcome = tokio::task::spawn_blocking(move || extractor.extract(&bytes, mode)).await;
    match outcome {
        Ok(Ok(text)) => text.trim().to_string(),
        Ok(Err(e)) => {
            app_log!(info, "PDF {:?} extraction failed: {}", mode, e);
            String::new()
        }
        Err(e) => {
            app_log!(warn, "PDF {:?} extraction aborted: {}", mode, e);
            String::new()
        }
    }
}

/// Extract text, trying the layout pass when the default pass is too short.
/// Fails with `UnparsablePdf` when neither pass yields usable text.
pub async fn extract_pdf_text(
    extractor: Arc<dyn PdfTextExtractor>,
    pdf_bytes: Vec<u8>,
) -> CvResult<String> {
    let bytes = Arc::new(pdf_bytes);

    let mut text = run_pass(extractor.clone(), bytes.clone(), ExtractionMode::Default).await;
    if text.chars().count() < MIN_TEXT_LENGTH {
        let layout = run_pass(extractor, bytes, ExtractionMode::Layout).await;
        app_log!(
            debug,
            "Default extraction gave {} chars, layout gave {}",
            text.chars().count(),
            layout.chars().count()
        );
        if layout.chars().count() > text.chars().count() {
            text = layout;
        }
    }

    if text.chars().count() < EMPTY_TEXT_LENGTH {
        return Err(CvToolError::UnparsablePdf(
            "PDF appears empty or could not extract text. Try a text-based PDF (e.g. exported from LinkedIn or Word)."
                .to_string(),
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedExtractor {
        default: String,
        layout: String,
        calls: Mutex<Vec<ExtractionMode>>,
    }

    impl FixedExtractor {
        fn new(default: &str, layout: &str) -> Arc<Self> {
            Arc::new(Self {
                default: default.to_string(),
                layout: layout.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl PdfTextExtractor for FixedExtractor {
        fn extract(&self, _bytes: &[u8], mode: ExtractionMode) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push(mode);
            match mode {
                ExtractionMode::Default => Ok(self.default.clone()),
                ExtractionMode::Layout => Ok(self.layout.clone()),
            }
        }
    }

    struct PanickingExtractor;

    impl PdfTextExtractor for PanickingExtractor {
        fn extract(&self, _bytes: &[u8], _mode: ExtractionMode) -> anyhow::Result<String> {
            panic!("malformed font table");
        }
    }

    const LONG_TEXT: &str = "Jane Doe\nExperience\nEngineer - Acme - 2020 - Present";

    #[tokio::test]
    async fn test_default_pass_is_enough() {
        let extractor = FixedExtractor::new(LONG_TEXT, "unused");
        let text = extract_pdf_text(extractor.clone(), vec![1]).await.unwrap();
        assert_eq!(text, LONG_TEXT);
        assert_eq!(*extractor.calls.lock().unwrap(), vec![ExtractionMode::Default]);
    }

    #[tokio::test]
    async fn test_layout_pass_rescues_short_text() {
        let extractor = FixedExtractor::new("  ", LONG_TEXT);
        let text = extract_pdf_text(extractor.clone(), vec![1]).await.unwrap();
        assert_eq!(text, LONG_TEXT);
        assert_eq!(
            *extractor.calls.lock().unwrap(),
            vec![ExtractionMode::Default, ExtractionMode::Layout]
        );
    }

    #[tokio::test]
    async fn test_empty_under_both_modes_is_unparsable() {
        let extractor = FixedExtractor::new("", "   \n ");
        let result = extract_pdf_text(extractor, vec![1]).await;
        assert!(matches!(result, Err(CvToolError::UnparsablePdf(_))));
    }

    #[tokio::test]
    async fn test_panicking_extractor_is_unparsable() {
        let result = extract_pdf_text(Arc::new(PanickingExtractor), vec![1]).await;
        assert!(matches!(result, Err(CvToolError::UnparsablePdf(_))));
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_unparsable() {
        let result = extract_pdf_text(Arc::new(LibraryExtractor), b"%PDF-1.4\n%%EOF".to_vec()).await;
        assert!(matches!(result, Err(CvToolError::UnparsablePdf(_))));
    }
}
