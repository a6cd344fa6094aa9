// src/renderer/mod.rs
//! Session to HTML to PDF.

pub mod context;
pub mod pdf_engine;

use chrono::Utc;
use std::sync::Arc;
use tracing::Instrument;

use crate::core::template_engine::{TemplateEngine, TemplateKind, LETTER_TEMPLATE};
use crate::error::{CvResult, CvToolError};
use crate::types::GenerationSession;
use crate::{app_log, app_span};

pub use pdf_engine::{CommandPdfEngine, PdfEngine};

const TEST_DOCUMENT: &str = "<!DOCTYPE html><html><body><p>Test</p></body></html>";

pub struct DocumentRenderer {
    templates: Arc<TemplateEngine>,
    engine: Arc<dyn PdfEngine>,
}

impl DocumentRenderer {
    pub fn new(templates: Arc<TemplateEngine>, engine: Arc<dyn PdfEngine>) -> Self {
        Self { templates, engine }
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn render_cv_html(&self, session: &GenerationSession, template_id: &str) -> CvResult<String> {
        let template = self.templates.resolve(Some(template_id), TemplateKind::Cv)?;
        let context = tera::Context::from_serialize(context::cv_context(session))
            .map_err(|e| CvToolError::Render(format!("Failed to build CV context: {}", e)))?;
        self.templates.render(&template, &context)
    }

    pub fn render_letter_html(&self, session: &GenerationSession) -> CvResult<String> {
        if !session.has_letter() {
            return Err(CvToolError::NotFound(
                "No cover letter was generated for this session".to_string(),
            ));
        }
        let context = tera::Context::from_serialize(context::letter_context(session, Utc::now()))
            .map_err(|e| CvToolError::Render(format!("Failed to build letter context: {}", e)))?;
        self.templates.render(LETTER_TEMPLATE, &context)
    }

    /// CV PDF of `session` in `template_id` (name or alias).
    pub async fn render_cv(&self, session: &GenerationSession, template_id: &str) -> CvResult<Vec<u8>> {
        let span = app_span!("render_cv", session_id = %session.id, template = %template_id);
        async {
            let html = self.render_cv_html(session, template_id)?;
            let pdf = self.engine.html_to_pdf(&html).await?;
            app_log!(info, "Rendered CV PDF ({} bytes)", pdf.len());
            Ok(pdf)
        }
        .instrument(span)
        .await
    }

    pub async fn render_letter(&self, session: &GenerationSession) -> CvResult<Vec<u8>> {
        let span = app_span!("render_letter", session_id = %session.id);
        async {
            let html = self.render_letter_html(session)?;
            let pdf = self.engine.html_to_pdf(&html).await?;
            app_log!(info, "Rendered letter PDF ({} bytes)", pdf.len());
            Ok(pdf)
        }
        .instrument(span)
        .await
    }

    /// Tiny document, to check the engine is installed and working.
    pub async fn render_test_document(&self) -> CvResult<Vec<u8>> {
        self.engine.html_to_pdf(TEST_DOCUMENT).await
    }
}

#[cfg(test)]
mod tests {
    use super::pdf_engine::testing::EchoPdfEngine;
    use super::*;
    use crate::types::{Experience, Profile};
    use std::path::PathBuf;

    fn renderer(engine: Arc<dyn PdfEngine>) -> DocumentRenderer {
        let templates = TemplateEngine::new(PathBuf::from("/nonexistent/templates")).unwrap();
        DocumentRenderer::new(Arc::new(templates), engine)
    }

    fn session(letter: &str) -> GenerationSession {
        GenerationSession {
            id: "session-1".into(),
            owner_id: None,
            created_at: Utc::now(),
            job_description: "Go role".into(),
            personal_summary: None,
            additional_urls: vec![],
            language: "en".into(),
            template: "modern".into(),
            profile: Profile {
                full_name: "Jane <Doe>".into(),
                email: Some("jane@example.com".into()),
                skills: vec!["Go".into()],
                ..Default::default()
            },
            tailored_summary: "Backend engineer writing <em>Go</em>.".into(),
            tailored_experience: vec![Experience {
                title: "Engineer".into(),
                company: "Acme".into(),
                start_date: Some("2020".into()),
                description: Some("Go services".into()),
                ..Default::default()
            }],
            motivation_letter: letter.into(),
            suggested_skills_highlight: vec!["Go".into()],
            has_pdf: false,
            has_letter_pdf: false,
        }
    }

    #[test]
    fn test_cv_html_for_both_templates() {
        let renderer = renderer(Arc::new(EchoPdfEngine::default()));
        for template in ["modern", "executive", "cv_base.html"] {
            let html = renderer.render_cv_html(&session(""), template).unwrap();
            assert!(html.contains("Jane &lt;Doe&gt;"), "{}", template);
            assert!(html.contains("Backend engineer writing <strong>Go</strong>."), "{}", template);
            assert!(!html.contains("<em>"), "{}", template);
            assert!(html.contains("2020 - Present"), "{}", template);
            assert!(!html.contains(">Links</h"), "{}", template);
        }
    }

    #[test]
    fn test_reference_links_are_listed() {
        let renderer = renderer(Arc::new(EchoPdfEngine::default()));
        let mut linked = session("");
        linked.additional_urls = vec!["https://github.com/janedoe".into()];
        for template in ["modern", "executive"] {
            let html = renderer.render_cv_html(&linked, template).unwrap();
            assert!(html.contains(">Links</h"), "{}", template);
            assert!(html.contains("github.com"), "{}", template);
        }
    }

    #[tokio::test]
    async fn test_render_cv_and_letter() {
        let engine = Arc::new(EchoPdfEngine::default());
        let renderer = renderer(engine.clone());

        let cv = renderer.render_cv(&session("Dear team,\n\nHire me."), "executive").await.unwrap();
        assert!(cv.starts_with(b"%PDF"));

        let letter = renderer.render_letter(&session("Dear team,\n\nHire me.")).await.unwrap();
        assert!(letter.starts_with(b"%PDF"));
        let rendered = engine.rendered.lock().unwrap();
        assert!(rendered[1].contains("<p>Hire me.</p>"));
    }

    #[tokio::test]
    async fn test_render_errors() {
        let renderer = renderer(Arc::new(EchoPdfEngine::default()));
        assert!(matches!(
            renderer.render_cv(&session(""), "neon").await,
            Err(CvToolError::Render(_))
        ));
        assert!(matches!(
            renderer.render_letter(&session("  ")).await,
            Err(CvToolError::NotFound(_))
        ));

        let failing = self::renderer(Arc::new(EchoPdfEngine::failing()));
        assert!(matches!(
            failing.render_cv(&session(""), "modern").await,
            Err(CvToolError::Render(_))
        ));
    }
}
