// src/web/handlers/system_handlers.rs
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::core::template_engine::TemplateKind;
use crate::error::CvResult;
use crate::web::types::{DataResponse, HealthData, PdfResponse, TemplatesData};
use crate::web::AppState;

pub async fn health_handler(state: &State<AppState>) -> Json<HealthData> {
    let database = match state.db.health_check().await {
        Ok(()) => true,
        Err(e) => {
            app_log!(error, "Database health check failed: {}", e);
            false
        }
    };

    Json(HealthData {
        status: if database { "ok" } else { "degraded" }.to_string(),
        openai_configured: state.llm.is_some(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// CV templates only; the letter layout is not selectable.
pub async fn get_templates_handler(state: &State<AppState>) -> Json<DataResponse<TemplatesData>> {
    let templates = state
        .renderer
        .templates()
        .templates_of(TemplateKind::Cv)
        .into_iter()
        .cloned()
        .collect();

    Json(DataResponse::success(
        "Available templates",
        TemplatesData { templates },
    ))
}

pub async fn test_pdf_handler(state: &State<AppState>) -> CvResult<PdfResponse> {
    let pdf = state.renderer.render_test_document().await?;
    Ok(PdfResponse::with_filename(pdf, "test.pdf".to_string()))
}
