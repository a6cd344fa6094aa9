// src/web/handlers/generation_handlers.rs
use rocket::serde::json::Json;
use rocket::State;

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::core::database::PdfKind;
use crate::core::template_engine::TemplateKind;
use crate::error::CvResult;
use crate::generation::GenerationInput;
use crate::types::response::GenerationResult;
use crate::types::{GenerationSession, SessionSummary};
use crate::utils::normalize_language;
use crate::web::types::{DataResponse, GenerateCvRequest, PdfResponse, SessionDetail};
use crate::web::AppState;
use crate::app_log;

pub async fn generate_cv_handler(
    request: GenerateCvRequest,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<GenerationResult>>> {
    let template = state
        .renderer
        .templates()
        .resolve(request.template.as_deref(), TemplateKind::Cv)?;

    let input = GenerationInput {
        profile: request.profile,
        job_description: request.job_description,
        personal_summary: request
            .personal_summary
            .filter(|s| !s.trim().is_empty()),
        additional_urls: request.additional_urls,
        additional_urls_content: request.additional_urls_content,
        language: normalize_language(request.language.as_deref()),
        template,
        owner_id: auth.user_id().map(str::to_string),
    };

    let mut generation = state.generator.generate(input).await?;

    if state.config.render_on_generate {
        prerender(state, &mut generation.session).await;
    }

    Ok(Json(DataResponse::success(
        "CV generated",
        generation.into_result(),
    )))
}

/// Render and cache both PDFs right away. A failure only means the
/// download renders later.
async fn prerender(state: &AppState, session: &mut GenerationSession) {
    match state.renderer.render_cv(session, &session.template).await {
        Ok(pdf) => match state.store.attach_pdf(&session.id, PdfKind::Cv, &pdf).await {
            Ok(()) => session.has_pdf = true,
            Err(e) => app_log!(warn, "Could not cache CV PDF for {}: {}", session.id, e),
        },
        Err(e) => app_log!(warn, "CV PDF not rendered for {}: {}", session.id, e),
    }

    if !session.has_letter() {
        return;
    }
    match state.renderer.render_letter(session).await {
        Ok(pdf) => match state.store.attach_pdf(&session.id, PdfKind::Letter, &pdf).await {
            Ok(()) => session.has_letter_pdf = true,
            Err(e) => app_log!(warn, "Could not cache letter PDF for {}: {}", session.id, e),
        },
        Err(e) => app_log!(warn, "Letter PDF not rendered for {}: {}", session.id, e),
    }
}

pub async fn get_session_handler(
    id: &str,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<SessionDetail>>> {
    let session = state.store.get(id, auth.user_id()).await?;
    Ok(Json(DataResponse::success("Session loaded", session.into())))
}

pub async fn generated_cvs_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<Vec<SessionSummary>>>> {
    let sessions = state.store.list(&auth.id).await?;
    Ok(Json(DataResponse::success(
        format!("{} generated CVs", sessions.len()),
        sessions,
    )))
}

/// Cached PDF when the session's own template is asked for, otherwise a
/// fresh render that is not cached.
pub async fn download_pdf_handler(
    id: &str,
    template: Option<&str>,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<PdfResponse> {
    let session = state.store.get(id, auth.user_id()).await?;
    let filename = format!("cv_{}.pdf", session.short_id());

    let requested = match template {
        Some(t) => Some(state.renderer.templates().resolve(Some(t), TemplateKind::Cv)?),
        None => None,
    };
    if let Some(other) = requested.filter(|t| *t != session.template) {
        let pdf = state.renderer.render_cv(&session, &other).await?;
        return Ok(PdfResponse::with_filename(pdf, filename));
    }

    if let Some(pdf) = state.store.cached_pdf(&session, PdfKind::Cv).await? {
        return Ok(PdfResponse::with_filename(pdf, filename));
    }

    let pdf = state.renderer.render_cv(&session, &session.template).await?;
    if let Err(e) = state.store.attach_pdf(&session.id, PdfKind::Cv, &pdf).await {
        app_log!(warn, "Could not cache CV PDF for {}: {}", session.id, e);
    }
    Ok(PdfResponse::with_filename(pdf, filename))
}

pub async fn download_letter_handler(
    id: &str,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<PdfResponse> {
    let session = state.store.get(id, auth.user_id()).await?;
    let filename = format!("motivation_letter_{}.pdf", session.short_id());

    if let Some(pdf) = state.store.cached_pdf(&session, PdfKind::Letter).await? {
        return Ok(PdfResponse::with_filename(pdf, filename));
    }

    let pdf = state.renderer.render_letter(&session).await?;
    if let Err(e) = state.store.attach_pdf(&session.id, PdfKind::Letter, &pdf).await {
        app_log!(warn, "Could not cache letter PDF for {}: {}", session.id, e);
    }
    Ok(PdfResponse::with_filename(pdf, filename))
}
