// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use types::*;

use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::http::{CookieJar, Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, put, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthenticatedUser, OptionalAuth, TokenService};
use crate::core::config_manager::AppConfig;
use crate::core::service_client::{LanguageModel, OpenAiClient};
use crate::core::{Database, TemplateEngine};
use crate::error::CvResult;
use crate::fetcher::{ContentFetcher, HttpFetcher};
use crate::generation::GenerationService;
use crate::profile_import::{LibraryExtractor, PdfTextExtractor, ProfileImporter};
use crate::renderer::{CommandPdfEngine, DocumentRenderer, PdfEngine};
use crate::session_store::SessionStore;
use crate::types::response::GenerationResult;
use crate::types::{Profile, SessionSummary};
use crate::app_log;

const UPLOAD_LIMIT_MIB: u64 = 10;

/// Everything the handlers share. Built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub tokens: TokenService,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub importer: ProfileImporter,
    pub renderer: DocumentRenderer,
    pub store: SessionStore,
    pub generator: GenerationService,
}

/// External services behind the state. Tests swap in fakes.
pub struct Services {
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub extractor: Arc<dyn PdfTextExtractor>,
    pub pdf_engine: Arc<dyn PdfEngine>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = OpenAiClient::from_config(config)?.map(|c| Arc::new(c) as Arc<dyn LanguageModel>);
        if llm.is_none() {
            app_log!(warn, "OPENAI_API_KEY not set, AI features are disabled");
        }

        let pdf_engine = CommandPdfEngine::new(
            &config.pdf_renderer,
            Duration::from_secs(config.render_timeout_secs),
        )?;
        app_log!(info, "PDF renderer: {}", pdf_engine.program());

        Ok(Self {
            llm,
            fetcher: Arc::new(HttpFetcher::new()?),
            extractor: Arc::new(LibraryExtractor),
            pdf_engine: Arc::new(pdf_engine),
        })
    }
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, services: Services) -> Result<Self> {
        let templates = Arc::new(TemplateEngine::new(config.templates_dir.clone())?);
        let store = SessionStore::new(db.clone(), config.output_dir.clone());

        Ok(Self {
            tokens: TokenService::new(&config.secret_key),
            importer: ProfileImporter::new(services.llm.clone(), services.extractor),
            renderer: DocumentRenderer::new(templates, services.pdf_engine),
            generator: GenerationService::new(
                services.llm.clone(),
                services.fetcher.clone(),
                store.clone(),
            ),
            llm: services.llm,
            fetcher: services.fetcher,
            store,
            db,
            config,
        })
    }
}

// CORS Fairing. Credentials are allowed, so the origin is echoed back only
// when it is on the configured list.
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = request.headers().get_one("Origin") else {
            return;
        };
        if !self.allowed_origins.iter().any(|o| o == origin) {
            return;
        }

        response.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        response.set_header(Header::new("Vary", "Origin"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// ===== Auth =====

#[post("/auth/register", data = "<request>")]
pub async fn register(
    request: Json<CredentialsRequest>,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<UserInfo>>> {
    handlers::register_handler(request.into_inner(), cookies, state).await
}

#[post("/auth/login", data = "<request>")]
pub async fn login(
    request: Json<CredentialsRequest>,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<UserInfo>>> {
    handlers::login_handler(request.into_inner(), cookies, state).await
}

#[post("/auth/logout")]
pub async fn logout(cookies: &CookieJar<'_>, state: &State<AppState>) -> Json<ActionResponse> {
    handlers::logout_handler(cookies, state).await
}

#[get("/auth/me")]
pub async fn me(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    handlers::me_handler(auth).await
}

#[post("/auth/delete-account")]
pub async fn delete_account(
    auth: AuthenticatedUser,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> CvResult<Json<ActionResponse>> {
    handlers::delete_account_handler(auth, cookies, state).await
}

// ===== Profile =====

#[post("/parse-cv", data = "<upload>")]
pub async fn parse_cv(
    upload: Form<CvUploadForm<'_>>,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<Profile>>> {
    handlers::parse_cv_handler(upload, auth, state).await
}

#[get("/profile")]
pub async fn get_profile(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<ProfileData>>> {
    handlers::get_profile_handler(auth, state).await
}

#[put("/profile", data = "<request>")]
pub async fn put_profile(
    request: Json<ProfileUpdateRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<ProfileData>>> {
    handlers::put_profile_handler(request.into_inner(), auth, state).await
}

// ===== Fetching =====

#[post("/fetch-job-description", data = "<request>")]
pub async fn fetch_job_description(
    request: Json<FetchJobDescriptionRequest>,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<JobDescriptionData>>> {
    handlers::fetch_job_description_handler(request.into_inner(), state).await
}

#[post("/fetch-additional-urls", data = "<request>")]
pub async fn fetch_additional_urls(
    request: Json<FetchAdditionalUrlsRequest>,
    state: &State<AppState>,
) -> Json<DataResponse<AdditionalUrlsData>> {
    handlers::fetch_additional_urls_handler(request.into_inner(), state).await
}

// ===== Generation & sessions =====

#[post("/generate-cv", data = "<request>")]
pub async fn generate_cv(
    request: Json<GenerateCvRequest>,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<GenerationResult>>> {
    handlers::generate_cv_handler(request.into_inner(), auth, state).await
}

#[get("/session/<id>")]
pub async fn get_session(
    id: &str,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<SessionDetail>>> {
    handlers::get_session_handler(id, auth, state).await
}

#[get("/generated-cvs")]
pub async fn generated_cvs(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<Vec<SessionSummary>>>> {
    handlers::generated_cvs_handler(auth, state).await
}

#[get("/download-pdf/<id>?<template>")]
pub async fn download_pdf(
    id: &str,
    template: Option<&str>,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<PdfResponse> {
    handlers::download_pdf_handler(id, template, auth, state).await
}

#[get("/download-letter/<id>")]
pub async fn download_letter(
    id: &str,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<PdfResponse> {
    handlers::download_letter_handler(id, auth, state).await
}

// ===== System =====

#[get("/health")]
pub async fn health(state: &State<AppState>) -> Json<HealthData> {
    handlers::health_handler(state).await
}

#[get("/templates")]
pub async fn get_templates(state: &State<AppState>) -> Json<DataResponse<TemplatesData>> {
    handlers::get_templates_handler(state).await
}

#[get("/test-pdf")]
pub async fn test_pdf(state: &State<AppState>) -> CvResult<PdfResponse> {
    handlers::test_pdf_handler(state).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers

fn error_json(message: &str, code: &str, suggestions: &[&str]) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        message.to_string(),
        code.to_string(),
        suggestions.iter().map(|s| s.to_string()).collect(),
    ))
}

#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    error_json(
        "Invalid request format",
        "BAD_REQUEST",
        &[
            "Check your request JSON format",
            "Verify all required fields are present",
        ],
    )
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<StandardErrorResponse> {
    error_json("Not authenticated", "UNAUTHORIZED", &["Log in and try again"])
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    error_json("Not found", "NOT_FOUND", &["Check the URL"])
}

#[rocket::catch(413)]
pub fn payload_too_large() -> Json<StandardErrorResponse> {
    error_json(
        "Upload is too large",
        "PAYLOAD_TOO_LARGE",
        &["Files up to 10 MB are accepted"],
    )
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    error_json(
        "Request body has the wrong shape",
        "UNPROCESSABLE_ENTITY",
        &["Verify the field names and types of the request body"],
    )
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    error_json(
        "Internal server error",
        "INTERNAL_ERROR",
        &[
            "Try again in a few moments",
            "Contact support if the problem persists",
        ],
    )
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("json", UPLOAD_LIMIT_MIB.mebibytes())
        .limit("file", UPLOAD_LIMIT_MIB.mebibytes())
        .limit("data-form", UPLOAD_LIMIT_MIB.mebibytes());

    let figment = rocket::Config::figment()
        .merge(("port", state.config.port))
        .merge(("address", "0.0.0.0"))
        .merge(("limits", limits));

    rocket::custom(figment)
        .attach(Cors::new(state.config.frontend_origins.clone()))
        .manage(state)
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                payload_too_large,
                unprocessable,
                internal_error
            ],
        )
        .mount("/", routes![health, options])
        .mount(
            "/api",
            routes![
                register,
                login,
                logout,
                me,
                delete_account,
                parse_cv,
                get_profile,
                put_profile,
                fetch_job_description,
                fetch_additional_urls,
                generate_cv,
                get_session,
                generated_cvs,
                download_pdf,
                download_letter,
                health,
                get_templates,
                test_pdf,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: AppConfig) -> Result<()> {
    config.ensure_directories().await?;

    let db = Database::connect(&config.database_url).await?;
    let services = Services::from_config(&config)?;
    let state = AppState::new(config, db, services)?;

    match state.store.purge_expired(state.config.session_retention_days).await {
        Ok(0) => {}
        Ok(n) => app_log!(info, "Startup retention pass removed {} sessions", n),
        Err(e) => app_log!(warn, "Startup retention pass failed: {}", e),
    }

    app_log!(info, "Starting CV tailoring API server");
    app_log!(info, "Environment: {}", state.config.environment);
    app_log!(info, "Output directory: {}", state.config.output_dir.display());
    app_log!(info, "Server: http://0.0.0.0:{}", state.config.port);

    build_rocket(state)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
