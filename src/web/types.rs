// src/web/types.rs
//! Request bodies and the standard response envelopes.

use chrono::{DateTime, Utc};
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::ContentType;
use rocket::response::{self, Responder};
use rocket::serde::{Deserialize, Serialize};
use rocket::{Request, Response};
use std::collections::BTreeMap;

use crate::core::database::{ProfileRecord, ProfileUpdate};
use crate::core::template_engine::TemplateInfo;
use crate::types::{Experience, GenerationSession, Profile};

pub struct PdfResponse {
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

impl PdfResponse {
    pub fn with_filename(data: Vec<u8>, filename: String) -> Self {
        Self {
            data,
            filename: Some(filename),
        }
    }
}

impl<'r> Responder<'r, 'static> for PdfResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut binding = Response::build();
        let mut response = binding
            .header(ContentType::PDF)
            .sized_body(self.data.len(), std::io::Cursor::new(self.data));

        if let Some(filename) = self.filename {
            response = response.raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            );
        }

        response.ok()
    }
}

// ===== Standard envelopes =====

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Data,
    Action,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

impl<T> DataResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl ActionResponse {
    pub fn success(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message: message.into(),
            action: action.into(),
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}

// ===== Auth =====

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
}

// ===== Profile =====

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct ProfileData {
    pub profile: Profile,
    pub additional_urls: Vec<String>,
    pub personal_summary: String,
    pub onboarding_complete: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ProfileRecord> for ProfileData {
    fn from(record: ProfileRecord) -> Self {
        Self {
            profile: record.profile.unwrap_or_default(),
            additional_urls: record.additional_urls,
            personal_summary: record.personal_summary,
            onboarding_complete: record.onboarding_complete,
            updated_at: record.updated_at,
        }
    }
}

/// Only the fields present are changed.
#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileUpdateRequest {
    pub profile: Option<Profile>,
    pub additional_urls: Option<Vec<String>>,
    pub personal_summary: Option<String>,
    pub onboarding_complete: Option<bool>,
}

impl From<ProfileUpdateRequest> for ProfileUpdate {
    fn from(request: ProfileUpdateRequest) -> Self {
        Self {
            profile: request.profile,
            additional_urls: request.additional_urls,
            personal_summary: request.personal_summary,
            onboarding_complete: request.onboarding_complete,
        }
    }
}

#[derive(FromForm)]
pub struct CvUploadForm<'f> {
    pub file: TempFile<'f>,
}

// ===== Fetching =====

#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct FetchJobDescriptionRequest {
    pub url: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct JobDescriptionData {
    pub content: String,
    /// "url" or "text".
    pub source: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct FetchAdditionalUrlsRequest {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AdditionalUrlsData {
    pub contents: BTreeMap<String, String>,
}

// ===== Generation =====

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct GenerateCvRequest {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub job_description: String,
    pub personal_summary: Option<String>,
    #[serde(default)]
    pub additional_urls: Vec<String>,
    pub additional_urls_content: Option<BTreeMap<String, String>>,
    pub language: Option<String>,
    pub template: Option<String>,
}

/// Stored generation as shown in the preview.
#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SessionDetail {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub job_description: String,
    pub personal_summary: Option<String>,
    pub additional_urls: Vec<String>,
    pub language: String,
    pub template: String,
    pub profile: Profile,
    pub tailored_summary: String,
    pub tailored_experience: Vec<Experience>,
    pub motivation_letter: String,
    pub keywords_to_highlight: Vec<String>,
    pub has_letter: bool,
    pub has_pdf: bool,
    pub has_letter_pdf: bool,
}

impl From<GenerationSession> for SessionDetail {
    fn from(session: GenerationSession) -> Self {
        let has_letter = session.has_letter();
        Self {
            session_id: session.id,
            created_at: session.created_at,
            job_description: session.job_description,
            personal_summary: session.personal_summary,
            additional_urls: session.additional_urls,
            language: session.language,
            template: session.template,
            profile: session.profile,
            tailored_summary: session.tailored_summary,
            tailored_experience: session.tailored_experience,
            motivation_letter: session.motivation_letter,
            keywords_to_highlight: session.suggested_skills_highlight,
            has_letter,
            has_pdf: session.has_pdf,
            has_letter_pdf: session.has_letter_pdf,
        }
    }
}

// ===== System =====

#[derive(Debug, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthData {
    pub status: String,
    pub openai_configured: bool,
    pub database: bool,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TemplatesData {
    pub templates: Vec<TemplateInfo>,
}
