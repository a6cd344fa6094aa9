// src/types/session.rs
//! Persisted generation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{Experience, Profile};

/// One generation request's inputs and outputs. Immutable once stored, apart
/// from the cached PDF flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSession {
    pub id: String,
    /// `None` for anonymous generations.
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub job_description: String,
    pub personal_summary: Option<String>,
    /// Reference links listed on the CV.
    #[serde(default)]
    pub additional_urls: Vec<String>,
    pub language: String,
    pub template: String,
    /// Profile as it was when the CV was generated.
    pub profile: Profile,
    pub tailored_summary: String,
    pub tailored_experience: Vec<Experience>,
    /// Empty when no letter was produced.
    pub motivation_letter: String,
    pub suggested_skills_highlight: Vec<String>,
    pub has_pdf: bool,
    pub has_letter_pdf: bool,
}

impl GenerationSession {
    pub fn has_letter(&self) -> bool {
        !self.motivation_letter.trim().is_empty()
    }

    /// First 8 characters of the id, used in download file names.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            created_at: self.created_at,
            job_title_hint: job_title_hint(&self.job_description),
            language: self.language.clone(),
            template: self.template.clone(),
            has_letter: self.has_letter(),
            has_pdf: self.has_pdf,
            has_letter_pdf: self.has_letter_pdf,
        }
    }
}

/// Row of the history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub job_title_hint: String,
    pub language: String,
    pub template: String,
    pub has_letter: bool,
    pub has_pdf: bool,
    pub has_letter_pdf: bool,
}

const TITLE_HINT_LEN: usize = 120;

/// First non-empty line of the job description, shortened for listings.
pub fn job_title_hint(job_description: &str) -> String {
    let line = job_description
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    crate::utils::truncate_chars(line, TITLE_HINT_LEN)
}
