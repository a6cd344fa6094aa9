// src/types/response.rs
//! Shapes exchanged with the language model and returned by generation.

use serde::{Deserialize, Serialize};

use crate::types::profile::Experience;

/// Tailoring answer expected from the model.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TailoringResponse {
    pub tailored_summary: String,
    pub tailored_experience: Vec<TailoredExperienceEntry>,
    #[serde(alias = "suggested_skills_highlight", alias = "keywords")]
    pub keywords_to_highlight: Vec<String>,
}

/// Only the description is taken from the model; facts come from the profile.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TailoredExperienceEntry {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LetterResponse {
    #[serde(alias = "letter", alias = "cover_letter")]
    pub motivation_letter: String,
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub session_id: String,
    pub tailored_summary: String,
    pub tailored_experience: Vec<Experience>,
    pub motivation_letter: String,
    pub suggested_skills_highlight: Vec<String>,
    pub status: String,
    /// Set when the letter step failed but the CV was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_error: Option<String>,
    pub has_pdf: bool,
    pub has_letter_pdf: bool,
}
