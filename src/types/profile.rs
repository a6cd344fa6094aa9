// src/types/profile.rs
//! Career profile records shared by ingestion, generation and rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: String,
    pub company: String,
    pub start_date: Option<String>,
    /// Free text; "Present" is valid.
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: String,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    pub name: String,
    pub authority: Option<String>,
    pub date: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub full_name: String,
    pub headline: Option<String>,
    pub summary: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linkedin_url: Option<String>,
    /// Base64 image, with or without a `data:` prefix.
    pub photo_base64: Option<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
    pub certifications: Vec<Certification>,
    pub languages: Vec<String>,
}

/// Keys that identify a JSON object as a profile in our own layout.
pub const PROFILE_KEYS: &[&str] = &[
    "full_name",
    "headline",
    "summary",
    "email",
    "phone",
    "address",
    "linkedin_url",
    "photo_base64",
    "experience",
    "education",
    "skills",
    "certifications",
    "languages",
];

impl Profile {
    /// True when there is nothing to tailor: no name, summary, experience,
    /// education or skills.
    pub fn is_empty(&self) -> bool {
        self.full_name.trim().is_empty()
            && self.summary.trim().is_empty()
            && self.experience.is_empty()
            && self.education.is_empty()
            && self.skills.iter().all(|s| s.trim().is_empty())
    }

    /// Display name, never blank.
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            "Candidate"
        } else {
            name
        }
    }

    /// Photo as an embeddable data URL.
    pub fn photo_data_url(&self) -> Option<String> {
        let raw = self.photo_base64.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with("data:") {
            Some(raw.to_string())
        } else {
            Some(format!("data:image/jpeg;base64,{}", raw))
        }
    }
}
