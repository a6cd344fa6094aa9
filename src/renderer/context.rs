// src/renderer/context.rs
//! Template contexts built from a session.

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Html;
use serde::Serialize;
use std::sync::OnceLock;

use crate::types::{GenerationSession, Profile};
use crate::utils::term_spans;

/// Keywords shorter than this are never highlighted.
const MIN_KEYWORD_LEN: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct Labels {
    pub summary: &'static str,
    pub experience: &'static str,
    pub education: &'static str,
    pub skills: &'static str,
    pub certifications: &'static str,
    pub languages: &'static str,
    pub contact: &'static str,
    pub links: &'static str,
    pub present: &'static str,
}

pub fn labels(language: &str) -> Labels {
    match language {
        "de" => Labels {
            summary: "Profil",
            experience: "Berufserfahrung",
            education: "Ausbildung",
            skills: "Kenntnisse",
            certifications: "Zertifikate",
            languages: "Sprachen",
            contact: "Kontakt",
            links: "Links",
            present: "heute",
        },
        "fr" => Labels {
            summary: "Profil",
            experience: "Expérience professionnelle",
            education: "Formation",
            skills: "Compétences",
            certifications: "Certifications",
            languages: "Langues",
            contact: "Contact",
            links: "Liens",
            present: "aujourd'hui",
        },
        _ => Labels {
            summary: "Professional Summary",
            experience: "Experience",
            education: "Education",
            skills: "Skills",
            certifications: "Certifications",
            languages: "Languages",
            contact: "Contact",
            links: "Links",
            present: "Present",
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperienceView {
    pub title: String,
    pub company: String,
    pub dates: String,
    pub location: Option<String>,
    /// Escaped text with `<strong>` around keywords.
    pub description_html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EducationView {
    pub school: String,
    pub degree_line: String,
    pub dates: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillView {
    pub name: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationView {
    pub name: String,
    pub authority: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CvContext {
    pub language: String,
    pub labels: Labels,
    pub name: String,
    pub headline: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linkedin_url: Option<String>,
    pub photo_data_url: Option<String>,
    pub summary_html: String,
    pub experience: Vec<ExperienceView>,
    pub education: Vec<EducationView>,
    pub skills: Vec<SkillView>,
    pub certifications: Vec<CertificationView>,
    pub languages: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LetterContext {
    pub language: String,
    pub name: String,
    pub headline: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date: String,
    pub paragraphs: Vec<String>,
}

fn tag_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"<[^>]+>").unwrap_or_else(|e| panic!("invalid tag pattern: {}", e)))
}

/// Plain text of model output that may carry markup, literal or escaped.
pub fn strip_html(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(text);
    let decoded: String = fragment.root_element().text().collect();
    tag_re()
        .replace_all(&decoded, "")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

/// Strip markup, escape, and wrap each keyword occurrence in `<strong>`.
pub fn highlight_keywords(text: &str, keywords: &[String]) -> String {
    let plain = strip_html(text);

    let mut spans: Vec<(usize, usize)> = keywords
        .iter()
        .filter(|k| k.trim().chars().count() >= MIN_KEYWORD_LEN)
        .flat_map(|k| term_spans(&plain, k))
        .collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut html = String::with_capacity(plain.len() + spans.len() * 17);
    let mut cursor = 0;
    for (start, end) in spans {
        if start < cursor {
            continue;
        }
        html.push_str(&tera::escape_html(&plain[cursor..start]));
        html.push_str("<strong>");
        html.push_str(&tera::escape_html(&plain[start..end]));
        html.push_str("</strong>");
        cursor = end;
    }
    html.push_str(&tera::escape_html(&plain[cursor..]));
    html
}

/// A skill is flagged when it equals a keyword or contains one.
pub fn keyword_match(skill: &str, keywords: &[String]) -> bool {
    let skill = skill.trim().to_lowercase();
    if skill.is_empty() {
        return false;
    }
    keywords.iter().any(|k| {
        let k = k.trim().to_lowercase();
        !k.is_empty() && (k == skill || skill.contains(&k))
    })
}

fn date_range(start: Option<&str>, end: Option<&str>, present: &str) -> String {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());
    match (start, end) {
        (Some(s), Some(e)) => format!("{} - {}", s, e),
        (Some(s), None) => format!("{} - {}", s, present),
        (None, Some(e)) => e.to_string(),
        (None, None) => String::new(),
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn cv_context(session: &GenerationSession) -> CvContext {
    let profile: &Profile = &session.profile;
    let keywords = &session.suggested_skills_highlight;
    let labels = labels(&session.language);

    let summary_source = if session.tailored_summary.trim().is_empty() {
        &profile.summary
    } else {
        &session.tailored_summary
    };

    let experience = session
        .tailored_experience
        .iter()
        .map(|job| ExperienceView {
            title: job.title.clone(),
            company: job.company.clone(),
            dates: date_range(job.start_date.as_deref(), job.end_date.as_deref(), labels.present),
            location: non_blank(&job.location),
            description_html: highlight_keywords(job.description.as_deref().unwrap_or(""), keywords),
        })
        .collect();

    let education = profile
        .education
        .iter()
        .map(|school| EducationView {
            school: school.school.clone(),
            degree_line: [non_blank(&school.degree), non_blank(&school.field)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", "),
            dates: date_range(school.start_date.as_deref(), school.end_date.as_deref(), labels.present),
            description: strip_html(school.description.as_deref().unwrap_or("")),
        })
        .collect();

    CvContext {
        language: session.language.clone(),
        name: profile.display_name().to_string(),
        headline: non_blank(&profile.headline),
        email: non_blank(&profile.email),
        phone: non_blank(&profile.phone),
        address: non_blank(&profile.address),
        linkedin_url: non_blank(&profile.linkedin_url),
        photo_data_url: profile.photo_data_url(),
        summary_html: highlight_keywords(summary_source, keywords),
        experience,
        education,
        skills: profile
            .skills
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| SkillView {
                name: s.trim().to_string(),
                highlighted: keyword_match(s, keywords),
            })
            .collect(),
        certifications: profile
            .certifications
            .iter()
            .map(|c| CertificationView {
                name: c.name.clone(),
                authority: non_blank(&c.authority),
                date: non_blank(&c.date),
            })
            .collect(),
        languages: profile.languages.clone(),
        links: session.additional_urls.clone(),
        labels,
    }
}

/// Letter paragraphs are separated by blank lines in the model output.
pub fn letter_context(session: &GenerationSession, today: DateTime<Utc>) -> LetterContext {
    let profile = &session.profile;
    let plain = strip_html(&session.motivation_letter);
    let paragraphs = plain
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    LetterContext {
        language: session.language.clone(),
        name: profile.display_name().to_string(),
        headline: non_blank(&profile.headline),
        email: non_blank(&profile.email),
        phone: non_blank(&profile.phone),
        address: non_blank(&profile.address),
        date: letter_date(today, &session.language),
        paragraphs,
    }
}

fn letter_date(today: DateTime<Utc>, language: &str) -> String {
    match language {
        "de" | "fr" => today.format("%d.%m.%Y").to_string(),
        _ => today.format("%B %-d, %Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Experience;
    use chrono::TimeZone;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<strong>Go</strong> expert"), "Go expert");
        assert_eq!(strip_html("&lt;strong&gt;Go&lt;/strong&gt; expert"), "Go expert");
        assert_eq!(strip_html("a\u{a0}b & c"), "a b & c");
        assert_eq!(strip_html("   "), "");
    }

    #[test]
    fn test_highlight_keywords() {
        assert_eq!(highlight_keywords("", &kw(&["Go"])), "");
        assert_eq!(highlight_keywords("Plain text", &[]), "Plain text");
        assert_eq!(
            highlight_keywords("Built go services & APIs", &kw(&["Go", "APIs"])),
            "Built <strong>go</strong> services &amp; <strong>APIs</strong>"
        );
        // short keywords are ignored, markup in the source is dropped
        assert_eq!(
            highlight_keywords("<b>C</b> and Rust", &kw(&["C", "rust"])),
            "C and <strong>Rust</strong>"
        );
        // overlapping keywords produce one tag
        assert_eq!(
            highlight_keywords("Google Cloud Platform", &kw(&["Google Cloud", "Cloud Platform"])),
            "<strong>Google Cloud</strong> Platform"
        );
    }

    #[test]
    fn test_keyword_match() {
        let keywords = kw(&["Go", "kubernetes"]);
        assert!(keyword_match("go", &keywords));
        assert!(keyword_match("Kubernetes (CKA)", &keywords));
        assert!(!keyword_match("Rust", &keywords));
        assert!(!keyword_match("", &keywords));
    }

    fn session() -> GenerationSession {
        GenerationSession {
            id: "0123456789abcdef".into(),
            owner_id: None,
            created_at: Utc::now(),
            job_description: "Go role".into(),
            personal_summary: None,
            additional_urls: vec!["https://jane.dev".into()],
            language: "de".into(),
            template: "modern".into(),
            profile: Profile {
                full_name: "Jane Doe".into(),
                summary: "Original".into(),
                skills: vec!["Go".into(), "Rust".into()],
                photo_base64: Some("AAAA".into()),
                ..Default::default()
            },
            tailored_summary: String::new(),
            tailored_experience: vec![Experience {
                title: "Engineer".into(),
                company: "Acme".into(),
                start_date: Some("2020".into()),
                description: Some("Go services".into()),
                ..Default::default()
            }],
            motivation_letter: "Dear team,\n\nI apply.\n\n\nRegards".into(),
            suggested_skills_highlight: kw(&["Go"]),
            has_pdf: false,
            has_letter_pdf: false,
        }
    }

    #[test]
    fn test_cv_context() {
        let context = cv_context(&session());
        assert_eq!(context.name, "Jane Doe");
        assert_eq!(context.summary_html, "Original");
        assert_eq!(context.labels.experience, "Berufserfahrung");
        assert_eq!(context.experience[0].dates, "2020 - heute");
        assert_eq!(context.experience[0].description_html, "<strong>Go</strong> services");
        assert!(context.skills[0].highlighted);
        assert!(!context.skills[1].highlighted);
        assert_eq!(context.photo_data_url.as_deref(), Some("data:image/jpeg;base64,AAAA"));
        assert_eq!(context.links, vec!["https://jane.dev"]);
        assert_eq!(context.labels.links, "Links");
    }

    #[test]
    fn test_letter_context() {
        let today = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let context = letter_context(&session(), today);
        assert_eq!(context.paragraphs, vec!["Dear team,", "I apply.", "Regards"]);
        assert_eq!(context.date, "05.03.2024");

        let mut english = session();
        english.language = "en".into();
        assert_eq!(letter_context(&english, today).date, "March 5, 2024");
    }
}
