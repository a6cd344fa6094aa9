// src/profile_import/heuristics.rs
//! Rule-based structuring of extracted PDF text.
//!
//! Best effort only: section headers and date-bearing lines are recognised,
//! everything else lands in the summary. Users fix the rest in the editor.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::types::profile::{Certification, Education, Experience, Profile};
use crate::utils::truncate_chars;

pub const DEFAULT_NAME: &str = "Imported from PDF";

const MAX_EXPERIENCE: usize = 20;
const MAX_EDUCATION: usize = 10;
const MAX_CERTIFICATIONS: usize = 15;
const MAX_SKILLS: usize = 50;
const SUMMARY_FALLBACK_CHARS: usize = 1500;
const HEADER_MAX_LEN: usize = 30;
const NAME_MAX_LEN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Experience,
    Education,
    Skills,
    Certifications,
    Languages,
}

fn section_for(line: &str) -> Option<Section> {
    if line.chars().count() >= HEADER_MAX_LEN {
        return None;
    }
    let lower = line.to_lowercase();
    let table: &[(&str, Section)] = &[
        ("experience", Section::Experience),
        ("work", Section::Experience),
        ("education", Section::Education),
        ("skills", Section::Skills),
        ("certification", Section::Certifications),
        ("licenses", Section::Certifications),
        ("summary", Section::Summary),
        ("about", Section::Summary),
        ("languages", Section::Languages),
    ];
    table
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, section)| *section)
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {}: {}", pattern, e)))
}

fn linkedin_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"https?://(?:www\.)?linkedin\.com/in/[\w\-]+")
}

fn email_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"[\w.+\-]+@[\w\-]+\.[\w.\-]+")
}

fn phone_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\+?\d[\d\s().\-]{7,}\d")
}

fn dated_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?i)\d{4}|present")
}

fn separator_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\s*[·–|]\s*|\s+-\s+")
}

fn skill_split_re() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"[,;·|•]")
}

/// Build a best-effort profile from raw text.
pub fn structure_text(text: &str) -> Profile {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let mut full_name = String::new();
    let mut summary_lines: Vec<&str> = Vec::new();
    let mut experience = Vec::new();
    let mut education = Vec::new();
    let mut skills: Vec<String> = Vec::new();
    let mut certifications = Vec::new();
    let mut languages: Vec<String> = Vec::new();
    let mut current: Option<Section> = None;

    for (i, line) in lines.iter().copied().enumerate() {
        if full_name.is_empty()
            && i < 5
            && line.chars().count() < NAME_MAX_LEN
            && line.chars().next().is_some_and(char::is_uppercase)
            && section_for(line).is_none()
            && !email_re().is_match(line)
        {
            full_name = line.to_string();
            continue;
        }

        if let Some(section) = section_for(line) {
            current = Some(section);
            continue;
        }

        match current {
            Some(Section::Experience) => {
                if let Some(entry) = experience_line(line) {
                    experience.push(entry);
                } else if let Some(last) = experience.last_mut() {
                    append_description(last, line);
                }
            }
            Some(Section::Education) => {
                if line.chars().count() > 5 && !line.starts_with("http") {
                    education.push(Education {
                        school: line.to_string(),
                        ..Default::default()
                    });
                }
            }
            Some(Section::Skills) => {
                let len = line.chars().count();
                if len > 1 && len < NAME_MAX_LEN {
                    skills.extend(skill_split_re().split(line).map(|s| s.trim().to_string()));
                }
            }
            Some(Section::Certifications) => {
                if line.chars().count() > 5 {
                    certifications.push(Certification {
                        name: line.to_string(),
                        ..Default::default()
                    });
                }
            }
            Some(Section::Languages) => {
                languages.extend(skill_split_re().split(line).map(|s| s.trim().to_string()));
            }
            Some(Section::Summary) => summary_lines.push(line),
            None => {}
        }
    }

    let summary = if summary_lines.is_empty() {
        truncate_chars(text.trim(), SUMMARY_FALLBACK_CHARS)
    } else {
        truncate_chars(&summary_lines.join(" "), SUMMARY_FALLBACK_CHARS)
    };

    experience.truncate(MAX_EXPERIENCE);
    education.truncate(MAX_EDUCATION);
    certifications.truncate(MAX_CERTIFICATIONS);

    let phone = contact_block(&lines)
        .find_map(|line| phone_re().find(line))
        .map(|m| m.as_str().trim().to_string());

    Profile {
        full_name: if full_name.is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            full_name
        },
        headline: None,
        summary,
        email: email_re().find(text).map(|m| m.as_str().to_string()),
        phone,
        address: None,
        linkedin_url: linkedin_re().find(text).map(|m| m.as_str().to_string()),
        photo_base64: None,
        experience,
        education,
        skills: dedupe_limited(skills, MAX_SKILLS),
        certifications,
        languages: dedupe_limited(languages, MAX_SKILLS),
    }
}

/// Lines above the first section header, where contact details live.
fn contact_block<'a>(lines: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
    lines
        .iter()
        .copied()
        .take_while(|line| section_for(line).is_none())
}

/// "Title · Company · 2019 - Present" style lines.
fn experience_line(line: &str) -> Option<Experience> {
    if !dated_re().is_match(line) || !separator_re().is_match(line) {
        return None;
    }
    let mut parts = separator_re().splitn(line, 3).map(str::trim);
    let title = parts.next().unwrap_or("").to_string();
    let company = parts.next().unwrap_or("").to_string();
    let dates = parts.next().unwrap_or("");
    let start_date = (!dates.is_empty()).then(|| truncate_chars(dates, 20));

    Some(Experience {
        title,
        company,
        start_date,
        ..Default::default()
    })
}

fn append_description(entry: &mut Experience, line: &str) {
    match entry.description.as_mut() {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(line);
        }
        None => entry.description = Some(line.to_string()),
    }
}

fn dedupe_limited(items: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The heuristics are approximate; these tests pin the cues they rely on,
    // not exact field extraction.

    const LINKEDIN_EXPORT: &str = "\
Jane Doe
Backend Engineer at Acme
jane@example.com
+49 170 1234567
www.linkedin.com/in/janedoe
https://www.linkedin.com/in/janedoe
Summary
Engineer who likes distributed systems.
Experience
Senior Engineer · Acme · 2020 - Present
Built the billing platform.
Engineer · Initech · 2016 - 2020
Skills
Go, Rust, PostgreSQL
Go; Kubernetes
Education
Technical University of Berlin
Certifications
Certified Kubernetes Administrator
";

    #[test]
    fn test_linkedin_style_text() {
        let profile = structure_text(LINKEDIN_EXPORT);
        assert_eq!(profile.full_name, "Jane Doe");
        assert_eq!(profile.email.as_deref(), Some("jane@example.com"));
        assert_eq!(profile.phone.as_deref(), Some("+49 170 1234567"));
        assert_eq!(
            profile.linkedin_url.as_deref(),
            Some("https://www.linkedin.com/in/janedoe")
        );
        assert_eq!(profile.summary, "Engineer who likes distributed systems.");
        assert_eq!(profile.experience.len(), 2);
        assert_eq!(profile.experience[0].title, "Senior Engineer");
        assert_eq!(profile.experience[0].company, "Acme");
        assert_eq!(
            profile.experience[0].description.as_deref(),
            Some("Built the billing platform.")
        );
        assert_eq!(profile.skills, vec!["Go", "Rust", "PostgreSQL", "Kubernetes"]);
        assert_eq!(profile.education[0].school, "Technical University of Berlin");
        assert_eq!(profile.certifications.len(), 1);
    }

    #[test]
    fn test_unstructured_text_falls_back() {
        let text = "some lowercase text without any headers that goes on for a while";
        let profile = structure_text(text);
        assert_eq!(profile.full_name, DEFAULT_NAME);
        assert_eq!(profile.summary, text);
        assert!(profile.experience.is_empty());
    }

    #[test]
    fn test_limits_apply() {
        let mut text = String::from("Skills\n");
        for i in 0..80 {
            text.push_str(&format!("skill{}\n", i));
        }
        let profile = structure_text(&text);
        assert_eq!(profile.skills.len(), MAX_SKILLS);
    }
}
