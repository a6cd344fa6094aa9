// src/generation/prompts.rs
//! Prompt text for CV tailoring and cover letters.

use std::collections::BTreeMap;

use crate::types::Profile;
use crate::utils::{language_name, truncate_chars};

const EXPERIENCE_DESCRIPTION_CHARS: usize = 500;
const EDUCATION_DESCRIPTION_CHARS: usize = 300;
const MAX_PROMPT_SKILLS: usize = 50;
/// Per auxiliary page.
pub const AUXILIARY_TEXT_CHARS: usize = 8000;

/// Plain-text rendering of the profile the model works from.
pub fn profile_context(profile: &Profile) -> String {
    let or_na = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("N/A")
            .to_string()
    };

    let mut parts = vec![
        format!("Name: {}", profile.full_name),
        format!("Headline: {}", or_na(&profile.headline)),
        format!("Summary: {}", profile.summary),
        format!(
            "Email: {}, Phone: {}, Address: {}",
            or_na(&profile.email),
            or_na(&profile.phone),
            or_na(&profile.address)
        ),
        String::new(),
        "Experience:".to_string(),
    ];

    for entry in &profile.experience {
        parts.push(format!(
            "  - {} at {} ({} - {})",
            entry.title,
            entry.company,
            entry.start_date.as_deref().unwrap_or("?"),
            entry.end_date.as_deref().unwrap_or("Present")
        ));
        if let Some(description) = entry.description.as_deref().filter(|d| !d.trim().is_empty()) {
            parts.push(format!("    {}", truncate_chars(description, EXPERIENCE_DESCRIPTION_CHARS)));
        }
    }

    parts.push(String::new());
    parts.push("Education:".to_string());
    for entry in &profile.education {
        parts.push(format!(
            "  - {} in {}, {} ({} - {})",
            or_na(&entry.degree),
            or_na(&entry.field),
            entry.school,
            entry.start_date.as_deref().unwrap_or("?"),
            entry.end_date.as_deref().unwrap_or("?")
        ));
        if let Some(description) = entry.description.as_deref().filter(|d| !d.trim().is_empty()) {
            parts.push(format!("    {}", truncate_chars(description, EDUCATION_DESCRIPTION_CHARS)));
        }
    }

    parts.push(String::new());
    let skills: Vec<&str> = profile
        .skills
        .iter()
        .take(MAX_PROMPT_SKILLS)
        .map(String::as_str)
        .collect();
    parts.push(format!("Skills: {}", skills.join(", ")));

    if !profile.certifications.is_empty() {
        let names: Vec<&str> = profile.certifications.iter().map(|c| c.name.as_str()).collect();
        parts.push(format!("Certifications: {}", names.join(", ")));
    }
    if !profile.languages.is_empty() {
        parts.push(format!("Languages: {}", profile.languages.join(", ")));
    }

    parts.join("\n")
}

/// Auxiliary pages as labelled blocks, empty when none have text.
pub fn auxiliary_context(texts: &BTreeMap<String, String>) -> String {
    texts
        .iter()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(url, content)| {
            format!(
                "[Content from {}]\n{}",
                url,
                truncate_chars(content, AUXILIARY_TEXT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Everything both prompts share about the candidate.
fn candidate_block(
    profile: &Profile,
    personal_summary: Option<&str>,
    auxiliary: &str,
) -> String {
    let mut context = profile_context(profile);
    if let Some(summary) = personal_summary.map(str::trim).filter(|s| !s.is_empty()) {
        context.push_str(
            "\n\nAdditional personal summary from the candidate (use this to enrich the CV summary):\n",
        );
        context.push_str(summary);
    }

    format!(
        "## Candidate profile (facts: do not change titles, companies, or dates)\n{}\n\n\
         ## Additional context about the candidate (from URLs or other sources)\n{}",
        context,
        if auxiliary.is_empty() { "None provided." } else { auxiliary }
    )
}

fn job_block(job_description: &str) -> String {
    if job_description.trim().is_empty() {
        "## Job description\nNo specific job was given. Produce a strong general-purpose version \
         of the CV, and pick keywords_to_highlight from the candidate's strongest skills."
            .to_string()
    } else {
        format!(
            "## Job description (use its keywords for tailoring and for keywords_to_highlight)\n{}",
            job_description
        )
    }
}

pub fn tailoring_system_prompt(language: &str) -> String {
    format!(
        "You are an expert CV writer. You optimize CVs for ATS (applicant tracking systems) and human \
         readers. Critical rules: (1) Do NOT alter factual background: job titles, company names, dates, \
         schools, and certifications must stay exactly as in the candidate profile. (2) Use and highlight \
         keywords from the job description so the CV ranks high in ATS without changing facts. \
         (3) Rephrase only the summary and experience descriptions to emphasize relevance. \
         Output all content in {}. Return valid JSON only, no markdown code blocks.",
        language_name(language)
    )
}

pub fn tailoring_user_prompt(
    profile: &Profile,
    job_description: &str,
    personal_summary: Option<&str>,
    auxiliary: &str,
    language: &str,
) -> String {
    let lang = language_name(language);
    format!(
        "{}\n\n{}\n\n---\n\n\
         Respond with a single JSON object with exactly these keys:\n\
         1) \"tailored_summary\": a professional summary (3-5 sentences) in {lang}, tailored to this job. Do not invent facts.\n\
         2) \"tailored_experience\": a list with one object per position, in profile order. Each object: \"title\", \"company\", \"description\". \
         Copy title and company exactly from the profile. Rewrite only \"description\" to emphasize relevance.\n\
         3) \"keywords_to_highlight\": 5-15 keywords or short phrases from the job description to highlight in the PDF, as a JSON array of strings.\n",
        candidate_block(profile, personal_summary, auxiliary),
        job_block(job_description),
        lang = lang
    )
}

pub fn letter_system_prompt(language: &str) -> String {
    format!(
        "You are an expert cover letter writer. Never invent employers, titles, dates or \
         qualifications that are not in the candidate profile. Write in {}. \
         Return valid JSON only, no markdown code blocks.",
        language_name(language)
    )
}

pub fn letter_user_prompt(
    profile: &Profile,
    job_description: &str,
    personal_summary: Option<&str>,
    auxiliary: &str,
    language: &str,
) -> String {
    format!(
        "{}\n\n{}\n\n---\n\n\
         Respond with a single JSON object with one key, \"motivation_letter\": a professional \
         motivation letter (3-5 short paragraphs, plain text, paragraphs separated by blank lines) \
         in {}, referencing the role and the candidate's fit. Sign it with the candidate's name.\n",
        candidate_block(profile, personal_summary, auxiliary),
        job_block(job_description),
        language_name(language)
    )
}
