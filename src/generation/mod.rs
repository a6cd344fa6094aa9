// src/generation/mod.rs
//! Tailoring of a profile to a job: one model call for the CV content, one
//! for the cover letter, persisted as a session.

pub mod prompts;

use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::service_client::{CompletionRequest, LanguageModel};
use crate::error::{CvResult, CvToolError};
use crate::fetcher::{fetch_additional_urls, resolve_job_description, ContentFetcher};
use crate::session_store::SessionStore;
use crate::types::response::{GenerationResult, LetterResponse, TailoredExperienceEntry, TailoringResponse};
use crate::types::{Experience, GenerationSession, Profile};
use crate::utils::{is_http_url, mentions_term, strip_code_fences, truncate_chars};
use crate::{app_log, app_span};

pub const MAX_KEYWORDS: usize = 15;
const TAILORING_TEMPERATURE: f32 = 0.5;
const LETTER_TEMPERATURE: f32 = 0.7;
const RAW_SUMMARY_CHARS: usize = 1500;

/// Everything a generation request carries.
#[derive(Debug, Clone, Default)]
pub struct GenerationInput {
    pub profile: Profile,
    /// Pasted text or a link to the posting.
    pub job_description: String,
    pub personal_summary: Option<String>,
    pub additional_urls: Vec<String>,
    /// Pre-fetched auxiliary texts; when present the links are not fetched again.
    pub additional_urls_content: Option<BTreeMap<String, String>>,
    pub language: String,
    pub template: String,
    pub owner_id: Option<String>,
}

/// A stored session plus the reason its letter is missing, if it failed.
#[derive(Debug, Clone)]
pub struct Generation {
    pub session: GenerationSession,
    pub letter_error: Option<String>,
}

impl Generation {
    pub fn into_result(self) -> GenerationResult {
        let session = self.session;
        GenerationResult {
            session_id: session.id,
            tailored_summary: session.tailored_summary,
            tailored_experience: session.tailored_experience,
            motivation_letter: session.motivation_letter,
            suggested_skills_highlight: session.suggested_skills_highlight,
            status: "success".to_string(),
            letter_error: self.letter_error,
            has_pdf: session.has_pdf,
            has_letter_pdf: session.has_letter_pdf,
        }
    }
}

/// CV content produced by the tailoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct TailoredCv {
    pub summary: String,
    pub experience: Vec<Experience>,
    pub keywords: Vec<String>,
}

pub struct GenerationService {
    llm: Option<Arc<dyn LanguageModel>>,
    fetcher: Arc<dyn ContentFetcher>,
    store: SessionStore,
}

impl GenerationService {
    pub fn new(
        llm: Option<Arc<dyn LanguageModel>>,
        fetcher: Arc<dyn ContentFetcher>,
        store: SessionStore,
    ) -> Self {
        Self { llm, fetcher, store }
    }

    pub async fn generate(&self, input: GenerationInput) -> CvResult<Generation> {
        let span = app_span!(
            "generate_cv",
            language = %input.language,
            template = %input.template,
            owner = input.owner_id.as_deref().unwrap_or("anonymous")
        );
        self.run(input).instrument(span).await
    }

    async fn run(&self, input: GenerationInput) -> CvResult<Generation> {
        if input.profile.is_empty() {
            return Err(CvToolError::MissingInput(
                "Your profile is empty. Add your name, a summary, experience, education or skills before generating."
                    .to_string(),
            ));
        }

        let llm = self.llm.as_ref().ok_or_else(|| {
            CvToolError::ServiceUnavailable("AI service is not configured".to_string())
        })?;

        let job_description = resolve_job_description(self.fetcher.as_ref(), &input.job_description).await?;
        if job_description.is_empty() {
            app_log!(info, "No job description given, generating a general-purpose CV");
        }

        let auxiliary_texts = match input.additional_urls_content.as_ref() {
            Some(contents) if contents.values().any(|c| !c.trim().is_empty()) => contents.clone(),
            _ => fetch_additional_urls(self.fetcher.as_ref(), &input.additional_urls).await,
        };
        let auxiliary = prompts::auxiliary_context(&auxiliary_texts);
        let personal_summary = input.personal_summary.as_deref();

        let tailoring = CompletionRequest::json(
            prompts::tailoring_system_prompt(&input.language),
            prompts::tailoring_user_prompt(
                &input.profile,
                &job_description,
                personal_summary,
                &auxiliary,
                &input.language,
            ),
            TAILORING_TEMPERATURE,
        );
        let answer = llm.complete(tailoring).await.map_err(|e| {
            app_log!(error, "CV tailoring call failed: {}", e);
            CvToolError::Generation(format!("AI service error while tailoring the CV: {}", e))
        })?;
        let tailored = parse_tailoring(&answer, &input.profile, &job_description)?;

        let (motivation_letter, letter_error) = if job_description.is_empty() {
            (String::new(), None)
        } else {
            let request = CompletionRequest::json(
                prompts::letter_system_prompt(&input.language),
                prompts::letter_user_prompt(
                    &input.profile,
                    &job_description,
                    personal_summary,
                    &auxiliary,
                    &input.language,
                ),
                LETTER_TEMPERATURE,
            );
            match llm.complete(request).await.map_err(|e| e.to_string()).and_then(|a| parse_letter(&a)) {
                Ok(letter) => (letter, None),
                Err(reason) => {
                    app_log!(warn, "Cover letter generation failed: {}", reason);
                    (String::new(), Some(format!("Cover letter generation failed: {}", reason)))
                }
            }
        };

        let session = GenerationSession {
            id: Uuid::new_v4().to_string(),
            owner_id: input.owner_id,
            created_at: Utc::now(),
            job_description,
            personal_summary: input.personal_summary.filter(|s| !s.trim().is_empty()),
            additional_urls: reference_links(&input.additional_urls),
            language: input.language,
            template: input.template,
            profile: input.profile,
            tailored_summary: tailored.summary,
            tailored_experience: tailored.experience,
            motivation_letter,
            suggested_skills_highlight: tailored.keywords,
            has_pdf: false,
            has_letter_pdf: false,
        };
        self.store.put(&session).await?;

        app_log!(
            info,
            "Generated session {} ({} keywords, letter: {})",
            session.id,
            session.suggested_skills_highlight.len(),
            session.has_letter()
        );

        Ok(Generation {
            session,
            letter_error,
        })
    }
}

/// Links shown on the CV: trimmed http(s) URLs, each once.
pub fn reference_links(urls: &[String]) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for url in urls.iter().map(|u| u.trim()).filter(|u| is_http_url(u)) {
        if !links.iter().any(|l| l == url) {
            links.push(url.to_string());
        }
    }
    links
}

/// Read the tailoring answer. A JSON object is used field by field; any
/// other non-empty answer becomes the summary as-is.
pub fn parse_tailoring(answer: &str, profile: &Profile, job_description: &str) -> CvResult<TailoredCv> {
    let content = strip_code_fences(answer);
    if content.is_empty() {
        return Err(CvToolError::Generation(
            "AI service returned an empty answer".to_string(),
        ));
    }

    let response = match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => serde_json::from_value::<TailoringResponse>(value.clone())
            .unwrap_or_else(|e| {
                app_log!(warn, "Tailoring answer has unexpected shapes ({}), reading summary only", e);
                TailoringResponse {
                    tailored_summary: value
                        .get("tailored_summary")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    ..Default::default()
                }
            }),
        _ => {
            app_log!(warn, "Tailoring answer is not JSON, using raw text as summary");
            TailoringResponse {
                tailored_summary: truncate_chars(content, RAW_SUMMARY_CHARS),
                ..Default::default()
            }
        }
    };

    let summary = if response.tailored_summary.trim().is_empty() {
        profile.summary.trim().to_string()
    } else {
        response.tailored_summary.trim().to_string()
    };
    if summary.is_empty() {
        return Err(CvToolError::Generation(
            "AI service returned no CV summary".to_string(),
        ));
    }

    Ok(TailoredCv {
        summary,
        experience: merge_experience(&profile.experience, &response.tailored_experience),
        keywords: collect_keywords(response.keywords_to_highlight, profile, job_description),
    })
}

/// Profile entries with descriptions from the model. Titles, companies,
/// dates and locations always come from the profile.
pub fn merge_experience(facts: &[Experience], rewrites: &[TailoredExperienceEntry]) -> Vec<Experience> {
    let same = |a: &Option<String>, b: &str| {
        a.as_deref()
            .is_some_and(|a| a.trim().eq_ignore_ascii_case(b.trim()))
    };

    facts
        .iter()
        .enumerate()
        .map(|(i, fact)| {
            let rewrite = rewrites
                .iter()
                .find(|r| same(&r.title, &fact.title) && same(&r.company, &fact.company))
                .or_else(|| rewrites.get(i));
            let description = rewrite
                .and_then(|r| r.description.as_deref())
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .or_else(|| fact.description.clone());

            Experience {
                description,
                ..fact.clone()
            }
        })
        .collect()
}

/// Profile skills the job text mentions, then the model's picks, without
/// duplicates and capped at [`MAX_KEYWORDS`].
pub fn collect_keywords(from_model: Vec<String>, profile: &Profile, job_description: &str) -> Vec<String> {
    let mentioned = profile
        .skills
        .iter()
        .filter(|skill| !job_description.is_empty() && mentions_term(job_description, skill))
        .cloned();

    let mut seen = HashSet::new();
    mentioned
        .chain(from_model)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(MAX_KEYWORDS)
        .collect()
}

fn parse_letter(answer: &str) -> Result<String, String> {
    let content = strip_code_fences(answer);
    let letter = match serde_json::from_str::<Value>(content) {
        Ok(value @ Value::Object(_)) => serde_json::from_value::<LetterResponse>(value)
            .map(|r| r.motivation_letter)
            .unwrap_or_default(),
        _ => content.to_string(),
    };
    let letter = letter.trim();
    if letter.is_empty() {
        Err("AI service returned an empty letter".to_string())
    } else {
        Ok(letter.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service_client::testing::ScriptedModel;
    use crate::core::service_client::LlmError;
    use crate::core::Database;
    use crate::fetcher::testing::StaticFetcher;

    fn jane() -> Profile {
        Profile {
            full_name: "Jane Doe".into(),
            summary: "Engineer".into(),
            skills: vec!["Go".into()],
            experience: vec![Experience {
                title: "Engineer".into(),
                company: "Acme".into(),
                start_date: Some("2020".into()),
                description: Some("Wrote services".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn input(profile: Profile, job: &str) -> GenerationInput {
        GenerationInput {
            profile,
            job_description: job.to_string(),
            language: "en".into(),
            template: "modern".into(),
            owner_id: Some("alice".into()),
            ..Default::default()
        }
    }

    async fn service(
        answers: Vec<Result<String, LlmError>>,
        fetcher: StaticFetcher,
    ) -> (GenerationService, Arc<ScriptedModel>, SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let store = SessionStore::new(db, dir.path().to_path_buf());
        let model = Arc::new(ScriptedModel::new(answers));
        let llm: Arc<dyn LanguageModel> = model.clone();
        let service = GenerationService::new(Some(llm), Arc::new(fetcher), store.clone());
        (service, model, store, dir)
    }

    const CV_ANSWER: &str = r#"{"tailored_summary":"Go engineer focused on backends.",
        "tailored_experience":[{"title":"Engineer","company":"Acme","description":"Built Go services"}],
        "keywords_to_highlight":["backend"]}"#;

    #[tokio::test]
    async fn test_generate_highlights_matching_skill() {
        let (service, _model, store, _dir) = service(
            vec![
                Ok(CV_ANSWER.to_string()),
                Ok(r#"{"motivation_letter":"Dear team,\n\nI would love to join."}"#.to_string()),
            ],
            StaticFetcher::default(),
        )
        .await;

        let generation = service
            .generate(input(jane(), "Backend engineer role requiring Go"))
            .await
            .unwrap();
        let session = &generation.session;
        assert!(session.suggested_skills_highlight.contains(&"Go".to_string()));
        assert_eq!(session.tailored_summary, "Go engineer focused on backends.");
        assert_eq!(session.tailored_experience[0].description.as_deref(), Some("Built Go services"));
        assert!(session.has_letter());
        assert!(generation.letter_error.is_none());

        let stored = store.get(&session.id, Some("alice")).await.unwrap();
        assert_eq!(stored.profile, session.profile);
        assert_eq!(stored.suggested_skills_highlight, session.suggested_skills_highlight);
        assert_eq!(stored.motivation_letter, session.motivation_letter);

        let result = generation.into_result();
        assert_eq!(result.status, "success");
    }

    #[tokio::test]
    async fn test_letter_failure_keeps_success() {
        let (service, _model, _store, _dir) = service(
            vec![Ok(CV_ANSWER.to_string()), Err(LlmError::Timeout)],
            StaticFetcher::default(),
        )
        .await;

        let generation = service.generate(input(jane(), "Go role")).await.unwrap();
        assert_eq!(generation.session.motivation_letter, "");
        assert!(generation.letter_error.is_some());
        assert_eq!(generation.into_result().status, "success");
    }

    #[tokio::test]
    async fn test_cv_failure_creates_no_session() {
        let (service, _model, store, _dir) = service(
            vec![Err(LlmError::RateLimited)],
            StaticFetcher::default(),
        )
        .await;

        let result = service.generate(input(jane(), "Go role")).await;
        assert!(matches!(result, Err(CvToolError::Generation(_))));
        assert!(store.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_profile_is_missing_input() {
        let (service, model, _store, _dir) = service(vec![], StaticFetcher::default()).await;
        let result = service.generate(input(Profile::default(), "Go role")).await;
        assert!(matches!(result, Err(CvToolError::MissingInput(_))));
        assert!(model.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_without_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let service = GenerationService::new(
            None,
            Arc::new(StaticFetcher::default()),
            SessionStore::new(db, dir.path().to_path_buf()),
        );
        let result = service.generate(input(jane(), "Go role")).await;
        assert!(matches!(result, Err(CvToolError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_general_purpose_cv_skips_letter() {
        let (service, model, _store, _dir) = service(
            vec![Ok(CV_ANSWER.to_string())],
            StaticFetcher::default(),
        )
        .await;

        let generation = service.generate(input(jane(), "")).await.unwrap();
        assert!(!generation.session.has_letter());
        assert!(generation.letter_error.is_none());
        assert_eq!(model.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_job_url_and_additional_urls_are_fetched() {
        let fetcher = StaticFetcher::default()
            .with_page("https://jobs.example.com/1", "Senior Go developer")
            .with_page("https://blog.example.com", "Talk about Go generics");
        let (service, model, _store, _dir) = service(
            vec![Ok(CV_ANSWER.to_string()), Ok("Dear team".to_string())],
            fetcher,
        )
        .await;

        let mut request = input(jane(), "https://jobs.example.com/1");
        request.additional_urls = vec!["https://blog.example.com".into()];
        let generation = service.generate(request).await.unwrap();

        assert_eq!(generation.session.job_description, "Senior Go developer");
        assert_eq!(generation.session.additional_urls, vec!["https://blog.example.com"]);
        assert_eq!(generation.session.motivation_letter, "Dear team");
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].user.contains("[Content from https://blog.example.com]"));
        assert!(requests[0].user.contains("Senior Go developer"));
    }

    #[tokio::test]
    async fn test_unreadable_job_url_is_missing_input() {
        let (service, _model, _store, _dir) = service(vec![], StaticFetcher::default()).await;
        let result = service
            .generate(input(jane(), "https://jobs.example.com/gone"))
            .await;
        assert!(matches!(result, Err(CvToolError::MissingInput(_))));
    }

    #[test]
    fn test_parse_tailoring_fallbacks() {
        let profile = jane();

        let raw = parse_tailoring("Here is a summary in prose.", &profile, "").unwrap();
        assert_eq!(raw.summary, "Here is a summary in prose.");
        assert_eq!(raw.experience, profile.experience);

        let fenced = parse_tailoring("```json\n{\"tailored_summary\":\"\"}\n```", &profile, "").unwrap();
        assert_eq!(fenced.summary, "Engineer");

        let odd = parse_tailoring(
            r#"{"tailored_summary":"Short","tailored_experience":"n/a"}"#,
            &profile,
            "",
        )
        .unwrap();
        assert_eq!(odd.summary, "Short");

        assert!(matches!(
            parse_tailoring("  ", &profile, ""),
            Err(CvToolError::Generation(_))
        ));
    }

    #[test]
    fn test_blank_summary_everywhere_is_an_error() {
        let skills_only = Profile {
            skills: vec!["Go".into()],
            ..Default::default()
        };
        assert!(matches!(
            parse_tailoring(r#"{"keywords_to_highlight":["Go"]}"#, &skills_only, "Go role"),
            Err(CvToolError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_summary_creates_no_session() {
        let (service, _model, store, _dir) = service(
            vec![Ok(r#"{"tailored_summary":"  ","keywords_to_highlight":["Go"]}"#.to_string())],
            StaticFetcher::default(),
        )
        .await;
        let profile = Profile {
            full_name: "Jane Doe".into(),
            skills: vec!["Go".into()],
            ..Default::default()
        };

        let result = service.generate(input(profile, "Go role")).await;
        assert!(matches!(result, Err(CvToolError::Generation(_))));
        assert!(store.list("alice").await.unwrap().is_empty());
    }

    #[test]
    fn test_reference_links() {
        let urls: Vec<String> = vec![
            " https://jane.dev ".into(),
            "jane.dev".into(),
            "".into(),
            "https://jane.dev".into(),
            "http://blog.example.com".into(),
        ];
        assert_eq!(reference_links(&urls), vec!["https://jane.dev", "http://blog.example.com"]);
    }

    #[test]
    fn test_merge_experience_keeps_facts() {
        let facts = vec![
            Experience {
                title: "Engineer".into(),
                company: "Acme".into(),
                start_date: Some("2020".into()),
                end_date: Some("Present".into()),
                ..Default::default()
            },
            Experience {
                title: "Intern".into(),
                company: "Initech".into(),
                description: Some("Fixed bugs".into()),
                ..Default::default()
            },
        ];
        let rewrites = vec![TailoredExperienceEntry {
            title: Some("Chief Engineer".into()),
            company: Some("Acme Global".into()),
            description: Some("Led the Go platform".into()),
        }];

        let merged = merge_experience(&facts, &rewrites);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "Engineer");
        assert_eq!(merged[0].company, "Acme");
        assert_eq!(merged[0].end_date.as_deref(), Some("Present"));
        assert_eq!(merged[0].description.as_deref(), Some("Led the Go platform"));
        assert_eq!(merged[1].description.as_deref(), Some("Fixed bugs"));
    }

    #[test]
    fn test_collect_keywords_dedupes_and_caps() {
        let profile = Profile {
            skills: vec!["Go".into(), "Rust".into(), "Java".into()],
            ..Default::default()
        };
        let from_model: Vec<String> = (0..20).map(|i| format!("kw{}", i)).chain(["go".to_string()]).collect();
        let keywords = collect_keywords(from_model, &profile, "We use Go and Rust, not JavaScript");
        assert_eq!(keywords.len(), MAX_KEYWORDS);
        assert_eq!(&keywords[..3], &["Go", "Rust", "kw0"]);
        assert!(!keywords.iter().any(|k| k == "Java"));
    }

    #[test]
    fn test_parse_letter() {
        assert_eq!(parse_letter(r#"{"letter":"Hi"}"#).unwrap(), "Hi");
        assert_eq!(parse_letter("Plain letter").unwrap(), "Plain letter");
        assert!(parse_letter(r#"{"other":"x"}"#).is_err());
    }
}
