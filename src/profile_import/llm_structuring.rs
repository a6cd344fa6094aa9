// src/profile_import/llm_structuring.rs
//! Language-model structuring of extracted PDF text into a profile.

use crate::core::service_client::{CompletionRequest, LanguageModel};
use crate::error::{CvResult, CvToolError};
use crate::types::Profile;
use crate::utils::{strip_code_fences, truncate_chars};

use super::heuristics::DEFAULT_NAME;
use super::json_import::profile_from_model_output;

const MAX_INPUT_CHARS: usize = 12_000;
const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = "You convert CV and LinkedIn profile text into structured JSON. \
Copy facts exactly as written; never invent employers, titles, dates or degrees. \
Answer with a single JSON object only.";

fn user_prompt(text: &str) -> String {
    format!(
        r#"Extract a CV/resume profile from the following text (from a PDF).
Return a single JSON object with these keys:
- full_name (string)
- headline (string or null)
- summary (string)
- email, phone, address, linkedin_url (string or null)
- experience: list of {{title, company, start_date, end_date, description, location}}
- education: list of {{school, degree, field, start_date, end_date, description}}
- skills: list of strings
- certifications: list of {{name, authority, date, url}}
- languages: list of strings
Use null for missing fields. No markdown, no code block.

---
{}"#,
        truncate_chars(text, MAX_INPUT_CHARS)
    )
}

/// One round trip to the model. Any failure (transport, empty or malformed
/// answer, empty profile) is returned so the caller can fall back.
pub async fn structure_with_model(llm: &dyn LanguageModel, text: &str) -> CvResult<Profile> {
    let answer = llm
        .complete(CompletionRequest::json(SYSTEM_PROMPT, user_prompt(text), TEMPERATURE))
        .await
        .map_err(|e| CvToolError::Generation(format!("Profile structuring failed: {}", e)))?;

    let value: serde_json::Value = serde_json::from_str(strip_code_fences(&answer))
        .map_err(|e| CvToolError::InvalidFormat(format!("Model answer is not JSON: {}", e)))?;

    let mut profile = profile_from_model_output(value)?;
    if profile.is_empty() {
        return Err(CvToolError::InvalidFormat(
            "Model returned an empty profile".to_string(),
        ));
    }
    if profile.full_name.trim().is_empty() {
        profile.full_name = DEFAULT_NAME.to_string();
    }
    profile.photo_base64 = None;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service_client::testing::ScriptedModel;
    use crate::core::service_client::LlmError;

    #[tokio::test]
    async fn test_structured_answer() {
        let model = ScriptedModel::new(vec![Ok(r#"```json
{"full_name": null, "summary": "Go developer", "skills": ["Go"], "experience": [{"title": "Dev", "company": "Acme", "end_date": null}]}
```"#
            .to_string())]);
        let profile = structure_with_model(&model, "Go developer at Acme").await.unwrap();
        assert_eq!(profile.full_name, DEFAULT_NAME);
        assert_eq!(profile.skills, vec!["Go"]);
        assert_eq!(profile.experience[0].company, "Acme");

        let requests = model.requests.lock().unwrap();
        assert!(requests[0].user.ends_with("Go developer at Acme"));
        assert!(requests[0].json_output);
    }

    #[tokio::test]
    async fn test_failures_are_reported() {
        let model = ScriptedModel::new(vec![
            Err(LlmError::RateLimited),
            Ok("I cannot help with that".to_string()),
            Ok("{}".to_string()),
        ]);
        assert!(structure_with_model(&model, "text").await.is_err());
        assert!(structure_with_model(&model, "text").await.is_err());
        assert!(structure_with_model(&model, "text").await.is_err());
    }
}
