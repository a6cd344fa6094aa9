// src/web/handlers/fetch_handlers.rs
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::error::{CvResult, CvToolError};
use crate::fetcher::fetch_additional_urls;
use crate::web::types::{
    AdditionalUrlsData, DataResponse, FetchAdditionalUrlsRequest, FetchJobDescriptionRequest,
    JobDescriptionData,
};
use crate::web::AppState;

/// A link is fetched; pasted text is returned trimmed.
pub async fn fetch_job_description_handler(
    request: FetchJobDescriptionRequest,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<JobDescriptionData>>> {
    let url = request.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
    let text = request.text.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let data = match (url, text) {
        (Some(url), _) => {
            let content = state.fetcher.fetch_text(url).await?;
            app_log!(info, "Fetched job description from {} ({} chars)", url, content.len());
            JobDescriptionData {
                content,
                source: "url".to_string(),
            }
        }
        (None, Some(text)) => JobDescriptionData {
            content: text.to_string(),
            source: "text".to_string(),
        },
        (None, None) => {
            return Err(CvToolError::MissingInput("Provide 'url' or 'text'".to_string()));
        }
    };

    Ok(Json(DataResponse::success("Job description ready", data)))
}

/// Unreachable links are left out of the map.
pub async fn fetch_additional_urls_handler(
    request: FetchAdditionalUrlsRequest,
    state: &State<AppState>,
) -> Json<DataResponse<AdditionalUrlsData>> {
    let contents = fetch_additional_urls(state.fetcher.as_ref(), &request.urls).await;
    Json(DataResponse::success(
        format!("Fetched {} of {} links", contents.len(), request.urls.len()),
        AdditionalUrlsData { contents },
    ))
}
