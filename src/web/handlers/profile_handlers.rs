// src/web/handlers/profile_handlers.rs
use rocket::form::Form;
use rocket::serde::json::Json;
use rocket::State;
use tokio::io::AsyncReadExt;
use tracing::Instrument;

use crate::auth::{AuthenticatedUser, OptionalAuth};
use crate::core::database::{ProfileRepository, ProfileUpdate};
use crate::error::{CvResult, CvToolError};
use crate::types::Profile;
use crate::web::types::{CvUploadForm, DataResponse, ProfileData, ProfileUpdateRequest};
use crate::web::AppState;
use crate::{app_log, app_span};

/// Parse an uploaded PDF or JSON profile. Signed-in callers also get it saved.
pub async fn parse_cv_handler(
    upload: Form<CvUploadForm<'_>>,
    auth: OptionalAuth,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<Profile>>> {
    let span = app_span!("parse_cv", user = auth.user_id().unwrap_or("anonymous"));

    async {
        let content_type = upload.file.content_type().map(|ct| ct.to_string());
        let filename = upload
            .file
            .raw_name()
            .map(|n| n.dangerous_unsafe_unsanitized_raw().as_str().to_string());

        let unreadable =
            |e: std::io::Error| CvToolError::InvalidFormat(format!("Could not read the uploaded file: {}", e));
        let mut reader = Box::pin(upload.file.open().await.map_err(unreadable)?);
        let mut bytes = Vec::with_capacity(upload.file.len() as usize);
        reader.read_to_end(&mut bytes).await.map_err(unreadable)?;

        app_log!(
            info,
            "Parsing upload {} ({} bytes)",
            filename.as_deref().unwrap_or("<unnamed>"),
            bytes.len()
        );

        let profile = state
            .importer
            .parse(bytes, content_type.as_deref(), filename.as_deref())
            .await?;

        if let Some(user) = &auth.user {
            let update = ProfileUpdate {
                profile: Some(profile.clone()),
                ..Default::default()
            };
            ProfileRepository::new(state.db.pool()).save(&user.id, update).await?;
            app_log!(info, "Saved parsed profile for user {}", user.id);
        }

        Ok(Json(DataResponse::success("CV parsed", profile)))
    }
    .instrument(span)
    .await
}

pub async fn get_profile_handler(
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<ProfileData>>> {
    let record = ProfileRepository::new(state.db.pool()).get(&auth.id).await?;
    Ok(Json(DataResponse::success("Profile loaded", record.into())))
}

/// Fields left out of the body keep their stored value.
pub async fn put_profile_handler(
    request: ProfileUpdateRequest,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<ProfileData>>> {
    let record = ProfileRepository::new(state.db.pool())
        .save(&auth.id, request.into())
        .await?;
    app_log!(info, "Updated profile for user {}", auth.id);
    Ok(Json(DataResponse::success("Profile saved", record.into())))
}
