// src/web/handlers/auth_handlers.rs
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::State;

use crate::app_log;
use crate::auth::{
    clear_session_cookie, hash_password, normalize_email, session_cookie, validate_password,
    verify_password, AuthenticatedUser,
};
use crate::core::database::{User, UserRepository};
use crate::error::{CvResult, CvToolError};
use crate::web::types::{ActionResponse, CredentialsRequest, DataResponse, UserInfo};
use crate::web::AppState;

fn user_info(user: &User) -> UserInfo {
    UserInfo {
        id: user.id.clone(),
        email: user.email.clone(),
    }
}

fn start_session(user: &User, cookies: &CookieJar<'_>, state: &AppState) -> CvResult<()> {
    let token = state.tokens.issue(user)?;
    cookies.add(session_cookie(token, state.config.cross_site_frontend));
    Ok(())
}

pub async fn register_handler(
    request: CredentialsRequest,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<UserInfo>>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(CvToolError::Validation("Email and password required".to_string()));
    }
    let email = normalize_email(&request.email)?;
    validate_password(&request.password)?;

    let password_hash = hash_password(&request.password)?;
    let user = UserRepository::new(state.db.pool())
        .create(&email, &password_hash)
        .await?;

    start_session(&user, cookies, state)?;
    app_log!(info, "Registered user {}", user.id);

    Ok(Json(DataResponse::success("Account created", user_info(&user))))
}

pub async fn login_handler(
    request: CredentialsRequest,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> CvResult<Json<DataResponse<UserInfo>>> {
    let invalid = || CvToolError::Unauthorized("Invalid email or password".to_string());

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(CvToolError::Validation("Email and password required".to_string()));
    }
    let email = normalize_email(&request.email).map_err(|_| invalid())?;

    let user = UserRepository::new(state.db.pool())
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password_hash) {
        app_log!(info, "Failed login for user {}", user.id);
        return Err(invalid());
    }

    start_session(&user, cookies, state)?;
    app_log!(info, "User {} logged in", user.id);

    Ok(Json(DataResponse::success("Logged in", user_info(&user))))
}

pub async fn logout_handler(cookies: &CookieJar<'_>, state: &State<AppState>) -> Json<ActionResponse> {
    clear_session_cookie(cookies, state.config.cross_site_frontend);
    Json(ActionResponse::success("Logged out", "logout"))
}

pub async fn me_handler(auth: AuthenticatedUser) -> Json<DataResponse<UserInfo>> {
    Json(DataResponse::success(
        "Authenticated",
        UserInfo {
            id: auth.id,
            email: auth.email,
        },
    ))
}

/// Removes the account, its profile, its sessions and their cached PDFs.
pub async fn delete_account_handler(
    auth: AuthenticatedUser,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> CvResult<Json<ActionResponse>> {
    let session_ids = UserRepository::new(state.db.pool())
        .delete_cascade(&auth.id)
        .await?;
    state.store.remove_files(&session_ids).await;
    clear_session_cookie(cookies, state.config.cross_site_frontend);

    app_log!(
        info,
        "Deleted account {} with {} sessions",
        auth.id,
        session_ids.len()
    );

    Ok(Json(ActionResponse::success("Account deleted", "delete_account")))
}
