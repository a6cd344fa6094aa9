// src/auth.rs
//! Email/password accounts with a signed session token in an HTTP-only cookie.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};

use crate::app_log;
use crate::core::database::{User, UserRepository};
use crate::error::{CvResult, CvToolError};
use crate::web::AppState;

pub const SESSION_COOKIE: &str = "cv-tool-session";
pub const TOKEN_TTL_DAYS: i64 = 30;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> CvResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CvToolError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Trimmed, lower-cased email. Rejects anything without a local part and a
/// dotted domain.
pub fn normalize_email(email: &str) -> CvResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(CvToolError::Validation("Please enter a valid email address".to_string()))
    }
}

pub fn validate_password(password: &str) -> CvResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CvToolError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Issues and checks HS256 session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User) -> CvResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CvToolError::Internal(anyhow::anyhow!("Failed to sign session token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                app_log!(debug, "Session token rejected: {}", e);
                AuthError::InvalidToken
            })
    }
}

/// `SameSite=None; Secure` when the frontend is on another site, else `Lax`.
pub fn session_cookie(token: String, cross_site: bool) -> Cookie<'static> {
    let builder = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(rocket::time::Duration::days(TOKEN_TTL_DAYS));
    if cross_site {
        builder.same_site(SameSite::None).secure(true).build()
    } else {
        builder.same_site(SameSite::Lax).build()
    }
}

pub fn clear_session_cookie(cookies: &CookieJar<'_>, cross_site: bool) {
    let builder = Cookie::build(SESSION_COOKIE).path("/").http_only(true);
    let cookie = if cross_site {
        builder.same_site(SameSite::None).secure(true).build()
    } else {
        builder.same_site(SameSite::Lax).build()
    };
    cookies.remove(cookie);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    UnknownUser,
    DatabaseError,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Not authenticated",
            AuthError::InvalidToken => "Session expired or invalid. Please log in again.",
            AuthError::UnknownUser => "Account no longer exists",
            AuthError::DatabaseError => "Database error occurred",
        }
    }
}

/// Logged-in caller, resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = match req.guard::<&State<AppState>>().await {
            Outcome::Success(state) => state,
            Outcome::Error((status, _)) => return Outcome::Error((status, AuthError::DatabaseError)),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        let Some(token) = req.cookies().get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Outcome::Error((Status::Unauthorized, AuthError::MissingToken));
        };

        let claims = match state.tokens.verify(&token) {
            Ok(claims) => claims,
            Err(e) => return Outcome::Error((Status::Unauthorized, e)),
        };

        match UserRepository::new(state.db.pool()).find_by_id(&claims.sub).await {
            Ok(Some(user)) => Outcome::Success(AuthenticatedUser {
                id: user.id,
                email: user.email,
            }),
            Ok(None) => {
                app_log!(warn, "Session token for deleted user {}", claims.sub);
                Outcome::Error((Status::Unauthorized, AuthError::UnknownUser))
            }
            Err(e) => {
                app_log!(error, "User lookup failed: {}", e);
                Outcome::Error((Status::InternalServerError, AuthError::DatabaseError))
            }
        }
    }
}

// Optional auth guard that doesn't fail if no auth is provided
pub struct OptionalAuth {
    pub user: Option<AuthenticatedUser>,
}

impl OptionalAuth {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) => Outcome::Success(OptionalAuth { user: Some(auth) }),
            _ => Outcome::Success(OptionalAuth { user: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "user-1".into(),
            email: "jane@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_email_and_password_rules() {
        assert_eq!(normalize_email("  Jane@Example.COM ").unwrap(), "jane@example.com");
        assert!(normalize_email("jane").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("jane@localhost").is_err());

        assert!(validate_password("12345678").is_ok());
        assert!(matches!(validate_password("short"), Err(CvToolError::Validation(_))));
    }

    #[test]
    fn test_token_round_trip_and_tampering() {
        let tokens = TokenService::new("secret-one");
        let token = tokens.issue(&user()).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);

        let other = TokenService::new("secret-two");
        assert_eq!(other.verify(&token).unwrap_err(), AuthError::InvalidToken);
        assert_eq!(tokens.verify("garbage").unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new("secret");
        let past = (Utc::now() - Duration::days(1)).timestamp() as usize;
        let claims = Claims {
            sub: "user-1".into(),
            email: "jane@example.com".into(),
            iat: past - 10,
            exp: past,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap();
        assert_eq!(tokens.verify(&token).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_cookie_attributes() {
        let cross = session_cookie("t".into(), true);
        assert_eq!(cross.name(), SESSION_COOKIE);
        assert_eq!(cross.http_only(), Some(true));
        assert_eq!(cross.same_site(), Some(SameSite::None));
        assert_eq!(cross.secure(), Some(true));

        let same = session_cookie("t".into(), false);
        assert_eq!(same.same_site(), Some(SameSite::Lax));
        assert_eq!(same.secure(), None);
    }
}
