// src/core/database.rs
//! SQLite persistence: users, profiles and generation sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::app_log;
use crate::error::{CvResult, CvToolError};
use crate::types::{Experience, GenerationSession, Profile, SessionSummary};

// ===== Core Database Connection Management =====

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and run migrations. `sqlite::memory:` keeps a single pinned
    /// connection so the schema survives between queries.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;

        app_log!(info, "Database connection established: {}", database_url);

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                profile_json TEXT NOT NULL,
                additional_urls TEXT NOT NULL DEFAULT '[]',
                personal_summary TEXT NOT NULL DEFAULT '',
                onboarding_complete BOOLEAN NOT NULL DEFAULT FALSE,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cv_generations (
                session_id TEXT PRIMARY KEY,
                user_id TEXT,
                created_at TEXT NOT NULL,
                job_description TEXT NOT NULL,
                personal_summary TEXT,
                additional_urls_json TEXT NOT NULL DEFAULT '[]',
                language TEXT NOT NULL,
                template TEXT NOT NULL,
                profile_json TEXT NOT NULL,
                tailored_summary TEXT NOT NULL,
                tailored_experience_json TEXT NOT NULL,
                motivation_letter TEXT NOT NULL,
                keywords_json TEXT NOT NULL,
                has_pdf BOOLEAN NOT NULL DEFAULT FALSE,
                has_letter_pdf BOOLEAN NOT NULL DEFAULT FALSE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cv_generations_user ON cv_generations(user_id, created_at);",
        )
        .execute(&self.pool)
        .await?;

        app_log!(info, "Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

// ===== Users =====

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user. A duplicate email is a `Conflict`.
    pub async fn create(&self, email: &str, password_hash: &str) -> CvResult<User> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {
                app_log!(info, "Created user {}", user.id);
                Ok(user)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(CvToolError::Conflict("Email already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> CvResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: &str) -> CvResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Remove the user with their profile and generation history. Returns the
    /// ids of the removed sessions so cached files can be deleted.
    pub async fn delete_cascade(&self, id: &str) -> CvResult<Vec<String>> {
        let mut tx = self.pool.begin().await?;

        let session_ids: Vec<String> =
            sqlx::query_scalar("SELECT session_id FROM cv_generations WHERE user_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM cv_generations WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM profiles WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(CvToolError::NotFound("Account not found".to_string()));
        }

        tx.commit().await?;
        app_log!(info, "Deleted user {} and {} sessions", id, session_ids.len());
        Ok(session_ids)
    }
}

// ===== Profiles =====

/// Stored profile plus the onboarding fields kept next to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile: Option<Profile>,
    pub additional_urls: Vec<String>,
    pub personal_summary: String,
    pub onboarding_complete: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields to change; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub profile: Option<Profile>,
    pub additional_urls: Option<Vec<String>>,
    pub personal_summary: Option<String>,
    pub onboarding_complete: Option<bool>,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    profile_json: String,
    additional_urls: String,
    personal_summary: String,
    onboarding_complete: bool,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_record(self) -> Result<ProfileRecord> {
        let profile = if self.profile_json.trim().is_empty() || self.profile_json == "null" {
            None
        } else {
            Some(serde_json::from_str(&self.profile_json).context("Stored profile is corrupt")?)
        };
        Ok(ProfileRecord {
            profile,
            additional_urls: serde_json::from_str(&self.additional_urls)
                .context("Stored additional_urls are corrupt")?,
            personal_summary: self.personal_summary,
            onboarding_complete: self.onboarding_complete,
            updated_at: Some(self.updated_at),
        })
    }
}

pub struct ProfileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored record, or an empty one when the user never saved anything.
    pub async fn get(&self, user_id: &str) -> CvResult<ProfileRecord> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT profile_json, additional_urls, personal_summary, onboarding_complete, updated_at \
             FROM profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into_record()?),
            None => Ok(ProfileRecord::default()),
        }
    }

    /// Apply a partial update; last write wins.
    pub async fn save(&self, user_id: &str, update: ProfileUpdate) -> CvResult<ProfileRecord> {
        let mut record = self.get(user_id).await?;
        if let Some(profile) = update.profile {
            record.profile = Some(profile);
        }
        if let Some(urls) = update.additional_urls {
            record.additional_urls = urls;
        }
        if let Some(summary) = update.personal_summary {
            record.personal_summary = summary;
        }
        if let Some(done) = update.onboarding_complete {
            record.onboarding_complete = done;
        }
        let updated_at = Utc::now();
        record.updated_at = Some(updated_at);

        let profile_json = serde_json::to_string(&record.profile)
            .context("Failed to serialize profile")?;
        let urls_json = serde_json::to_string(&record.additional_urls)
            .context("Failed to serialize additional_urls")?;

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, profile_json, additional_urls, personal_summary, onboarding_complete, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                additional_urls = excluded.additional_urls,
                personal_summary = excluded.personal_summary,
                onboarding_complete = excluded.onboarding_complete,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(profile_json)
        .bind(urls_json)
        .bind(&record.personal_summary)
        .bind(record.onboarding_complete)
        .bind(updated_at)
        .execute(self.pool)
        .await?;

        app_log!(debug, "Saved profile for user {}", user_id);
        Ok(record)
    }
}

// ===== Generation sessions =====

#[derive(sqlx::FromRow)]
struct GenerationRow {
    session_id: String,
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    job_description: String,
    personal_summary: Option<String>,
    additional_urls_json: String,
    language: String,
    template: String,
    profile_json: String,
    tailored_summary: String,
    tailored_experience_json: String,
    motivation_letter: String,
    keywords_json: String,
    has_pdf: bool,
    has_letter_pdf: bool,
}

impl GenerationRow {
    fn into_session(self) -> Result<GenerationSession> {
        Ok(GenerationSession {
            profile: serde_json::from_str(&self.profile_json)
                .context("Stored session profile is corrupt")?,
            tailored_experience: serde_json::from_str::<Vec<Experience>>(
                &self.tailored_experience_json,
            )
            .context("Stored tailored experience is corrupt")?,
            suggested_skills_highlight: serde_json::from_str(&self.keywords_json)
                .context("Stored keywords are corrupt")?,
            additional_urls: serde_json::from_str(&self.additional_urls_json)
                .context("Stored additional URLs are corrupt")?,
            id: self.session_id,
            owner_id: self.user_id,
            created_at: self.created_at,
            job_description: self.job_description,
            personal_summary: self.personal_summary,
            language: self.language,
            template: self.template,
            tailored_summary: self.tailored_summary,
            motivation_letter: self.motivation_letter,
            has_pdf: self.has_pdf,
            has_letter_pdf: self.has_letter_pdf,
        })
    }
}

/// Which cached PDF a flag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    Cv,
    Letter,
}

pub struct GenerationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GenerationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, session: &GenerationSession) -> CvResult<()> {
        let profile_json =
            serde_json::to_string(&session.profile).context("Failed to serialize profile")?;
        let experience_json = serde_json::to_string(&session.tailored_experience)
            .context("Failed to serialize tailored experience")?;
        let keywords_json = serde_json::to_string(&session.suggested_skills_highlight)
            .context("Failed to serialize keywords")?;
        let urls_json = serde_json::to_string(&session.additional_urls)
            .context("Failed to serialize additional URLs")?;

        sqlx::query(
            r#"
            INSERT INTO cv_generations (
                session_id, user_id, created_at, job_description, personal_summary,
                additional_urls_json, language, template, profile_json, tailored_summary,
                tailored_experience_json, motivation_letter, keywords_json, has_pdf, has_letter_pdf
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.owner_id)
        .bind(session.created_at)
        .bind(&session.job_description)
        .bind(&session.personal_summary)
        .bind(urls_json)
        .bind(&session.language)
        .bind(&session.template)
        .bind(profile_json)
        .bind(&session.tailored_summary)
        .bind(experience_json)
        .bind(&session.motivation_letter)
        .bind(keywords_json)
        .bind(session.has_pdf)
        .bind(session.has_letter_pdf)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Session `id` if it belongs to `owner` (`None` = anonymous).
    pub async fn find(&self, id: &str, owner: Option<&str>) -> CvResult<Option<GenerationSession>> {
        let row = sqlx::query_as::<_, GenerationRow>(
            "SELECT * FROM cv_generations WHERE session_id = ? AND user_id IS ?",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(GenerationRow::into_session).transpose()?)
    }

    /// Newest first.
    pub async fn list_for_user(&self, user_id: &str) -> CvResult<Vec<SessionSummary>> {
        let rows = sqlx::query_as::<_, GenerationRow>(
            "SELECT * FROM cv_generations WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            summaries.push(row.into_session()?.summary());
        }
        Ok(summaries)
    }

    pub async fn mark_pdf(&self, id: &str, kind: PdfKind) -> CvResult<()> {
        let sql = match kind {
            PdfKind::Cv => "UPDATE cv_generations SET has_pdf = TRUE WHERE session_id = ?",
            PdfKind::Letter => {
                "UPDATE cv_generations SET has_letter_pdf = TRUE WHERE session_id = ?"
            }
        };
        sqlx::query(sql).bind(id).execute(self.pool).await?;
        Ok(())
    }

    /// Delete sessions created before `cutoff`, returning their ids.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> CvResult<Vec<String>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT session_id FROM cv_generations WHERE created_at < ?")
                .bind(cutoff)
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM cv_generations WHERE created_at < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(ids)
    }
}
