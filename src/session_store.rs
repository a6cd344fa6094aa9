// src/session_store.rs
//! Owner-scoped storage of generation sessions and their rendered PDFs.

use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};

use crate::app_log;
use crate::core::database::{GenerationRepository, PdfKind};
use crate::core::{Database, FsOps};
use crate::error::{CvResult, CvToolError};
use crate::types::{GenerationSession, SessionSummary};

#[derive(Clone)]
pub struct SessionStore {
    db: Database,
    pdf_dir: PathBuf,
}

impl SessionStore {
    pub fn new(db: Database, pdf_dir: PathBuf) -> Self {
        Self { db, pdf_dir }
    }

    pub fn pdf_dir(&self) -> &Path {
        &self.pdf_dir
    }

    pub async fn put(&self, session: &GenerationSession) -> CvResult<()> {
        GenerationRepository::new(self.db.pool()).insert(session).await?;
        app_log!(info, "Stored generation session {}", session.id);
        Ok(())
    }

    /// The session, only if `owner` matches the one it was created for.
    /// Unknown ids and foreign sessions look the same to the caller.
    pub async fn get(&self, id: &str, owner: Option<&str>) -> CvResult<GenerationSession> {
        GenerationRepository::new(self.db.pool())
            .find(id, owner)
            .await?
            .ok_or_else(|| CvToolError::NotFound("Session not found".to_string()))
    }

    /// Newest first.
    pub async fn list(&self, owner: &str) -> CvResult<Vec<SessionSummary>> {
        GenerationRepository::new(self.db.pool())
            .list_for_user(owner)
            .await
    }

    fn pdf_path(&self, session_id: &str, kind: PdfKind) -> PathBuf {
        let suffix = match kind {
            PdfKind::Cv => "cv",
            PdfKind::Letter => "letter",
        };
        self.pdf_dir.join(format!("{}_{}.pdf", session_id, suffix))
    }

    /// Cached bytes for a session whose flag says they exist.
    pub async fn cached_pdf(
        &self,
        session: &GenerationSession,
        kind: PdfKind,
    ) -> CvResult<Option<Vec<u8>>> {
        let flagged = match kind {
            PdfKind::Cv => session.has_pdf,
            PdfKind::Letter => session.has_letter_pdf,
        };
        if !flagged {
            return Ok(None);
        }
        Ok(FsOps::read_bytes_optional(&self.pdf_path(&session.id, kind)).await?)
    }

    pub async fn attach_pdf(&self, session_id: &str, kind: PdfKind, bytes: &[u8]) -> CvResult<()> {
        FsOps::write_bytes_atomic(&self.pdf_path(session_id, kind), bytes).await?;
        GenerationRepository::new(self.db.pool())
            .mark_pdf(session_id, kind)
            .await
    }

    /// Delete cached files of the given sessions.
    pub async fn remove_files(&self, session_ids: &[String]) {
        for id in session_ids {
            for kind in [PdfKind::Cv, PdfKind::Letter] {
                if let Err(e) = FsOps::remove_file_if_exists(&self.pdf_path(id, kind)).await {
                    app_log!(warn, "Could not remove cached PDF for {}: {}", id, e);
                }
            }
        }
    }

    /// Drop sessions older than `retention_days`. 0 keeps everything.
    pub async fn purge_expired(&self, retention_days: u32) -> CvResult<usize> {
        if retention_days == 0 {
            return Ok(0);
        }
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let ids = GenerationRepository::new(self.db.pool())
            .delete_older_than(cutoff)
            .await?;
        self.remove_files(&ids).await;
        if !ids.is_empty() {
            app_log!(info, "Purged {} sessions older than {} days", ids.len(), retention_days);
        }
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Profile;

    fn session(id: &str, owner: Option<&str>, age_days: i64) -> GenerationSession {
        GenerationSession {
            id: id.to_string(),
            owner_id: owner.map(str::to_string),
            created_at: Utc::now() - Duration::days(age_days),
            job_description: "Backend engineer".into(),
            personal_summary: None,
            additional_urls: vec![],
            language: "en".into(),
            template: "modern".into(),
            profile: Profile {
                full_name: "Jane Doe".into(),
                ..Default::default()
            },
            tailored_summary: "Tailored".into(),
            tailored_experience: vec![],
            motivation_letter: String::new(),
            suggested_skills_highlight: vec!["Go".into()],
            has_pdf: false,
            has_letter_pdf: false,
        }
    }

    async fn store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect("sqlite::memory:").await.unwrap();
        (SessionStore::new(db, dir.path().to_path_buf()), dir)
    }

    #[tokio::test]
    async fn test_get_is_owner_scoped() {
        let (store, _dir) = store().await;
        let mut linked = session("s1", Some("alice"), 0);
        linked.additional_urls = vec!["https://jane.dev".into()];
        store.put(&linked).await.unwrap();
        store.put(&session("anon", None, 0)).await.unwrap();

        let stored = store.get("s1", Some("alice")).await.unwrap();
        assert_eq!(stored.id, "s1");
        assert_eq!(stored.additional_urls, linked.additional_urls);
        assert!(matches!(store.get("s1", Some("bob")).await, Err(CvToolError::NotFound(_))));
        assert!(matches!(store.get("s1", None).await, Err(CvToolError::NotFound(_))));
        assert!(matches!(store.get("missing", Some("alice")).await, Err(CvToolError::NotFound(_))));

        assert_eq!(store.get("anon", None).await.unwrap().id, "anon");
        assert!(store.get("anon", Some("alice")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (store, _dir) = store().await;
        store.put(&session("old", Some("alice"), 3)).await.unwrap();
        store.put(&session("new", Some("alice"), 0)).await.unwrap();
        store.put(&session("mid", Some("alice"), 1)).await.unwrap();
        store.put(&session("other", Some("bob"), 0)).await.unwrap();

        let ids: Vec<String> = store
            .list("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_attach_and_read_pdf() {
        let (store, _dir) = store().await;
        store.put(&session("s1", Some("alice"), 0)).await.unwrap();

        let before = store.get("s1", Some("alice")).await.unwrap();
        assert_eq!(store.cached_pdf(&before, PdfKind::Cv).await.unwrap(), None);

        store.attach_pdf("s1", PdfKind::Cv, b"%PDF-1.4 cv").await.unwrap();
        let after = store.get("s1", Some("alice")).await.unwrap();
        assert!(after.has_pdf);
        assert!(!after.has_letter_pdf);
        assert_eq!(
            store.cached_pdf(&after, PdfKind::Cv).await.unwrap().as_deref(),
            Some(&b"%PDF-1.4 cv"[..])
        );
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, _dir) = store().await;
        store.put(&session("old", Some("alice"), 40)).await.unwrap();
        store.attach_pdf("old", PdfKind::Cv, b"%PDF").await.unwrap();
        store.put(&session("new", Some("alice"), 1)).await.unwrap();

        assert_eq!(store.purge_expired(0).await.unwrap(), 0);
        assert_eq!(store.purge_expired(30).await.unwrap(), 1);
        assert!(store.get("old", Some("alice")).await.is_err());
        assert!(store.get("new", Some("alice")).await.is_ok());
        assert!(!store.pdf_dir().join("old_cv.pdf").exists());
    }
}
