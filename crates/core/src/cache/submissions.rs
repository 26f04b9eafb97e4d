//! Pending form submissions.
//!
//! Each queue tag holds at most one payload. A submission is removed only
//! by an explicit `delete_submission` after its replay succeeded, and only if
//! it was not replaced in the meantime.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// A queued form payload awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSubmission {
    /// Row id; changes every time the tag is re-queued.
    pub id: i64,
    pub tag: String,
    pub payload: serde_json::Value,
    pub queued_at: String,
}

impl CacheDb {
    /// Queue a payload for `tag`, replacing any payload already queued there.
    pub async fn put_submission(&self, tag: &str, payload: &serde_json::Value) -> Result<PendingSubmission, Error> {
        let payload_json =
            serde_json::to_string(payload).map_err(|e| Error::InvalidInput(format!("payload is not JSON: {e}")))?;
        let tag = tag.to_string();
        let payload = payload.clone();
        let queued_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<PendingSubmission, Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO pending_submissions (tag, payload_json, queued_at)
                    VALUES (?1, ?2, ?3)",
                    params![tag, payload_json, queued_at],
                )?;
                Ok(PendingSubmission { id: conn.last_insert_rowid(), tag, payload, queued_at })
            })
            .await
            .map_err(Error::from)
    }

    /// Get the submission queued for `tag`.
    ///
    /// Returns None if nothing is queued.
    pub async fn get_submission(&self, tag: &str) -> Result<Option<PendingSubmission>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Option<PendingSubmission>, Error> {
                let row = conn
                    .query_row(
                        "SELECT id, tag, payload_json, queued_at FROM pending_submissions WHERE tag = ?1",
                        params![tag],
                        |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                            ))
                        },
                    )
                    .optional()?;

                row.map(|(id, tag, payload_json, queued_at)| -> Result<PendingSubmission, Error> {
                    let payload = serde_json::from_str(&payload_json)
                        .map_err(|e| Error::CorruptEntry(format!("submission {tag}: {e}")))?;
                    Ok(PendingSubmission { id, tag, payload, queued_at })
                })
                .transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// Remove `submission` if it is still the one queued for its tag.
    ///
    /// Returns false if the tag is empty or was re-queued since.
    pub async fn delete_submission(&self, submission: &PendingSubmission) -> Result<bool, Error> {
        let tag = submission.tag.clone();
        let id = submission.id;
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM pending_submissions WHERE tag = ?1 AND id = ?2", params![tag, id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let payload = json!({"name": "Ravi", "email": "ravi@example.com", "message": "hello"});

        db.put_submission("contact-form", &payload).await.unwrap();

        let found = db.get_submission("contact-form").await.unwrap().unwrap();
        assert_eq!(found.tag, "contact-form");
        assert_eq!(found.payload, payload);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_submission("newsletter").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requeue_replaces_payload() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_submission("newsletter", &json!({"email": "a@example.com"}))
            .await
            .unwrap();
        db.put_submission("newsletter", &json!({"email": "b@example.com"}))
            .await
            .unwrap();

        let found = db.get_submission("newsletter").await.unwrap().unwrap();
        assert_eq!(found.payload, json!({"email": "b@example.com"}));
    }

    #[tokio::test]
    async fn test_delete_is_per_tag() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let contact = db
            .put_submission("contact-form", &json!({"message": "hi"}))
            .await
            .unwrap();
        db.put_submission("newsletter", &json!({"email": "a@example.com"}))
            .await
            .unwrap();

        assert!(db.delete_submission(&contact).await.unwrap());
        assert!(!db.delete_submission(&contact).await.unwrap());
        assert!(db.get_submission("contact-form").await.unwrap().is_none());
        assert!(db.get_submission("newsletter").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_skips_requeued_payload() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db
            .put_submission("contact-form", &json!({"message": "first"}))
            .await
            .unwrap();
        let second = db
            .put_submission("contact-form", &json!({"message": "second"}))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        assert!(!db.delete_submission(&first).await.unwrap());
        let found = db.get_submission("contact-form").await.unwrap().unwrap();
        assert_eq!(found, second);

        assert!(db.delete_submission(&second).await.unwrap());
        assert!(db.get_submission("contact-form").await.unwrap().is_none());
    }
}
