//! Versioned response caches.
//!
//! A cache version is a named container of entries. Lookups that are not
//! scoped to a version walk the versions in creation order and return the
//! first match, so a previous version stays readable until activation
//! deletes it.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{ResponseType, WorkerResponse};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row};
use tokio_rusqlite::params;

const ENTRY_COLUMNS: &str = "cache_name, key, method, url, status, status_text, headers_json, body, response_type, stored_at";

/// A cached response, keyed by request identity within one cache version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_name: String,
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers_json: String,
    pub body: Vec<u8>,
    pub response_type: String,
    pub stored_at: String,
}

impl CacheEntry {
    /// Capture a response for storage under `cache_name`.
    pub fn from_response(cache_name: &str, method: &str, request_url: &str, response: &WorkerResponse) -> Self {
        Self {
            cache_name: cache_name.to_string(),
            key: compute_request_key(method, request_url),
            method: method.to_ascii_uppercase(),
            url: request_url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers).unwrap_or_else(|_| "[]".into()),
            body: response.body.to_vec(),
            response_type: response.response_type.as_str().to_string(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild the stored response.
    pub fn to_response(&self) -> Result<WorkerResponse, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{}: headers: {e}", self.url)))?;
        Ok(WorkerResponse {
            url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers,
            body: Bytes::from(self.body.clone()),
            response_type: self.response_type.parse::<ResponseType>()?,
        })
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            cache_name: row.get(0)?,
            key: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            status: row.get(4)?,
            status_text: row.get(5)?,
            headers_json: row.get(6)?,
            body: row.get(7)?,
            response_type: row.get(8)?,
            stored_at: row.get(9)?,
        })
    }
}

fn upsert_entry(conn: &rusqlite::Connection, entry: &CacheEntry) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO cache_entries (
            cache_name, key, method, url, status, status_text,
            headers_json, body, response_type, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(cache_name, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            response_type = excluded.response_type,
            stored_at = excluded.stored_at",
        params![
            &entry.cache_name,
            &entry.key,
            &entry.method,
            &entry.url,
            entry.status,
            &entry.status_text,
            &entry.headers_json,
            &entry.body,
            &entry.response_type,
            &entry.stored_at,
        ],
    )
}

fn create_cache(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )
}

impl CacheDb {
    /// Names of all cache versions, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache version and every entry in it.
    ///
    /// Returns false if no version had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace one entry in an existing cache version.
    ///
    /// Fails with `UnknownCache` if the version was never opened or has been
    /// deleted; entries never resurrect a garbage-collected version.
    pub async fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![&entry.cache_name],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::UnknownCache(entry.cache_name.clone()));
                }
                upsert_entry(conn, &entry)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Create `cache_name` if needed and upsert every entry in one
    /// transaction. Either all entries land or none do.
    pub async fn put_all(&self, cache_name: &str, entries: Vec<CacheEntry>) -> Result<usize, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                create_cache(&tx, &cache_name)?;
                for entry in &entries {
                    if entry.cache_name != cache_name {
                        return Err(Error::InvalidInput(format!(
                            "entry for {} belongs to {}, not {cache_name}",
                            entry.url, entry.cache_name
                        )));
                    }
                    upsert_entry(&tx, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request key up across every cache version, oldest version first.
    pub async fn match_entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries e JOIN caches c ON c.name = e.cache_name
                     WHERE e.key = ?1 ORDER BY c.seq ASC LIMIT 1",
                    qualified_columns("e")
                );
                let entry = conn.query_row(&sql, params![key], CacheEntry::from_row).optional()?;
                Ok(entry)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request key up in one cache version.
    pub async fn match_in(&self, cache_name: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let cache_name = cache_name.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE cache_name = ?1 AND key = ?2");
                let entry = conn
                    .query_row(&sql, params![cache_name, key], CacheEntry::from_row)
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(Error::from)
    }

    /// All entries of one cache version, ordered by URL.
    pub async fn entries(&self, cache_name: &str) -> Result<Vec<CacheEntry>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let sql =
                    format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE cache_name = ?1 ORDER BY url ASC, method ASC");
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(params![cache_name], CacheEntry::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}

fn qualified_columns(alias: &str) -> String {
    ENTRY_COLUMNS
        .split(", ")
        .map(|col| format!("{alias}.{col}"))
        .collect::<Vec<_>>()
        .join(", ")
}
