//! Entry CRUD operations.
//!
//! An entry maps a request identity (method + URL, hashed) to a stored
//! response. Entries are written wholesale and never mutated in place: a
//! second `put` for the same request replaces the first.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const ENTRY_COLUMNS: &str = "key_hash, method, url, status_code, headers_json, body, stored_at";

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedResponse {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    /// Age of this entry relative to now, or None if `stored_at` is unreadable.
    pub fn age(&self) -> Option<chrono::Duration> {
        let stored_at = chrono::DateTime::parse_from_rfc3339(&self.stored_at).ok()?;
        Some(chrono::Utc::now().signed_duration_since(stored_at))
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Self, String)> {
        let headers_json: String = row.get(4)?;
        let entry = CachedResponse {
            key_hash: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status_code: row.get::<_, i64>(3)? as u16,
            headers: Vec::new(),
            body: row.get(5)?,
            stored_at: row.get(6)?,
        };
        Ok((entry, headers_json))
    }
}

fn decode_headers((mut entry, headers_json): (CachedResponse, String)) -> Result<CachedResponse, Error> {
    entry.headers = serde_json::from_str(&headers_json)
        .map_err(|e| Error::InvalidInput(format!("corrupt headers for {}: {e}", entry.url)))?;
    Ok(entry)
}

fn insert_entry(tx: &rusqlite::Transaction<'_>, partition: &str, entry: &CachedResponse) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.headers)
        .map_err(|e| Error::InvalidInput(format!("unserializable headers for {}: {e}", entry.url)))?;
    tx.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![partition, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.execute(
        "INSERT INTO entries (
            partition_name, key_hash, method, url, status_code, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(partition_name, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.status_code as i64,
            headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or replace one entry, creating the partition if needed.
    pub async fn put_entry(&self, partition: &str, entry: &CachedResponse) -> Result<(), Error> {
        self.put_batches(vec![(partition.to_string(), vec![entry.clone()])])
            .await
    }

    /// Insert or replace several entries in one partition atomically.
    pub async fn put_entries(&self, partition: &str, entries: Vec<CachedResponse>) -> Result<(), Error> {
        self.put_batches(vec![(partition.to_string(), entries)]).await
    }

    /// Write batches into several partitions in a single transaction.
    ///
    /// Either every entry lands or none does.
    pub async fn put_batches(&self, batches: Vec<(String, Vec<CachedResponse>)>) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (partition, entries) in &batches {
                    for entry in entries {
                        insert_entry(&tx, partition, entry)?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry in one partition.
    pub async fn match_entry(&self, partition: &str, key_hash: &str) -> Result<Option<CachedResponse>, Error> {
        let partition = partition.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition_name = ?1 AND key_hash = ?2");
                let result = conn.query_row(&sql, params![partition, key_hash], CachedResponse::from_row);

                match result {
                    Ok(row) => decode_headers(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry across every partition, oldest partition first.
    ///
    /// Returns the matching partition's name alongside the entry.
    pub async fn match_any(&self, key_hash: &str) -> Result<Option<(String, CachedResponse)>, Error> {
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<(String, CachedResponse)>, Error> {
                let result = conn.query_row(
                    "SELECT e.key_hash, e.method, e.url, e.status_code, e.headers_json, e.body, e.stored_at,
                            e.partition_name
                     FROM entries e
                     JOIN partitions p ON p.name = e.partition_name
                     WHERE e.key_hash = ?1
                     ORDER BY p.rowid ASC
                     LIMIT 1",
                    params![key_hash],
                    |row| Ok((CachedResponse::from_row(row)?, row.get::<_, String>(7)?)),
                );

                match result {
                    Ok((row, partition)) => Ok(Some((partition, decode_headers(row)?))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it wasn't there.
    pub async fn delete_entry(&self, partition: &str, key_hash: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition_name = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a partition, in insertion order.
    pub async fn entry_urls(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition_name = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
