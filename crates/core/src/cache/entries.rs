//! SQLite-backed [`CacheStorage`].
//!
//! Stores live in `cache_stores`; entries in `cache_entries` reference their
//! store and are removed with it by `ON DELETE CASCADE`.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::entry::{CacheEntry, EntryMeta};
use super::storage::CacheStorage;
use crate::Error;
use crate::http::Response;

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("bad cached_at {raw:?}: {e}")))
}

fn parse_headers(raw: &str) -> Result<BTreeMap<String, String>, Error> {
    Ok(serde_json::from_str(raw)?)
}

/// Row shape shared by `get` before decoding.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    cached_at: String,
}

impl EntryRow {
    fn decode(self) -> Result<CacheEntry, Error> {
        Ok(CacheEntry {
            key: self.key,
            method: self.method,
            url: self.url,
            response: Response {
                status: self.status,
                headers: parse_headers(&self.headers_json)?,
                body: Bytes::from(self.body),
            },
            cached_at: parse_ts(&self.cached_at)?,
        })
    }
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = format_ts(Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, name: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let name = name.to_string();
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, headers_json, body, cached_at
                     FROM cache_entries WHERE cache_name = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![name, key], |row| {
                    Ok(EntryRow {
                        key: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get(3)?,
                        headers_json: row.get(4)?,
                        body: row.get(5)?,
                        cached_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::decode).transpose()
    }

    /// Upsert an entry, creating its store first if needed.
    async fn put(&self, name: &str, entry: &CacheEntry) -> Result<(), Error> {
        let name = name.to_string();
        let headers_json = serde_json::to_string(&entry.response.headers)?;
        let entry = entry.clone();
        let now = format_ts(Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![&name, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        cache_name, key, method, url, status, headers_json, body, cached_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(cache_name, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                    params![
                        &name,
                        &entry.key,
                        &entry.method,
                        &entry.url,
                        entry.response.status,
                        headers_json,
                        entry.response.body.as_ref(),
                        format_ts(entry.cached_at),
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1 AND key = ?2", params![name, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list(&self, name: &str) -> Result<Vec<EntryMeta>, Error> {
        let name = name.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String, String, String, i64)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, url, headers_json, cached_at, length(body)
                     FROM cache_entries WHERE cache_name = ?1",
                )?;
                let rows = stmt
                    .query_map(params![name], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(key, url, headers_json, cached_at, body_len)| {
                let headers = parse_headers(&headers_json)?;
                Ok(EntryMeta {
                    key,
                    url,
                    cached_at: parse_ts(&cached_at)?,
                    declared_size: headers.get("content-length").and_then(|v| v.trim().parse().ok()),
                    body_len: body_len.max(0) as u64,
                })
            })
            .collect()
    }
}
