//! Rust structs mapping to database tables.

use rf_core::{RunId, VideoId};
use serde::Serialize;
use uuid::Uuid;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

/// Parse a JSON string-array column.
fn parse_list(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// A generated video and where it was published.
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: VideoId,
    pub run_id: RunId,
    pub user_email: String,
    pub title: String,
    pub description: String,
    pub source_url: String,
    pub file_path: String,
    pub platforms_ok: Vec<String>,
    pub platforms_failed: Vec<String>,
    /// `published_full` or `published_partial`.
    pub status: String,
    pub created_at: String,
}

impl Video {
    /// Column order expected by [`Video::from_row`].
    pub(crate) const COLUMNS: &'static str = "id, run_id, user_email, title, description, source_url, \
         file_path, platforms_ok, platforms_failed, status, created_at";

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            run_id: parse_id(row, 1)?,
            user_email: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            source_url: row.get(5)?,
            file_path: row.get(6)?,
            platforms_ok: parse_list(row, 7)?,
            platforms_failed: parse_list(row, 8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

/// Fields supplied when recording a video.
#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub run_id: RunId,
    pub user_email: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub source_url: &'a str,
    pub file_path: &'a str,
    pub platforms_ok: &'a [String],
    pub platforms_failed: &'a [String],
    pub status: &'a str,
}
