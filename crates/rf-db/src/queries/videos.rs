//! Video record operations.

use chrono::Utc;
use rf_core::{Error, Result, VideoId};
use rusqlite::Connection;

use crate::models::{NewVideo, Video};

/// Record a generated video.
pub fn create_video(conn: &Connection, new: &NewVideo<'_>) -> Result<Video> {
    let id = VideoId::new();
    let created_at = Utc::now().to_rfc3339();
    let ok_json =
        serde_json::to_string(new.platforms_ok).map_err(|e| Error::Internal(e.to_string()))?;
    let failed_json =
        serde_json::to_string(new.platforms_failed).map_err(|e| Error::Internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO videos (id, run_id, user_email, title, description, source_url,
                             file_path, platforms_ok, platforms_failed, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            id.to_string(),
            new.run_id.to_string(),
            new.user_email,
            new.title,
            new.description,
            new.source_url,
            new.file_path,
            ok_json,
            failed_json,
            new.status,
            created_at,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Video {
        id,
        run_id: new.run_id,
        user_email: new.user_email.to_string(),
        title: new.title.to_string(),
        description: new.description.to_string(),
        source_url: new.source_url.to_string(),
        file_path: new.file_path.to_string(),
        platforms_ok: new.platforms_ok.to_vec(),
        platforms_failed: new.platforms_failed.to_vec(),
        status: new.status.to_string(),
        created_at,
    })
}

/// Get a video by ID.
pub fn get_video(conn: &Connection, id: VideoId) -> Result<Option<Video>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM videos WHERE id = ?1", Video::COLUMNS),
        [id.to_string()],
        Video::from_row,
    );
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Most recent videos first, optionally for one user.
pub fn list_videos(conn: &Connection, user_email: Option<&str>, limit: u32) -> Result<Vec<Video>> {
    let sql = format!(
        "SELECT {} FROM videos WHERE (?1 IS NULL OR user_email = ?1)
         ORDER BY created_at DESC LIMIT ?2",
        Video::COLUMNS
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![user_email, limit], Video::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Total number of recorded videos.
pub fn count_videos(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use rf_core::RunId;

    fn new_video<'a>(email: &'a str, ok: &'a [String], failed: &'a [String]) -> NewVideo<'a> {
        NewVideo {
            run_id: RunId::new(),
            user_email: email,
            title: "Solar System",
            description: "The Solar System...\n\nSource: https://en.wikipedia.org/wiki/Solar_System",
            source_url: "https://en.wikipedia.org/wiki/Solar_System",
            file_path: "/data/videos/run.mp4",
            platforms_ok: ok,
            platforms_failed: failed,
            status: if failed.is_empty() { "published_full" } else { "published_partial" },
        }
    }

    #[test]
    fn create_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let ok = vec!["youtube".to_string()];
        let failed = vec!["vimeo".to_string()];
        let created = create_video(&conn, &new_video("a@example.com", &ok, &failed)).unwrap();

        let fetched = get_video(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.run_id, created.run_id);
        assert_eq!(fetched.platforms_ok, ok);
        assert_eq!(fetched.platforms_failed, failed);
        assert_eq!(fetched.status, "published_partial");
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[test]
    fn get_missing_is_none() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        assert!(get_video(&conn, VideoId::new()).unwrap().is_none());
    }

    #[test]
    fn list_filters_by_user_and_limits() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let ok = vec!["youtube".to_string()];

        for _ in 0..3 {
            create_video(&conn, &new_video("a@example.com", &ok, &[])).unwrap();
        }
        create_video(&conn, &new_video("b@example.com", &ok, &[])).unwrap();

        assert_eq!(list_videos(&conn, None, 50).unwrap().len(), 4);
        assert_eq!(list_videos(&conn, Some("a@example.com"), 50).unwrap().len(), 3);
        assert_eq!(list_videos(&conn, None, 2).unwrap().len(), 2);
        assert_eq!(count_videos(&conn).unwrap(), 4);
    }
}
