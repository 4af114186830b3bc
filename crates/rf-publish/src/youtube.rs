//! YouTube Data API v3 uploader.
//!
//! Authentication uses an installed-app OAuth client (the `credentials`
//! file downloaded from the Google console) plus a stored token file that
//! carries a refresh token. Access tokens are refreshed against the client's
//! `token_uri` when they are missing or about to expire, and the refreshed
//! token is written back to the token file.
//!
//! Uploads use the resumable protocol: one POST that carries the metadata and
//! returns a session URL, then one PUT that streams the file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rf_core::config::PlatformConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::publisher::Publisher;

const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SERVICE: &str = "youtube";

/// Longest title the API accepts.
const MAX_TITLE_CHARS: usize = 100;

/// Tokens expiring sooner than this are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Publishes to one YouTube channel.
pub struct YouTubePublisher {
    http: reqwest::Client,
    client: ClientSecret,
    token_path: PathBuf,
    upload_url: String,
    api_key: Option<String>,
}

impl YouTubePublisher {
    /// Build from a user's platform entry.
    ///
    /// `credentials` is required; `token` defaults to `token.json` beside
    /// it; `upload_path` overrides the upload endpoint.
    pub fn from_config(http: reqwest::Client, cfg: &PlatformConfig) -> rf_core::Result<Self> {
        let credentials = cfg.credentials.as_deref().ok_or_else(|| {
            rf_core::Error::Validation("youtube platform requires a credentials file".into())
        })?;
        let client = ClientSecret::load(credentials)?;

        let token_path = cfg.token.clone().unwrap_or_else(|| {
            credentials
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("token.json")
        });

        Ok(Self {
            http,
            client,
            token_path,
            upload_url: cfg
                .upload_path
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| UPLOAD_URL.to_string()),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// A valid access token, refreshing (and persisting) it if needed.
    async fn access_token(&self) -> rf_core::Result<String> {
        let raw = tokio::fs::read_to_string(&self.token_path).await.map_err(|e| {
            rf_core::Error::Validation(format!(
                "cannot read youtube token {}: {e}",
                self.token_path.display()
            ))
        })?;
        let mut token: StoredToken = serde_json::from_str(&raw).map_err(|e| {
            rf_core::Error::Validation(format!(
                "invalid youtube token {}: {e}",
                self.token_path.display()
            ))
        })?;

        if token.is_fresh(Utc::now()) {
            return Ok(token.access_token);
        }
        if token.refresh_token.is_empty() {
            return Err(rf_core::Error::Validation(format!(
                "youtube token {} is expired and has no refresh_token; re-authorize the client",
                self.token_path.display()
            )));
        }

        tracing::debug!(token = %self.token_path.display(), "Refreshing youtube access token");
        let resp = self
            .http
            .post(&self.client.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| rf_core::Error::http(SERVICE, format!("token refresh failed: {e}")))?;
        let resp = check_status(resp, "token refresh").await?;
        let refreshed: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| rf_core::Error::http(SERVICE, format!("token refresh parse error: {e}")))?;

        token.access_token = refreshed.access_token;
        if let Some(token_type) = refreshed.token_type {
            token.token_type = token_type;
        }
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + TimeDelta::seconds(secs));

        match serde_json::to_string_pretty(&token) {
            Ok(json) => {
                let path = self.token_path.clone();
                let written = tokio::task::spawn_blocking(move || replace_token_file(&path, &json))
                    .await
                    .map_err(std::io::Error::other)
                    .and_then(|r| r);
                if let Err(e) = written {
                    tracing::warn!(token = %self.token_path.display(), error = %e, "Failed to persist refreshed token");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize refreshed token"),
        }

        Ok(token.access_token)
    }

    /// Open a resumable upload session and return its URL.
    async fn start_session(
        &self,
        access_token: &str,
        size: u64,
        title: &str,
        description: &str,
        tags: &[String],
    ) -> rf_core::Result<String> {
        let title: String = title.chars().take(MAX_TITLE_CHARS).collect();
        let metadata = json!({
            "snippet": {
                "title": title,
                "description": description,
                "tags": tags,
            },
            "status": {
                "privacyStatus": "public",
            },
        });

        let mut query: Vec<(&str, &str)> = vec![("uploadType", "resumable"), ("part", "snippet,status")];
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let resp = self
            .http
            .post(&self.upload_url)
            .query(&query)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", size.to_string())
            .json(&metadata)
            .send()
            .await
            .map_err(|e| rf_core::Error::http(SERVICE, format!("upload session request failed: {e}")))?;
        let resp = check_status(resp, "upload session").await?;

        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| rf_core::Error::http(SERVICE, "upload session response has no Location header"))
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    fn platform(&self) -> &str {
        SERVICE
    }

    async fn upload(
        &self,
        asset: &Path,
        title: &str,
        description: &str,
        tags: &[String],
    ) -> rf_core::Result<()> {
        let file = tokio::fs::File::open(asset).await?;
        let size = file.metadata().await?.len();

        let access_token = self.access_token().await?;
        let session = self
            .start_session(&access_token, size, title, description, tags)
            .await?;

        let resp = self
            .http
            .put(&session)
            .bearer_auth(&access_token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| rf_core::Error::http(SERVICE, format!("upload failed: {e}")))?;
        let resp = check_status(resp, "upload").await?;

        let video: UploadedVideo = resp.json().await.unwrap_or_default();
        tracing::info!(
            platform = SERVICE,
            video_id = video.id.as_deref().unwrap_or("unknown"),
            bytes = size,
            "Uploaded video"
        );
        Ok(())
    }
}

/// Replace the token file through a sibling temp file and a rename.
/// Concurrent readers see the old token or the new one, never a partial file.
fn replace_token_file(path: &Path, json: &str) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn check_status(resp: reqwest::Response, what: &str) -> rf_core::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let body: String = body.chars().take(300).collect();
    Err(rf_core::Error::http(SERVICE, format!("{what} {status}: {body}")))
}

// ---------------------------------------------------------------------------
// Credential files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    fn load(path: &Path) -> rf_core::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            rf_core::Error::Validation(format!(
                "cannot read youtube credentials {}: {e}",
                path.display()
            ))
        })?;
        let file: ClientSecretFile = serde_json::from_str(&raw).map_err(|e| {
            rf_core::Error::Validation(format!(
                "invalid youtube credentials {}: {e}",
                path.display()
            ))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            rf_core::Error::Validation(format!(
                "youtube credentials {} have neither an 'installed' nor a 'web' client",
                path.display()
            ))
        })
    }
}

/// OAuth token as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredToken {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self
                .expiry
                .is_some_and(|exp| exp > now + TimeDelta::seconds(EXPIRY_MARGIN_SECS))
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadedVideo {
    id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        dir: tempfile::TempDir,
        cfg: PlatformConfig,
        asset: PathBuf,
    }

    fn fixture(server: &MockServer, token: serde_json::Value) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("client_secret.json");
        std::fs::write(
            &credentials,
            json!({"installed": {
                "client_id": "cid",
                "client_secret": "csecret",
                "token_uri": format!("{}/token", server.uri())
            }})
            .to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("token.json"), token.to_string()).unwrap();

        let asset = dir.path().join("final.mp4");
        std::fs::write(&asset, b"fake video payload").unwrap();

        let cfg = PlatformConfig {
            name: "youtube".into(),
            credentials: Some(credentials),
            api_key: Some("apikey".into()),
            upload_path: Some(format!("{}/upload/youtube/v3/videos", server.uri())),
            token: None,
        };
        Fixture { dir, cfg, asset }
    }

    async fn mount_upload(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("part", "snippet,status"))
            .and(query_param("key", "apikey"))
            .and(body_string_contains("\"privacyStatus\":\"public\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/session/1", server.uri()).as_str()),
            )
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "vid123"})))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fresh_token_uploads_without_refresh() {
        let server = MockServer::start().await;
        let expiry = (Utc::now() + TimeDelta::hours(1)).to_rfc3339();
        let fx = fixture(
            &server,
            json!({"access_token": "live", "refresh_token": "r", "expiry": expiry}),
        );
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        mount_upload(&server).await;

        let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &fx.cfg).unwrap();
        publisher
            .upload(&fx.asset, "Title", "Description", &["space".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let server = MockServer::start().await;
        let fx = fixture(
            &server,
            json!({"access_token": "old", "refresh_token": "refresh-me", "expiry": "2001-01-01T00:00:00Z"}),
        );
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token", "token_type": "Bearer", "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_upload(&server).await;

        let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &fx.cfg).unwrap();
        publisher.upload(&fx.asset, "Title", "Desc", &[]).await.unwrap();

        let saved: StoredToken = serde_json::from_str(
            &std::fs::read_to_string(fx.dir.path().join("token.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved.access_token, "new-token");
        assert_eq!(saved.refresh_token, "refresh-me");
        assert!(saved.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn upload_rejection_is_error() {
        let server = MockServer::start().await;
        let expiry = (Utc::now() + TimeDelta::hours(1)).to_rfc3339();
        let fx = fixture(&server, json!({"access_token": "live", "expiry": expiry}));
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(header("authorization", "Bearer live"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &fx.cfg).unwrap();
        let err = publisher.upload(&fx.asset, "T", "D", &[]).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("HTTP error [youtube]: upload session 403"), "got: {msg}");
        assert!(msg.contains("quotaExceeded"));
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_is_error() {
        let server = MockServer::start().await;
        let fx = fixture(&server, json!({"access_token": "old"}));
        let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &fx.cfg).unwrap();
        let err = publisher.upload(&fx.asset, "T", "D", &[]).await.unwrap_err();
        assert!(err.to_string().contains("re-authorize"), "got: {err}");
    }

    #[tokio::test]
    async fn concurrent_refreshes_never_expose_a_partial_token_file() {
        let server = MockServer::start().await;
        // A large refresh token widens the write window.
        let refresh_token = "r".repeat(512 * 1024);
        let fx = fixture(
            &server,
            json!({"access_token": "old", "refresh_token": refresh_token, "expiry": "2001-01-01T00:00:00Z"}),
        );
        // Every refreshed token is already stale, so every upload refreshes
        // and rewrites the shared file.
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token", "expires_in": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/session/1", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "vid"})))
            .mount(&server)
            .await;

        let mut uploads = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let publisher = std::sync::Arc::new(
                YouTubePublisher::from_config(reqwest::Client::new(), &fx.cfg).unwrap(),
            );
            for _ in 0..4 {
                let publisher = publisher.clone();
                let asset = fx.asset.clone();
                uploads.spawn(async move { publisher.upload(&asset, "T", "D", &[]).await });
            }
        }

        let mut failures = Vec::new();
        while let Some(done) = uploads.join_next().await {
            if let Err(e) = done.unwrap() {
                failures.push(e.to_string());
            }
        }
        assert!(failures.is_empty(), "failed uploads: {failures:?}");

        let saved: StoredToken = serde_json::from_str(
            &std::fs::read_to_string(fx.dir.path().join("token.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved.access_token, "new-token");
        assert_eq!(saved.refresh_token.len(), 512 * 1024);
        // No temp files are left beside the token.
        let names: Vec<String> = std::fs::read_dir(fx.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3, "unexpected files: {names:?}");
    }

    #[test]
    fn web_client_and_default_token_path() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("secret.json");
        std::fs::write(
            &credentials,
            r#"{"web": {"client_id": "a", "client_secret": "b"}}"#,
        )
        .unwrap();
        let cfg = PlatformConfig {
            name: "youtube".into(),
            credentials: Some(credentials),
            ..Default::default()
        };
        let publisher = YouTubePublisher::from_config(reqwest::Client::new(), &cfg).unwrap();
        assert_eq!(publisher.token_path, dir.path().join("token.json"));
        assert_eq!(publisher.client.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(publisher.upload_url, UPLOAD_URL);
    }

    #[test]
    fn freshness_respects_margin() {
        let now = Utc::now();
        let token = StoredToken {
            access_token: "t".into(),
            expiry: Some(now + TimeDelta::seconds(30)),
            ..Default::default()
        };
        assert!(!token.is_fresh(now));
        let token = StoredToken {
            expiry: Some(now + TimeDelta::seconds(600)),
            ..token
        };
        assert!(token.is_fresh(now));
    }
}
