//! Shared HTTP helpers for the remote content and stock services.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 300;

/// Build a client with a request timeout and user agent.
pub fn build_client(timeout: Duration, user_agent: &str) -> rf_core::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| rf_core::Error::http("client", format!("failed to build HTTP client: {e}")))
}

/// Send a request and decode a JSON body, mapping every failure to
/// [`rf_core::Error::Http`] tagged with `service`.
pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
    service: &str,
    request: reqwest::RequestBuilder,
) -> rf_core::Result<T> {
    let resp = request
        .send()
        .await
        .map_err(|e| rf_core::Error::http(service, format!("request failed: {e}")))?;

    let resp = check_status(service, resp).await?;

    resp.json::<T>()
        .await
        .map_err(|e| rf_core::Error::http(service, format!("parse error: {e}")))
}

async fn check_status(service: &str, resp: reqwest::Response) -> rf_core::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(rf_core::Error::http(service, format!("{status}: {body}")))
}

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// A non-success status is an error. On any failure the partially written
/// file is removed.
pub(crate) async fn download_to_file(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    dest: &Path,
) -> rf_core::Result<u64> {
    let result = stream_to_file(client, service, url, dest).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(dest).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %dest.display(), error = %e, "Failed to remove partial download");
            }
        }
    }
    result
}

async fn stream_to_file(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    dest: &Path,
) -> rf_core::Result<u64> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| rf_core::Error::http(service, format!("download failed: {e}")))?;
    let resp = check_status(service, resp).await?;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| rf_core::Error::http(service, format!("download interrupted: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> reqwest::Client {
        build_client(Duration::from_secs(5), "reelforge-test").unwrap()
    }

    #[tokio::test]
    async fn send_json_maps_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = send_json::<serde_json::Value>(
            "demo",
            client().get(format!("{}/broken", server.uri())),
        )
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("HTTP error [demo]: 503"), "got: {msg}");
        assert!(msg.contains("maintenance"), "got: {msg}");
    }

    #[tokio::test]
    async fn download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 1024]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        let n = download_to_file(&client(), "demo", &format!("{}/clip.mp4", server.uri()), &dest)
            .await
            .unwrap();
        assert_eq!(n, 1024);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 1024);
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");
        let err = download_to_file(&client(), "demo", &format!("{}/gone.mp4", server.uri()), &dest)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"), "got: {err}");
        assert!(!dest.exists());
    }
}
