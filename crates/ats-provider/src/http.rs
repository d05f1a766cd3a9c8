//! Single-shot JSON calls to an upstream ATS
//!
//! One request, no retries. Non-2xx statuses, connection failures and
//! undecodable bodies all become `AtsError` values; a 204 or an empty body is
//! `None` so adapters can treat "no data" as an empty list.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AtsError, Result};

/// Send a prepared request and decode its JSON body.
pub async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<Option<T>> {
    let (client, request) = request.build_split();
    let request = request.map_err(|e| AtsError::Internal(format!("building request: {e}")))?;
    let url = request.url().to_string();
    let method = request.method().clone();

    let response = client
        .execute(request)
        .await
        .map_err(|e| AtsError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

    let status = response.status();
    debug!(%method, url = %url, status = status.as_u16(), "upstream responded");

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(AtsError::Upstream {
            url,
            status: status.as_u16(),
            body,
        });
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let bytes = response.bytes().await.map_err(|e| AtsError::Transport {
        url: url.clone(),
        message: format!("reading body: {e}"),
    })?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AtsError::Decode {
            url,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tokio::net::TcpListener;

    async fn spawn_upstream(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn no_content_is_none() {
        let url = spawn_upstream(
            axum::Router::new().fallback(|| async { StatusCode::NO_CONTENT }),
        )
        .await;
        let client = reqwest::Client::new();
        let result: Option<serde_json::Value> = send_json(client.get(&url)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn empty_ok_body_is_none() {
        let url = spawn_upstream(axum::Router::new().fallback(|| async { "" })).await;
        let client = reqwest::Client::new();
        let result: Option<serde_json::Value> = send_json(client.get(&url)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let url = spawn_upstream(axum::Router::new().fallback(|| async {
            (StatusCode::UNAUTHORIZED, r#"{"detail":"Unauthorized"}"#)
        }))
        .await;
        let client = reqwest::Client::new();
        let err = send_json::<serde_json::Value>(client.post(&url))
            .await
            .unwrap_err();
        match err {
            AtsError::Upstream { status, body, .. } => {
                assert_eq!(status, 401);
                assert!(body.contains("Unauthorized"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_decode_error() {
        let url = spawn_upstream(axum::Router::new().fallback(|| async { "<html>oops</html>" }))
            .await;
        let client = reqwest::Client::new();
        let err = send_json::<serde_json::Value>(client.get(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, AtsError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_transport_error() {
        let client = reqwest::Client::new();
        let err = send_json::<serde_json::Value>(client.get("http://127.0.0.1:1/jobs"))
            .await
            .unwrap_err();
        assert!(matches!(err, AtsError::Transport { .. }), "got {err:?}");
    }
}
