// Errors raised by the external data providers (statistics, directory, weather).

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("CSV error from {url}: {source}")]
    Csv { url: String, source: csv::Error },

    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("a {window_days}-day window ending {end} starts before the earliest date")]
    WindowOutOfRange { window_days: u32, end: NaiveDate },
}

/// Send a GET request and return the body text, mapping transport and
/// non-success statuses into [`ProviderError`].
pub(crate) async fn get_text(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<String, ProviderError> {
    let response = request.send().await.map_err(|e| ProviderError::Network {
        url: url.to_string(),
        source: e,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            url: url.to_string(),
            status,
        });
    }

    response.text().await.map_err(|e| ProviderError::Network {
        url: url.to_string(),
        source: e,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub(crate) const SERVER_ERROR: &str = "HTTP/1.1 500 Internal Server Error\r\n\
        content-length: 0\r\n\
        connection: close\r\n\r\n";

    const HELLO: &str = "HTTP/1.1 200 OK\r\n\
        content-length: 5\r\n\
        connection: close\r\n\r\n\
        hello";

    /// Answer one request on a local port with `response`; returns the URL.
    pub(crate) async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/data")
    }

    pub(crate) fn local_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let url = serve_once(SERVER_ERROR).await;
        let err = get_text(local_client().get(&url), &url).await.unwrap_err();
        match err {
            ProviderError::Status { url: u, status } => {
                assert_eq!(u, url);
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_returns_body_text() {
        let url = serve_once(HELLO).await;
        let body = get_text(local_client().get(&url), &url).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/data", listener.local_addr().unwrap());
        drop(listener);
        let err = get_text(local_client().get(&url), &url).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network { .. }));
    }
}
