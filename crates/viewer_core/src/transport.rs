use async_trait::async_trait;
use reqwest::Client;
use shared::error::FetchError;

/// Raw page/image I/O behind the session.
///
/// Implementations perform a single attempt with no retries or
/// timeouts: a failure is terminal for that attempt and the caller
/// keeps its last good state.
#[async_trait]
pub trait StripTransport: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StripTransport for HttpTransport {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        // Success means 200 exactly, not any 2xx.
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status(status));
        }
        response.text().await.map_err(|_| FetchError::NotText)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status(status));
        }
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|err| FetchError::Transport(err.to_string()))
    }
}
