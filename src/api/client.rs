//! HTTP client for the news assistant backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

use super::Backend;
use super::sse::{EventStream, decode_stream};
use super::types::{CreateSessionResponse, HistoryResponse, Message};
use crate::error::{Error, Result};

/// HTTP client for the backend API.
///
/// # Example
///
/// ```rust,no_run
/// use newschat::api::{Backend, Client};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("http://localhost:3000")?;
///
/// let session_id = client.create_session().await?;
/// let history = client.fetch_history(&session_id).await?;
/// assert!(history.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    /// Bound on each session/history call; never applied to chat streams.
    request_timeout: Option<Duration>,
}

impl Client {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the backend (e.g., "http://localhost:3000")
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
            request_timeout: None,
        })
    }

    /// Create a client whose session and history calls give up after
    /// `request_timeout`.
    ///
    /// Chat streams only have their connection setup bounded; once open
    /// they are guarded by the controller's idle timeout.
    pub fn with_request_timeout(
        base_url: impl AsRef<str>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        let mut client = Self::with_client(base_url, http)?;
        client.request_timeout = Some(request_timeout);
        Ok(client)
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            base_url,
            http,
            request_timeout: None,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the streaming chat endpoint for one turn.
    pub fn chat_url(&self, session_id: &str, message: &str) -> Result<Url> {
        let mut url = self.base_url.join("/api/chat")?;
        url.query_pairs_mut()
            .append_pair("sessionId", session_id)
            .append_pair("message", message);
        Ok(url)
    }

    /// Apply the per-request bound, if any.
    fn bounded(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn history_url(&self, session_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "session", session_id, "history"]);
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl Backend for Client {
    #[instrument(skip(self))]
    async fn create_session(&self) -> Result<String> {
        let response = self
            .bounded(self.http.post(self.url("/api/session")?))
            .send()
            .await?;
        let created: CreateSessionResponse = Self::handle_response(response).await?;
        debug!(session_id = %created.session_id, "Backend minted session");
        Ok(created.session_id)
    }

    #[instrument(skip(self))]
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let response = self
            .bounded(self.http.get(self.history_url(session_id)?))
            .send()
            .await?;
        let body: HistoryResponse = Self::handle_response(response).await?;
        Ok(body.history)
    }

    #[instrument(skip(self))]
    async fn delete_history(&self, session_id: &str) -> Result<()> {
        let response = self
            .bounded(self.http.delete(self.history_url(session_id)?))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    #[instrument(skip(self, message), fields(message_len = message.len()))]
    async fn open_chat(&self, session_id: &str, message: &str) -> Result<EventStream> {
        let response = self
            .http
            .get(self.chat_url(session_id, message)?)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(decode_stream(response.bytes_stream()))
    }
}
