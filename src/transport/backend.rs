use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;

use crate::config::AppConfig;
use crate::error::BridgeError;
use crate::protocol::BackendChatRequest;
use crate::util::sanitize_backend_error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Streamed body of a successful backend chat response.
pub type BackendStream = std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    timeout: Duration,
) -> Result<reqwest::Client, BridgeError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|err| BridgeError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client for the chat backend.
pub struct BackendClient {
    client: reqwest::Client,
    chat_url: url::Url,
}

impl BackendClient {
    /// Build the client from validated config.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the chat URL does not parse, or
    /// [`BridgeError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self, BridgeError> {
        let chat_url = url::Url::parse(&config.backend.chat_url()).map_err(|err| {
            BridgeError::Config(format!("invalid backend chat URL: {err}"))
        })?;
        let client = build_reqwest_client(
            config.server.http_pool_max_idle_per_host.max(1),
            Duration::from_secs(config.server.timeout),
        )?;
        Ok(Self { client, chat_url })
    }

    #[must_use]
    pub fn chat_url(&self) -> &url::Url {
        &self.chat_url
    }

    /// POST the conversation and hand back the streamed response body.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when the request cannot be sent and
    /// [`BridgeError::Upstream`] for a non-2xx backend status.
    pub async fn open_chat_stream(
        &self,
        request: &BackendChatRequest,
    ) -> Result<BackendStream, BridgeError> {
        let response = self
            .client
            .post(self.chat_url.clone())
            .header(http::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|err| BridgeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| BridgeError::Transport(format!("Failed to read error body: {e}")))?;
            let message = sanitize_backend_error(&body);
            tracing::warn!(status = status.as_u16(), "backend rejected chat request: {message}");
            return Err(BridgeError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(
            status = status.as_u16(),
            messages = request.messages.len(),
            "backend chat stream opened"
        );
        Ok(Box::pin(response.bytes_stream()))
    }
}
