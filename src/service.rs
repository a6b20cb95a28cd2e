//! HTTP client for the remote crash game service.
//!
//! The service owns everything that matters about a round (crash point,
//! settlement); this side only issues the three calls and decodes replies.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Transient failure of a game service call.
///
/// Every variant is recoverable: the caller keeps its prior state and may
/// retry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid tick response: {0}")]
    InvalidTick(&'static str),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for game service calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Body of a successful `/game/tick` call.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResponse {
    pub multiplier: f64,
    pub running: bool,
    /// Only present once `running` is false.
    #[serde(default)]
    pub crash_point: Option<f64>,
}

/// The three calls a client makes against a game service.
pub trait GameService: Send + Sync {
    /// `POST /game/start?bet={bet}`.
    fn start(&self, bet: f64) -> impl Future<Output = Result<()>> + Send;

    /// `POST /game/tick`.
    fn tick(&self) -> impl Future<Output = Result<TickResponse>> + Send;

    /// `POST /game/cashout`. Returns the body as display text.
    fn cash_out(&self) -> impl Future<Output = Result<String>> + Send;
}

impl<T: GameService> GameService for Arc<T> {
    async fn start(&self, bet: f64) -> Result<()> {
        (**self).start(bet).await
    }

    async fn tick(&self) -> Result<TickResponse> {
        (**self).tick().await
    }

    async fn cash_out(&self) -> Result<String> {
        (**self).cash_out().await
    }
}

/// [`GameService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGameService {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpGameService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => return Err(Error::InvalidScheme(other.to_string())),
        }
        // `Url::join` replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post(&self, url: Url) -> Result<reqwest::Response> {
        debug!(%url, "POST");
        let response = self.http_client.post(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FailedWithBody { status, body });
        }
        Ok(response)
    }
}

impl GameService for HttpGameService {
    async fn start(&self, bet: f64) -> Result<()> {
        let mut url = self.endpoint("game/start")?;
        url.query_pairs_mut().append_pair("bet", &bet.to_string());
        self.post(url).await?;
        Ok(())
    }

    async fn tick(&self) -> Result<TickResponse> {
        let url = self.endpoint("game/tick")?;
        let bytes = self.post(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn cash_out(&self) -> Result<String> {
        let url = self.endpoint("game/cashout")?;
        let body = self.post(url).await?.text().await?;
        Ok(display_text(&body))
    }
}

/// Turn a response body into display text. A JSON string literal is
/// unquoted; anything else is shown as sent.
fn display_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        _ => body.trim().to_string(),
    }
}
