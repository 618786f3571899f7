//! HTTP bot-API transport
//!
//! Talks to a bot-style HTTP API: `POST {base}/bot{token}/copyMessage` and
//! `POST {base}/bot{token}/sendMessage` for publishing, `GET
//! {base}/bot{token}/messages` for fetching. Response status codes map onto
//! the [`TransportError`] taxonomy: 404 NotFound, 403 PermissionDenied,
//! 429 RateLimited, anything else non-success Unknown.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{FeedRef, MessageId, Transport, TransportError, TransportResult};
use crate::models::{Item, ItemId};

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// API base URL, e.g. `https://api.example.org`
    pub api_url: String,

    /// Bot token appended to the URL path
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl HttpTransportConfig {
    /// Create a new transport configuration
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.is_empty() {
            return Err("API URL cannot be empty".to_string());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err("API URL must start with http:// or https://".to_string());
        }

        if self.token.is_empty() {
            return Err("Bot token cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CopyMessageRequest<'a> {
    chat_id: &'a str,
    from_chat_id: &'a str,
    message_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CopyMessageResponse {
    message_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    messages: Vec<WireItem>,
}

/// Item shape on the wire; converted to the internal model on fetch.
#[derive(Debug, Deserialize)]
struct WireItem {
    id: ItemId,
    timestamp: DateTime<Utc>,
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    media_ref: Option<String>,
}

impl WireItem {
    fn into_item(self) -> Item {
        Item {
            id: self.id,
            timestamp: self.timestamp,
            kind: crate::models::ItemKind::parse(&self.kind)
                .unwrap_or(crate::models::ItemKind::Text),
            raw_text: self.text,
            media_ref: self.media_ref,
        }
    }
}

/// reqwest-based implementation of [`Transport`].
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        config
            .validate()
            .map_err(TransportError::Unknown)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Unknown(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token
        )
    }

    fn map_status(status: StatusCode, body: String) -> TransportError {
        match status {
            StatusCode::NOT_FOUND => TransportError::NotFound,
            StatusCode::FORBIDDEN => TransportError::PermissionDenied,
            StatusCode::TOO_MANY_REQUESTS => TransportError::RateLimited,
            _ => TransportError::Unknown(format!("HTTP {status}: {body}")),
        }
    }

    async fn check<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> TransportResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(Self::map_status(status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Unknown(format!("malformed response: {e}")))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unknown(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn publish(
        &self,
        target: &FeedRef,
        source: &FeedRef,
        item: &Item,
        cleaned_text: Option<&str>,
    ) -> TransportResult<MessageId> {
        let request = CopyMessageRequest {
            chat_id: target.as_str(),
            from_chat_id: source.as_str(),
            message_id: item.id,
            caption: cleaned_text,
        };

        let response = self
            .client
            .post(self.endpoint("copyMessage"))
            .json(&request)
            .send()
            .await?;

        let parsed: CopyMessageResponse = Self::check(response).await?;

        tracing::debug!(
            item_id = item.id,
            target = %target,
            "Item copied to destination feed"
        );

        // The platform may return a numeric or string message id
        Ok(match parsed.message_id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    }

    async fn fetch_range(&self, feed: &FeedRef, since: DateTime<Utc>) -> TransportResult<Vec<Item>> {
        let since = since.to_rfc3339();
        let response = self
            .client
            .get(self.endpoint("messages"))
            .query(&[("chat_id", feed.as_str()), ("since", since.as_str())])
            .send()
            .await?;

        let parsed: MessagesResponse = Self::check(response).await?;
        Ok(parsed.messages.into_iter().map(WireItem::into_item).collect())
    }

    async fn fetch_since(
        &self,
        feed: &FeedRef,
        after: ItemId,
        max: usize,
    ) -> TransportResult<Vec<Item>> {
        let after = after.to_string();
        let max = max.to_string();
        let response = self
            .client
            .get(self.endpoint("messages"))
            .query(&[
                ("chat_id", feed.as_str()),
                ("after_id", after.as_str()),
                ("limit", max.as_str()),
            ])
            .send()
            .await?;

        let parsed: MessagesResponse = Self::check(response).await?;
        Ok(parsed.messages.into_iter().map(WireItem::into_item).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let valid = HttpTransportConfig::new("https://api.example.org", "123:abc");
        assert!(valid.validate().is_ok());

        let no_scheme = HttpTransportConfig::new("api.example.org", "123:abc");
        assert!(no_scheme.validate().is_err());

        let empty_token = HttpTransportConfig::new("https://api.example.org", "");
        assert!(empty_token.validate().is_err());

        let zero_timeout =
            HttpTransportConfig::new("https://api.example.org", "123:abc").with_timeout(0);
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_endpoint_building() {
        let transport = HttpTransport::new(HttpTransportConfig::new(
            "https://api.example.org/",
            "123:abc",
        ))
        .unwrap();

        assert_eq!(
            transport.endpoint("copyMessage"),
            "https://api.example.org/bot123:abc/copyMessage"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            HttpTransport::map_status(StatusCode::NOT_FOUND, String::new()),
            TransportError::NotFound
        ));
        assert!(matches!(
            HttpTransport::map_status(StatusCode::FORBIDDEN, String::new()),
            TransportError::PermissionDenied
        ));
        assert!(matches!(
            HttpTransport::map_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            TransportError::RateLimited
        ));
        assert!(matches!(
            HttpTransport::map_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            TransportError::Unknown(_)
        ));
    }

    #[test]
    fn test_wire_item_conversion() {
        let wire = WireItem {
            id: 42,
            timestamp: Utc::now(),
            kind: "photo".to_string(),
            text: Some("caption".to_string()),
            media_ref: Some("file-42".to_string()),
        };

        let item = wire.into_item();
        assert_eq!(item.id, 42);
        assert_eq!(item.kind, crate::models::ItemKind::Photo);
        assert_eq!(item.raw_text.as_deref(), Some("caption"));

        let unknown_kind = WireItem {
            id: 43,
            timestamp: Utc::now(),
            kind: "sticker".to_string(),
            text: None,
            media_ref: None,
        };
        assert_eq!(unknown_kind.into_item().kind, crate::models::ItemKind::Text);
    }
}
