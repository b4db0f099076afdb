use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::CdnError;

/// Something that can drop cached copies of published paths.
#[allow(async_fn_in_trait)]
pub trait Invalidator {
    /// Request invalidation of `paths` (each starting with `/`). Returns a
    /// short description of the accepted request.
    async fn invalidate(&self, paths: &[String]) -> Result<String, CdnError>;
}

#[derive(Serialize)]
struct PurgeRequest<'a> {
    paths: &'a [String],
    caller_reference: String,
}

/// Posts a JSON purge request to a CDN's HTTP purge endpoint.
#[derive(Debug, Clone)]
pub struct HttpInvalidator {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpInvalidator {
    pub fn new(client: reqwest::Client, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            token,
        }
    }
}

impl Invalidator for HttpInvalidator {
    async fn invalidate(&self, paths: &[String]) -> Result<String, CdnError> {
        let request = PurgeRequest {
            paths,
            caller_reference: caller_reference(OffsetDateTime::now_utc()),
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|source| CdnError::Http {
            url: self.url.clone(),
            source,
        })?;
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Could not read invalidation response from {}: {e}", self.url);
                String::new()
            }
        };

        if !status.is_success() {
            return Err(CdnError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(format!("{} {}", status.as_u16(), body.trim()))
    }
}

/// Unique per request.
fn caller_reference(now: OffsetDateTime) -> String {
    format!("trailmap-{}", now.unix_timestamp_nanos())
}
