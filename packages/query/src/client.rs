//! HTTP client with bounded retry for feature-service endpoints.
//!
//! County and city GIS servers fail in bursts: short timeouts, transient
//! 5xx, and occasionally an HTTP 200 carrying an embedded error object.
//! Every query therefore runs through the same retry loop with a short
//! per-attempt timeout and linear backoff, and the embedded-error shape is
//! checked before a body is handed back.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    FeatureQuery, QueryError,
    params::{QueryParams, Transport, prepare},
};

/// Budget for a single attempt, connect through body read. Interactive
/// callers sit directly on this path, so a hung upstream has to surface
/// quickly.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

/// Extra attempts after the first failure.
pub const MAX_RETRIES: u32 = 2;

/// Backoff grows linearly: 250ms before the first retry, 500ms before the
/// second.
pub const BACKOFF_STEP: Duration = Duration::from_millis(250);

/// Maximum length of the response body preview included in parse-error logs.
const BODY_PREVIEW_LEN: usize = 300;

const USER_AGENT: &str = "parcel-map/0.1 (+https://github.com/BSteffaniak/parcel-map)";

/// Production [`FeatureQuery`] implementation over `reqwest`.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ArcgisClient {
    client: reqwest::Client,
}

impl ArcgisClient {
    /// Build a client with the pipeline's standard timeouts.
    ///
    /// # Errors
    ///
    /// * Returns `QueryError::Http` if the TLS backend fails to initialize.
    pub fn new() -> Result<Self, QueryError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    async fn attempt(
        &self,
        endpoint: &str,
        transport: Transport,
        params: &QueryParams,
    ) -> Result<Value, QueryError> {
        let pairs = params.entries();
        let builder = match transport {
            Transport::Get => self.client.get(endpoint).query(&pairs),
            Transport::Post => self.client.post(endpoint).form(&pairs),
        };
        let response = builder.timeout(ATTEMPT_TIMEOUT).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status { status });
        }

        // Read as text first so a parse failure can log what actually came
        // back (WAF challenge pages and HTML error screens are common).
        let text = response.text().await?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => {
                let preview = body_preview(&text);
                log::warn!("unparseable response from {endpoint}: {e}\n  body preview: {preview}");
                return Err(QueryError::Json(e));
            }
        };

        if let Some(service_error) = embedded_error(&body) {
            return Err(service_error);
        }

        Ok(body)
    }
}

/// At most the first [`BODY_PREVIEW_LEN`] bytes of a body, cut back to the
/// nearest character boundary so multi-byte text never splits mid-character.
fn body_preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// `ArcGIS` servers report malformed queries as HTTP 200 with an `error`
/// object in the body. Treat that as a failed attempt.
fn embedded_error(body: &Value) -> Option<QueryError> {
    let error = body.get("error")?;
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown service error")
        .to_string();
    Some(QueryError::Service { code, message })
}

#[async_trait]
impl FeatureQuery for ArcgisClient {
    async fn query(&self, endpoint: &str, params: QueryParams) -> Result<Value, QueryError> {
        if endpoint.trim().is_empty() {
            return Err(QueryError::MissingEndpoint);
        }

        let (transport, params) = prepare(params);
        let mut last_error = String::new();

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BACKOFF_STEP * attempt;
                log::warn!("  retry {attempt}/{MAX_RETRIES} against {endpoint} in {delay:?}...");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(endpoint, transport, &params).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    log::warn!("  attempt {} against {endpoint} failed: {e}", attempt + 1);
                    last_error = e.to_string();
                }
            }
        }

        Err(QueryError::RetriesExhausted {
            attempts: MAX_RETRIES + 1,
            endpoint: endpoint.to_string(),
            last_error,
        })
    }
}
