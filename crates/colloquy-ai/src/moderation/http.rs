use std::time::Duration;

use async_trait::async_trait;
use colloquy_core::{ContentFilter, FilterVerdict, PolicyRule, PolicySet, Unavailable};
use serde::{Deserialize, Serialize};

/// Content filter backed by a remote moderation API.
///
/// Posts `{"text", "policies"}` and expects `{"passed", "violations"}` back.
/// Transport errors, non-2xx statuses and unparseable bodies all map to
/// [`Unavailable`].
pub struct HttpModerationFilter {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    text: &'a str,
    policies: &'a [PolicyRule],
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    passed: bool,
    #[serde(default)]
    violations: Vec<String>,
}

impl HttpModerationFilter {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            anyhow::bail!("moderation endpoint is empty");
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl ContentFilter for HttpModerationFilter {
    async fn check(&self, text: &str, policies: &PolicySet) -> Result<FilterVerdict, Unavailable> {
        let body = ModerationRequest {
            text,
            policies: policies.rules(),
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| Unavailable::Transport(format!("Moderation request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Unavailable::Status { status, body });
        }

        let parsed: ModerationResponse = resp
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(format!("Moderation response: {e}")))?;

        tracing::debug!(
            "Moderation verdict: passed={} violations={:?}",
            parsed.passed,
            parsed.violations
        );
        Ok(FilterVerdict {
            passed: parsed.passed,
            violations: parsed.violations,
        })
    }
}
