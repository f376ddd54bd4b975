use std::time::Duration;

use async_trait::async_trait;
use colloquy_core::{MirrorError, MirrorRecord, MirrorSink};
use serde_json::json;

/// Mirror to a Sanity-style document store through its mutation API.
///
/// Each exchange becomes one `create` mutation on
/// `{base_url}/v{api_version}/data/mutate/{dataset}`.
pub struct DocumentMirror {
    client: reqwest::Client,
    url: String,
    token: String,
    document_type: String,
}

impl DocumentMirror {
    pub fn new(
        base_url: &str,
        api_version: &str,
        dataset: &str,
        token: impl Into<String>,
        document_type: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!(
            "{}/v{}/data/mutate/{}",
            base_url.trim_end_matches('/'),
            api_version.trim_start_matches('v'),
            dataset
        );
        Ok(Self {
            client,
            url,
            token: token.into(),
            document_type: document_type.into(),
        })
    }

    /// Default API host for a project.
    pub fn project_base_url(project_id: &str) -> String {
        format!("https://{project_id}.api.sanity.io")
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn mutation(&self, record: &MirrorRecord) -> serde_json::Value {
        json!({
            "mutations": [{
                "create": {
                    "_type": self.document_type,
                    "user_message": record.user_message,
                    "bot_response": record.bot_response,
                }
            }]
        })
    }
}

#[async_trait]
impl MirrorSink for DocumentMirror {
    async fn mirror(&self, record: &MirrorRecord) -> Result<(), MirrorError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&self.mutation(record))
            .send()
            .await
            .map_err(|e| MirrorError::Transport(format!("Mutation request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(MirrorError::Status { status, body });
        }

        tracing::debug!("Mirrored exchange {} to document store", record.id);
        Ok(())
    }
}
