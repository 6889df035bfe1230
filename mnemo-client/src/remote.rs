//! Remote generation client.

use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::{Facet, SubjectId};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Confirmation returned by the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReceipt {
    /// `true` for 201, `false` when the artifact already existed (200).
    pub created: bool,
    pub message: String,
    pub url: String,
}

/// Asks the generation service to ensure an artifact.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn request_generation(
        &self,
        subject: SubjectId,
        facet: Facet,
        credential: &str,
    ) -> ClientResult<GenerationReceipt>;
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    openai_api_key: &'a str,
}

#[derive(Deserialize)]
struct GenerateReply {
    message: String,
    url: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

/// `POST <api_base>/<facet>/<subject_id>` over reqwest.
#[derive(Clone)]
pub struct HttpGenerationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, subject: SubjectId, facet: Facet) -> String {
        format!("{}/{}/{}", self.base_url, facet, subject)
    }
}

#[async_trait]
impl GenerationApi for HttpGenerationClient {
    async fn request_generation(
        &self,
        subject: SubjectId,
        facet: Facet,
        credential: &str,
    ) -> ClientResult<GenerationReceipt> {
        let response = self
            .client
            .post(self.endpoint(subject, facet))
            .json(&GenerateBody {
                openai_api_key: credential,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let reply: GenerateReply = serde_json::from_str(&text)
                .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
            return Ok(GenerationReceipt {
                created: status == reqwest::StatusCode::CREATED,
                message: reply.message,
                url: reply.url,
            });
        }

        let message = serde_json::from_str::<ErrorReply>(&text)
            .map(|reply| reply.error)
            .unwrap_or(text);
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for HttpGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerationClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_unpadded_id() {
        let client =
            HttpGenerationClient::new("https://api.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint(SubjectId::new(5).unwrap(), Facet::Reading),
            "https://api.example.com/reading/5"
        );
    }

    #[test]
    fn test_body_shape() {
        let json = serde_json::to_value(GenerateBody {
            openai_api_key: "sk-user",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"openai_api_key": "sk-user"}));
    }
}
