//! OpenAI image synthesizer implementation

use super::client::OpenAIClient;
use super::types::{ImageData, ImageGenerationRequest, ImageGenerationResponse};
use crate::providers::invalid_response;
use crate::{ImageSynthesizer, SynthesisCredential};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mnemo_core::MnemoResult;

/// OpenAI image synthesizer using dall-e-3 or a custom model.
pub struct OpenAIImageSynthesizer {
    client: OpenAIClient,
    model: String,
    size: String,
}

impl OpenAIImageSynthesizer {
    /// Create a new OpenAI image synthesizer.
    ///
    /// # Arguments
    /// * `client` - Shared, rate-limited API client
    /// * `model` - Model name (e.g., "dall-e-3", "gpt-image-1")
    /// * `size` - Output size (e.g., "1024x1024")
    pub fn new(client: OpenAIClient, model: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            size: size.into(),
        }
    }

    /// Create a synthesizer with the default dall-e-3, 1024x1024 settings.
    pub fn with_default_model(client: OpenAIClient) -> Self {
        Self::new(client, "dall-e-3", "1024x1024")
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn image_bytes(&self, image: ImageData) -> MnemoResult<Vec<u8>> {
        if let Some(b64) = image.b64_json {
            return BASE64
                .decode(b64.as_bytes())
                .map_err(|e| invalid_response("openai", format!("Image base64 decode failed: {}", e)));
        }
        if let Some(url) = image.url {
            return self.client.download(&url).await;
        }
        Err(invalid_response("openai", "Image entry has neither b64_json nor url"))
    }
}

#[async_trait]
impl ImageSynthesizer for OpenAIImageSynthesizer {
    async fn synthesize(
        &self,
        prompt: &str,
        credential: &SynthesisCredential,
    ) -> MnemoResult<Vec<u8>> {
        let request = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
            response_format: None,
        };

        let response: ImageGenerationResponse = self
            .client
            .request("images/generations", credential, request)
            .await?;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| invalid_response("openai", "No image data in response"))?;
        if let Some(revised) = image.revised_prompt.as_deref() {
            tracing::debug!(revised_prompt = revised, "Provider revised the prompt");
        }

        let bytes = self.image_bytes(image).await?;
        if bytes.is_empty() {
            return Err(invalid_response("openai", "Image payload is empty"));
        }
        Ok(bytes)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

impl std::fmt::Debug for OpenAIImageSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIImageSynthesizer")
            .field("client", &self.client)
            .field("model", &self.model)
            .field("size", &self.size)
            .finish()
    }
}
