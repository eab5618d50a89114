use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GenerationConfig, ProviderConfig};
use crate::error::ProviderResult;
use crate::{ProviderId, Vendor};

const VENDOR: &str = "OpenRouter";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

// ===== OpenRouter Client =====

/// OpenAI-compatible chat completions through OpenRouter.
/// Authenticates with a bearer token.
pub struct OpenRouterClient
{   config: ProviderConfig
  , generation: GenerationConfig
  , http_client: reqwest::Client
}

impl OpenRouterClient
{   pub fn new(
      config: ProviderConfig
    , generation: GenerationConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating OpenRouterClient");
        let http_client = super::http_client(config.timeout())?;
        Ok(OpenRouterClient
        {   config
          , generation
          , http_client
        })
    }

    pub fn endpoint(&self) -> String
    {   format!(
          "{}/chat/completions",
          self.config.base_url(Vendor::OpenRouter)
        )
    }

    pub fn build_request(
      &self
    , provider: ProviderId
    , prompt: &str
    ) -> ChatRequest
    {   ChatRequest
        {   model: self.config.model_for(provider).to_string()
          , messages: vec![
              ChatMessage
              {   role: "user".to_string()
                , content: prompt.to_string()
              }
            ]
          , max_tokens: Some(self.generation.max_output_tokens)
          , temperature: Some(self.generation.temperature)
        }
    }
}

fn extract_text(value: &Value) -> Option<&str>
{   value
      .pointer("/choices/0/message/content")
      .and_then(Value::as_str)
}

#[async_trait]
impl super::ProviderClient for OpenRouterClient
{   fn name(&self) -> &str
    {   VENDOR
    }

    async fn invoke(
      &self
    , provider: ProviderId
    , prompt: &str
    ) -> ProviderResult
    {   let api_key = match self.config.credential()
        {   Some(key) => key
          , None => return Err(super::missing_credentials(VENDOR))
        };

        let request = self.build_request(provider, prompt);
        debug!(
          "Sending {} request for {} (model {})",
          VENDOR, provider, request.model
        );
        trace!("{} request: {:?}", VENDOR, request);

        let response = self.http_client
          .post(self.endpoint())
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| super::transport_failure(VENDOR, &e))?;

        let status = response.status().as_u16();
        let body = response.text()
          .await
          .map_err(|e| super::transport_failure(VENDOR, &e))?;

        super::interpret_reply(VENDOR, status, &body, extract_text)
    }
}
