use async_trait::async_trait;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GenerationConfig, ProviderConfig};
use crate::error::ProviderResult;
use crate::{ProviderId, Vendor};

const VENDOR: &str = "Gemini";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams
{   pub temperature: f32
  , pub max_output_tokens: u32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationParams
}

// ===== Gemini Client =====

/// Google Generative Language `generateContent`.
/// The key travels in the query string.
pub struct GeminiClient
{   config: ProviderConfig
  , generation: GenerationConfig
  , http_client: reqwest::Client
}

impl GeminiClient
{   pub fn new(
      config: ProviderConfig
    , generation: GenerationConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating GeminiClient");
        let http_client = super::http_client(config.timeout())?;
        Ok(GeminiClient
        {   config
          , generation
          , http_client
        })
    }

    /// URL without the key
    pub fn endpoint(&self, provider: ProviderId) -> String
    {   format!(
          "{}/models/{}:generateContent",
          self.config.base_url(Vendor::Gemini),
          self.config.model_for(provider)
        )
    }

    pub fn build_request(&self, prompt: &str) -> GenerateContentRequest
    {   GenerateContentRequest
        {   contents: vec![
              Content
              {   parts: vec![Part { text: prompt.to_string() }]
              }
            ]
          , generation_config: GenerationParams
            {   temperature: self.generation.temperature
              , max_output_tokens: self.generation.max_output_tokens
            }
        }
    }
}

fn extract_text(value: &Value) -> Option<&str>
{   value
      .pointer("/candidates/0/content/parts/0/text")
      .and_then(Value::as_str)
}

#[async_trait]
impl super::ProviderClient for GeminiClient
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

        let url = self.endpoint(provider);
        let request = self.build_request(prompt);
        debug!("Sending {} request for {} to {}", VENDOR, provider, url);
        trace!("{} request: {:?}", VENDOR, request);

        let response = self.http_client
          .post(&url)
          .query(&[("key", api_key)])
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| super::transport_failure(VENDOR, &e.without_url()))?;

        let status = response.status().as_u16();
        let body = response.text()
          .await
          .map_err(|e| super::transport_failure(VENDOR, &e.without_url()))?;

        super::interpret_reply(VENDOR, status, &body, extract_text)
    }
}
