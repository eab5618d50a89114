//! Reads one JSON `GenerationRequest` on stdin and prints the
//! outcome as JSON on stdout.
//!
//! Configuration comes from the file named by `AISEO_CONFIG` (if
//! set) with API keys taken from `AISEO_GEMINI_API_KEY` and
//! `AISEO_OPENROUTER_API_KEY`.

use std::io::Read;
use std::process::ExitCode;

use log::{error, info};
use serde_json::json;

use aiseo::{AiseoConfig, ContentGenerator, Error, GenerationRequest};

const CONFIG_ENV: &str = "AISEO_CONFIG";

fn load_config() -> Result<AiseoConfig, Error>
{   let config = match std::env::var(CONFIG_ENV)
    {   Ok(path) => AiseoConfig::from_json_file(path)?
      , Err(_) => AiseoConfig::default()
    };
    let config = config.with_env_keys();
    config.validate()?;
    Ok(config)
}

fn read_request() -> Result<GenerationRequest, Error>
{   let mut raw = String::new();
    std::io::stdin()
      .read_to_string(&mut raw)
      .map_err(|e| Error::InvalidRequest(e.to_string()))?;
    serde_json::from_str(&raw)
      .map_err(|e| Error::InvalidRequest(e.to_string()))
}

fn failure_body(err: &Error) -> serde_json::Value
{   match err
    {   Error::Generation(gen) => json!({
          "success": false,
          "code": gen.code(),
          "status": gen.http_status(),
          "message": gen.user_message(),
          "detail": gen.to_string(),
        })
      , Error::InvalidRequest(msg) => json!({
          "success": false,
          "code": "missing_params",
          "status": 400,
          "message": msg,
        })
      , other => json!({
          "success": false,
          "code": "error",
          "status": 500,
          "message": other.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode
{   env_logger::init();

    let outcome = async {
      let config = load_config()?;
      let request = read_request()?;
      let generator = ContentGenerator::from_config(&config)?;
      generator.generate(&request).await
    }.await;

    match outcome
    {   Ok(content) => {
          info!("Generated content with {}", content.provider);
          println!("{}", json!({
            "success": true,
            "data": content.content,
            "meta_title": content.metadata.meta_title,
            "meta_description": content.metadata.meta_description,
            "synonym_keyword": content.metadata.synonym_keyword,
            "secondary_keyword": content.metadata.secondary_keyword,
            "provider": content.provider,
          }));
          ExitCode::SUCCESS
        }
      , Err(e) => {
          error!("{}", e);
          println!("{}", failure_body(&e));
          ExitCode::FAILURE
        }
    }
}
