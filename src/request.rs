//! Request, fingerprint and outcome types

use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::ProviderId;

/// Prefix shared by every cache key
pub const FINGERPRINT_PREFIX: &str = "aiseo_content_";

pub const DEFAULT_WORD_COUNT: u32 = 500;

/// Writing tone offered by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone
{   #[default]
    Neutral
  , Informative
  , Storytelling
  , Professional
  , Friendly
  , Humorous
}

impl Tone
{   pub fn as_str(self) -> &'static str
    {   match self
        {   Tone::Neutral => "neutral"
          , Tone::Informative => "informative"
          , Tone::Storytelling => "storytelling"
          , Tone::Professional => "professional"
          , Tone::Friendly => "friendly"
          , Tone::Humorous => "humorous"
        }
    }
}

/// Output language, carried as its ISO 639-1 code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language
{   #[default]
    Vietnamese
  , English
  , Korean
}

impl Language
{   pub const ALL: [Language; 3] = [
      Language::Vietnamese
    , Language::English
    , Language::Korean
    ];

    /// Strict lookup by code
    pub fn lookup(code: &str) -> Option<Language>
    {   let code = code.trim();
        Language::ALL
          .into_iter()
          .find(|l| l.code().eq_ignore_ascii_case(code))
    }

    /// Lenient parse: unknown codes become Vietnamese.
    pub fn parse(code: &str) -> Language
    {   Language::lookup(code).unwrap_or_else(|| {
          warn!("Unknown language '{}', using vi", code);
          Language::Vietnamese
        })
    }
   /// ISO 639-1 code
    pub fn code(self) -> &'static str
    {   match self
        {   Language::Vietnamese => "vi"
          , Language::English => "en"
          , Language::Korean => "ko"
        }
    }

    /// Name used inside the prompt
    pub fn full_name(self) -> &'static str
    {   match self
        {   Language::Vietnamese => "Vietnamese"
          , Language::English => "English"
          , Language::Korean => "Korean"
        }
    }
}

/// One content-generation request.
/// Built per call, consumed, and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// Free-text user request
    pub prompt: String
  , /// Primary keyword
    pub keyword: String
  , /// Target word count
    #[serde(default = "default_word_count")]
    pub word_count: u32
  , #[serde(default)]
    pub tone: Tone
  , /// `None` resolves to the configured default language
    #[serde(default)]
    pub language: Option<Language>
  , #[serde(default)]
    pub preferred_provider: ProviderId
}

fn default_word_count() -> u32
{   DEFAULT_WORD_COUNT
}

impl GenerationRequest
{   pub fn new(
      prompt: impl Into<String>
    , keyword: impl Into<String>
    ) -> Self
    {   GenerationRequest
        {   prompt: prompt.into()
          , keyword: keyword.into()
          , word_count: DEFAULT_WORD_COUNT
          , tone: Tone::default()
          , language: None
          , preferred_provider: ProviderId::default()
        }
    }

    pub fn with_word_count(mut self, word_count: u32) -> Self
    {   self.word_count = word_count;
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self
    {   self.tone = tone;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self
    {   self.language = Some(language);
        self
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self
    {   self.preferred_provider = provider;
        self
    }

    /// Reject requests that cannot produce a sensible prompt
    pub fn validate(&self) -> Result<(), Error>
    {   if self.prompt.trim().is_empty()
        {   return Err(Error::InvalidRequest(
              "prompt is empty".to_string()
            ));
        }
        if self.keyword.trim().is_empty()
        {   return Err(Error::InvalidRequest(
              "keyword is empty".to_string()
            ));
        }
        if self.word_count == 0
        {   return Err(Error::InvalidRequest(
              "word_count must be positive".to_string()
            ));
        }
        Ok(())
    }

    /// Stable cache key over every semantic field.
    ///
    /// Hash input order is fixed: prompt, keyword, word count, tone,
    /// language, preferred provider. Each field is written as its
    /// byte length (u64, big endian) followed by its UTF-8 bytes,
    /// so no two distinct requests share an input stream.
    pub fn fingerprint(&self, default_language: Language) -> String
    {   let language = self.language.unwrap_or(default_language);
        let word_count = self.word_count.to_string();
        let fields: [&str; 6] = [
          self.prompt.trim()
        , self.keyword.trim()
        , &word_count
        , self.tone.as_str()
        , language.code()
        , self.preferred_provider.as_str()
        ];

        let mut hasher = Sha256::new();
        for field in fields
        {   hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        format!(
          "{}{}",
          FINGERPRINT_PREFIX,
          hex::encode(hasher.finalize())
        )
    }
}

impl From<String> for Language
{   fn from(code: String) -> Self
    {   Language::parse(&code)
    }
}

impl From<Language> for String
{   fn from(language: Language) -> Self
    {   language.code().to_string()
    }
}

/// SEO fields the model is asked to emit ahead of the article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoMetadata
{   pub meta_title: String
  , pub meta_description: String
  , pub synonym_keyword: String
  , pub secondary_keyword: String
}

/// Successful generation as returned to the caller and cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent
{   /// Article body with the metadata header removed
    pub content: String
  , #[serde(flatten)]
    pub metadata: SeoMetadata
  , /// Provider that produced the text
    pub provider: ProviderId
}
