//! SEO prompt construction and metadata extraction
//!
//! The model is asked to lead its answer with four labelled lines
//! (title, description, two keywords) followed by the HTML article.
//! Extraction only peels those lines off; the article body is
//! passed through untouched.

use std::fmt::Write;

use crate::request::{GenerationRequest, Language, SeoMetadata};

pub const SEO_TITLE: &str = "SEO Title:";
pub const META_DESCRIPTION: &str = "Meta Description:";
pub const SYNONYM_KEYWORD: &str = "Synonym Keyword:";
pub const SECONDARY_KEYWORD: &str = "Secondary Keyword:";

/// Full provider prompt for a request
pub fn build_prompt(
  request: &GenerationRequest
, default_language: Language
) -> String
{   let language = request.language.unwrap_or(default_language);
    let mut prompt = String::with_capacity(1024);

    // `write!` into a String cannot fail
    let _ = writeln!(
      prompt,
      "Generate an SEO-optimized article in {} language with the following details:",
      language.full_name()
    );
    let _ = writeln!(prompt, "- Main keyword: {}", request.keyword.trim());
    let _ = writeln!(
      prompt,
      "- Word count: approximately {} words",
      request.word_count
    );
    let _ = writeln!(prompt, "- Tone: {}", request.tone.as_str());
    prompt.push_str(
      "- Format the content strictly in HTML using tags <h2> to <h6>, <p>, <ul>, <li>. \
       Do NOT use <h1>, Markdown, or wrap in code blocks like ```html...```.\n"
    );
    prompt.push_str(
      "- Ensure the content is unique, original, and free from plagiarism.\n"
    );
    prompt.push_str(
      "- Include proper heading structure, bullet points, and natural keyword integration.\n"
    );
    let _ = writeln!(prompt, "- User request: {}", request.prompt.trim());
    prompt.push_str(
      "- Provide an SEO title (60-70 characters), meta description (150-160 characters), \
       synonym keyword, and secondary keyword at the beginning in plain text, formatted as:\n"
    );
    let _ = writeln!(prompt, "  {} [Your title here]", SEO_TITLE);
    let _ = writeln!(prompt, "  {} [Your description here]", META_DESCRIPTION);
    let _ = writeln!(prompt, "  {} [Your synonym here]", SYNONYM_KEYWORD);
    let _ = writeln!(
      prompt,
      "  {} [Your secondary keyword here]",
      SECONDARY_KEYWORD
    );
    prompt.push_str(
      "- Focus on professional content with factual accuracy for Gemini, \
       or conversational and engaging content for DeepSeek.\n"
    );
    prompt
}

/// Split generated text into metadata and article body.
///
/// Any line (after trimming) starting with one of the four labels
/// sets that field, and the body starts after the last such line.
/// Text without labels is returned whole with empty metadata.
pub fn extract_metadata(text: &str) -> (SeoMetadata, String)
{   let lines: Vec<&str> = text.split('\n').collect();
    let mut metadata = SeoMetadata::default();
    let mut body_start = 0;

    for (index, raw) in lines.iter().enumerate()
    {   let line = raw.trim();
        let field = if let Some(rest) = line.strip_prefix(SEO_TITLE)
        {   Some((&mut metadata.meta_title, rest))
        } else if let Some(rest) = line.strip_prefix(META_DESCRIPTION)
        {   Some((&mut metadata.meta_description, rest))
        } else if let Some(rest) = line.strip_prefix(SYNONYM_KEYWORD)
        {   Some((&mut metadata.synonym_keyword, rest))
        } else if let Some(rest) = line.strip_prefix(SECONDARY_KEYWORD)
        {   Some((&mut metadata.secondary_keyword, rest))
        } else
        {   None
        };

        if let Some((slot, rest)) = field
        {   *slot = rest.trim().to_string();
            body_start = index + 1;
        }
    }

    (metadata, lines[body_start..].join("\n"))
}
