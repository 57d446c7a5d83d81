//! Extracts a structured post draft from free-text model output.
//!
//! The model is asked for a fenced JSON block but does not reliably produce
//! one. The candidate JSON is located (fenced block first, then the widest
//! brace span) and parsed strictly; when strict parsing fails there is one
//! explicit fallback that scrapes the known fields out of the text. A
//! result without a title and content is an error, never an empty draft.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::text;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub suggested_tags: Vec<String>,
    pub estimated_reading_time: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftPayload {
    title: Option<String>,
    content: Option<String>,
    excerpt: Option<String>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    keywords: Option<Vec<String>>,
    suggested_tags: Option<Vec<String>>,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid regex"))
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""title"\s*:\s*"([^"]+)""#).expect("valid regex"))
}

fn content_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""content"\s*:\s*"([\s\S]*?)"\s*,\s*"excerpt""#).expect("valid regex")
    })
}

fn excerpt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""excerpt"\s*:\s*"([^"]+)""#).expect("valid regex"))
}

/// Locates the JSON candidate inside the raw model output: a ```json
/// fenced block when present, otherwise the span from the first `{` to the
/// last `}`.
fn json_candidate(raw: &str) -> Result<&str> {
    if let Some(captures) = fence_regex().captures(raw) {
        if let Some(inner) = captures.get(1) {
            return Ok(inner.as_str());
        }
    }

    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok(&raw[start..=end]),
        _ => Err(AppError::AiParse("no JSON object found".to_string())),
    }
}

/// Last-resort field scrape for output that is JSON-shaped but not valid
/// JSON. Only the three core fields are recovered; SEO fields fall back to
/// derived defaults.
fn scrape_fields(candidate: &str) -> Option<DraftPayload> {
    let title = title_regex()
        .captures(candidate)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())?;
    let content = content_regex()
        .captures(candidate)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())?;
    let excerpt = excerpt_regex()
        .captures(candidate)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Some(DraftPayload {
        title: Some(title),
        content: Some(content),
        excerpt,
        ..Default::default()
    })
}

pub fn parse_draft(raw: &str) -> Result<PostDraft> {
    let candidate = json_candidate(raw)?;

    let payload = match serde_json::from_str::<DraftPayload>(candidate) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "strict JSON parse failed, scraping fields");
            scrape_fields(candidate)
                .ok_or_else(|| AppError::AiParse(format!("invalid JSON in response: {e}")))?
        }
    };

    let title = payload
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::AiParse("response is missing a title".to_string()))?;
    let content = payload
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::AiParse("response is missing content".to_string()))?;

    let excerpt = payload
        .excerpt
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| text::truncate(&text::strip_html(&content), 200));
    let meta_title = payload.meta_title.unwrap_or_else(|| title.clone());
    let meta_description = payload
        .meta_description
        .unwrap_or_else(|| text::truncate(&excerpt, 160));
    let estimated_reading_time = text::reading_time(&content);

    Ok(PostDraft {
        title,
        content,
        excerpt,
        meta_title,
        meta_description,
        keywords: payload.keywords.unwrap_or_default(),
        suggested_tags: payload.suggested_tags.unwrap_or_default(),
        estimated_reading_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json(content: &str) -> String {
        format!(
            r#"{{
  "title": "Rust in Production",
  "content": "{content}",
  "excerpt": "A short summary",
  "metaTitle": "Rust in Production",
  "metaDescription": "Why Rust works in production",
  "keywords": ["rust", "production"],
  "suggestedTags": ["rust", "backend"]
}}"#
        )
    }

    #[test]
    fn parses_fenced_json_block() {
        let content = format!("<p>{}</p>", vec!["word"; 450].join(" "));
        let raw = format!(
            "Here is your post:\n```json\n{}\n```\nEnjoy!",
            valid_json(&content)
        );
        let draft = parse_draft(&raw).unwrap();
        assert_eq!(draft.title, "Rust in Production");
        assert_eq!(draft.keywords, vec!["rust", "production"]);
        assert_eq!(draft.suggested_tags, vec!["rust", "backend"]);
        // ceil(450 / 200) == 3
        assert_eq!(draft.estimated_reading_time, 3);
    }

    #[test]
    fn parses_bare_json_object() {
        let raw = format!("Sure thing. {}", valid_json("<p>short content here</p>"));
        let draft = parse_draft(&raw).unwrap();
        assert_eq!(draft.title, "Rust in Production");
        assert_eq!(draft.excerpt, "A short summary");
        assert_eq!(draft.estimated_reading_time, 1);
    }

    #[test]
    fn scrapes_fields_from_broken_json() {
        // Trailing comma makes strict parsing fail.
        let raw = r#"{
  "title": "Broken but usable",
  "content": "<p>some content</p>",
  "excerpt": "an excerpt",
}"#;
        let draft = parse_draft(raw).unwrap();
        assert_eq!(draft.title, "Broken but usable");
        assert_eq!(draft.content, "<p>some content</p>");
        assert_eq!(draft.excerpt, "an excerpt");
        // Fallback never invents SEO fields.
        assert!(draft.keywords.is_empty());
        assert_eq!(draft.meta_title, "Broken but usable");
    }

    #[test]
    fn missing_title_and_content_is_an_error() {
        assert!(parse_draft("not json at all").is_err());
        assert!(parse_draft(r#"{"foo": "bar"}"#).is_err());
        assert!(parse_draft(r#"{"title": "only a title"}"#).is_err());
        assert!(parse_draft(r#"{"title": "", "content": ""}"#).is_err());
    }

    #[test]
    fn derives_excerpt_when_absent() {
        let raw = r#"{"title": "T", "content": "<p>body text</p>"}"#;
        let draft = parse_draft(raw).unwrap();
        assert_eq!(draft.excerpt, "body text");
        assert_eq!(draft.meta_title, "T");
    }
}
