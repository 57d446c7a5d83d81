//! Prompt templates for the generation endpoints. Each builder formats a
//! fixed instruction template with the caller-supplied parameters; invalid
//! input is the caller's problem, absent optional fields are simply left
//! out of the template.

use serde::{Deserialize, Serialize};

pub const DEFAULT_WORD_COUNT: u32 = 1000;
pub const MIN_WORD_COUNT: u32 = 300;
pub const MAX_WORD_COUNT: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Technical,
    Friendly,
}

impl Tone {
    fn description(&self) -> &'static str {
        match self {
            Tone::Professional => "professional and formal",
            Tone::Casual => "relaxed and informal",
            Tone::Technical => "technical and detailed",
            Tone::Friendly => "warm and approachable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
}

impl Language {
    fn instruction(&self) -> &'static str {
        match self {
            Language::Tr => "Write in Turkish. Follow Turkish grammar and spelling rules.",
            Language::En => "Write in English. Follow proper English grammar rules.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub topic: String,
    pub keywords: Vec<String>,
    pub tone: Tone,
    pub word_count: u32,
    pub language: Language,
    pub category_name: Option<String>,
}

/// Builds the full blog-post generation prompt, including the required
/// JSON output schema in a fenced block.
pub fn build_post_prompt(options: &GenerateOptions) -> String {
    let mut context = format!("**TOPIC:** {}\n", options.topic);
    if let Some(category) = &options.category_name {
        context.push_str(&format!("**CATEGORY:** {category}\n"));
    }
    if !options.keywords.is_empty() {
        context.push_str(&format!("**KEYWORDS:** {}\n", options.keywords.join(", ")));
    }
    context.push_str(&format!("**TONE:** {}\n", options.tone.description()));
    context.push_str(&format!(
        "**TARGET LENGTH:** {} words (REQUIRED - you must reach this length!)\n",
        options.word_count
    ));
    context.push_str(&format!("**LANGUAGE:** {}\n", options.language.instruction()));

    format!(
        r#"You are a professional blog writer. Create an SEO-friendly, engaging blog post according to the criteria below.

{context}
**VERY IMPORTANT:**
- The content must be AT LEAST {words} words!
- Write a FULL blog post, not a short summary!
- Every section must be detailed (minimum 3-4 paragraphs)

**CONTENT STRUCTURE:**

1. **Introduction** (2-3 paragraphs)
   - Introduce the topic and why it matters
   - Hook the reader
   - Explain what the post covers

2. **Main sections** (3-5 sections, 3-4 paragraphs each)
   - Use an H2 heading for every main topic
   - Add H3 headings for subtopics
   - Include examples, lists and explanations

3. **Conclusion** (2 paragraphs)
   - Summarize the key points
   - Give the reader actionable advice

**HTML FORMAT:**
- Use proper HTML: <h2>, <h3>, <p>, <ul>, <ol>, <li>, <strong>, <em>
- Every paragraph goes inside a <p> tag
- Use <ul> or <ol> for lists

**SEO:**
- Place the keywords naturally
- Headings must be SEO friendly

**OUTPUT FORMAT:**
Respond ONLY in the JSON format below.

VERY IMPORTANT:
- Write NOTHING outside the JSON!
- No explanations, no comments!
- Use valid JSON (no trailing commas, correct quoting)
- Escape newlines inside content as \n

```json
{{
  "title": "Post title (max 60 characters)",
  "content": "<h2>Introduction</h2><p>Detailed opening paragraph...</p><h2>Main Section 1</h2><p>Detailed content...</p>",
  "excerpt": "Short 150-200 word summary",
  "metaTitle": "SEO title (max 60 characters)",
  "metaDescription": "SEO description (max 160 characters)",
  "keywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
  "suggestedTags": ["tag1", "tag2", "tag3", "tag4"]
}}
```

REMINDER:
- "content" is the LONG HTML body, around {words} words
- "excerpt" is the SHORT 150-200 word summary
- Do not mix them up!"#,
        context = context,
        words = options.word_count,
    )
}

pub fn build_improve_prompt(content: &str, instructions: &str) -> String {
    format!(
        r#"Improve the blog post below.

**CURRENT CONTENT:**
{content}

**IMPROVEMENT INSTRUCTIONS:**
{instructions}

Return the improved content in HTML format. Return only the content, no explanations."#
    )
}

pub fn build_titles_prompt(topic: &str, count: u32) -> String {
    format!(
        r#"Suggest {count} different engaging blog titles for the topic "{topic}".

Every title must:
- Be SEO friendly
- Be 50-60 characters long
- Be engaging and clickable

List only the titles, one per line, without numbering or explanations."#
    )
}

pub fn build_topics_prompt(category: &str, count: u32) -> String {
    format!(
        r#"Suggest {count} different current, trending blog post topics for the "{category}" category.

Every topic must:
- Be current and engaging
- Have high SEO potential
- Be valuable to the target audience

List only the topics, one per line, no explanations."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> GenerateOptions {
        GenerateOptions {
            topic: "Rust web services".into(),
            keywords: vec!["rust".into(), "salvo".into()],
            tone: Tone::Technical,
            word_count: 1200,
            language: Language::En,
            category_name: Some("Programming".into()),
        }
    }

    #[test]
    fn post_prompt_embeds_all_inputs() {
        let prompt = build_post_prompt(&options());
        assert!(prompt.contains("**TOPIC:** Rust web services"));
        assert!(prompt.contains("**CATEGORY:** Programming"));
        assert!(prompt.contains("**KEYWORDS:** rust, salvo"));
        assert!(prompt.contains("technical and detailed"));
        assert!(prompt.contains("1200 words"));
        assert!(prompt.contains("Write in English"));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"suggestedTags\""));
    }

    #[test]
    fn post_prompt_omits_absent_optionals() {
        let mut opts = options();
        opts.category_name = None;
        opts.keywords.clear();
        let prompt = build_post_prompt(&opts);
        assert!(!prompt.contains("**CATEGORY:**"));
        assert!(!prompt.contains("**KEYWORDS:**"));
    }

    #[test]
    fn titles_prompt_embeds_topic_and_count() {
        let prompt = build_titles_prompt("Yapay Zeka", 7);
        assert!(prompt.contains("Suggest 7"));
        assert!(prompt.contains("\"Yapay Zeka\""));
    }
}
