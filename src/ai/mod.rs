//! AI content-generation pipeline: prompt building, the generation client,
//! and response extraction. Control flow is strictly linear per request —
//! build prompt, one call to the service, extract the result.

mod client;
mod extract;
mod prompt;

pub use client::{GeminiClient, GenerationParams};
pub use extract::{parse_draft, PostDraft};
pub use prompt::{
    build_improve_prompt, build_post_prompt, build_titles_prompt, build_topics_prompt,
    GenerateOptions, Language, Tone, DEFAULT_WORD_COUNT, MAX_WORD_COUNT, MIN_WORD_COUNT,
};

use crate::error::Result;
use crate::models::UsageStats;

// Gemini 2.5 Flash free-tier pricing; the paid tier is $0.075 per 1M input
// tokens and $0.30 per 1M output tokens.
const INPUT_TOKEN_COST: f64 = 0.0;
const OUTPUT_TOKEN_COST: f64 = 0.0;

/// Rough token estimate (~4 characters per token), used when the service
/// does not report usage.
pub fn estimate_tokens(text: &str) -> u32 {
    text.len().div_ceil(4) as u32
}

fn usage_stats(prompt_tokens: u32, completion_tokens: u32) -> UsageStats {
    let cost = f64::from(prompt_tokens) * INPUT_TOKEN_COST
        + f64::from(completion_tokens) * OUTPUT_TOKEN_COST;
    UsageStats {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
        cost,
    }
}

fn usage_for(prompt: &str, generation: &client::Generation) -> UsageStats {
    match generation.usage {
        Some(counts) => usage_stats(counts.prompt_tokens, counts.completion_tokens),
        None => usage_stats(estimate_tokens(prompt), estimate_tokens(&generation.text)),
    }
}

/// Runs the full generation pipeline: prompt build, one service call,
/// draft extraction. Single attempt; any failure is terminal.
pub async fn generate_blog_post(
    client: &GeminiClient,
    options: &GenerateOptions,
) -> Result<(PostDraft, UsageStats)> {
    let prompt = build_post_prompt(options);
    let generation = client.generate(&prompt, GenerationParams::post()).await?;
    let usage = usage_for(&prompt, &generation);
    let draft = parse_draft(&generation.text)?;
    Ok((draft, usage))
}

pub async fn improve_content(
    client: &GeminiClient,
    content: &str,
    instructions: &str,
) -> Result<(String, UsageStats)> {
    let prompt = build_improve_prompt(content, instructions);
    let generation = client.generate(&prompt, GenerationParams::improve()).await?;
    let usage = usage_for(&prompt, &generation);
    Ok((generation.text, usage))
}

pub async fn suggest_titles(
    client: &GeminiClient,
    topic: &str,
    count: u32,
) -> Result<Vec<String>> {
    let prompt = build_titles_prompt(topic, count);
    let generation = client.generate(&prompt, GenerationParams::titles()).await?;
    Ok(parse_suggestion_lines(&generation.text, count as usize))
}

pub async fn suggest_topics(
    client: &GeminiClient,
    category: &str,
    count: u32,
) -> Result<Vec<String>> {
    let prompt = build_topics_prompt(category, count);
    let generation = client.generate(&prompt, GenerationParams::topics()).await?;
    Ok(parse_suggestion_lines(&generation.text, count as usize))
}

/// Splits suggestion output into clean lines: bullets and numbering
/// stripped, headings and blanks dropped, capped at `count`.
fn parse_suggestion_lines(text: &str, count: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| strip_list_prefix(line).to_string())
        .filter(|line| !line.is_empty())
        .take(count)
        .collect()
}

/// Removes a leading bullet or list-numbering marker. Digits are only a
/// marker when followed by `.` or `)`; a title that happens to start with
/// a number stays intact.
fn strip_list_prefix(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn usage_stats_sum_and_cost() {
        let usage = usage_stats(100, 400);
        assert_eq!(usage.total_tokens, 500);
        assert_eq!(usage.cost, 0.0);
    }

    #[test]
    fn suggestion_lines_are_cleaned_and_capped() {
        let text = "# Suggestions\n\n- First title\n* Second title\n1. Third title\n2) Fourth title\nFifth title\nSixth title\n";
        let titles = parse_suggestion_lines(text, 5);
        assert_eq!(
            titles,
            vec![
                "First title",
                "Second title",
                "Third title",
                "Fourth title",
                "Fifth title"
            ]
        );
    }

    #[test]
    fn digit_leading_titles_survive_cleanup() {
        let text = "2025 AI Trends You Cannot Ignore\n10 Tips for Rust Beginners\n1. 7 Habits of Effective Teams\n";
        let titles = parse_suggestion_lines(text, 5);
        assert_eq!(
            titles,
            vec![
                "2025 AI Trends You Cannot Ignore",
                "10 Tips for Rust Beginners",
                "7 Habits of Effective Teams"
            ]
        );
    }
}
