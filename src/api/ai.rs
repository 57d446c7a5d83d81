use std::sync::Arc;

use salvo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::{
    self, GeminiClient, GenerateOptions, Language, PostDraft, Tone, DEFAULT_WORD_COUNT,
    MAX_WORD_COUNT, MIN_WORD_COUNT,
};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{AiUsageEntry, UsageStats};

use super::envelope::ApiEnvelope;
use super::{auth, state, AppState};

pub fn routes() -> Router {
    Router::with_path("ai")
        .hoop(auth::require_admin)
        .push(Router::with_path("generate").post(generate))
        .push(Router::with_path("improve").post(improve))
        .push(Router::with_path("titles").post(titles))
        .push(Router::with_path("topics").post(topics))
}

fn client(state: &AppState) -> Result<Arc<GeminiClient>> {
    state
        .ai
        .clone()
        .ok_or_else(|| AppError::Ai("GEMINI_API_KEY is not configured".to_string()))
}

/// Appends a ledger row in the background; a ledger failure never fails
/// the request that produced it.
fn record_usage(repo: &Repository, entry: AiUsageEntry) {
    let repo = repo.clone();
    tokio::spawn(async move {
        if let Err(e) = repo.record_ai_usage(entry).await {
            tracing::warn!("failed to record AI usage: {e}");
        }
    });
}

fn usage_entry(model: &str, usage: &UsageStats, purpose: &str) -> AiUsageEntry {
    AiUsageEntry {
        model: model.to_string(),
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
        cost: usage.cost,
        purpose: purpose.to_string(),
        success: true,
        error: None,
    }
}

fn failure_entry(model: &str, purpose: &str, error: &AppError) -> AiUsageEntry {
    AiUsageEntry {
        model: model.to_string(),
        prompt_tokens: 0,
        completion_tokens: 0,
        total_tokens: 0,
        cost: 0.0,
        purpose: purpose.to_string(),
        success: false,
        error: Some(error.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    topic: String,
    keywords: Option<Vec<String>>,
    tone: Option<Tone>,
    word_count: Option<u32>,
    language: Option<Language>,
    category_id: Option<i64>,
}

#[handler]
pub async fn generate(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<PostDraft>>, AppError> {
    let state = state(depot)?;
    let body: GenerateBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    if body.topic.trim().is_empty() {
        return Err(AppError::invalid("topic", "topic is required"));
    }
    let word_count = body.word_count.unwrap_or(DEFAULT_WORD_COUNT);
    if !(MIN_WORD_COUNT..=MAX_WORD_COUNT).contains(&word_count) {
        return Err(AppError::invalid(
            "wordCount",
            &format!("wordCount must be between {MIN_WORD_COUNT} and {MAX_WORD_COUNT}"),
        ));
    }

    let client = client(state)?;

    // An unknown category id is not an error here; the prompt simply goes
    // out without the category context.
    let category_name = match body.category_id {
        Some(id) => state.repo.find_category(id).await?.map(|c| c.name),
        None => None,
    };

    let options = GenerateOptions {
        topic: body.topic,
        keywords: body.keywords.unwrap_or_default(),
        tone: body.tone.unwrap_or_default(),
        word_count,
        language: body.language.unwrap_or_default(),
        category_name,
    };

    match ai::generate_blog_post(&client, &options).await {
        Ok((draft, usage)) => {
            record_usage(
                &state.repo,
                usage_entry(client.model(), &usage, "post_generation"),
            );
            Ok(Json(ApiEnvelope::data(draft).usage(usage)))
        }
        Err(e) => {
            record_usage(
                &state.repo,
                failure_entry(client.model(), "post_generation", &e),
            );
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImproveBody {
    content: String,
    instructions: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedContent {
    pub improved_content: String,
}

#[handler]
pub async fn improve(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<ImprovedContent>>, AppError> {
    let state = state(depot)?;
    let body: ImproveBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    if body.content.trim().is_empty() {
        return Err(AppError::invalid("content", "content is required"));
    }
    if body.instructions.trim().is_empty() {
        return Err(AppError::invalid("instructions", "instructions are required"));
    }

    let client = client(state)?;

    match ai::improve_content(&client, &body.content, &body.instructions).await {
        Ok((improved, usage)) => {
            record_usage(
                &state.repo,
                usage_entry(client.model(), &usage, "content_improvement"),
            );
            Ok(Json(
                ApiEnvelope::data(ImprovedContent {
                    improved_content: improved,
                })
                .usage(usage),
            ))
        }
        Err(e) => {
            record_usage(
                &state.repo,
                failure_entry(client.model(), "content_improvement", &e),
            );
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct TitlesBody {
    topic: String,
    count: Option<u32>,
}

fn suggestion_count(count: Option<u32>) -> Result<u32> {
    let count = count.unwrap_or(5);
    if !(1..=10).contains(&count) {
        return Err(AppError::invalid("count", "count must be between 1 and 10"));
    }
    Ok(count)
}

#[handler]
pub async fn titles(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<Vec<String>>>, AppError> {
    let state = state(depot)?;
    let body: TitlesBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    if body.topic.trim().is_empty() {
        return Err(AppError::invalid("topic", "topic is required"));
    }
    let count = suggestion_count(body.count)?;

    let client = client(state)?;
    let suggestions = ai::suggest_titles(&client, &body.topic, count).await?;
    Ok(Json(ApiEnvelope::data(suggestions)))
}

#[derive(Debug, Deserialize)]
struct TopicsBody {
    category: String,
    count: Option<u32>,
}

#[handler]
pub async fn topics(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<Vec<String>>>, AppError> {
    let state = state(depot)?;
    let body: TopicsBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    if body.category.trim().is_empty() {
        return Err(AppError::invalid("category", "category is required"));
    }
    let count = suggestion_count(body.count)?;

    let client = client(state)?;
    let suggestions = ai::suggest_topics(&client, &body.category, count).await?;
    Ok(Json(ApiEnvelope::data(suggestions)))
}
