use serde::{Deserialize, Serialize};

/// Token usage and estimated cost for a single AI call, reported back to
/// the caller alongside the generated content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
}

/// Append-only ledger row for an AI call, success or failure.
#[derive(Debug, Clone)]
pub struct AiUsageEntry {
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
    pub purpose: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiUsageTotals {
    pub calls: i64,
    pub failed_calls: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: String,
    pub posts: i64,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub total_categories: i64,
    pub top_posts: Vec<TopPost>,
    pub category_stats: Vec<CategoryStat>,
    pub ai_usage: AiUsageTotals,
}
