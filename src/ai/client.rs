use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Per-call generation parameters. Single attempt, no retry or backoff;
/// a failed call is terminal for the request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    pub fn post() -> Self {
        Self {
            temperature: 0.7,
            top_k: Some(40),
            top_p: Some(0.95),
            max_output_tokens: 16384,
        }
    }

    pub fn improve() -> Self {
        Self {
            temperature: 0.7,
            top_k: None,
            top_p: None,
            max_output_tokens: 16384,
        }
    }

    pub fn titles() -> Self {
        Self {
            temperature: 0.8,
            top_k: None,
            top_p: None,
            max_output_tokens: 1000,
        }
    }

    pub fn topics() -> Self {
        Self {
            temperature: 0.9,
            top_k: None,
            top_p: None,
            max_output_tokens: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

/// Token counts as reported by the service. Absent when the service did
/// not include usage metadata; the caller then falls back to estimation.
#[derive(Debug, Clone, Copy)]
pub struct TokenCounts {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenCounts>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one prompt to the generative-language service and returns the
    /// joined candidate text.
    pub async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<Generation> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                max_output_tokens: params.max_output_tokens,
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Ai(format!("API error: {}", error_text)));
        }

        let body: GenerateContentResponse = response.json().await?;

        let text = body
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(AppError::Ai("empty response from model".to_string()));
        }

        let usage = body.usage_metadata.and_then(|meta| {
            match (meta.prompt_token_count, meta.candidates_token_count) {
                (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenCounts {
                    prompt_tokens,
                    completion_tokens,
                }),
                _ => None,
            }
        });

        Ok(Generation { text, usage })
    }
}
