use serde::Serialize;

use crate::models::UsageStats;

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + page_size - 1) / page_size
        };
        Self {
            total,
            page,
            page_size,
            total_pages,
            has_next: page * page_size < total,
            has_prev: page > 1,
        }
    }
}

/// Uniform response envelope: `{ success, data?, message?, usage?, pagination? }`.
/// The error side is rendered by `AppError`.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            usage: None,
            pagination: None,
        }
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::data(data)
        }
    }

    pub fn usage(mut self, usage: UsageStats) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiEnvelope<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            usage: None,
            pagination: None,
        }
    }
}
