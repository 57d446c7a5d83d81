use std::sync::OnceLock;

use regex::Regex;
use salvo::prelude::*;
use serde::Deserialize;

use crate::db::CategoryPatch;
use crate::error::{AppError, FieldError, Result};
use crate::models::{Category, NewCategory, DEFAULT_CATEGORY_COLOR};
use crate::text;

use super::envelope::ApiEnvelope;
use super::{auth, state};

pub fn routes() -> Router {
    Router::with_path("categories")
        .get(list_categories)
        .push(Router::with_path("{id}").get(get_category))
        .push(
            Router::new()
                .hoop(auth::require_admin)
                .post(create_category)
                .push(
                    Router::with_path("{id}")
                        .put(update_category)
                        .delete(delete_category),
                ),
        )
}

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCategoryBody {
    name: String,
    slug: Option<String>,
    description: Option<String>,
    image: Option<String>,
    color: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCategoryBody {
    name: Option<String>,
    slug: Option<String>,
    description: Option<String>,
    image: Option<String>,
    color: Option<String>,
    is_active: Option<bool>,
}

fn check_category_fields(
    details: &mut Vec<FieldError>,
    name: Option<&str>,
    color: Option<&str>,
    image: Option<&str>,
) {
    if let Some(name) = name {
        if name.trim().is_empty() {
            details.push(FieldError::new("name", "name is required"));
        } else if name.chars().count() > 100 {
            details.push(FieldError::new("name", "name must be at most 100 characters"));
        }
    }
    if let Some(color) = color {
        if !color_regex().is_match(color) {
            details.push(FieldError::new("color", "color must be a hex code like #3B82F6"));
        }
    }
    if let Some(image) = image {
        if !image.is_empty() && url::Url::parse(image).is_err() {
            details.push(FieldError::new("image", "image must be a valid URL"));
        }
    }
}

fn category_id(req: &Request) -> Result<i64> {
    req.param::<i64>("id")
        .ok_or_else(|| AppError::invalid("id", "id must be an integer"))
}

#[handler]
pub async fn list_categories(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<Vec<Category>>>, AppError> {
    let state = state(depot)?;
    let active_only = req.query::<bool>("activeOnly").unwrap_or(false);
    let include_count = req.query::<bool>("includeCount").unwrap_or(false);
    let categories = state.repo.list_categories(active_only, include_count).await?;
    Ok(Json(ApiEnvelope::data(categories)))
}

#[handler]
pub async fn get_category(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<Category>>, AppError> {
    let state = state(depot)?;
    let id = category_id(req)?;
    let category = state
        .repo
        .find_category(id)
        .await?
        .ok_or_else(|| AppError::NotFound("category not found".to_string()))?;
    Ok(Json(ApiEnvelope::data(category)))
}

#[handler]
pub async fn create_category(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<Category>>, AppError> {
    let state = state(depot)?;
    let body: CreateCategoryBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    let mut details = Vec::new();
    check_category_fields(
        &mut details,
        Some(&body.name),
        body.color.as_deref(),
        body.image.as_deref(),
    );
    if !details.is_empty() {
        return Err(AppError::validation(details));
    }

    let slug = body
        .slug
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| text::slugify(&body.name));
    if slug.is_empty() {
        return Err(AppError::invalid("slug", "name does not produce a usable slug"));
    }
    if state.repo.category_slug_exists(&slug, None).await? {
        return Err(AppError::Conflict("this slug is already in use".to_string()));
    }

    let id = state
        .repo
        .create_category(NewCategory {
            name: body.name,
            slug,
            description: body.description.filter(|s| !s.is_empty()),
            image: body.image.filter(|s| !s.is_empty()),
            color: body.color.unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            is_active: body.is_active.unwrap_or(true),
        })
        .await?;

    let category = state
        .repo
        .find_category(id)
        .await?
        .ok_or_else(|| AppError::NotFound("category not found".to_string()))?;

    Ok(Json(ApiEnvelope::with_message(category, "category created")))
}

#[handler]
pub async fn update_category(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<Category>>, AppError> {
    let state = state(depot)?;
    let id = category_id(req)?;
    let body: UpdateCategoryBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    let existing = state
        .repo
        .find_category(id)
        .await?
        .ok_or_else(|| AppError::NotFound("category not found".to_string()))?;

    let mut details = Vec::new();
    check_category_fields(
        &mut details,
        body.name.as_deref(),
        body.color.as_deref(),
        body.image.as_deref(),
    );
    if !details.is_empty() {
        return Err(AppError::validation(details));
    }

    let slug = match (body.slug.filter(|s| !s.is_empty()), &body.name) {
        (Some(slug), _) => Some(slug),
        (None, Some(name)) => Some(text::slugify(name)),
        (None, None) => None,
    };
    if let Some(slug) = &slug {
        if *slug != existing.slug && state.repo.category_slug_exists(slug, Some(id)).await? {
            return Err(AppError::Conflict("this slug is already in use".to_string()));
        }
    }

    state
        .repo
        .update_category(
            id,
            CategoryPatch {
                name: body.name,
                slug,
                description: body
                    .description
                    .map(|s| if s.is_empty() { None } else { Some(s) }),
                image: body.image.map(|s| if s.is_empty() { None } else { Some(s) }),
                color: body.color,
                is_active: body.is_active,
            },
        )
        .await?;

    let category = state
        .repo
        .find_category(id)
        .await?
        .ok_or_else(|| AppError::NotFound("category not found".to_string()))?;

    Ok(Json(ApiEnvelope::with_message(category, "category updated")))
}

#[handler]
pub async fn delete_category(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<ApiEnvelope<()>>, AppError> {
    let state = state(depot)?;
    let id = category_id(req)?;

    if state.repo.find_category(id).await?.is_none() {
        return Err(AppError::NotFound("category not found".to_string()));
    }

    // Deleting a referenced category is blocked, not cascaded. Repeating
    // the request fails the same way with the record unchanged.
    if state.repo.count_posts_in_category(id).await? > 0 {
        return Err(AppError::Conflict(
            "this category still has posts; move or delete them first".to_string(),
        ));
    }

    state.repo.delete_category(id).await?;

    Ok(Json(ApiEnvelope::message("category deleted")))
}
