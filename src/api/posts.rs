use chrono::{DateTime, Utc};
use salvo::prelude::*;
use serde::Deserialize;

use crate::db::{self, PostFilter, PostPatch};
use crate::error::{AppError, FieldError, Result};
use crate::models::{NewPost, Post, PostStatus};
use crate::text;

use super::envelope::{ApiEnvelope, Pagination};
use super::{auth, state};

pub fn routes() -> Router {
    Router::with_path("posts")
        .get(list_posts)
        .push(Router::with_path("slug/{slug}").get(get_post_by_slug))
        .push(Router::with_path("{id}").get(get_post))
        .push(
            Router::new()
                .hoop(auth::require_admin)
                .post(create_post)
                .push(Router::with_path("{id}").put(update_post).delete(delete_post)),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostBody {
    title: String,
    slug: Option<String>,
    excerpt: Option<String>,
    content: String,
    category_id: i64,
    author_id: i64,
    tags: Option<Vec<String>>,
    featured_image: Option<String>,
    status: Option<PostStatus>,
    scheduled_for: Option<DateTime<Utc>>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePostBody {
    title: Option<String>,
    slug: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
    category_id: Option<i64>,
    tags: Option<Vec<String>>,
    featured_image: Option<String>,
    status: Option<PostStatus>,
    scheduled_for: Option<DateTime<Utc>>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    keywords: Option<Vec<String>>,
}

fn check_field_lengths(
    details: &mut Vec<FieldError>,
    title: Option<&str>,
    content: Option<&str>,
    excerpt: Option<&str>,
    meta_title: Option<&str>,
    meta_description: Option<&str>,
    featured_image: Option<&str>,
) {
    if let Some(title) = title {
        if title.trim().is_empty() {
            details.push(FieldError::new("title", "title is required"));
        } else if title.chars().count() > 200 {
            details.push(FieldError::new("title", "title must be at most 200 characters"));
        }
    }
    if let Some(content) = content {
        if content.trim().is_empty() {
            details.push(FieldError::new("content", "content is required"));
        }
    }
    if let Some(excerpt) = excerpt {
        if excerpt.chars().count() > 300 {
            details.push(FieldError::new("excerpt", "excerpt must be at most 300 characters"));
        }
    }
    if let Some(meta_title) = meta_title {
        if meta_title.chars().count() > 60 {
            details.push(FieldError::new("metaTitle", "metaTitle must be at most 60 characters"));
        }
    }
    if let Some(meta_description) = meta_description {
        if meta_description.chars().count() > 160 {
            details.push(FieldError::new(
                "metaDescription",
                "metaDescription must be at most 160 characters",
            ));
        }
    }
    if let Some(image) = featured_image {
        if !image.is_empty() && url::Url::parse(image).is_err() {
            details.push(FieldError::new("featuredImage", "featuredImage must be a valid URL"));
        }
    }
}

fn tag_pairs(tags: &[String]) -> Vec<(String, String)> {
    tags.iter()
        .filter_map(|name| {
            let slug = text::slugify(name);
            if slug.is_empty() {
                None
            } else {
                Some((name.clone(), slug))
            }
        })
        .collect()
}

fn post_id(req: &Request) -> Result<i64> {
    req.param::<i64>("id")
        .ok_or_else(|| AppError::invalid("id", "id must be an integer"))
}

#[handler]
pub async fn list_posts(req: &mut Request, depot: &mut Depot) -> Result<Json<ApiEnvelope<Vec<Post>>>, AppError> {
    let state = state(depot)?;

    let status = match req.query::<String>("status") {
        Some(s) if !s.is_empty() && s != "all" => Some(
            s.parse::<PostStatus>()
                .map_err(|_| AppError::invalid("status", "unknown status"))?,
        ),
        _ => None,
    };
    let filter = PostFilter {
        status,
        category_id: req.query::<i64>("categoryId"),
        search: req.query::<String>("search").filter(|s| !s.is_empty()),
    };

    let page = req.query::<i64>("page").unwrap_or(1).max(1);
    let page_size = req.query::<i64>("pageSize").unwrap_or(10).clamp(1, 100);
    let sort_by = req
        .query::<String>("sortBy")
        .unwrap_or_else(|| "createdAt".to_string());
    let sort = db::sort_column(&sort_by)
        .ok_or_else(|| AppError::invalid("sortBy", "unsupported sort field"))?;
    let ascending = match req
        .query::<String>("sortOrder")
        .unwrap_or_else(|| "desc".to_string())
        .as_str()
    {
        "asc" => true,
        "desc" => false,
        _ => return Err(AppError::invalid("sortOrder", "must be asc or desc")),
    };

    let total = state.repo.count_posts(&filter).await?;
    let posts = state
        .repo
        .list_posts(&filter, sort, ascending, page, page_size)
        .await?;

    Ok(Json(
        ApiEnvelope::data(posts).pagination(Pagination::new(total, page, page_size)),
    ))
}

#[handler]
pub async fn get_post(req: &mut Request, depot: &mut Depot) -> Result<Json<ApiEnvelope<Post>>, AppError> {
    let state = state(depot)?;
    let id = post_id(req)?;
    let post = state
        .repo
        .find_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;
    Ok(Json(ApiEnvelope::data(post)))
}

/// Public detail endpoint: published posts only, bumps the view counter.
#[handler]
pub async fn get_post_by_slug(req: &mut Request, depot: &mut Depot) -> Result<Json<ApiEnvelope<Post>>, AppError> {
    let state = state(depot)?;
    let slug = req
        .param::<String>("slug")
        .ok_or_else(|| AppError::invalid("slug", "slug is required"))?;
    let mut post = state
        .repo
        .find_post_by_slug(&slug)
        .await?
        .filter(|post| post.status == PostStatus::Published)
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    state.repo.increment_views(post.id).await?;
    post.views += 1;

    Ok(Json(ApiEnvelope::data(post)))
}

#[handler]
pub async fn create_post(req: &mut Request, depot: &mut Depot) -> Result<Json<ApiEnvelope<Post>>, AppError> {
    let state = state(depot)?;
    let body: CreatePostBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    let mut details = Vec::new();
    check_field_lengths(
        &mut details,
        Some(&body.title),
        Some(&body.content),
        body.excerpt.as_deref(),
        body.meta_title.as_deref(),
        body.meta_description.as_deref(),
        body.featured_image.as_deref(),
    );
    if !details.is_empty() {
        return Err(AppError::validation(details));
    }

    let slug = body
        .slug
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| text::slugify(&body.title));
    if slug.is_empty() {
        return Err(AppError::invalid("slug", "title does not produce a usable slug"));
    }
    if state.repo.post_slug_exists(&slug, None).await? {
        return Err(AppError::Conflict("this slug is already in use".to_string()));
    }

    if state.repo.find_category(body.category_id).await?.is_none() {
        return Err(AppError::invalid("categoryId", "category does not exist"));
    }
    if !state.repo.user_exists(body.author_id).await? {
        return Err(AppError::invalid("authorId", "author does not exist"));
    }

    let status = body.status.unwrap_or(PostStatus::Draft);
    let published_at = (status == PostStatus::Published).then(Utc::now);
    let meta_title = body
        .meta_title
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| body.title.clone());
    let meta_description = body
        .meta_description
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| text::meta_description(&body.content));

    let id = state
        .repo
        .create_post(NewPost {
            title: body.title,
            slug,
            excerpt: body.excerpt.unwrap_or_default(),
            content: body.content,
            featured_image: body.featured_image.filter(|s| !s.is_empty()),
            status,
            category_id: body.category_id,
            author_id: body.author_id,
            scheduled_for: body.scheduled_for,
            published_at,
            meta_title,
            meta_description,
            keywords: body.keywords.unwrap_or_default(),
            tags: tag_pairs(&body.tags.unwrap_or_default()),
        })
        .await?;

    let post = state
        .repo
        .find_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    Ok(Json(ApiEnvelope::with_message(post, "post created")))
}

#[handler]
pub async fn update_post(req: &mut Request, depot: &mut Depot) -> Result<Json<ApiEnvelope<Post>>, AppError> {
    let state = state(depot)?;
    let id = post_id(req)?;
    let body: UpdatePostBody = req
        .parse_json()
        .await
        .map_err(|e| AppError::invalid("body", &e.to_string()))?;

    let existing = state
        .repo
        .find_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    let mut details = Vec::new();
    check_field_lengths(
        &mut details,
        body.title.as_deref(),
        body.content.as_deref(),
        body.excerpt.as_deref(),
        body.meta_title.as_deref(),
        body.meta_description.as_deref(),
        body.featured_image.as_deref(),
    );
    if !details.is_empty() {
        return Err(AppError::validation(details));
    }

    // Explicit slug wins; otherwise a new title regenerates it. Either way
    // the result must stay unique.
    let slug = match (body.slug.clone().filter(|s| !s.is_empty()), &body.title) {
        (Some(slug), _) => Some(slug),
        (None, Some(title)) => Some(text::slugify(title)),
        (None, None) => None,
    };
    if let Some(slug) = &slug {
        if *slug != existing.slug && state.repo.post_slug_exists(slug, Some(id)).await? {
            return Err(AppError::Conflict("this slug is already in use".to_string()));
        }
    }

    if let Some(category_id) = body.category_id {
        if state.repo.find_category(category_id).await?.is_none() {
            return Err(AppError::invalid("categoryId", "category does not exist"));
        }
    }

    let published_at = match body.status {
        Some(PostStatus::Published) if existing.status != PostStatus::Published => Some(Utc::now()),
        _ => None,
    };

    let patch = PostPatch {
        title: body.title,
        slug,
        excerpt: body.excerpt,
        content: body.content,
        featured_image: body
            .featured_image
            .map(|s| if s.is_empty() { None } else { Some(s) }),
        status: body.status,
        scheduled_for: body.scheduled_for,
        published_at,
        meta_title: body.meta_title,
        meta_description: body.meta_description,
        keywords: body.keywords,
        tags: body.tags.map(|tags| tag_pairs(&tags)),
        category_id: body.category_id,
    };
    state.repo.update_post(id, patch).await?;

    let post = state
        .repo
        .find_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    Ok(Json(ApiEnvelope::with_message(post, "post updated")))
}

#[handler]
pub async fn delete_post(req: &mut Request, depot: &mut Depot) -> Result<Json<ApiEnvelope<()>>, AppError> {
    let state = state(depot)?;
    let id = post_id(req)?;

    if state.repo.find_post(id).await?.is_none() {
        return Err(AppError::NotFound("post not found".to_string()));
    }

    // Analytics and tag links are removed by the schema's cascade rules.
    state.repo.delete_post(id).await?;

    Ok(Json(ApiEnvelope::message("post deleted")))
}
