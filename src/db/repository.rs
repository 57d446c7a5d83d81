use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection as SqliteConnection, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    AiUsageEntry, AiUsageTotals, AuthorRef, Category, CategoryRef, CategoryStat, DashboardStats,
    NewCategory, NewPost, Post, PostAnalytics, PostStatus, Tag, TopPost,
};

use super::schema::SCHEMA;

/// Filters applied to post listing and counting.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
}

/// Partial update for a post. `None` leaves a column unchanged; the nested
/// options clear nullable columns.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<Option<String>>,
    pub status: Option<PostStatus>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub tags: Option<Vec<(String, String)>>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

/// Maps an API sort field to its column. Anything outside the whitelist is
/// rejected so the ORDER BY clause never interpolates caller input.
pub fn sort_column(name: &str) -> Option<&'static str> {
    match name {
        "createdAt" => Some("p.created_at"),
        "updatedAt" => Some("p.updated_at"),
        "publishedAt" => Some("p.published_at"),
        "title" => Some("p.title"),
        "slug" => Some("p.slug"),
        "views" => Some("p.views"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Closes the underlying connection. Called once on graceful shutdown.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    // User operations

    pub async fn upsert_user(
        &self,
        name: &str,
        email: &str,
        image: Option<&str>,
        role: &str,
    ) -> Result<i64> {
        let name = name.to_string();
        let email = email.to_string();
        let image = image.map(|s| s.to_string());
        let role = role.to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO users (name, email, image, role) VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(email) DO UPDATE SET
                           name = excluded.name,
                           image = excluded.image,
                           role = excluded.role"#,
                    params![name, email, image, role],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn user_exists(&self, id: i64) -> Result<bool> {
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    // Category operations

    pub async fn list_categories(
        &self,
        active_only: bool,
        include_count: bool,
    ) -> Result<Vec<Category>> {
        let categories = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    r#"SELECT c.id, c.name, c.slug, c.description, c.image, c.color,
                              c.is_active, c.created_at, c.updated_at,
                              (SELECT COUNT(*) FROM posts p WHERE p.category_id = c.id)
                       FROM categories c
                       {}
                       ORDER BY c.name"#,
                    if active_only { "WHERE c.is_active = 1" } else { "" }
                );
                let mut stmt = conn.prepare(&sql)?;
                let categories = stmt
                    .query_map([], |row| Ok(category_from_row(row, include_count)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(categories)
            })
            .await?;
        Ok(categories)
    }

    pub async fn find_category(&self, id: i64) -> Result<Option<Category>> {
        let category = self
            .conn
            .call(move |conn| {
                let category = conn
                    .query_row(
                        r#"SELECT c.id, c.name, c.slug, c.description, c.image, c.color,
                                  c.is_active, c.created_at, c.updated_at,
                                  (SELECT COUNT(*) FROM posts p WHERE p.category_id = c.id)
                           FROM categories c WHERE c.id = ?1"#,
                        params![id],
                        |row| Ok(category_from_row(row, true)),
                    )
                    .optional()?;
                Ok(category)
            })
            .await?;
        Ok(category)
    }

    pub async fn category_slug_exists(&self, slug: &str, exclude: Option<i64>) -> Result<bool> {
        let slug = slug.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM categories WHERE slug = ?1 AND id != ?2",
                    params![slug, exclude.unwrap_or(-1)],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    pub async fn create_category(&self, category: NewCategory) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO categories (name, slug, description, image, color, is_active)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                    params![
                        category.name,
                        category.slug,
                        category.description,
                        category.image,
                        category.color,
                        category.is_active,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn update_category(&self, id: i64, patch: CategoryPatch) -> Result<()> {
        self.conn
            .call(move |conn| {
                let mut sets: Vec<&'static str> = Vec::new();
                let mut values: Vec<Value> = Vec::new();

                if let Some(name) = patch.name {
                    sets.push("name = ?");
                    values.push(Value::from(name));
                }
                if let Some(slug) = patch.slug {
                    sets.push("slug = ?");
                    values.push(Value::from(slug));
                }
                if let Some(description) = patch.description {
                    sets.push("description = ?");
                    values.push(description.map(Value::from).unwrap_or(Value::Null));
                }
                if let Some(image) = patch.image {
                    sets.push("image = ?");
                    values.push(image.map(Value::from).unwrap_or(Value::Null));
                }
                if let Some(color) = patch.color {
                    sets.push("color = ?");
                    values.push(Value::from(color));
                }
                if let Some(is_active) = patch.is_active {
                    sets.push("is_active = ?");
                    values.push(Value::from(is_active as i64));
                }
                sets.push("updated_at = datetime('now')");

                let sql = format!("UPDATE categories SET {} WHERE id = ?", sets.join(", "));
                values.push(Value::from(id));
                conn.execute(&sql, params_from_iter(values))?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn count_posts_in_category(&self, id: i64) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM posts WHERE category_id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Post operations

    pub async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let filter = filter.clone();
        let count = self
            .conn
            .call(move |conn| {
                let (where_sql, values) = build_post_filter(&filter);
                let sql = format!("SELECT COUNT(*) FROM posts p {where_sql}");
                let count: i64 =
                    conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    pub async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: &'static str,
        ascending: bool,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Post>> {
        let filter = filter.clone();
        let posts = self
            .conn
            .call(move |conn| {
                let (where_sql, mut values) = build_post_filter(&filter);
                let order = if ascending { "ASC" } else { "DESC" };
                let sql = format!(
                    "{POST_SELECT} {where_sql} ORDER BY {sort} {order} LIMIT ? OFFSET ?"
                );
                values.push(Value::from(page_size));
                values.push(Value::from((page - 1) * page_size));

                let mut stmt = conn.prepare(&sql)?;
                let mut posts = stmt
                    .query_map(params_from_iter(values), |row| Ok(post_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                for post in &mut posts {
                    post.tags = load_tags(conn, post.id)?;
                }
                Ok(posts)
            })
            .await?;
        Ok(posts)
    }

    pub async fn find_post(&self, id: i64) -> Result<Option<Post>> {
        let post = self
            .conn
            .call(move |conn| {
                let sql = format!("{POST_SELECT} WHERE p.id = ?1");
                let post = conn
                    .query_row(&sql, params![id], |row| Ok(post_from_row(row)))
                    .optional()?;
                let Some(mut post) = post else {
                    return Ok(None);
                };
                post.tags = load_tags(conn, post.id)?;
                post.analytics = load_analytics(conn, post.id)?;
                Ok(Some(post))
            })
            .await?;
        Ok(post)
    }

    pub async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let slug = slug.to_string();
        let post = self
            .conn
            .call(move |conn| {
                let sql = format!("{POST_SELECT} WHERE p.slug = ?1");
                let post = conn
                    .query_row(&sql, params![slug], |row| Ok(post_from_row(row)))
                    .optional()?;
                let Some(mut post) = post else {
                    return Ok(None);
                };
                post.tags = load_tags(conn, post.id)?;
                post.analytics = load_analytics(conn, post.id)?;
                Ok(Some(post))
            })
            .await?;
        Ok(post)
    }

    pub async fn post_slug_exists(&self, slug: &str, exclude: Option<i64>) -> Result<bool> {
        let slug = slug.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM posts WHERE slug = ?1 AND id != ?2",
                    params![slug, exclude.unwrap_or(-1)],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Inserts the post row, its analytics row, and the tag links.
    /// Tags use connect-or-create semantics keyed by slug, so repeated or
    /// duplicate tag names are idempotent.
    pub async fn create_post(&self, post: NewPost) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let keywords = serde_json::to_string(&post.keywords).unwrap_or_default();
                conn.execute(
                    r#"INSERT INTO posts (title, slug, excerpt, content, featured_image, status,
                                          category_id, author_id, scheduled_for, published_at,
                                          meta_title, meta_description, keywords)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                    params![
                        post.title,
                        post.slug,
                        post.excerpt,
                        post.content,
                        post.featured_image,
                        post.status.as_str(),
                        post.category_id,
                        post.author_id,
                        post.scheduled_for.map(|dt| dt.to_rfc3339()),
                        post.published_at.map(|dt| dt.to_rfc3339()),
                        post.meta_title,
                        post.meta_description,
                        keywords,
                    ],
                )?;
                let post_id = conn.last_insert_rowid();
                link_tags(conn, post_id, &post.tags)?;
                conn.execute(
                    "INSERT INTO post_analytics (post_id) VALUES (?1)",
                    params![post_id],
                )?;
                Ok(post_id)
            })
            .await?;
        Ok(id)
    }

    pub async fn update_post(&self, id: i64, patch: PostPatch) -> Result<()> {
        self.conn
            .call(move |conn| {
                let mut sets: Vec<&'static str> = Vec::new();
                let mut values: Vec<Value> = Vec::new();

                if let Some(title) = patch.title {
                    sets.push("title = ?");
                    values.push(Value::from(title));
                }
                if let Some(slug) = patch.slug {
                    sets.push("slug = ?");
                    values.push(Value::from(slug));
                }
                if let Some(excerpt) = patch.excerpt {
                    sets.push("excerpt = ?");
                    values.push(Value::from(excerpt));
                }
                if let Some(content) = patch.content {
                    sets.push("content = ?");
                    values.push(Value::from(content));
                }
                if let Some(image) = patch.featured_image {
                    sets.push("featured_image = ?");
                    values.push(image.map(Value::from).unwrap_or(Value::Null));
                }
                if let Some(status) = patch.status {
                    sets.push("status = ?");
                    values.push(Value::from(status.as_str().to_string()));
                }
                if let Some(scheduled_for) = patch.scheduled_for {
                    sets.push("scheduled_for = ?");
                    values.push(Value::from(scheduled_for.to_rfc3339()));
                }
                if let Some(published_at) = patch.published_at {
                    sets.push("published_at = ?");
                    values.push(Value::from(published_at.to_rfc3339()));
                }
                if let Some(meta_title) = patch.meta_title {
                    sets.push("meta_title = ?");
                    values.push(Value::from(meta_title));
                }
                if let Some(meta_description) = patch.meta_description {
                    sets.push("meta_description = ?");
                    values.push(Value::from(meta_description));
                }
                if let Some(keywords) = patch.keywords {
                    sets.push("keywords = ?");
                    values.push(Value::from(
                        serde_json::to_string(&keywords).unwrap_or_default(),
                    ));
                }
                if let Some(category_id) = patch.category_id {
                    sets.push("category_id = ?");
                    values.push(Value::from(category_id));
                }
                sets.push("updated_at = datetime('now')");

                let sql = format!("UPDATE posts SET {} WHERE id = ?", sets.join(", "));
                values.push(Value::from(id));
                conn.execute(&sql, params_from_iter(values))?;

                // Replace the tag set when the caller supplied one.
                if let Some(tags) = patch.tags {
                    conn.execute("DELETE FROM post_tags WHERE post_id = ?1", params![id])?;
                    link_tags(conn, id, &tags)?;
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn delete_post(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                // Analytics and tag links go with it (ON DELETE CASCADE).
                conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Overwrites the view counter. Used by the demo seed only.
    pub async fn set_views(&self, id: i64, views: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE posts SET views = ?1 WHERE id = ?2",
                    params![views, id],
                )?;
                conn.execute(
                    "UPDATE post_analytics SET total_views = ?1 WHERE post_id = ?2",
                    params![views, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn increment_views(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE posts SET views = views + 1 WHERE id = ?1",
                    params![id],
                )?;
                conn.execute(
                    r#"UPDATE post_analytics
                       SET total_views = total_views + 1, updated_at = datetime('now')
                       WHERE post_id = ?1"#,
                    params![id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // AI usage ledger

    pub async fn record_ai_usage(&self, entry: AiUsageEntry) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO ai_usage (model, prompt_tokens, completion_tokens,
                                             total_tokens, cost, purpose, success, error)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    params![
                        entry.model,
                        entry.prompt_tokens,
                        entry.completion_tokens,
                        entry.total_tokens,
                        entry.cost,
                        entry.purpose,
                        entry.success,
                        entry.error,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn ai_usage_totals(&self) -> Result<AiUsageTotals> {
        let totals = self
            .conn
            .call(|conn| {
                let totals = conn.query_row(
                    r#"SELECT COUNT(*),
                              COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0),
                              COALESCE(SUM(total_tokens), 0),
                              COALESCE(SUM(cost), 0.0)
                       FROM ai_usage"#,
                    [],
                    |row| {
                        Ok(AiUsageTotals {
                            calls: row.get(0)?,
                            failed_calls: row.get(1)?,
                            total_tokens: row.get(2)?,
                            total_cost: row.get(3)?,
                        })
                    },
                )?;
                Ok(totals)
            })
            .await?;
        Ok(totals)
    }

    // Dashboard

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let stats = self
            .conn
            .call(|conn| {
                let total_posts: i64 =
                    conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
                let published_posts: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM posts WHERE status = 'PUBLISHED'",
                    [],
                    |row| row.get(0),
                )?;
                let draft_posts: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM posts WHERE status = 'DRAFT'",
                    [],
                    |row| row.get(0),
                )?;
                let total_views: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(views), 0) FROM posts",
                    [],
                    |row| row.get(0),
                )?;
                let total_categories: i64 =
                    conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;

                let mut stmt = conn.prepare(
                    "SELECT id, title, slug, views FROM posts ORDER BY views DESC LIMIT 5",
                )?;
                let top_posts = stmt
                    .query_map([], |row| {
                        Ok(TopPost {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            slug: row.get(2)?,
                            views: row.get(3)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut stmt = conn.prepare(
                    r#"SELECT c.name, COUNT(p.id), COALESCE(SUM(p.views), 0)
                       FROM categories c
                       LEFT JOIN posts p ON p.category_id = c.id
                       GROUP BY c.id
                       ORDER BY c.name"#,
                )?;
                let category_stats = stmt
                    .query_map([], |row| {
                        Ok(CategoryStat {
                            category: row.get(0)?,
                            posts: row.get(1)?,
                            views: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let ai_usage = conn.query_row(
                    r#"SELECT COUNT(*),
                              COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0),
                              COALESCE(SUM(total_tokens), 0),
                              COALESCE(SUM(cost), 0.0)
                       FROM ai_usage"#,
                    [],
                    |row| {
                        Ok(AiUsageTotals {
                            calls: row.get(0)?,
                            failed_calls: row.get(1)?,
                            total_tokens: row.get(2)?,
                            total_cost: row.get(3)?,
                        })
                    },
                )?;

                Ok(DashboardStats {
                    total_posts,
                    published_posts,
                    draft_posts,
                    total_views,
                    total_categories,
                    top_posts,
                    category_stats,
                    ai_usage,
                })
            })
            .await?;
        Ok(stats)
    }
}

const POST_SELECT: &str = r#"SELECT p.id, p.title, p.slug, p.excerpt, p.content,
       p.featured_image, p.status, p.views, p.category_id, p.author_id,
       p.scheduled_for, p.published_at, p.meta_title, p.meta_description,
       p.keywords, p.created_at, p.updated_at,
       u.id, u.name, u.email, u.image,
       c.id, c.name, c.slug, c.color
FROM posts p
JOIN users u ON p.author_id = u.id
JOIN categories c ON p.category_id = c.id"#;

fn build_post_filter(filter: &PostFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&'static str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("p.status = ?");
        values.push(Value::from(status.as_str().to_string()));
    }
    if let Some(category_id) = filter.category_id {
        clauses.push("p.category_id = ?");
        values.push(Value::from(category_id));
    }
    if let Some(search) = &filter.search {
        clauses.push("(p.title LIKE ? OR p.excerpt LIKE ? OR p.content LIKE ?)");
        let pattern = format!("%{}%", search);
        values.push(Value::from(pattern.clone()));
        values.push(Value::from(pattern.clone()));
        values.push(Value::from(pattern));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn link_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    tags: &[(String, String)],
) -> rusqlite::Result<()> {
    for (name, slug) in tags {
        conn.execute(
            "INSERT OR IGNORE INTO tags (name, slug) VALUES (?1, ?2)",
            params![name, slug],
        )?;
        let tag_id: i64 = conn.query_row(
            "SELECT id FROM tags WHERE slug = ?1",
            params![slug],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id, tag_id],
        )?;
    }
    Ok(())
}

fn load_tags(conn: &SqliteConnection, post_id: i64) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        r#"SELECT t.id, t.name, t.slug
           FROM tags t
           JOIN post_tags pt ON pt.tag_id = t.id
           WHERE pt.post_id = ?1
           ORDER BY t.slug"#,
    )?;
    let tags = stmt
        .query_map(params![post_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn load_analytics(
    conn: &SqliteConnection,
    post_id: i64,
) -> rusqlite::Result<Option<PostAnalytics>> {
    conn.query_row(
        r#"SELECT total_views, unique_visitors, likes, shares
           FROM post_analytics WHERE post_id = ?1"#,
        params![post_id],
        |row| {
            Ok(PostAnalytics {
                total_views: row.get(0)?,
                unique_visitors: row.get(1)?,
                likes: row.get(2)?,
                shares: row.get(3)?,
            })
        },
    )
    .optional()
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn post_from_row(row: &Row) -> Post {
    let keywords: String = row.get(14).unwrap();
    Post {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        slug: row.get(2).unwrap(),
        excerpt: row.get(3).unwrap(),
        content: row.get(4).unwrap(),
        featured_image: row.get(5).unwrap(),
        status: row
            .get::<_, String>(6)
            .unwrap()
            .parse()
            .unwrap_or(PostStatus::Draft),
        views: row.get(7).unwrap(),
        category_id: row.get(8).unwrap(),
        author_id: row.get(9).unwrap(),
        scheduled_for: row
            .get::<_, Option<String>>(10)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        published_at: row
            .get::<_, Option<String>>(11)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        meta_title: row.get(12).unwrap(),
        meta_description: row.get(13).unwrap(),
        keywords: serde_json::from_str(&keywords).unwrap_or_default(),
        created_at: row
            .get::<_, String>(15)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(16)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        author: AuthorRef {
            id: row.get(17).unwrap(),
            name: row.get(18).unwrap(),
            email: row.get(19).unwrap(),
            image: row.get(20).unwrap(),
        },
        category: CategoryRef {
            id: row.get(21).unwrap(),
            name: row.get(22).unwrap(),
            slug: row.get(23).unwrap(),
            color: row.get(24).unwrap(),
        },
        tags: Vec::new(),
        analytics: None,
    }
}

fn category_from_row(row: &Row, include_count: bool) -> Category {
    Category {
        id: row.get(0).unwrap(),
        name: row.get(1).unwrap(),
        slug: row.get(2).unwrap(),
        description: row.get(3).unwrap(),
        image: row.get(4).unwrap(),
        color: row.get(5).unwrap(),
        is_active: row.get::<_, i64>(6).unwrap() != 0,
        created_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(8)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        post_count: if include_count {
            Some(row.get(9).unwrap())
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_CATEGORY_COLOR;

    async fn repo_with_fixtures() -> (Repository, i64, i64) {
        let repo = Repository::open_in_memory().await.unwrap();
        let author_id = repo
            .upsert_user("Admin User", "admin@autoblog.com", None, "ADMIN")
            .await
            .unwrap();
        let category_id = repo
            .create_category(NewCategory {
                name: "Tech".into(),
                slug: "tech".into(),
                description: None,
                image: None,
                color: DEFAULT_CATEGORY_COLOR.into(),
                is_active: true,
            })
            .await
            .unwrap();
        (repo, author_id, category_id)
    }

    fn sample_post(slug: &str, category_id: i64, author_id: i64) -> NewPost {
        NewPost {
            title: format!("Post {slug}"),
            slug: slug.to_string(),
            excerpt: "excerpt".into(),
            content: "<p>content</p>".into(),
            featured_image: None,
            status: PostStatus::Draft,
            category_id,
            author_id,
            scheduled_for: None,
            published_at: None,
            meta_title: format!("Post {slug}"),
            meta_description: "desc".into(),
            keywords: vec!["kw".into()],
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn tag_connect_or_create_is_idempotent() {
        let (repo, author_id, category_id) = repo_with_fixtures().await;

        let mut post = sample_post("first", category_id, author_id);
        post.tags = vec![
            ("Next.js".into(), "nextjs".into()),
            ("React".into(), "react".into()),
            ("Next.js".into(), "nextjs".into()),
        ];
        let id = repo.create_post(post).await.unwrap();

        let fetched = repo.find_post(id).await.unwrap().unwrap();
        let slugs: Vec<_> = fetched.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["nextjs", "react"]);

        // Re-linking the same tags in a different order changes nothing.
        let patch = PostPatch {
            tags: Some(vec![
                ("React".into(), "react".into()),
                ("Next.js".into(), "nextjs".into()),
            ]),
            ..Default::default()
        };
        repo.update_post(id, patch).await.unwrap();
        let fetched = repo.find_post(id).await.unwrap().unwrap();
        let slugs: Vec<_> = fetched.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["nextjs", "react"]);
    }

    #[tokio::test]
    async fn pagination_returns_expected_page() {
        let (repo, author_id, category_id) = repo_with_fixtures().await;
        for i in 0..25 {
            repo.create_post(sample_post(&format!("post-{i:02}"), category_id, author_id))
                .await
                .unwrap();
        }

        let filter = PostFilter::default();
        let total = repo.count_posts(&filter).await.unwrap();
        assert_eq!(total, 25);

        let page = repo
            .list_posts(&filter, "p.slug", true, 2, 10)
            .await
            .unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].slug, "post-10");
        assert_eq!(page[9].slug, "post-19");
    }

    #[tokio::test]
    async fn search_filter_is_case_insensitive() {
        let (repo, author_id, category_id) = repo_with_fixtures().await;
        let mut post = sample_post("searchable", category_id, author_id);
        post.title = "Rust Memory Safety".into();
        repo.create_post(post).await.unwrap();
        repo.create_post(sample_post("other", category_id, author_id))
            .await
            .unwrap();

        let filter = PostFilter {
            search: Some("memory".into()),
            ..Default::default()
        };
        // SQLite LIKE is case-insensitive for ASCII by default.
        assert_eq!(repo.count_posts(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_post_cascades_analytics() {
        let (repo, author_id, category_id) = repo_with_fixtures().await;
        let id = repo
            .create_post(sample_post("doomed", category_id, author_id))
            .await
            .unwrap();
        repo.increment_views(id).await.unwrap();

        let post = repo.find_post(id).await.unwrap().unwrap();
        assert_eq!(post.views, 1);
        assert_eq!(post.analytics.unwrap().total_views, 1);

        repo.delete_post(id).await.unwrap();
        assert!(repo.find_post(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db").to_string_lossy().to_string();

        let repo = Repository::open(&path).await.unwrap();
        let author_id = repo
            .upsert_user("Admin User", "admin@autoblog.com", None, "ADMIN")
            .await
            .unwrap();
        let category_id = repo
            .create_category(NewCategory {
                name: "Tech".into(),
                slug: "tech".into(),
                description: None,
                image: None,
                color: DEFAULT_CATEGORY_COLOR.into(),
                is_active: true,
            })
            .await
            .unwrap();
        repo.create_post(sample_post("kept", category_id, author_id))
            .await
            .unwrap();
        repo.close().await.unwrap();

        let repo = Repository::open(&path).await.unwrap();
        assert!(repo.find_post_by_slug("kept").await.unwrap().is_some());
        repo.close().await.unwrap();
    }

    #[tokio::test]
    async fn ai_usage_totals_aggregate() {
        let (repo, _, _) = repo_with_fixtures().await;
        repo.record_ai_usage(AiUsageEntry {
            model: "gemini-2.5-flash".into(),
            prompt_tokens: 100,
            completion_tokens: 400,
            total_tokens: 500,
            cost: 0.0,
            purpose: "post_generation".into(),
            success: true,
            error: None,
        })
        .await
        .unwrap();
        repo.record_ai_usage(AiUsageEntry {
            model: "gemini-2.5-flash".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost: 0.0,
            purpose: "post_generation".into(),
            success: false,
            error: Some("boom".into()),
        })
        .await
        .unwrap();

        let totals = repo.ai_usage_totals().await.unwrap();
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.failed_calls, 1);
        assert_eq!(totals.total_tokens, 500);
    }
}
