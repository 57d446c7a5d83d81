use std::sync::Arc;

use salvo::http::StatusCode;
use salvo::test::{ResponseExt, TestClient};
use salvo::Service;
use serde_json::{json, Value};

use autoblog::api::{self, AppState};
use autoblog::config::Config;
use autoblog::db::Repository;
use autoblog::models::{NewCategory, NewPost, PostStatus};

const ADMIN_TOKEN: &str = "test-admin-token";

struct TestApp {
    service: Service,
    repo: Repository,
    category_id: i64,
    author_id: i64,
}

async fn test_app() -> TestApp {
    let repo = Repository::open_in_memory().await.unwrap();
    let author_id = repo
        .upsert_user("Test Author", "author@example.com", None, "ADMIN")
        .await
        .unwrap();
    let category_id = repo
        .create_category(NewCategory {
            name: "Teknoloji".to_string(),
            slug: "teknoloji".to_string(),
            description: None,
            image: None,
            color: "#10B981".to_string(),
            is_active: true,
        })
        .await
        .unwrap();

    let config = Config {
        db_path: ":memory:".to_string(),
        bind_addr: "127.0.0.1:5800".to_string(),
        gemini_api_key: None,
        gemini_model: "gemini-2.5-flash".to_string(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
    };
    let state = AppState {
        repo: repo.clone(),
        ai: None,
        config: Arc::new(config),
    };
    TestApp {
        service: Service::new(api::router(state)),
        repo,
        category_id,
        author_id,
    }
}

fn bearer() -> String {
    format!("Bearer {ADMIN_TOKEN}")
}

async fn insert_post(app: &TestApp, title: &str, slug: &str, status: PostStatus) -> i64 {
    app.repo
        .create_post(NewPost {
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: String::new(),
            content: "<p>body</p>".to_string(),
            featured_image: None,
            status,
            category_id: app.category_id,
            author_id: app.author_id,
            scheduled_for: None,
            published_at: (status == PostStatus::Published).then(chrono::Utc::now),
            meta_title: title.to_string(),
            meta_description: "body".to_string(),
            keywords: Vec::new(),
            tags: Vec::new(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn create_post_slugifies_title() {
    let app = test_app().await;
    let body = json!({
        "title": "Yapay Zeka ile İçerik Üretimi",
        "content": "<p>İçerik</p>",
        "categoryId": app.category_id,
        "authorId": app.author_id,
        "tags": ["AI", "İçerik"],
    });
    let mut res = TestClient::post("http://127.0.0.1:5800/api/posts")
        .add_header("authorization", bearer(), true)
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["message"], "post created");
    assert_eq!(value["data"]["slug"], "yapay-zeka-ile-icerik-uretimi");
    assert_eq!(value["data"]["status"], "DRAFT");
    assert_eq!(value["data"]["tags"].as_array().unwrap().len(), 2);
    assert_eq!(value["data"]["category"]["slug"], "teknoloji");
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
    let app = test_app().await;
    insert_post(&app, "First", "ayni-slug", PostStatus::Draft).await;
    let body = json!({
        "title": "Second",
        "slug": "ayni-slug",
        "content": "<p>x</p>",
        "categoryId": app.category_id,
        "authorId": app.author_id,
    });
    let mut res = TestClient::post("http://127.0.0.1:5800/api/posts")
        .add_header("authorization", bearer(), true)
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["success"], false);
    assert!(value["error"].as_str().unwrap().contains("slug"));
}

#[tokio::test]
async fn validation_errors_carry_field_details() {
    let app = test_app().await;
    let body = json!({
        "title": "",
        "content": "",
        "categoryId": app.category_id,
        "authorId": app.author_id,
    });
    let mut res = TestClient::post("http://127.0.0.1:5800/api/posts")
        .add_header("authorization", bearer(), true)
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    let value = res.take_json::<Value>().await.unwrap();
    let details = value["details"].as_array().unwrap();
    let fields: Vec<&str> = details
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"content"));
}

#[tokio::test]
async fn missing_post_is_404() {
    let app = test_app().await;
    let res = TestClient::get("http://127.0.0.1:5800/api/posts/9999")
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    let app = test_app().await;
    let body = json!({
        "title": "x",
        "content": "<p>x</p>",
        "categoryId": app.category_id,
        "authorId": app.author_id,
    });

    let res = TestClient::post("http://127.0.0.1:5800/api/posts")
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

    let res = TestClient::post("http://127.0.0.1:5800/api/posts")
        .add_header("authorization", "Bearer wrong", true)
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

    // Public reads stay open.
    let res = TestClient::get("http://127.0.0.1:5800/api/posts")
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
}

#[tokio::test]
async fn list_paginates_and_reports_totals() {
    let app = test_app().await;
    for i in 0..25 {
        insert_post(&app, &format!("Post {i}"), &format!("post-{i}"), PostStatus::Published).await;
    }
    let mut res = TestClient::get("http://127.0.0.1:5800/api/posts?page=2&pageSize=10")
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["data"].as_array().unwrap().len(), 10);
    let pagination = &value["pagination"];
    assert_eq!(pagination["total"], 25);
    assert_eq!(pagination["totalPages"], 3);
    assert_eq!(pagination["hasNext"], true);
    assert_eq!(pagination["hasPrev"], true);
}

#[tokio::test]
async fn slug_endpoint_serves_published_only_and_counts_views() {
    let app = test_app().await;
    insert_post(&app, "Taslak", "taslak", PostStatus::Draft).await;
    insert_post(&app, "Yayinda", "yayinda", PostStatus::Published).await;

    let res = TestClient::get("http://127.0.0.1:5800/api/posts/slug/taslak")
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

    let mut res = TestClient::get("http://127.0.0.1:5800/api/posts/slug/yayinda")
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["data"]["views"], 1);

    let mut res = TestClient::get("http://127.0.0.1:5800/api/posts/slug/yayinda")
        .send(&app.service)
        .await;
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["data"]["views"], 2);
}

#[tokio::test]
async fn category_with_posts_cannot_be_deleted() {
    let app = test_app().await;
    let post_id = insert_post(&app, "Bagli", "bagli", PostStatus::Draft).await;

    let url = format!("http://127.0.0.1:5800/api/categories/{}", app.category_id);
    let res = TestClient::delete(&url)
        .add_header("authorization", bearer(), true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

    app.repo.delete_post(post_id).await.unwrap();

    let res = TestClient::delete(&url)
        .add_header("authorization", bearer(), true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
}

#[tokio::test]
async fn category_create_validates_color() {
    let app = test_app().await;
    let body = json!({ "name": "Yeni", "color": "mavi" });
    let mut res = TestClient::post("http://127.0.0.1:5800/api/categories")
        .add_header("authorization", bearer(), true)
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["details"][0]["field"], "color");

    let body = json!({ "name": "Yeni" });
    let mut res = TestClient::post("http://127.0.0.1:5800/api/categories")
        .add_header("authorization", bearer(), true)
        .json(&body)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let value = res.take_json::<Value>().await.unwrap();
    assert_eq!(value["data"]["color"], "#3B82F6");
    assert_eq!(value["data"]["isActive"], true);
}

#[tokio::test]
async fn ai_generate_validates_before_client_lookup() {
    let app = test_app().await;
    let res = TestClient::post("http://127.0.0.1:5800/api/ai/generate")
        .add_header("authorization", bearer(), true)
        .json(&json!({ "topic": "" }))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

    // Valid request but no API key configured.
    let res = TestClient::post("http://127.0.0.1:5800/api/ai/generate")
        .add_header("authorization", bearer(), true)
        .json(&json!({ "topic": "Rust" }))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn ai_word_count_bounds_are_enforced() {
    let app = test_app().await;
    let res = TestClient::post("http://127.0.0.1:5800/api/ai/generate")
        .add_header("authorization", bearer(), true)
        .json(&json!({ "topic": "Rust", "wordCount": 100 }))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn dashboard_aggregates_counts() {
    let app = test_app().await;
    insert_post(&app, "Bir", "bir", PostStatus::Published).await;
    insert_post(&app, "Iki", "iki", PostStatus::Draft).await;

    let mut res = TestClient::get("http://127.0.0.1:5800/api/analytics/dashboard")
        .add_header("authorization", bearer(), true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let value = res.take_json::<Value>().await.unwrap();
    let data = &value["data"];
    assert_eq!(data["totalPosts"], 2);
    assert_eq!(data["publishedPosts"], 1);
    assert_eq!(data["draftPosts"], 1);
    assert_eq!(data["totalCategories"], 1);
}
