//! Demo data for local development: an admin author, a handful of
//! categories and tags, and a few published posts.

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::models::{NewCategory, NewPost, PostStatus};
use crate::text;

use super::Repository;

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("Yapay Zeka", "AI ve makine öğrenimi üzerine yazılar", "#8B5CF6"),
    ("Web Geliştirme", "Modern web teknolojileri ve framework'ler", "#3B82F6"),
    ("Teknoloji", "Teknoloji dünyasından haberler ve trendler", "#10B981"),
    ("Programlama", "Programlama dilleri ve best practice'ler", "#F59E0B"),
];

pub async fn seed(repo: &Repository) -> Result<()> {
    let author_id = repo
        .upsert_user(
            "Admin User",
            "admin@autoblog.com",
            Some("https://api.dicebear.com/7.x/avataaars/svg?seed=admin"),
            "ADMIN",
        )
        .await?;
    info!("seeded admin user");

    let mut category_ids = Vec::new();
    for (name, description, color) in CATEGORIES {
        let slug = text::slugify(name);
        if repo.category_slug_exists(&slug, None).await? {
            continue;
        }
        let id = repo
            .create_category(NewCategory {
                name: name.to_string(),
                slug,
                description: Some(description.to_string()),
                image: None,
                color: color.to_string(),
                is_active: true,
            })
            .await?;
        category_ids.push(id);
    }
    info!(count = category_ids.len(), "seeded categories");

    if category_ids.is_empty() {
        info!("seed data already present, nothing to do");
        return Ok(());
    }

    let posts = [
        (
            "Next.js 16 ile Modern Web Uygulamaları Geliştirme",
            "Next.js 16 ile birlikte gelen yeni özellikler ve performans iyileştirmeleri hakkında kapsamlı bir rehber.",
            "<h2>Giriş</h2><p>Next.js 16, modern web uygulamaları geliştirmek için güçlü araçlar sunan bir React framework'üdür.</p><h2>Yeni Özellikler</h2><p>Next.js 16 birçok yeni özellik ve iyileştirme ile geliyor.</p>",
            vec!["Next.js", "React", "TypeScript"],
            1250,
        ),
        (
            "Yapay Zeka ile İçerik Üretimi",
            "Üretken yapay zeka modelleriyle blog içeriği oluşturmanın pratik yolları.",
            "<h2>Giriş</h2><p>Üretken modeller içerik üretim sürecini kökten değiştiriyor.</p><h2>Araçlar</h2><p>Doğru araç seçimi iş akışınızı belirler.</p>",
            vec!["AI", "ChatGPT"],
            890,
        ),
        (
            "Rust ile Güvenli Sistem Programlama",
            "Bellek güvenliği ve performansı bir arada sunan Rust diline giriş.",
            "<h2>Giriş</h2><p>Rust, sistem programlamada güvenlik ve hız dengesini kurar.</p><h2>Sahiplik</h2><p>Sahiplik modeli derleme zamanında hataları önler.</p>",
            vec!["Rust", "Programlama"],
            640,
        ),
    ];

    let mut created = 0;
    for (i, (title, excerpt, content, tag_names, views)) in posts.iter().enumerate() {
        let slug = text::slugify(title);
        if repo.post_slug_exists(&slug, None).await? {
            continue;
        }
        let tags = tag_names
            .iter()
            .map(|name| (name.to_string(), text::slugify(name)))
            .collect();
        let id = repo
            .create_post(NewPost {
                title: title.to_string(),
                slug,
                excerpt: excerpt.to_string(),
                content: content.to_string(),
                featured_image: None,
                status: PostStatus::Published,
                category_id: category_ids[i % category_ids.len()],
                author_id,
                scheduled_for: None,
                published_at: Some(Utc::now()),
                meta_title: text::truncate(title, 60),
                meta_description: text::meta_description(content),
                keywords: tag_names.iter().map(|s| s.to_string()).collect(),
                tags,
            })
            .await?;
        repo.set_views(id, *views).await?;
        created += 1;
    }
    info!(count = created, "seeded posts");

    Ok(())
}
