mod category;
mod post;
mod stats;

pub use category::{Category, NewCategory, DEFAULT_CATEGORY_COLOR};
pub use post::{AuthorRef, CategoryRef, NewPost, Post, PostAnalytics, PostStatus, Tag};
pub use stats::{AiUsageEntry, AiUsageTotals, CategoryStat, DashboardStats, TopPost, UsageStats};
