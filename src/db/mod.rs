mod repository;
mod schema;
pub mod seed;

pub use repository::{sort_column, CategoryPatch, PostFilter, PostPatch, Repository};
