//! Blog platform backend: public content API, admin CRUD, and AI-assisted
//! content generation backed by SQLite.

pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod text;
