pub mod db;
pub mod handlers;
pub mod models;
pub mod mutations;

pub use db::require_category;
pub use models::{Category, CategoryKind, CreateCategoryInput};
