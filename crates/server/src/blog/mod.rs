pub mod db;
pub mod handlers;
pub mod markdown;
pub mod models;
pub mod mutations;

pub use models::{BlogPost, CreateBlogPostInput};
pub use mutations::create_post;
