pub mod db;
pub mod handlers;
pub mod models;
pub mod mutations;

pub use models::{ContentKind, ContentVersion, CreateContentInput};
pub use mutations::create_version;
