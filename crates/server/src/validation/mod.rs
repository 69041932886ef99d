pub mod fields;
pub mod slug;
pub mod url;

pub use fields::{Validator, clean_optional};
pub use slug::{SlugTable, ensure_unique_slug, resolve_slug, slugify, validate_slug};
