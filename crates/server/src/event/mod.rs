pub mod db;
pub mod handlers;
pub mod models;
pub mod mutations;

pub use models::{CreateEventInput, Event};
pub use mutations::create_event;
