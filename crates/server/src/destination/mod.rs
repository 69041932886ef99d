pub mod db;
pub mod handlers;
pub mod models;
pub mod mutations;

pub use db::require_destination;
pub use models::{CreateDestinationInput, Destination};
pub use mutations::create_destination;
