pub mod db;
pub mod handlers;
pub mod models;
pub mod mutations;

pub use models::{CreateTourInput, Difficulty, ItineraryDay, Tour};
pub use mutations::create_tour;
