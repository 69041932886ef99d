pub mod db;
pub mod handlers;
pub mod models;
pub mod mutations;
pub mod storage;

pub use models::{Media, Upload};
pub use storage::MediaStorage;
