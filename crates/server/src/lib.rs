//! Tourism CMS server library

pub mod api;
pub mod audit;
pub mod auth;
pub mod blog;
pub mod category;
pub mod common;
pub mod config;
pub mod content;
pub mod db;
pub mod destination;
pub mod error;
pub mod event;
pub mod media;
pub mod metrics_exporter;
pub mod pagination;
pub mod seed;
pub mod supervisor;
pub mod tour;
pub mod validation;

pub mod test_helpers;
