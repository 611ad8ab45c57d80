pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod scrape;
