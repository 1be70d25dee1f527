pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod http_client;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
