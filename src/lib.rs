//! Folio Bookshop & Lending Management System
//!
//! A Rust REST backend for a bookshop with a loyalty-gated lending program:
//! book catalog, user accounts and the loan lifecycle (issue/return with
//! tier-based entitlements and loyalty-point accounting).

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
