//! HTTP request handlers

pub mod auth;
pub mod dashboard;
pub mod health;

pub use auth::*;
pub use dashboard::*;
pub use health::*;
