//! Business logic services for the AgroX farm advisory platform

pub mod accounts;
pub mod chat;
pub mod dashboard;
pub mod environment;
pub mod inference;

pub use accounts::{AccountService, InMemoryUserStore, PgUserStore, UserStore};
pub use chat::{ChatSession, ChatSessionFactory, GeminiChatFactory};
pub use dashboard::{Dashboard, DashboardRegistry, DashboardServices, DashboardSettings, DashboardView};
pub use environment::{EnvironmentService, EnvironmentSource};
pub use inference::{GeminiInference, InferenceService};
