//! AgroX farm advisory service
//!
//! Crop photo analysis, environmental context, market-aware harvest advice,
//! a location-aware assistant and voice callbacks for signed-in farmers.

use axum::{routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use external::{GeminiClient, RegistrationHook, VapiClient, WeatherClient, WebhookClient};
use services::{
    AccountService, DashboardRegistry, DashboardServices, DashboardSettings, EnvironmentService,
    GeminiChatFactory, GeminiInference, InMemoryUserStore, PgUserStore, UserStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Option<PgPool>,
    pub accounts: AccountService,
    pub dashboards: Arc<DashboardRegistry>,
}

impl AppState {
    /// Wire the production clients from configuration.
    ///
    /// Accounts live in PostgreSQL when a pool is given, in memory otherwise.
    pub fn new(config: Config, db: Option<PgPool>) -> Self {
        let store: Arc<dyn UserStore> = match &db {
            Some(pool) => Arc::new(PgUserStore::new(pool.clone())),
            None => Arc::new(InMemoryUserStore::new()),
        };
        let webhook: Arc<dyn RegistrationHook> =
            Arc::new(WebhookClient::new(config.registration.webhook_url.clone()));

        let gemini = GeminiClient::new(&config.gemini);
        let services = DashboardServices {
            inference: Arc::new(GeminiInference::new(gemini.clone())),
            chat: Arc::new(GeminiChatFactory::new(gemini)),
            environment: Arc::new(EnvironmentService::new(WeatherClient::with_base_url(
                config.open_meteo.base_url.clone(),
            ))),
            callback: Arc::new(VapiClient::new(&config.vapi)),
        };

        Self::from_parts(config, db, store, webhook, services)
    }

    /// Assemble state from explicit parts (tests substitute doubles here)
    pub fn from_parts(
        config: Config,
        db: Option<PgPool>,
        store: Arc<dyn UserStore>,
        webhook: Arc<dyn RegistrationHook>,
        services: DashboardServices,
    ) -> Self {
        let accounts = AccountService::new(store, webhook, &config.jwt);
        let dashboards = Arc::new(DashboardRegistry::new(
            services,
            DashboardSettings::from(&config.dashboard),
        ));

        Self {
            config: Arc::new(config),
            db,
            accounts,
            dashboards,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "AgroX Farm Advisory API v1.0"
}
