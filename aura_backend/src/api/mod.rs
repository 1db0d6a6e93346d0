//! REST API: router, shared state and request handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    response::Json,
    routing::{get, post, put},
    Router,
};
use log::warn;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod validation;

pub use auth::{AuthUser, TokenService};
pub use errors::{ApiError, ApiResult};

use crate::chain::CertificationRegistry;
use crate::config::AppConfig;
use crate::risk::{RiskError, RiskService};
use crate::storage::Database;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub risk: Arc<RiskService>,
    pub registry: Arc<dyn CertificationRegistry>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: AppConfig,
        registry: Arc<dyn CertificationRegistry>,
    ) -> Result<Self, RiskError> {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
        let risk = RiskService::new(&config.ml)?;

        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            risk: Arc::new(risk),
            registry,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);

    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/invite", post(handlers::auth::invite))
        .route("/me", get(handlers::auth::me));

    let farmer_routes = Router::new().route(
        "/:id",
        get(handlers::farmers::get_farmer).put(handlers::farmers::update_farmer),
    );

    let prediction_routes = Router::new()
        .route("/", post(handlers::predictions::create_prediction))
        .route("/history/:farmer_id", get(handlers::predictions::history));

    // `:id` is a farmer id on GET routes and an alert id on PUT routes
    let alert_routes = Router::new()
        .route("/:id", get(handlers::alerts::list_alerts))
        .route("/:id/stats", get(handlers::alerts::alert_stats))
        .route("/:id/read", put(handlers::alerts::mark_read))
        .route("/:id/acknowledge", put(handlers::alerts::acknowledge));

    let certification_routes = Router::new()
        .route("/", post(handlers::certifications::create_certification))
        .route("/verify/:batch_id", get(handlers::certifications::verify))
        .route("/farmer/:farmer_id", get(handlers::certifications::list_for_farmer))
        .route("/:batch_id/status", put(handlers::certifications::update_status));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/farmers", farmer_routes)
        .nest("/api/predictions", prediction_routes)
        .nest("/api/alerts", alert_routes)
        .nest("/api/certifications", certification_routes)
        .fallback(route_not_found)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(60 * 60));

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "AURA Backend API",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
