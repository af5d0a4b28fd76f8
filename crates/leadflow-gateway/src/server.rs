//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post, put},
};
use leadflow_campaign::CampaignController;
use leadflow_channels::{DryRunChannel, WhatsAppChannel};
use leadflow_core::config::LeadflowConfig;
use leadflow_core::traits::{LeadStatusStore, MessageChannel};
use leadflow_store::LeadDb;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub start_time: std::time::Instant,
    /// Lead board database.
    pub db: Arc<LeadDb>,
    /// The one campaign controller for this process.
    pub campaign: Arc<CampaignController>,
}

impl AppState {
    pub fn new(config: &LeadflowConfig, db: Arc<LeadDb>, channel: Arc<dyn MessageChannel>) -> Self {
        let store: Arc<dyn LeadStatusStore> = db.clone();
        let campaign = CampaignController::from_config(channel, store, &config.campaign);
        Self {
            start_time: std::time::Instant::now(),
            db,
            campaign: Arc::new(campaign),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/health", get(super::routes::health_check))
        // Lead board
        .route(
            "/api/v1/leads",
            get(super::routes::list_leads).post(super::routes::create_lead),
        )
        .route("/api/v1/leads/categories", get(super::routes::list_categories))
        .route(
            "/api/v1/leads/{id}",
            put(super::routes::update_lead).delete(super::routes::delete_lead),
        )
        // Sellers
        .route(
            "/api/v1/users",
            get(super::routes::list_users).post(super::routes::create_user),
        )
        .route(
            "/api/v1/users/{id}",
            put(super::routes::update_user).delete(super::routes::delete_user),
        )
        .route("/api/v1/metrics/daily", get(super::routes::daily_metrics))
        // Campaign controls
        .route("/api/v1/campaign/preview", post(super::routes::campaign_preview))
        .route("/api/v1/campaign/start", post(super::routes::campaign_start))
        .route("/api/v1/campaign/pause", post(super::routes::campaign_pause))
        .route("/api/v1/campaign/resume", post(super::routes::campaign_resume))
        .route("/api/v1/campaign/stop", post(super::routes::campaign_stop))
        .route("/api/v1/campaign/status", get(super::routes::campaign_status))
        .route("/api/v1/campaign/events", get(super::routes::campaign_events))
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Example: LEADFLOW_CORS_ORIGINS=https://crm.example.com,https://admin.example.com
            if let Ok(origins_str) = std::env::var("LEADFLOW_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Pick the outbound channel: the WhatsApp gateway when configured,
/// otherwise a dry-run logger so the board stays usable.
pub fn build_channel(config: &LeadflowConfig) -> Arc<dyn MessageChannel> {
    match WhatsAppChannel::new(config.whatsapp.clone()) {
        Ok(channel) => {
            tracing::info!("✅ WhatsApp channel ready (instance={})", config.whatsapp.instance);
            Arc::new(channel)
        }
        Err(e) => {
            tracing::warn!("⚠️ WhatsApp channel not available: {e} — campaigns will run in dry-run mode");
            Arc::new(DryRunChannel::new())
        }
    }
}

/// Start the HTTP server.
pub async fn start(config: &LeadflowConfig) -> anyhow::Result<()> {
    let db_path = config.database.resolved_path();
    let db = Arc::new(LeadDb::open(&db_path)?);
    tracing::info!("💾 Lead database: {}", db_path.display());

    let channel = build_channel(config);
    let state = AppState::new(config, db, channel);
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = LeadflowConfig::default();
        let db = Arc::new(LeadDb::open(std::path::Path::new(":memory:")).unwrap());
        build_router(AppState::new(&config, db, Arc::new(DryRunChannel::new())))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_then_move_lead() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/leads",
                serde_json::json!({"name": "Clínica Sorriso", "category": "Clínica", "tag": "quente"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        let id = created["lead"]["id"].as_i64().unwrap();
        assert_eq!(created["lead"]["status"], "lista_leads");

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/leads/{id}"),
                serde_json::json!({"status": "interessados"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["lead"]["status"], "interessados");
    }

    #[tokio::test]
    async fn test_unknown_lead_is_404() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/leads/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn test_campaign_conflict_is_409() {
        let response = test_app()
            .oneshot(json_request("POST", "/api/v1/campaign/pause", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_campaign_without_leads_is_400() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/v1/campaign/start",
                serde_json::json!({"message": "Olá!"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
