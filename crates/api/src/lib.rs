pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    // Licence routes (admin)
    let licence_routes = Router::new()
        .route("/", get(routes::licence::list))
        .route("/{licence_id}", get(routes::licence::get))
        .route("/{licence_id}/revoke", post(routes::licence::revoke));

    // Invitation routes (admin, except verify/accept which carry the token)
    let invitation_routes = Router::new()
        .route("/", get(routes::invitation::list))
        .route("/", post(routes::invitation::create))
        .route("/{invitation_id}", delete(routes::invitation::revoke))
        .route("/verify/{token}", get(routes::invitation::verify))
        .route("/accept", post(routes::invitation::accept));

    // Order routes (back office)
    let order_routes = Router::new().route("/confirm", post(routes::order::confirm));

    // Compose API
    let api = Router::new()
        .nest("/licence", licence_routes)
        .nest("/invitation", invitation_routes)
        .nest("/order", order_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(allowed)
    }
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
