use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    add_scan, delete_vehicle, delete_vehicle_by_query, health_handler, list_scans,
    list_vehicles, put_vehicle, save_scans, save_vehicles, AppState,
};

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/scans", get(list_scans).post(save_scans))
        .route("/scans/add", post(add_scan))
        .route(
            "/vehicles",
            get(list_vehicles)
                .post(save_vehicles)
                .delete(delete_vehicle_by_query),
        )
        .route("/vehicles/{card_id}", post(put_vehicle).delete(delete_vehicle))
}

/// Build the application router. Every route is served both at the root and
/// under `/api`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
