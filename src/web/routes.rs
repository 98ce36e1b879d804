use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::context::AppContext;

pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/drives/list", get(handlers::list_drives))
        .route("/drives/update", post(handlers::update_drives))
        .route("/drives/{device}/discid", get(handlers::disc_id))
        .route("/drives/{device}/rip/track", post(handlers::rip_track_missing))
        .route("/drives/{device}/rip/track/{track}", post(handlers::rip_track))
        .route("/drives/{device}/rip/cd", post(handlers::rip_cd))
        .route("/drives/{device}/eject", post(handlers::eject))
        .route("/drives/{device}/analyze", post(handlers::analyze))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
