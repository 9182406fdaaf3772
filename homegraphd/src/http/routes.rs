use crate::{
    http::{devices as d, handlers as h},
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(h::healthz))
        .route("/google/home", post(h::fulfillment))
        .route("/devices", get(d::list).post(d::create))
        .route("/devices/{device_id}", get(d::show).put(d::update).delete(d::delete))
        .route(
            "/devices/{device_id}/traits/{trait_name}",
            put(d::put_trait).delete(d::delete_trait),
        )
        .with_state(state)
}
