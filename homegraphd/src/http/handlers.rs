use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use intents::protocol::FulfillmentRequest;
use metrics::counter;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn fulfillment(
    State(app): State<AppState>,
    Json(request): Json<FulfillmentRequest>,
) -> impl IntoResponse {
    let intent = request.inputs.first().map(|i| i.name()).unwrap_or("NONE");
    counter!("intents.handled", "intent" => intent).increment(1);
    tracing::info!(request_id = %request.request_id, intent, "fulfillment request");
    Json(app.fulfillment.respond(request).await)
}
