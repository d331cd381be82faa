use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthCheckResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
