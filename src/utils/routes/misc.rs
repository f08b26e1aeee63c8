use actix_web::{get, HttpResponse};
use chrono::Utc;

#[get("/api/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp()
    }))
}
