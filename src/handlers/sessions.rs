//! Operator surface over the session registry.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

/// `POST /api/sessions/{connection_id}/stop`: request shutdown of a live
/// transcription session. The session drains and notifies its own client;
/// this call only flips the cancellation signal.
pub async fn stop_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let connection_id = path.into_inner();

    if !state.registry.request_stop(&connection_id) {
        return Err(AppError::NotFound(format!(
            "No active session: {}",
            connection_id
        )));
    }

    info!(connection_id = %connection_id, "Session stop requested by operator");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Stop requested",
        "connection_id": connection_id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{state_with, MemoryStore};
    use crate::session::CancelSignal;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn stops_a_registered_session() {
        let state = state_with(Arc::new(MemoryStore::default()), false);
        let cancel = CancelSignal::new();
        state.registry.register("conn-9", cancel.clone(), "es");

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/sessions/{id}/stop", web::post().to(stop_session)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/sessions/conn-9/stop")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(cancel.is_stop_requested());
    }

    #[actix_web::test]
    async fn unknown_session_is_404() {
        let state = state_with(Arc::new(MemoryStore::default()), false);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/api/sessions/{id}/stop", web::post().to(stop_session)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/sessions/missing/stop")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
