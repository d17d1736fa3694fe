//! The request/response translation endpoint. The streaming path has its own
//! fail-soft wrapper; here a gateway failure is a plain 502 for the caller.

use crate::error::{AppError, AppResult};
use crate::gateway::translation::language_code;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    /// Language-country tag; defaults to the configured target when absent.
    pub target_language: Option<String>,
}

/// `POST /api/translate`: translate a piece of text on demand.
pub async fn translate(
    state: web::Data<AppState>,
    body: web::Json<TranslateRequest>,
) -> AppResult<HttpResponse> {
    if body.text.trim().is_empty() {
        return Err(AppError::BadRequest("Text is required".to_string()));
    }

    let target = match &body.target_language {
        Some(lang) if !lang.is_empty() => lang.clone(),
        _ => state.get_config().translation.default_target_language,
    };

    info!(
        target_language = %target,
        chars = body.text.chars().count(),
        "Translating text"
    );

    let translated = state
        .translator
        .translate(&body.text, language_code(&target))
        .await
        .map_err(|err| AppError::Gateway(err.to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "translated_text": translated })))
}
