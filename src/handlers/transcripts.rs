//! Transcript persistence endpoint.

use crate::error::{AppError, AppResult};
use crate::handlers::preview;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

fn default_filename() -> String {
    "translated_text.txt".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SaveTranscriptRequest {
    pub content: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// `POST /api/save_transcript`: persist transcript text through the blob
/// store so `/api/tts_from_file` can pick it up later.
pub async fn save_transcript(
    state: web::Data<AppState>,
    body: web::Json<SaveTranscriptRequest>,
) -> AppResult<HttpResponse> {
    // Stored names are flat; path separators would escape the folder
    if body.filename.contains('/') || body.filename.contains("..") {
        return Err(AppError::BadRequest("Invalid filename".to_string()));
    }

    info!(
        filename = %body.filename,
        language = %body.language.as_deref().unwrap_or("unspecified"),
        chars = body.content.chars().count(),
        "Saving transcript"
    );

    let file_path = state
        .store
        .save("transcripts", &body.filename, body.content.as_bytes())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Transcript saved successfully",
        "file_path": file_path,
        "content_preview": preview(&body.content)
    })))
}
