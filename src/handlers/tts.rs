//! Text-to-speech endpoints: one taking text in the request body, one reading
//! the previously saved translated transcript out of storage.

use crate::error::{AppError, AppResult};
use crate::handlers::preview;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Storage name of the transcript `/api/tts_from_file` reads.
const SAVED_TRANSCRIPT: &str = "translated_text.txt";

#[derive(Debug, Deserialize)]
pub struct TextToSpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language_code: String,
}

/// Synthesize `text` and persist the MP3 under a timestamped name, returning
/// its public URL.
async fn generate_audio(state: &AppState, text: &str, language_code: &str) -> AppResult<String> {
    let audio = state
        .synthesizer
        .synthesize(text, language_code)
        .await
        .map_err(|err| AppError::Gateway(err.to_string()))?;

    let name = format!("output_{}.mp3", chrono::Utc::now().timestamp());
    let url = state.store.save("audio", &name, &audio).await?;

    info!(bytes = audio.len(), url = %url, "Stored synthesized audio");
    Ok(url)
}

/// `POST /api/tts`: synthesize speech from text in the request body.
pub async fn text_to_speech(
    state: web::Data<AppState>,
    body: web::Json<TextToSpeechRequest>,
) -> AppResult<HttpResponse> {
    let text = match body.text.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => return Err(AppError::BadRequest("Text is required".to_string())),
    };

    let audio_url = generate_audio(&state, text, &body.language_code).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Audio generated successfully",
        "audio_url": audio_url
    })))
}

/// `POST /api/tts_from_file`: synthesize speech from the saved translated
/// transcript.
pub async fn tts_from_file(
    state: web::Data<AppState>,
    body: web::Json<TextToSpeechRequest>,
) -> AppResult<HttpResponse> {
    let stored = state.store.load("transcripts", SAVED_TRANSCRIPT).await?;

    let content = match stored {
        Some(content) => content,
        None => {
            return Err(AppError::NotFound(format!(
                "Translated text file not found: transcripts/{}",
                SAVED_TRANSCRIPT
            )))
        }
    };

    let text = String::from_utf8_lossy(&content).into_owned();
    if text.is_empty() {
        return Err(AppError::BadRequest(
            "Translated text file is empty".to_string(),
        ));
    }

    info!(chars = text.chars().count(), "Generating speech from saved transcript");

    let audio_url = generate_audio(&state, &text, &body.language_code).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Audio generated successfully from file",
        "audio_url": audio_url,
        "text_used": preview(&text)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{state_with, MemoryStore};
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    fn tts_app(
        store: Arc<MemoryStore>,
        fail: bool,
    ) -> (web::Data<AppState>, Arc<MemoryStore>) {
        (web::Data::new(state_with(store.clone(), fail)), store)
    }

    #[actix_web::test]
    async fn synthesizes_and_stores_audio() {
        let (state, store) = tts_app(Arc::new(MemoryStore::default()), false);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/api/tts", web::post().to(text_to_speech)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tts")
            .set_json(json!({"text": "hello", "language_code": "en-US"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["message"], "Audio generated successfully");
        let url = body["audio_url"].as_str().unwrap();
        assert!(url.starts_with("/static/audio/output_"));
        assert!(url.ends_with(".mp3"));

        let blobs = store.blobs.lock().unwrap();
        let (key, content) = blobs.iter().next().unwrap();
        assert!(key.starts_with("audio/output_"));
        assert_eq!(content, &b"mp3:hello".to_vec());
    }

    #[actix_web::test]
    async fn missing_text_is_400() {
        let (state, _) = tts_app(Arc::new(MemoryStore::default()), false);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/api/tts", web::post().to(text_to_speech)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tts")
            .set_json(json!({"language_code": "en-US"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn from_file_requires_a_saved_transcript() {
        let (state, _) = tts_app(Arc::new(MemoryStore::default()), false);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/api/tts_from_file", web::post().to(tts_from_file)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tts_from_file")
            .set_json(json!({"language_code": "es"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn from_file_rejects_empty_transcript() {
        let store = Arc::new(MemoryStore::default());
        store
            .blobs
            .lock()
            .unwrap()
            .insert("transcripts/translated_text.txt".to_string(), Vec::new());
        let (state, _) = tts_app(store, false);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/api/tts_from_file", web::post().to(tts_from_file)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tts_from_file")
            .set_json(json!({"language_code": "es"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn from_file_reports_the_text_used() {
        let store = Arc::new(MemoryStore::default());
        store.blobs.lock().unwrap().insert(
            "transcripts/translated_text.txt".to_string(),
            b"hola mundo".to_vec(),
        );
        let (state, _) = tts_app(store, false);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/api/tts_from_file", web::post().to(tts_from_file)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tts_from_file")
            .set_json(json!({"language_code": "es"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["message"], "Audio generated successfully from file");
        assert_eq!(body["text_used"], "hola mundo");
    }

    #[actix_web::test]
    async fn synthesis_failure_maps_to_502() {
        let (state, _) = tts_app(Arc::new(MemoryStore::default()), true);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/api/tts", web::post().to(text_to_speech)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/tts")
            .set_json(json!({"text": "hello"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
