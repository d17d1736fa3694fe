//! # Translation Gateway
//!
//! Synchronous request/response façade to the cloud translation service.
//!
//! ## Failure Policy:
//! Translation failures degrade the session, they never terminate it. The
//! [`translate_or_marker`] wrapper converts a gateway error into a
//! deterministic error-marker string that takes the place of the translated
//! text, so transcript events keep flowing.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Cloud translation service boundary.
#[async_trait]
pub trait TranslationGateway: Send + Sync {
    /// Translate `text` into the bare language code `target_language_code`
    /// (already stripped of any country suffix).
    async fn translate(&self, text: &str, target_language_code: &str) -> Result<String>;
}

/// Reduce a language-country tag to the bare language code the translation
/// service expects ("en-US" → "en").
pub fn language_code(target_language: &str) -> &str {
    target_language
        .split('-')
        .next()
        .unwrap_or(target_language)
}

/// Fail-soft translation call used by the transcription session.
///
/// Empty or whitespace-only text short-circuits to an empty translation
/// without a service call. A gateway failure is logged and embedded in the
/// returned text instead of propagating.
pub async fn translate_or_marker(
    gateway: &dyn TranslationGateway,
    text: &str,
    target_language: &str,
) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    match gateway.translate(text, language_code(target_language)).await {
        Ok(translation) => translation,
        Err(err) => {
            error!("Translation error: {}", err);
            format!("[Translation error: {}]", err)
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translated_text: String,
}

/// Translation over the cloud service's HTTP API.
#[derive(Clone)]
pub struct RemoteTranslator {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl RemoteTranslator {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TranslationGateway for RemoteTranslator {
    async fn translate(&self, text: &str, target_language_code: &str) -> Result<String> {
        let url = format!("{}/v2/translate", self.base_url);
        let mut request = self.http.post(&url).json(&TranslateRequest {
            text,
            target_language: target_language_code,
        });

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Translation service returned {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: TranslateResponse = response.json().await?;
        Ok(body.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTranslator(&'static str);

    #[async_trait]
    impl TranslationGateway for FixedTranslator {
        async fn translate(&self, _text: &str, _target: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenTranslator;

    #[async_trait]
    impl TranslationGateway for BrokenTranslator {
        async fn translate(&self, _text: &str, _target: &str) -> Result<String> {
            Err(anyhow!("quota exceeded"))
        }
    }

    #[test]
    fn language_code_strips_country() {
        assert_eq!(language_code("en-US"), "en");
        assert_eq!(language_code("es"), "es");
        assert_eq!(language_code("zh-Hant-TW"), "zh");
    }

    #[tokio::test]
    async fn empty_text_skips_the_service() {
        let result = translate_or_marker(&BrokenTranslator, "   ", "en-US").await;
        assert_eq!(result, "");
    }

    #[tokio::test]
    async fn success_passes_through() {
        let result = translate_or_marker(&FixedTranslator("hola"), "hello", "es-ES").await;
        assert_eq!(result, "hola");
    }

    #[tokio::test]
    async fn failure_becomes_marker() {
        let result = translate_or_marker(&BrokenTranslator, "hello", "es").await;
        assert_eq!(result, "[Translation error: quota exceeded]");
    }
}
