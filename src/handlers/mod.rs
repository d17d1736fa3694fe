//! # HTTP Handlers
//!
//! The request/response API surface, mounted under `/api`. These are thin
//! marshalling layers over the gateway and storage traits in the application
//! state; all session streaming lives in the WebSocket path instead.

pub mod sessions;
pub mod translation;
pub mod transcripts;
pub mod tts;

pub use sessions::stop_session;
pub use translation::translate;
pub use transcripts::save_transcript;
pub use tts::{text_to_speech, tts_from_file};

/// Truncate UI previews the same way everywhere: first 100 characters plus an
/// ellipsis marker.
pub(crate) fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 100;
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::AppConfig;
    use crate::gateway::{
        RecognitionStream, SpeechRecognizer, SynthesisGateway, TranslationGateway,
    };
    use crate::state::AppState;
    use crate::storage::BlobStore;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Scripted gateway double shared by the handler tests. Translation
    /// echoes `"{target}:{text}"`, synthesis returns fixed MP3 bytes, and
    /// both can be switched to fail.
    pub struct StubGateways {
        pub fail: bool,
    }

    #[async_trait]
    impl SpeechRecognizer for StubGateways {
        async fn start_stream(&self, _language_code: &str) -> Result<RecognitionStream> {
            Err(anyhow!("no streaming in handler tests"))
        }
    }

    #[async_trait]
    impl TranslationGateway for StubGateways {
        async fn translate(&self, text: &str, target_language_code: &str) -> Result<String> {
            if self.fail {
                return Err(anyhow!("translation backend down"));
            }
            Ok(format!("{}:{}", target_language_code, text))
        }
    }

    #[async_trait]
    impl SynthesisGateway for StubGateways {
        async fn synthesize(&self, text: &str, _language_code: &str) -> Result<Vec<u8>> {
            if self.fail {
                return Err(anyhow!("synthesis backend down"));
            }
            Ok(format!("mp3:{}", text).into_bytes())
        }
    }

    /// In-memory blob store recording every save.
    #[derive(Default)]
    pub struct MemoryStore {
        pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn save(&self, folder: &str, name: &str, content: &[u8]) -> Result<String> {
            let key = format!("{}/{}", folder, name);
            self.blobs.lock().unwrap().insert(key, content.to_vec());
            Ok(format!("/static/{}/{}", folder, name))
        }

        async fn load(&self, folder: &str, name: &str) -> Result<Option<Vec<u8>>> {
            let key = format!("{}/{}", folder, name);
            Ok(self.blobs.lock().unwrap().get(&key).cloned())
        }
    }

    pub fn state_with(store: Arc<MemoryStore>, fail: bool) -> AppState {
        let gateways = Arc::new(StubGateways { fail });
        AppState::new(
            AppConfig::default(),
            gateways.clone(),
            gateways.clone(),
            gateways,
            store,
        )
    }
}
