//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler and WebSocket
//! session simultaneously.
//!
//! ## Sharing pattern:
//! - **Arc<RwLock<T>>** for mutable data (config, metrics): multiple readers
//!   or one writer at a time
//! - **Arc<dyn Trait>** for the gateway and storage collaborators: immutable
//!   after startup, cheap to clone into each handler and session task
//!
//! The gateways are trait objects so tests can swap in scripted doubles
//! without touching any network service.

use crate::config::AppConfig;
use crate::gateway::{SpeechRecognizer, SynthesisGateway, TranslationGateway};
use crate::session::SessionRegistry;
use crate::storage::BlobStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (readable by every handler)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Live transcription sessions, keyed by connection id
    pub registry: SessionRegistry,

    /// Streaming speech recognizer used by transcription sessions
    pub recognizer: Arc<dyn SpeechRecognizer>,

    /// Translation service used by sessions and the /api/translate endpoint
    pub translator: Arc<dyn TranslationGateway>,

    /// Text-to-speech service used by the /api/tts endpoints
    pub synthesizer: Arc<dyn SynthesisGateway>,

    /// Blob store for transcripts and synthesized audio
    pub store: Arc<dyn BlobStore>,

    /// When the server started
    pub start_time: Instant,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Current number of active transcription sessions
    pub active_sessions: u32,

    /// Detailed metrics for each API endpoint, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Create a new AppState from the configuration and its collaborators.
    pub fn new(
        config: AppConfig,
        recognizer: Arc<dyn SpeechRecognizer>,
        translator: Arc<dyn TranslationGateway>,
        synthesizer: Arc<dyn SynthesisGateway>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            registry: SessionRegistry::new(),
            recognizer,
            translator,
            synthesizer,
            store,
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so other threads aren't
    /// blocked; AppConfig is cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Increment the active sessions counter (a WebSocket session started).
    pub fn increment_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions += 1;
    }

    /// Decrement the active sessions counter (a WebSocket session ended).
    ///
    /// Guarded against underflow so a double-close can't wrap the counter.
    pub fn decrement_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    /// Get a snapshot of current metrics (used by the health endpoints).
    ///
    /// Clones under a read lock so the data stays consistent without holding
    /// the lock during response generation.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_sessions: metrics.active_sessions,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint as a fraction (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RecognitionStream;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct NullGateways;

    #[async_trait]
    impl SpeechRecognizer for NullGateways {
        async fn start_stream(&self, _language_code: &str) -> anyhow::Result<RecognitionStream> {
            Err(anyhow!("not wired in this test"))
        }
    }

    #[async_trait]
    impl TranslationGateway for NullGateways {
        async fn translate(&self, _text: &str, _target_language: &str) -> anyhow::Result<String> {
            Err(anyhow!("not wired in this test"))
        }
    }

    #[async_trait]
    impl SynthesisGateway for NullGateways {
        async fn synthesize(&self, _text: &str, _language_code: &str) -> anyhow::Result<Vec<u8>> {
            Err(anyhow!("not wired in this test"))
        }
    }

    #[async_trait]
    impl BlobStore for NullGateways {
        async fn save(&self, _folder: &str, _name: &str, _content: &[u8]) -> anyhow::Result<String> {
            Err(anyhow!("not wired in this test"))
        }

        async fn load(&self, _folder: &str, _name: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    fn test_state() -> AppState {
        let gateways = Arc::new(NullGateways);
        AppState::new(
            AppConfig::default(),
            gateways.clone(),
            gateways.clone(),
            gateways.clone(),
            gateways,
        )
    }

    #[test]
    fn test_session_counter_never_underflows() {
        let state = test_state();
        state.increment_active_sessions();
        state.decrement_active_sessions();
        state.decrement_active_sessions();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 0);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = test_state();
        state.record_endpoint_request("POST /api/translate", 30, false);
        state.record_endpoint_request("POST /api/translate", 70, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/translate"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.total_duration_ms, 100);
        assert_eq!(metric.error_count, 1);
    }

    #[test]
    fn test_endpoint_metric_math() {
        let metric = EndpointMetric {
            request_count: 4,
            total_duration_ms: 200,
            error_count: 1,
        };
        assert_eq!(metric.average_duration_ms(), 50.0);
        assert_eq!(metric.error_rate(), 0.25);

        let empty = EndpointMetric::default();
        assert_eq!(empty.average_duration_ms(), 0.0);
        assert_eq!(empty.error_rate(), 0.0);
    }
}
