//! # Cloud Gateway Module
//!
//! Façades for the external cloud services the backend delegates its hard
//! work to. The service itself only manages connection lifecycle, buffering
//! and message sequencing; acoustic modeling, language translation and
//! speech synthesis all live behind these seams.
//!
//! ## Key Components:
//! - **SpeechRecognizer**: streaming recognition (audio frames in, interim
//!   and final transcripts out)
//! - **TranslationGateway**: synchronous text translation, fail-soft
//! - **SynthesisGateway**: text to synthesized speech bytes
//!
//! Each trait ships one remote implementation; tests substitute doubles.

pub mod recognizer;  // streaming recognition over WebSocket
pub mod synthesis;   // text-to-speech over HTTP
pub mod translation; // translation over HTTP

pub use recognizer::{RecognitionResult, RecognitionStream, RemoteRecognizer, SpeechRecognizer};
pub use synthesis::{RemoteSynthesizer, SynthesisGateway};
pub use translation::{RemoteTranslator, TranslationGateway};
