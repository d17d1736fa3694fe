//! # Audio Capture Module
//!
//! Server-side microphone capture feeding the streaming transcription
//! pipeline.
//!
//! ## Key Components:
//! - **Frames**: fixed 100 ms chunks of 16 kHz mono 16-bit PCM
//! - **Capture**: cpal input stream on a dedicated worker thread, pushing
//!   frames into the session's bounded hand-off queue
//!
//! ## Audio Format:
//! - **Sample Rate**: 16 kHz
//! - **Bit Depth**: 16-bit PCM, little-endian
//! - **Channels**: Mono
//!
//! Capture runs on the server host: the service transcribes the microphone
//! of the machine it runs on, and the WebSocket carries control and
//! transcript traffic only.

pub mod capture; // cpal worker thread and stop/join handle
pub mod frame;   // frame constants, packing, re-grouping

pub use capture::{AudioSource, CaptureHandle, CAPTURE_JOIN_TIMEOUT};
pub use frame::AudioFrame;
