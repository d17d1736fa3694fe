//! # Microphone Capture
//!
//! Continuous capture from the default input device on a dedicated worker
//! thread. Captured samples are re-grouped into 100 ms [`AudioFrame`]s and
//! pushed into the bounded hand-off queue owned by the transcription session.
//!
//! ## Lifecycle:
//! - `AudioSource::start` spawns the worker and returns a [`CaptureHandle`]
//! - the worker opens the device, converts whatever sample format the backend
//!   delivers to 16-bit PCM, and polls the cancellation signal every 100 ms
//! - `CaptureHandle::stop` requests termination and waits (bounded) for the
//!   worker to drop the stream, which releases the device
//!
//! A failed read or a full hand-off queue is a transient condition: the frame
//! is dropped with a warning and capture continues unless cancellation is
//! already set. The worker never blocks longer than the device's own frame
//! latency.

use crate::audio::frame::{AudioFrame, FrameAssembler, CHANNELS, SAMPLE_RATE};
use crate::session::cancel::CancelSignal;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How often the worker re-checks the cancellation signal while the device
/// stream runs in the background.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded wait for the capture thread to release the device during drain.
pub const CAPTURE_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Microphone audio source. Stateless; `start` owns the whole lifecycle.
pub struct AudioSource;

impl AudioSource {
    /// Begin continuous capture, pushing frames into `sink` until the
    /// cancellation signal is set.
    ///
    /// Device setup happens on the worker thread (the device stream is not
    /// `Send`), so setup failures are logged there rather than returned: a
    /// session with a broken microphone still runs its normal shutdown path.
    pub fn start(sink: mpsc::Sender<AudioFrame>, cancel: CancelSignal) -> Result<CaptureHandle> {
        let worker_cancel = cancel.clone();
        CaptureHandle::spawn(cancel, move || run_capture(sink, worker_cancel))
    }
}

/// Handle to a running capture worker.
pub struct CaptureHandle {
    cancel: CancelSignal,
    done_rx: std_mpsc::Receiver<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl CaptureHandle {
    /// Spawn a capture worker. Split out from [`AudioSource::start`] so the
    /// stop/join behavior is testable without an input device.
    pub(crate) fn spawn(
        cancel: CancelSignal,
        body: impl FnOnce() + Send + 'static,
    ) -> Result<Self> {
        let (done_tx, done_rx) = std_mpsc::channel();
        let join = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                body();
                // Receiver may already be gone during teardown
                let _ = done_tx.send(());
            })
            .context("Failed to spawn audio capture thread")?;

        Ok(Self {
            cancel,
            done_rx,
            join: Some(join),
        })
    }

    /// Request termination and wait for the worker to release its resources.
    ///
    /// Returns `true` when the worker finished within `timeout`. On timeout
    /// the thread is left to die on its own; cleanup is best-effort and must
    /// not stall session teardown.
    pub fn stop(mut self, timeout: Duration) -> bool {
        self.cancel.request_stop();

        match self.done_rx.recv_timeout(timeout) {
            Ok(()) => {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                true
            }
            Err(_) => {
                warn!("Audio capture thread did not stop within {:?}", timeout);
                false
            }
        }
    }
}

/// Worker body: open the default input device and stream until cancelled.
fn run_capture(sink: mpsc::Sender<AudioFrame>, cancel: CancelSignal) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            error!("No default input device available, capture disabled");
            return;
        }
    };

    info!(
        "Starting microphone capture on {}",
        device.name().unwrap_or_else(|_| "<unknown>".into())
    );

    let sample_format = match device.default_input_config() {
        Ok(supported) => supported.sample_format(),
        Err(err) => {
            error!("Failed to query input device config: {}", err);
            return;
        }
    };

    let config = StreamConfig {
        channels: CHANNELS,
        sample_rate: SampleRate(SAMPLE_RATE),
        buffer_size: BufferSize::Default,
    };

    let stream = match sample_format {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, sink, cancel.clone()),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, sink, cancel.clone()),
        SampleFormat::F32 => build_stream::<f32>(&device, &config, sink, cancel.clone()),
        other => {
            error!("Unsupported input sample format: {:?}", other);
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(err) => {
            error!("Failed to open input stream: {}", err);
            return;
        }
    };

    if let Err(err) = stream.play() {
        error!("Failed to start input stream: {}", err);
        return;
    }

    // The device delivers samples through the callback; this thread only
    // watches for cancellation.
    while !cancel.is_stop_requested() {
        thread::sleep(CANCEL_POLL_INTERVAL);
    }

    info!("Stopping audio capture");
    drop(stream); // releases the input device
    info!("Audio capture resources released");
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    sink: mpsc::Sender<AudioFrame>,
    cancel: CancelSignal,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let mut assembler = FrameAssembler::new();
    let error_cancel = cancel.clone();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<i16> = data.iter().map(|&s| cpal::Sample::to_sample(s)).collect();
            for frame in assembler.push(&samples) {
                if cancel.is_stop_requested() {
                    return;
                }
                // A full queue means the consumer stalled; dropping the frame
                // bounds memory and keeps the device callback non-blocking.
                if let Err(err) = sink.try_send(frame) {
                    warn!(
                        "Dropping {}-byte audio frame, hand-off queue unavailable",
                        err.into_inner().len()
                    );
                }
            }
        },
        move |err| {
            if error_cancel.is_stop_requested() {
                return;
            }
            error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A cooperative worker stops within the join timeout once cancelled.
    #[test]
    fn stop_joins_cooperative_worker() {
        let cancel = CancelSignal::new();
        let worker_cancel = cancel.clone();
        let handle = CaptureHandle::spawn(cancel.clone(), move || {
            while !worker_cancel.is_stop_requested() {
                thread::sleep(Duration::from_millis(10));
            }
        })
        .unwrap();

        assert!(handle.stop(Duration::from_secs(1)));
        assert!(cancel.is_stop_requested());
    }

    /// Stop works even when cancellation was requested before the call.
    #[test]
    fn stop_after_external_cancellation() {
        let cancel = CancelSignal::new();
        let worker_cancel = cancel.clone();
        let handle = CaptureHandle::spawn(cancel.clone(), move || {
            while !worker_cancel.is_stop_requested() {
                thread::sleep(Duration::from_millis(10));
            }
        })
        .unwrap();

        cancel.request_stop();
        assert!(handle.stop(Duration::from_secs(1)));
    }

    /// A wedged worker does not stall teardown past the bounded timeout.
    #[test]
    fn stop_times_out_on_stuck_worker() {
        let cancel = CancelSignal::new();
        let handle = CaptureHandle::spawn(cancel, || {
            thread::sleep(Duration::from_millis(500));
        })
        .unwrap();

        assert!(!handle.stop(Duration::from_millis(50)));
    }

    /// Frames produced by a worker arrive on the hand-off queue in order.
    #[test]
    fn frames_flow_through_handoff_queue() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancelSignal::new();
        let handle = CaptureHandle::spawn(cancel.clone(), move || {
            for value in 0..3i16 {
                let frame = AudioFrame::from_samples(&[value; 4]);
                let _ = tx.try_send(frame);
            }
        })
        .unwrap();

        assert!(handle.stop(Duration::from_secs(1)));
        for value in 0..3i16 {
            let frame = rx.blocking_recv().unwrap();
            assert_eq!(frame, AudioFrame::from_samples(&[value; 4]));
        }
    }
}
