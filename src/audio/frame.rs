//! # Audio Frames
//!
//! Fixed-size PCM frames handed from the capture thread to the recognizer
//! request pump. One frame is 100 ms of mono 16-bit linear PCM at 16 kHz
//! (1600 samples, 3200 bytes), delivered in capture order.

use byteorder::{LittleEndian, WriteBytesExt};

/// Capture sample rate in Hz. Matches the rate the streaming recognizer is
/// configured for.
pub const SAMPLE_RATE: u32 = 16_000;

/// Mono capture.
pub const CHANNELS: u16 = 1;

/// One frame covers 100 ms of audio.
pub const FRAME_DURATION_MS: u32 = 100;

/// Samples per frame: 16_000 Hz * 0.1 s = 1600.
pub const SAMPLES_PER_FRAME: usize =
    (SAMPLE_RATE as usize / 1000) * FRAME_DURATION_MS as usize;

/// Bytes per frame (16-bit samples).
pub const BYTES_PER_FRAME: usize = SAMPLES_PER_FRAME * 2;

/// One sampling interval of little-endian 16-bit PCM.
///
/// Produced by the capture thread, consumed exactly once by the recognizer
/// request pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Vec<u8>,
}

impl AudioFrame {
    /// Pack a full frame of samples into wire bytes.
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            // Vec writes cannot fail
            data.write_i16::<LittleEndian>(sample).unwrap();
        }
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Re-groups device callbacks into fixed 100 ms frames.
///
/// The input device delivers buffers of whatever size the backend prefers;
/// the recognizer wants steady 100 ms chunks. Leftover samples stay pending
/// until the next callback fills the frame.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: Vec<i16>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb captured samples, returning every complete frame they produce.
    pub fn push(&mut self, samples: &[i16]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.pending.len() >= SAMPLES_PER_FRAME {
            let rest = self.pending.split_off(SAMPLES_PER_FRAME);
            frames.push(AudioFrame::from_samples(&self.pending));
            self.pending = rest;
        }
        frames
    }

    /// Samples waiting for the next full frame.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_packs_little_endian() {
        let frame = AudioFrame::from_samples(&[1, -2]);
        assert_eq!(frame.as_bytes(), &[0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn assembler_holds_partial_frames() {
        let mut assembler = FrameAssembler::new();
        let half = vec![0i16; SAMPLES_PER_FRAME / 2];
        assert!(assembler.push(&half).is_empty());
        assert_eq!(assembler.pending_samples(), SAMPLES_PER_FRAME / 2);

        let frames = assembler.push(&half);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), BYTES_PER_FRAME);
        assert_eq!(assembler.pending_samples(), 0);
    }

    #[test]
    fn assembler_emits_multiple_frames_in_order() {
        let mut assembler = FrameAssembler::new();
        // Two and a half frames, with a recognizable first sample per frame
        let mut samples = Vec::new();
        for frame_index in 0..2 {
            samples.push(frame_index as i16 + 1);
            samples.extend(std::iter::repeat(0i16).take(SAMPLES_PER_FRAME - 1));
        }
        samples.extend(std::iter::repeat(7i16).take(SAMPLES_PER_FRAME / 2));

        let frames = assembler.push(&samples);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes()[0], 1);
        assert_eq!(frames[1].as_bytes()[0], 2);
        assert_eq!(assembler.pending_samples(), SAMPLES_PER_FRAME / 2);
    }
}
