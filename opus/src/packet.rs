//! Opus packet header inspection.
//!
//! Implements the TOC byte and frame count rules of RFC 6716 Section 3.1.

use crate::config::{Bandwidth, FrameDuration};
use crate::error::{OpusError, Result};

/// TOC byte from an Opus packet header.
///
/// Layout:
/// ```text
///          0 1 2 3 4 5 6 7
///         +-+-+-+-+-+-+-+-+
///         | config  |s| c |
///         +-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toc(pub u8);

impl Toc {
    /// Builds a TOC byte from its fields. `config` is masked to 5 bits.
    pub const fn from_parts(config: u8, stereo: bool, code: FrameCode) -> Self {
        Self(((config & 0x1F) << 3) | ((stereo as u8) << 2) | code as u8)
    }

    /// Returns the configuration number (0-31).
    pub fn config(&self) -> u8 {
        self.0 >> 3
    }

    /// Returns true if the TOC indicates stereo audio.
    pub fn is_stereo(&self) -> bool {
        (self.0 & 0b00000100) != 0
    }

    /// Returns the frame code (number of frames per packet).
    pub fn frame_code(&self) -> FrameCode {
        match self.0 & 0b11 {
            0 => FrameCode::One,
            1 => FrameCode::TwoEqual,
            2 => FrameCode::TwoDifferent,
            _ => FrameCode::Arbitrary,
        }
    }

    /// Returns the coding mode.
    pub fn mode(&self) -> Mode {
        match self.config() {
            0..=11 => Mode::Silk,
            12..=15 => Mode::Hybrid,
            _ => Mode::Celt,
        }
    }

    /// Returns the audio bandwidth.
    pub fn bandwidth(&self) -> Bandwidth {
        match self.config() {
            0..=3 | 16..=19 => Bandwidth::Narrowband,
            4..=7 => Bandwidth::Mediumband,
            8..=11 | 20..=23 => Bandwidth::Wideband,
            12..=13 | 24..=27 => Bandwidth::Superwideband,
            _ => Bandwidth::Fullband,
        }
    }

    /// Returns the duration of each frame in the packet.
    pub fn frame_duration(&self) -> FrameDuration {
        match self.config() {
            16 | 20 | 24 | 28 => FrameDuration::Ms2_5,
            17 | 21 | 25 | 29 => FrameDuration::Ms5,
            0 | 4 | 8 | 12 | 14 | 18 | 22 | 26 | 30 => FrameDuration::Ms10,
            2 | 6 | 10 => FrameDuration::Ms40,
            3 | 7 | 11 => FrameDuration::Ms60,
            _ => FrameDuration::Ms20,
        }
    }

    /// Returns the number of samples per channel in each frame at `sample_rate`.
    pub fn samples_per_frame(&self, sample_rate: i32) -> i32 {
        self.frame_duration().samples(sample_rate).unwrap_or(0)
    }
}

impl std::fmt::Display for Toc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "opus_toc: stereo={}, mode={:?}, bw={:?}, {:?}, {}",
            self.is_stereo(),
            self.mode(),
            self.bandwidth(),
            self.frame_code(),
            self.frame_duration(),
        )
    }
}

/// Coding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Silk,
    Hybrid,
    Celt,
}

/// Frame code indicating number of frames per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCode {
    /// One frame in the packet.
    One = 0,
    /// Two frames with equal compressed size.
    TwoEqual = 1,
    /// Two frames with different compressed sizes.
    TwoDifferent = 2,
    /// Arbitrary number of frames, count in the second byte.
    Arbitrary = 3,
}

/// Returns the number of frames in a packet.
pub fn frame_count(packet: &[u8]) -> Result<usize> {
    let Some(&toc) = packet.first() else {
        return Err(OpusError::BadArg);
    };
    match Toc(toc).frame_code() {
        FrameCode::One => Ok(1),
        FrameCode::TwoEqual | FrameCode::TwoDifferent => Ok(2),
        FrameCode::Arbitrary => match packet.get(1) {
            Some(&b) => Ok((b & 0x3F) as usize),
            None => Err(OpusError::InvalidPacket),
        },
    }
}

/// Returns the number of samples per channel in a packet at `sample_rate`.
///
/// Packets announcing more than 120 ms of audio are invalid.
pub fn samples(packet: &[u8], sample_rate: i32) -> Result<usize> {
    let count = frame_count(packet)?;
    let per_frame = Toc(packet[0]).samples_per_frame(sample_rate) as usize;
    let total = count * per_frame;
    if total * 25 > sample_rate as usize * 3 {
        return Err(OpusError::InvalidPacket);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_fields() {
        // 0x48 = config 9, mono, one frame
        let toc = Toc(0x48);
        assert_eq!(toc.config(), 9);
        assert!(!toc.is_stereo());
        assert_eq!(toc.frame_code(), FrameCode::One);
        assert_eq!(toc.mode(), Mode::Silk);
        assert_eq!(toc.bandwidth(), Bandwidth::Wideband);
        assert_eq!(toc.frame_duration(), FrameDuration::Ms20);
        assert_eq!(toc.samples_per_frame(16000), 320);
    }

    #[test]
    fn test_toc_celt_fullband() {
        let toc = Toc(0xEC);
        assert_eq!(toc.config(), 29);
        assert!(toc.is_stereo());
        assert_eq!(toc.mode(), Mode::Celt);
        assert_eq!(toc.bandwidth(), Bandwidth::Fullband);
        assert_eq!(toc.frame_duration(), FrameDuration::Ms5);
        assert_eq!(toc.samples_per_frame(48000), 240);
    }

    #[test]
    fn test_toc_from_parts() {
        let toc = Toc::from_parts(29, true, FrameCode::One);
        assert_eq!(toc, Toc(0xEC));
        let toc = Toc::from_parts(31, false, FrameCode::Arbitrary);
        assert_eq!(toc.config(), 31);
        assert_eq!(toc.frame_code(), FrameCode::Arbitrary);
    }

    #[test]
    fn test_toc_hybrid() {
        let toc = Toc::from_parts(15, false, FrameCode::One);
        assert_eq!(toc.mode(), Mode::Hybrid);
        assert_eq!(toc.bandwidth(), Bandwidth::Fullband);
        assert_eq!(toc.frame_duration(), FrameDuration::Ms20);
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(&[]), Err(OpusError::BadArg));
        assert_eq!(frame_count(&[0x48]), Ok(1));
        assert_eq!(frame_count(&[0x49]), Ok(2));
        assert_eq!(frame_count(&[0x4A]), Ok(2));
        assert_eq!(frame_count(&[0x4B, 0x03]), Ok(3));
        assert_eq!(frame_count(&[0x4B]), Err(OpusError::InvalidPacket));
    }

    #[test]
    fn test_samples() {
        // 20ms SILK WB, two frames at 48kHz
        assert_eq!(samples(&[0x49], 48000), Ok(1920));
        // 5ms CELT at 16kHz
        assert_eq!(samples(&[0xEC, 0xFF, 0xFE], 16000), Ok(80));
        // 6 x 20ms = 120ms is the limit
        assert_eq!(samples(&[0x4B, 0x06], 48000), Ok(5760));
        assert_eq!(samples(&[0x4B, 0x07], 48000), Err(OpusError::InvalidPacket));
    }

    #[test]
    fn test_display() {
        let s = format!("{}", Toc(0x48));
        assert!(s.contains("stereo=false"));
        assert!(s.contains("20ms"));
    }
}
