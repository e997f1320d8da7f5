//! Encoder and decoder configuration.

use std::os::raw::c_int;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ffi;

/// Sample rates accepted by libopus.
pub const SAMPLE_RATES: [i32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Sample rate used when a config leaves it unset.
pub const DEFAULT_SAMPLE_RATE: i32 = 48000;

/// Channel count used when a config leaves it unset.
pub const DEFAULT_CHANNELS: i32 = 2;

/// Bytes per 16-bit PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Opus application type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Application {
    /// Best quality for voice signals.
    #[serde(rename = "voip")]
    VoIP,
    /// Best quality for non-voice signals.
    #[default]
    Audio,
    /// Minimum possible coding delay.
    RestrictedLowdelay,
}

impl Application {
    /// Converts to the `OPUS_APPLICATION_*` constant.
    pub fn to_ffi(self) -> c_int {
        match self {
            Self::VoIP => ffi::OPUS_APPLICATION_VOIP,
            Self::Audio => ffi::OPUS_APPLICATION_AUDIO,
            Self::RestrictedLowdelay => ffi::OPUS_APPLICATION_RESTRICTED_LOWDELAY,
        }
    }
}

/// Target bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bitrate {
    /// Let the encoder pick a bitrate from the frame size and channel count.
    Auto,
    /// Use as many bits as the output buffer allows.
    Max,
    /// Explicit rate in bits per second (500 to 512000 are meaningful).
    Bits(i32),
}

impl Bitrate {
    /// Converts to the `OPUS_SET_BITRATE` value.
    pub fn to_ffi(self) -> c_int {
        match self {
            Self::Auto => ffi::OPUS_AUTO,
            Self::Max => ffi::OPUS_BITRATE_MAX,
            Self::Bits(bps) => bps,
        }
    }
}

/// Audio bandpass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    /// 4 kHz bandpass
    Narrowband,
    /// 6 kHz bandpass
    Mediumband,
    /// 8 kHz bandpass
    Wideband,
    /// 12 kHz bandpass
    Superwideband,
    /// 20 kHz bandpass
    Fullband,
}

impl Bandwidth {
    /// Converts to the `OPUS_BANDWIDTH_*` constant.
    pub fn to_ffi(self) -> c_int {
        match self {
            Self::Narrowband => ffi::OPUS_BANDWIDTH_NARROWBAND,
            Self::Mediumband => ffi::OPUS_BANDWIDTH_MEDIUMBAND,
            Self::Wideband => ffi::OPUS_BANDWIDTH_WIDEBAND,
            Self::Superwideband => ffi::OPUS_BANDWIDTH_SUPERWIDEBAND,
            Self::Fullband => ffi::OPUS_BANDWIDTH_FULLBAND,
        }
    }

    /// Returns the effective sample rate for this bandwidth.
    pub fn sample_rate(self) -> i32 {
        match self {
            Self::Narrowband => 8000,
            Self::Mediumband => 12000,
            Self::Wideband => 16000,
            Self::Superwideband => 24000,
            Self::Fullband => 48000,
        }
    }
}

/// Frame duration selection for the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameDuration {
    /// Use the frame size passed to each encode call.
    #[default]
    #[serde(rename = "arg")]
    Arg,
    #[serde(rename = "2.5ms")]
    Ms2_5,
    #[serde(rename = "5ms")]
    Ms5,
    #[serde(rename = "10ms")]
    Ms10,
    #[serde(rename = "20ms")]
    Ms20,
    #[serde(rename = "40ms")]
    Ms40,
    #[serde(rename = "60ms")]
    Ms60,
    #[serde(rename = "80ms")]
    Ms80,
    #[serde(rename = "100ms")]
    Ms100,
    #[serde(rename = "120ms")]
    Ms120,
}

impl FrameDuration {
    /// Converts to the `OPUS_FRAMESIZE_*` constant.
    pub fn to_ffi(self) -> c_int {
        match self {
            Self::Arg => ffi::OPUS_FRAMESIZE_ARG,
            Self::Ms2_5 => ffi::OPUS_FRAMESIZE_2_5_MS,
            Self::Ms5 => ffi::OPUS_FRAMESIZE_5_MS,
            Self::Ms10 => ffi::OPUS_FRAMESIZE_10_MS,
            Self::Ms20 => ffi::OPUS_FRAMESIZE_20_MS,
            Self::Ms40 => ffi::OPUS_FRAMESIZE_40_MS,
            Self::Ms60 => ffi::OPUS_FRAMESIZE_60_MS,
            Self::Ms80 => ffi::OPUS_FRAMESIZE_80_MS,
            Self::Ms100 => ffi::OPUS_FRAMESIZE_100_MS,
            Self::Ms120 => ffi::OPUS_FRAMESIZE_120_MS,
        }
    }

    /// Maps a libopus `OPUS_FRAMESIZE_*` value back to a duration.
    pub fn from_ffi(value: c_int) -> Option<Self> {
        Some(match value {
            ffi::OPUS_FRAMESIZE_ARG => Self::Arg,
            ffi::OPUS_FRAMESIZE_2_5_MS => Self::Ms2_5,
            ffi::OPUS_FRAMESIZE_5_MS => Self::Ms5,
            ffi::OPUS_FRAMESIZE_10_MS => Self::Ms10,
            ffi::OPUS_FRAMESIZE_20_MS => Self::Ms20,
            ffi::OPUS_FRAMESIZE_40_MS => Self::Ms40,
            ffi::OPUS_FRAMESIZE_60_MS => Self::Ms60,
            ffi::OPUS_FRAMESIZE_80_MS => Self::Ms80,
            ffi::OPUS_FRAMESIZE_100_MS => Self::Ms100,
            ffi::OPUS_FRAMESIZE_120_MS => Self::Ms120,
            _ => return None,
        })
    }

    /// Returns the duration, or `None` for [`FrameDuration::Arg`].
    pub fn duration(self) -> Option<Duration> {
        let micros = match self {
            Self::Arg => return None,
            Self::Ms2_5 => 2500,
            Self::Ms5 => 5000,
            Self::Ms10 => 10_000,
            Self::Ms20 => 20_000,
            Self::Ms40 => 40_000,
            Self::Ms60 => 60_000,
            Self::Ms80 => 80_000,
            Self::Ms100 => 100_000,
            Self::Ms120 => 120_000,
        };
        Some(Duration::from_micros(micros))
    }

    /// Returns the number of samples per channel in one frame at `sample_rate`.
    pub fn samples(self, sample_rate: i32) -> Option<i32> {
        let micros = self.duration()?.as_micros() as i64;
        Some((sample_rate as i64 * micros / 1_000_000) as i32)
    }
}

impl std::fmt::Display for FrameDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arg => write!(f, "arg"),
            Self::Ms2_5 => write!(f, "2.5ms"),
            Self::Ms5 => write!(f, "5ms"),
            Self::Ms10 => write!(f, "10ms"),
            Self::Ms20 => write!(f, "20ms"),
            Self::Ms40 => write!(f, "40ms"),
            Self::Ms60 => write!(f, "60ms"),
            Self::Ms80 => write!(f, "80ms"),
            Self::Ms100 => write!(f, "100ms"),
            Self::Ms120 => write!(f, "120ms"),
        }
    }
}

/// Type of signal being encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Auto,
    Voice,
    Music,
}

impl Signal {
    /// Converts to the `OPUS_AUTO` or `OPUS_SIGNAL_*` constant.
    pub fn to_ffi(self) -> c_int {
        match self {
            Self::Auto => ffi::OPUS_AUTO,
            Self::Voice => ffi::OPUS_SIGNAL_VOICE,
            Self::Music => ffi::OPUS_SIGNAL_MUSIC,
        }
    }
}

/// Opus encoder config.
///
/// Fields left at their default are not sent to the codec, so the codec's
/// own defaults apply. `None` means "unset"; `Some(0)` is a real value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Sampling rate of input signal (Hz).
    /// This must be one of 8000, 12000, 16000, 24000, or 48000.
    /// 0 selects [`DEFAULT_SAMPLE_RATE`].
    pub sample_rate: i32,
    /// Number of channels in input signal (1 or 2).
    /// 0 selects [`DEFAULT_CHANNELS`].
    pub channels: i32,
    /// Encode mode; unset selects [`Application::Audio`].
    pub application: Option<Application>,
    /// Enable discontinuous transmission (DTX).
    pub enable_dtx: bool,
    /// Enable inband forward error correction (FEC).
    pub enable_inband_fec: bool,
    /// Disable almost all use of prediction.
    pub disable_prediction: bool,
    /// Disable variable bitrate (VBR).
    pub disable_vbr: bool,
    /// Disable constrained VBR.
    pub disable_constrained_vbr: bool,
    /// Disable the use of phase inversion for intensity stereo.
    pub disable_phase_inversion: bool,
    pub bitrate: Option<Bitrate>,
    /// Computational complexity, 0-10.
    pub complexity: Option<i32>,
    /// The maximum bandpass that the encoder will select automatically.
    pub max_bandwidth: Option<Bandwidth>,
    /// Forces the encoder's bandpass to a specific value.
    pub bandwidth: Option<Bandwidth>,
    /// Expected packet loss percentage, 0-100.
    pub packet_loss_percent: Option<i32>,
    pub frame_duration: Option<FrameDuration>,
    pub signal: Option<Signal>,
    /// Force mono (1) or stereo (2).
    pub force_channels: Option<i32>,
    /// Depth of the signal being encoded, 8-24 bits.
    pub lsb_depth: Option<i32>,
}

impl EncoderConfig {
    /// Creates a config with the given format and every tunable unset.
    pub fn new(sample_rate: i32, channels: i32, application: Application) -> Self {
        Self {
            sample_rate,
            channels,
            application: Some(application),
            ..Default::default()
        }
    }

    /// Returns a copy with unset format fields filled with defaults.
    pub fn resolved(&self) -> Self {
        let mut c = self.clone();
        if c.sample_rate == 0 {
            c.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        if c.channels == 0 {
            c.channels = DEFAULT_CHANNELS;
        }
        if c.application.is_none() {
            c.application = Some(Application::default());
        }
        c
    }
}

/// Opus decoder config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Sample rate to decode at (Hz). 0 selects [`DEFAULT_SAMPLE_RATE`].
    pub sample_rate: i32,
    /// Number of output channels (1 or 2). 0 selects [`DEFAULT_CHANNELS`].
    pub channels: i32,
    /// Decoder gain adjustment in Q8 dB units (-32768 to 32767).
    pub gain: Option<i32>,
    /// Decode inband forward error correction data.
    pub enable_inband_fec: bool,
}

impl DecoderConfig {
    /// Creates a config with the given format, no gain and FEC off.
    pub fn new(sample_rate: i32, channels: i32) -> Self {
        Self {
            sample_rate,
            channels,
            ..Default::default()
        }
    }

    /// Returns a copy with unset format fields filled with defaults.
    pub fn resolved(&self) -> Self {
        let mut c = self.clone();
        if c.sample_rate == 0 {
            c.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        if c.channels == 0 {
            c.channels = DEFAULT_CHANNELS;
        }
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_resolved_defaults() {
        let c = EncoderConfig::default().resolved();
        assert_eq!(c.sample_rate, 48000);
        assert_eq!(c.channels, 2);
        assert_eq!(c.application, Some(Application::Audio));
        assert_eq!(c.bitrate, None);
        assert!(!c.enable_dtx);
    }

    #[test]
    fn test_encoder_resolved_keeps_values() {
        let c = EncoderConfig {
            sample_rate: 16000,
            channels: 1,
            application: Some(Application::VoIP),
            complexity: Some(0),
            ..Default::default()
        };
        let r = c.resolved();
        assert_eq!(r, c);
    }

    #[test]
    fn test_decoder_resolved_defaults() {
        let c = DecoderConfig {
            gain: Some(256),
            ..Default::default()
        }
        .resolved();
        assert_eq!(c.sample_rate, 48000);
        assert_eq!(c.channels, 2);
        assert_eq!(c.gain, Some(256));
    }

    #[test]
    fn test_frame_duration_samples() {
        assert_eq!(FrameDuration::Ms2_5.samples(48000), Some(120));
        assert_eq!(FrameDuration::Ms5.samples(48000), Some(240));
        assert_eq!(FrameDuration::Ms20.samples(16000), Some(320));
        assert_eq!(FrameDuration::Ms120.samples(8000), Some(960));
        assert_eq!(FrameDuration::Arg.samples(48000), None);
    }

    #[test]
    fn test_frame_duration_ffi() {
        for fd in [
            FrameDuration::Arg,
            FrameDuration::Ms2_5,
            FrameDuration::Ms10,
            FrameDuration::Ms120,
        ] {
            assert_eq!(FrameDuration::from_ffi(fd.to_ffi()), Some(fd));
        }
        assert_eq!(FrameDuration::from_ffi(4999), None);
    }

    #[test]
    fn test_ffi_values() {
        assert_eq!(Application::VoIP.to_ffi(), 2048);
        assert_eq!(Application::RestrictedLowdelay.to_ffi(), 2051);
        assert_eq!(Bitrate::Auto.to_ffi(), -1000);
        assert_eq!(Bitrate::Max.to_ffi(), -1);
        assert_eq!(Bitrate::Bits(32000).to_ffi(), 32000);
        assert_eq!(Bandwidth::Fullband.to_ffi(), 1105);
        assert_eq!(Signal::Music.to_ffi(), 3002);
        assert_eq!(Bandwidth::Wideband.sample_rate(), 16000);
    }

    #[test]
    fn test_encoder_config_json() {
        let c: EncoderConfig = serde_json::from_str(
            r#"{"sample_rate": 24000, "application": "voip", "enable_dtx": true,
                "bitrate": {"bits": 24000}, "frame_duration": "10ms", "signal": "voice"}"#,
        )
        .unwrap();
        assert_eq!(c.sample_rate, 24000);
        assert_eq!(c.channels, 0);
        assert_eq!(c.application, Some(Application::VoIP));
        assert!(c.enable_dtx);
        assert_eq!(c.bitrate, Some(Bitrate::Bits(24000)));
        assert_eq!(c.frame_duration, Some(FrameDuration::Ms10));
        assert_eq!(c.signal, Some(Signal::Voice));
        assert_eq!(c.resolved().channels, 2);
    }

    #[test]
    fn test_decoder_config_yaml() {
        let c: DecoderConfig = serde_yaml::from_str(
            "sample_rate: 16000\nchannels: 1\ngain: -256\nenable_inband_fec: true\n",
        )
        .unwrap();
        assert_eq!(c, DecoderConfig {
            sample_rate: 16000,
            channels: 1,
            gain: Some(-256),
            enable_inband_fec: true,
        });
    }

    #[test]
    fn test_bitrate_auto_yaml() {
        let c: EncoderConfig = serde_yaml::from_str("bitrate: max\nmax_bandwidth: wideband\n").unwrap();
        assert_eq!(c.bitrate, Some(Bitrate::Max));
        assert_eq!(c.max_bandwidth, Some(Bandwidth::Wideband));
    }
}
