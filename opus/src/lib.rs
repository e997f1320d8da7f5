//! Opus encoder and decoder bindings.
//!
//! This crate wraps the libopus encoder and decoder as owned objects with
//! byte-buffer encode/decode calls:
//!
//! - `config`: encoder/decoder configuration with serde support
//! - `ctl`: typed control requests applied at creation
//! - `packet`: TOC parsing and packet sample counts (RFC 6716)
//! - `fake`: an in-process backend for tests and machines without libopus
//!
//! The real codec is linked with the `libopus` feature.
//!
//! # Example
//!
//! ```ignore
//! use giztoy_opus::{Application, Decoder, DecoderConfig, Encoder, EncoderConfig};
//!
//! let mut encoder = Encoder::create(&EncoderConfig::new(16000, 1, Application::VoIP))?;
//! let pcm = vec![0u8; 640]; // 20ms at 16kHz
//! let mut packet = vec![0u8; 4000];
//! let n = encoder.encode(&pcm, &mut packet)?;
//!
//! let mut decoder = Decoder::create(&DecoderConfig::new(16000, 1))?;
//! let mut out = vec![0u8; 640];
//! let written = decoder.decode(&packet[..n], &mut out)?;
//! assert_eq!(written, 640);
//! ```

mod backend;
pub mod config;
pub mod ctl;
mod decoder;
mod encoder;
mod error;
pub mod fake;
pub mod ffi;
#[cfg(feature = "libopus")]
mod libopus;
pub mod packet;

pub use backend::{Backend, Control, NativeDecoder, NativeEncoder};
pub use config::{
    Application, Bandwidth, Bitrate, DecoderConfig, EncoderConfig, FrameDuration, Signal,
};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{check, OpusError, Result};
#[cfg(feature = "libopus")]
pub use libopus::{Libopus, LibopusDecoder, LibopusEncoder};

/// Encoder over the linked libopus.
#[cfg(feature = "libopus")]
pub type OpusEncoder = Encoder<Libopus>;

/// Decoder over the linked libopus.
#[cfg(feature = "libopus")]
pub type OpusDecoder = Decoder<Libopus>;
