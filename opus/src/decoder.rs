//! Opus decoder.

use std::os::raw::c_int;

use tracing::debug;

use crate::backend::{Backend, NativeDecoder};
use crate::config::{DecoderConfig, BYTES_PER_SAMPLE};
use crate::ctl::{self, DecoderQuery};
use crate::error::{OpusError, Result};
use crate::packet;

/// Opus decoder.
///
/// Owns one native decoder state. The state is released by [`Decoder::close`]
/// or on drop, whichever comes first.
pub struct Decoder<B: Backend> {
    config: DecoderConfig,
    native: Option<B::Decoder>,
    samples: Vec<i16>,
}

#[cfg(feature = "libopus")]
impl Decoder<crate::libopus::Libopus> {
    /// Creates a libopus decoder.
    pub fn create(config: &DecoderConfig) -> Result<Self> {
        Self::create_with(&crate::libopus::Libopus, config)
    }
}

impl<B: Backend> Decoder<B> {
    /// Creates a decoder on `backend`, releasing the native state if any
    /// configured request fails.
    pub fn create_with(backend: &B, config: &DecoderConfig) -> Result<Self> {
        let config = config.resolved();

        let mut native = backend
            .create_decoder(config.sample_rate, config.channels)
            .map_err(OpusError::from_code)?;
        ctl::apply(&mut native, &config.requests())?;

        debug!(
            "opus: decoder created: sample_rate={}, channels={}, fec={}",
            config.sample_rate, config.channels, config.enable_inband_fec
        );

        Ok(Self {
            config,
            native: Some(native),
            samples: Vec::new(),
        })
    }

    /// Returns the resolved config.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> i32 {
        self.config.sample_rate
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> i32 {
        self.config.channels
    }

    /// Returns true once the native state has been released.
    pub fn is_closed(&self) -> bool {
        self.native.is_none()
    }

    /// Decodes a packet into `out` as interleaved little-endian 16-bit PCM.
    ///
    /// At most `out.len() / 2 / channels` samples per channel are produced.
    /// An empty packet conceals a lost one. Returns the number of bytes
    /// written.
    pub fn decode(&mut self, packet: &[u8], out: &mut [u8]) -> Result<usize> {
        let channels = self.config.channels as usize;
        let capacity = out.len() / BYTES_PER_SAMPLE / channels;

        let mut samples = std::mem::take(&mut self.samples);
        samples.clear();
        samples.resize(self.clamp_frame_size(capacity) * channels, 0);
        let result = self.decode_samples(packet, &mut samples);

        let result = result.map(|n| {
            let written = n * channels;
            for (dst, s) in out.chunks_exact_mut(BYTES_PER_SAMPLE).zip(&samples[..written]) {
                dst.copy_from_slice(&s.to_le_bytes());
            }
            written * BYTES_PER_SAMPLE
        });
        self.samples = samples;
        result
    }

    /// Decodes a packet into interleaved samples.
    /// Returns the number of samples per channel.
    pub fn decode_samples(&mut self, packet: &[u8], pcm: &mut [i16]) -> Result<usize> {
        let channels = self.config.channels as usize;
        let fec = self.config.enable_inband_fec;

        let mut frame_size = self.clamp_frame_size(pcm.len() / channels);
        // Concealment and FEC decode whole 2.5ms units.
        if packet.is_empty() || fec {
            let unit = (self.config.sample_rate / 400) as usize;
            frame_size -= frame_size % unit;
        }

        let native = self.native.as_mut().ok_or(OpusError::Closed("decoder"))?;
        if frame_size == 0 {
            return Err(OpusError::BadArg);
        }

        let n = native.decode(packet, pcm, frame_size as c_int, fec);
        if n < 0 {
            return Err(OpusError::from_code(n));
        }
        let n = n as usize;
        if n > frame_size {
            return Err(OpusError::Internal(n as i32));
        }
        Ok(n)
    }

    /// Conceals a lost packet, filling up to `out.len()` bytes.
    pub fn decode_plc(&mut self, out: &mut [u8]) -> Result<usize> {
        self.decode(&[], out)
    }

    /// Returns the number of samples per channel `packet` decodes to.
    pub fn packet_samples(&self, packet: &[u8]) -> Result<usize> {
        packet::samples(packet, self.config.sample_rate)
    }

    /// Returns the configured gain, or 0 if it cannot be read.
    pub fn gain(&mut self) -> i32 {
        self.query(DecoderQuery::Gain).unwrap_or(0)
    }

    /// Returns the duration in samples of the last decoded packet, or 0 if
    /// it cannot be read.
    pub fn last_packet_duration(&mut self) -> i32 {
        self.query(DecoderQuery::LastPacketDuration).unwrap_or(0)
    }

    fn query(&mut self, q: DecoderQuery) -> Result<c_int> {
        let native = self.native.as_mut().ok_or(OpusError::Closed("decoder"))?;
        ctl::query(native, q.id())
    }

    /// A packet never holds more than 120ms.
    fn clamp_frame_size(&self, frame_size: usize) -> usize {
        frame_size.min(self.config.sample_rate as usize * 3 / 25)
    }

    /// Releases the native state. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.native.take().is_some() {
            debug!("opus: decoder closed");
        }
    }
}
