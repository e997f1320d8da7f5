//! Opus encoder.

use std::os::raw::c_int;

use tracing::debug;

use crate::backend::{Backend, NativeEncoder};
use crate::config::{Application, EncoderConfig, FrameDuration, BYTES_PER_SAMPLE};
use crate::ctl::{self, EncoderQuery};
use crate::error::{OpusError, Result};

/// Opus encoder.
///
/// Owns one native encoder state. The state is released by [`Encoder::close`]
/// or on drop, whichever comes first.
pub struct Encoder<B: Backend> {
    config: EncoderConfig,
    native: Option<B::Encoder>,
    samples: Vec<i16>,
}

#[cfg(feature = "libopus")]
impl Encoder<crate::libopus::Libopus> {
    /// Creates a libopus encoder.
    pub fn create(config: &EncoderConfig) -> Result<Self> {
        Self::create_with(&crate::libopus::Libopus, config)
    }
}

impl<B: Backend> Encoder<B> {
    /// Creates an encoder on `backend`.
    ///
    /// Unset format fields are filled with defaults, then every set tunable
    /// is applied. If any request fails the native state is released
    /// before the error is returned.
    pub fn create_with(backend: &B, config: &EncoderConfig) -> Result<Self> {
        let config = config.resolved();
        let application = config.application.unwrap_or_default();

        let mut native = backend
            .create_encoder(config.sample_rate, config.channels, application.to_ffi())
            .map_err(OpusError::from_code)?;
        ctl::apply(&mut native, &config.requests())?;

        debug!(
            "opus: encoder created: sample_rate={}, channels={}, application={:?}",
            config.sample_rate, config.channels, application
        );

        Ok(Self {
            config,
            native: Some(native),
            samples: Vec::new(),
        })
    }

    /// Returns the resolved config.
    pub fn config(&self) -> &EncoderConfig {
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

    /// Returns the application type.
    pub fn application(&self) -> Application {
        self.config.application.unwrap_or_default()
    }

    /// Returns true once the native state has been released.
    pub fn is_closed(&self) -> bool {
        self.native.is_none()
    }

    /// Returns the PCM byte length of one frame of `duration`.
    pub fn frame_bytes(&self, duration: FrameDuration) -> Option<usize> {
        let samples = duration.samples(self.sample_rate())? as usize;
        Some(samples * self.channels() as usize * BYTES_PER_SAMPLE)
    }

    /// Encodes interleaved little-endian 16-bit PCM into `out`.
    ///
    /// The frame size is `pcm.len() / 2 / channels` samples per channel and
    /// the packet is bounded by `out.len()`. Returns the packet length.
    pub fn encode(&mut self, pcm: &[u8], out: &mut [u8]) -> Result<usize> {
        let mut samples = std::mem::take(&mut self.samples);
        samples.clear();
        samples.extend(
            pcm.chunks_exact(BYTES_PER_SAMPLE)
                .map(|b| i16::from_le_bytes([b[0], b[1]])),
        );
        let result = self.encode_samples(&samples, out);
        self.samples = samples;
        result
    }

    /// Encodes interleaved PCM samples into `out`. Returns the packet length.
    pub fn encode_samples(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
        let channels = self.config.channels as usize;
        let native = self.native.as_mut().ok_or(OpusError::Closed("encoder"))?;

        let frame_size = pcm.len() / channels;
        if frame_size == 0 || out.is_empty() {
            return Err(OpusError::BadArg);
        }
        let frame_size = c_int::try_from(frame_size).map_err(|_| OpusError::BadArg)?;

        let n = native.encode(pcm, frame_size, out);
        if n < 0 {
            return Err(OpusError::from_code(n));
        }
        Ok(n as usize)
    }

    /// Encodes one frame into a new packet of at most `max_bytes`.
    pub fn encode_packet(&mut self, pcm: &[u8], max_bytes: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let n = self.encode(pcm, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Returns the algorithmic delay in samples, or 0 if it cannot be read.
    pub fn lookahead(&mut self) -> i32 {
        self.query(EncoderQuery::Lookahead).unwrap_or(0)
    }

    /// Returns true if the encoder is currently in DTX.
    pub fn in_dtx(&mut self) -> bool {
        self.query(EncoderQuery::InDtx).is_ok_and(|v| v != 0)
    }

    fn query(&mut self, q: EncoderQuery) -> Result<c_int> {
        let native = self.native.as_mut().ok_or(OpusError::Closed("encoder"))?;
        ctl::query(native, q.id())
    }

    /// Releases the native state. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.native.take().is_some() {
            debug!("opus: encoder closed");
        }
    }
}
