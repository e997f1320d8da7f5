//! Native codec seam.
//!
//! A [`Backend`] allocates native encoder and decoder states. The states
//! speak the libopus calling convention: every call returns either a
//! non-negative count or a negative status code, and releasing the state
//! happens when the value is dropped.
//!
//! Every method is safe to call with any arguments. Implementations check
//! slice lengths against `frame_size` and reject request ids they do not
//! know before anything reaches native code.

use std::os::raw::c_int;

/// Generic get/set control requests (`opus_*_ctl`).
pub trait Control {
    /// Issues a set request. Unknown ids return `OPUS_UNIMPLEMENTED`.
    fn set(&mut self, request: c_int, value: c_int) -> c_int;

    /// Issues a get request, writing the result into `value`. Unknown ids
    /// return `OPUS_UNIMPLEMENTED`.
    fn get(&mut self, request: c_int, value: &mut c_int) -> c_int;
}

/// A native encoder state.
pub trait NativeEncoder: Control + Send {
    /// Encodes `frame_size` samples per channel from interleaved `pcm`.
    ///
    /// Returns `OPUS_BAD_ARG` unless `pcm` holds `frame_size * channels`
    /// samples and `out` is non-empty. Otherwise returns the packet length
    /// or a negative status.
    fn encode(&mut self, pcm: &[i16], frame_size: c_int, out: &mut [u8]) -> c_int;
}

/// A native decoder state.
pub trait NativeDecoder: Control + Send {
    /// Decodes `packet` into interleaved `pcm`, at most `frame_size`
    /// samples per channel. An empty packet requests loss concealment.
    ///
    /// Returns `OPUS_BAD_ARG` unless `pcm` holds `frame_size * channels`
    /// samples. Otherwise returns the number of samples per channel or a
    /// negative status.
    fn decode(&mut self, packet: &[u8], pcm: &mut [i16], frame_size: c_int, fec: bool) -> c_int;
}

/// Allocates native codec states.
pub trait Backend {
    type Encoder: NativeEncoder;
    type Decoder: NativeDecoder;

    /// Creates an encoder, or returns the negative status on failure.
    fn create_encoder(
        &self,
        sample_rate: i32,
        channels: i32,
        application: c_int,
    ) -> Result<Self::Encoder, c_int>;

    /// Creates a decoder, or returns the negative status on failure.
    fn create_decoder(&self, sample_rate: i32, channels: i32) -> Result<Self::Decoder, c_int>;
}

/// Whether `len` interleaved samples cover `frame_size` samples per channel.
pub(crate) fn holds_frame(len: usize, frame_size: c_int, channels: i32) -> bool {
    frame_size > 0
        && channels > 0
        && (frame_size as usize)
            .checked_mul(channels as usize)
            .is_some_and(|needed| len >= needed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds_frame() {
        assert!(holds_frame(1920, 960, 2));
        assert!(holds_frame(4000, 960, 2));
        assert!(!holds_frame(1919, 960, 2));
        assert!(!holds_frame(0, 960, 1));
        assert!(!holds_frame(100, 0, 1));
        assert!(!holds_frame(100, -1, 1));
        assert!(!holds_frame(usize::MAX, c_int::MAX, 0));
    }
}
