//! FFI bindings to libopus.
//!
//! The constants mirror `opus_defines.h` and are always available; the
//! function declarations are only compiled with the `libopus` feature.

use std::os::raw::c_int;
#[cfg(feature = "libopus")]
use std::os::raw::{c_char, c_uchar};

/// Opaque encoder state.
pub enum OpusEncoder {}

/// Opaque decoder state.
pub enum OpusDecoder {}

/// opus_int32 type (from opus_types.h)
pub type OpusInt32 = i32;

/// opus_int16 type (from opus_types.h)
pub type OpusInt16 = i16;

// Return codes
pub const OPUS_OK: c_int = 0;
pub const OPUS_BAD_ARG: c_int = -1;
pub const OPUS_BUFFER_TOO_SMALL: c_int = -2;
pub const OPUS_INTERNAL_ERROR: c_int = -3;
pub const OPUS_INVALID_PACKET: c_int = -4;
pub const OPUS_UNIMPLEMENTED: c_int = -5;
pub const OPUS_INVALID_STATE: c_int = -6;
pub const OPUS_ALLOC_FAIL: c_int = -7;

// Special values
pub const OPUS_AUTO: c_int = -1000;
pub const OPUS_BITRATE_MAX: c_int = -1;

// Application types
pub const OPUS_APPLICATION_VOIP: c_int = 2048;
pub const OPUS_APPLICATION_AUDIO: c_int = 2049;
pub const OPUS_APPLICATION_RESTRICTED_LOWDELAY: c_int = 2051;

// Signal types
pub const OPUS_SIGNAL_VOICE: c_int = 3001;
pub const OPUS_SIGNAL_MUSIC: c_int = 3002;

// Bandwidths
pub const OPUS_BANDWIDTH_NARROWBAND: c_int = 1101;
pub const OPUS_BANDWIDTH_MEDIUMBAND: c_int = 1102;
pub const OPUS_BANDWIDTH_WIDEBAND: c_int = 1103;
pub const OPUS_BANDWIDTH_SUPERWIDEBAND: c_int = 1104;
pub const OPUS_BANDWIDTH_FULLBAND: c_int = 1105;

// Expert frame durations
pub const OPUS_FRAMESIZE_ARG: c_int = 5000;
pub const OPUS_FRAMESIZE_2_5_MS: c_int = 5001;
pub const OPUS_FRAMESIZE_5_MS: c_int = 5002;
pub const OPUS_FRAMESIZE_10_MS: c_int = 5003;
pub const OPUS_FRAMESIZE_20_MS: c_int = 5004;
pub const OPUS_FRAMESIZE_40_MS: c_int = 5005;
pub const OPUS_FRAMESIZE_60_MS: c_int = 5006;
pub const OPUS_FRAMESIZE_80_MS: c_int = 5007;
pub const OPUS_FRAMESIZE_100_MS: c_int = 5008;
pub const OPUS_FRAMESIZE_120_MS: c_int = 5009;

// CTL macros (request codes)
pub const OPUS_SET_BITRATE_REQUEST: c_int = 4002;
pub const OPUS_SET_MAX_BANDWIDTH_REQUEST: c_int = 4004;
pub const OPUS_SET_VBR_REQUEST: c_int = 4006;
pub const OPUS_SET_BANDWIDTH_REQUEST: c_int = 4008;
pub const OPUS_SET_COMPLEXITY_REQUEST: c_int = 4010;
pub const OPUS_SET_INBAND_FEC_REQUEST: c_int = 4012;
pub const OPUS_SET_PACKET_LOSS_PERC_REQUEST: c_int = 4014;
pub const OPUS_SET_DTX_REQUEST: c_int = 4016;
pub const OPUS_SET_VBR_CONSTRAINT_REQUEST: c_int = 4020;
pub const OPUS_SET_FORCE_CHANNELS_REQUEST: c_int = 4022;
pub const OPUS_SET_SIGNAL_REQUEST: c_int = 4024;
pub const OPUS_GET_LOOKAHEAD_REQUEST: c_int = 4027;
pub const OPUS_SET_GAIN_REQUEST: c_int = 4034;
pub const OPUS_SET_LSB_DEPTH_REQUEST: c_int = 4036;
pub const OPUS_GET_LAST_PACKET_DURATION_REQUEST: c_int = 4039;
pub const OPUS_SET_EXPERT_FRAME_DURATION_REQUEST: c_int = 4040;
pub const OPUS_SET_PREDICTION_DISABLED_REQUEST: c_int = 4042;
pub const OPUS_GET_GAIN_REQUEST: c_int = 4045;
pub const OPUS_SET_PHASE_INVERSION_DISABLED_REQUEST: c_int = 4046;
pub const OPUS_GET_IN_DTX_REQUEST: c_int = 4049;

/// Encoder requests that take an `opus_int32` value.
pub const ENCODER_SET_REQUESTS: &[c_int] = &[
    OPUS_SET_BITRATE_REQUEST,
    OPUS_SET_MAX_BANDWIDTH_REQUEST,
    OPUS_SET_VBR_REQUEST,
    OPUS_SET_BANDWIDTH_REQUEST,
    OPUS_SET_COMPLEXITY_REQUEST,
    OPUS_SET_INBAND_FEC_REQUEST,
    OPUS_SET_PACKET_LOSS_PERC_REQUEST,
    OPUS_SET_DTX_REQUEST,
    OPUS_SET_VBR_CONSTRAINT_REQUEST,
    OPUS_SET_FORCE_CHANNELS_REQUEST,
    OPUS_SET_SIGNAL_REQUEST,
    OPUS_SET_LSB_DEPTH_REQUEST,
    OPUS_SET_EXPERT_FRAME_DURATION_REQUEST,
    OPUS_SET_PREDICTION_DISABLED_REQUEST,
    OPUS_SET_PHASE_INVERSION_DISABLED_REQUEST,
];

/// Encoder requests that write an `opus_int32` through a pointer.
pub const ENCODER_GET_REQUESTS: &[c_int] = &[OPUS_GET_LOOKAHEAD_REQUEST, OPUS_GET_IN_DTX_REQUEST];

/// Decoder requests that take an `opus_int32` value.
pub const DECODER_SET_REQUESTS: &[c_int] = &[OPUS_SET_GAIN_REQUEST];

/// Decoder requests that write an `opus_int32` through a pointer.
pub const DECODER_GET_REQUESTS: &[c_int] =
    &[OPUS_GET_GAIN_REQUEST, OPUS_GET_LAST_PACKET_DURATION_REQUEST];

#[cfg(feature = "libopus")]
unsafe extern "C" {
    // Error handling
    pub fn opus_strerror(error: c_int) -> *const c_char;

    // Encoder
    pub fn opus_encoder_create(
        fs: OpusInt32,
        channels: c_int,
        application: c_int,
        error: *mut c_int,
    ) -> *mut OpusEncoder;

    pub fn opus_encoder_destroy(enc: *mut OpusEncoder);

    pub fn opus_encode(
        enc: *mut OpusEncoder,
        pcm: *const OpusInt16,
        frame_size: c_int,
        data: *mut c_uchar,
        max_data_bytes: OpusInt32,
    ) -> OpusInt32;

    pub fn opus_encoder_ctl(enc: *mut OpusEncoder, request: c_int, ...) -> c_int;

    // Decoder
    pub fn opus_decoder_create(
        fs: OpusInt32,
        channels: c_int,
        error: *mut c_int,
    ) -> *mut OpusDecoder;

    pub fn opus_decoder_destroy(dec: *mut OpusDecoder);

    pub fn opus_decode(
        dec: *mut OpusDecoder,
        data: *const c_uchar,
        len: OpusInt32,
        pcm: *mut OpusInt16,
        frame_size: c_int,
        decode_fec: c_int,
    ) -> c_int;

    pub fn opus_decoder_ctl(dec: *mut OpusDecoder, request: c_int, ...) -> c_int;
}

/// Gets an error message for an opus error code.
#[cfg(feature = "libopus")]
pub fn error_string(error: c_int) -> String {
    unsafe {
        let c_str = opus_strerror(error);
        if c_str.is_null() {
            return format!("opus error {}", error);
        }
        std::ffi::CStr::from_ptr(c_str)
            .to_string_lossy()
            .into_owned()
    }
}
