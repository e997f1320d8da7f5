use std::os::raw::c_int;

use thiserror::Error;

use crate::ffi;

/// Errors returned by the Opus encoder and decoder.
///
/// Each variant except [`OpusError::Closed`] corresponds to exactly one
/// libopus status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OpusError {
    #[error("opus: one or more invalid arguments")]
    BadArg,

    #[error("opus: not enough bytes allocated in the buffer")]
    BufferTooSmall,

    /// An internal error, or a status code outside the documented set.
    /// The raw code is kept for diagnostics.
    #[error("opus: an internal error was detected (code {0})")]
    Internal(i32),

    #[error("opus: the compressed data passed is corrupted")]
    InvalidPacket,

    #[error("opus: invalid or unsupported request number")]
    Unimplemented,

    #[error("opus: an encoder or decoder structure is invalid or already freed")]
    InvalidState,

    #[error("opus: memory allocation has failed")]
    AllocFail,

    /// The operation was invoked on an encoder or decoder after `close`.
    #[error("opus: {0} is closed")]
    Closed(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OpusError>;

impl OpusError {
    /// Maps a negative libopus status code to an error.
    ///
    /// `OPUS_OK` and unknown codes both map to [`OpusError::Internal`];
    /// use [`check`] when the status may be OK.
    pub fn from_code(code: c_int) -> Self {
        match code {
            ffi::OPUS_BAD_ARG => Self::BadArg,
            ffi::OPUS_BUFFER_TOO_SMALL => Self::BufferTooSmall,
            ffi::OPUS_INVALID_PACKET => Self::InvalidPacket,
            ffi::OPUS_UNIMPLEMENTED => Self::Unimplemented,
            ffi::OPUS_INVALID_STATE => Self::InvalidState,
            ffi::OPUS_ALLOC_FAIL => Self::AllocFail,
            other => Self::Internal(other),
        }
    }

    /// Returns the libopus status code for this error.
    pub fn code(&self) -> c_int {
        match self {
            Self::BadArg => ffi::OPUS_BAD_ARG,
            Self::BufferTooSmall => ffi::OPUS_BUFFER_TOO_SMALL,
            Self::Internal(code) => *code,
            Self::InvalidPacket => ffi::OPUS_INVALID_PACKET,
            Self::Unimplemented => ffi::OPUS_UNIMPLEMENTED,
            Self::InvalidState | Self::Closed(_) => ffi::OPUS_INVALID_STATE,
            Self::AllocFail => ffi::OPUS_ALLOC_FAIL,
        }
    }
}

/// Classifies a libopus status code.
pub fn check(status: c_int) -> Result<()> {
    if status == ffi::OPUS_OK {
        Ok(())
    } else {
        Err(OpusError::from_code(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ok() {
        assert_eq!(check(ffi::OPUS_OK), Ok(()));
    }

    #[test]
    fn test_from_code_known() {
        assert_eq!(OpusError::from_code(-1), OpusError::BadArg);
        assert_eq!(OpusError::from_code(-2), OpusError::BufferTooSmall);
        assert_eq!(OpusError::from_code(-3), OpusError::Internal(-3));
        assert_eq!(OpusError::from_code(-4), OpusError::InvalidPacket);
        assert_eq!(OpusError::from_code(-5), OpusError::Unimplemented);
        assert_eq!(OpusError::from_code(-6), OpusError::InvalidState);
        assert_eq!(OpusError::from_code(-7), OpusError::AllocFail);
    }

    #[test]
    fn test_from_code_unknown_keeps_raw() {
        assert_eq!(check(-42), Err(OpusError::Internal(-42)));
        assert_eq!(OpusError::from_code(17).code(), 17);
    }

    #[test]
    fn test_code_round_trip() {
        for code in -7..=-1 {
            assert_eq!(OpusError::from_code(code).code(), code);
        }
        assert_eq!(OpusError::Closed("encoder").code(), ffi::OPUS_INVALID_STATE);
    }

    #[test]
    fn test_display() {
        let err = OpusError::BufferTooSmall;
        assert!(format!("{}", err).contains("not enough bytes"));

        let err = OpusError::Closed("decoder");
        assert_eq!(format!("{}", err), "opus: decoder is closed");

        let err = OpusError::Internal(-99);
        assert!(format!("{}", err).contains("-99"));
    }
}
