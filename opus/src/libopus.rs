//! libopus backend.
//!
//! The handles here are the only place raw pointers cross into C, so each
//! call validates its arguments first: slices must cover `frame_size`
//! samples per channel, and ctl ids must be known requests of the right
//! direction. Anything else is answered with a status code.

use std::os::raw::c_int;
use std::ptr;

use tracing::debug;

use crate::backend::{holds_frame, Backend, Control, NativeDecoder, NativeEncoder};
use crate::ffi;

/// Backend that allocates real libopus states.
#[derive(Debug, Clone, Copy, Default)]
pub struct Libopus;

impl Backend for Libopus {
    type Encoder = LibopusEncoder;
    type Decoder = LibopusDecoder;

    fn create_encoder(
        &self,
        sample_rate: i32,
        channels: i32,
        application: c_int,
    ) -> Result<LibopusEncoder, c_int> {
        let mut error: c_int = ffi::OPUS_OK;
        let handle =
            unsafe { ffi::opus_encoder_create(sample_rate, channels, application, &mut error) };
        // Owning the handle first releases it on every exit path below.
        let enc = LibopusEncoder { handle, channels };
        if error != ffi::OPUS_OK {
            debug!("opus: opus_encoder_create: {}", ffi::error_string(error));
            return Err(error);
        }
        if enc.handle.is_null() {
            return Err(ffi::OPUS_ALLOC_FAIL);
        }
        Ok(enc)
    }

    fn create_decoder(&self, sample_rate: i32, channels: i32) -> Result<LibopusDecoder, c_int> {
        let mut error: c_int = ffi::OPUS_OK;
        let handle = unsafe { ffi::opus_decoder_create(sample_rate, channels, &mut error) };
        let dec = LibopusDecoder { handle, channels };
        if error != ffi::OPUS_OK {
            debug!("opus: opus_decoder_create: {}", ffi::error_string(error));
            return Err(error);
        }
        if dec.handle.is_null() {
            return Err(ffi::OPUS_ALLOC_FAIL);
        }
        Ok(dec)
    }
}

/// Owned `OpusEncoder*`.
pub struct LibopusEncoder {
    handle: *mut ffi::OpusEncoder,
    channels: i32,
}

// Safety: the handle is owned exclusively and never shared across threads.
unsafe impl Send for LibopusEncoder {}

impl Drop for LibopusEncoder {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { ffi::opus_encoder_destroy(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}

impl Control for LibopusEncoder {
    fn set(&mut self, request: c_int, value: c_int) -> c_int {
        if !ffi::ENCODER_SET_REQUESTS.contains(&request) {
            return ffi::OPUS_UNIMPLEMENTED;
        }
        unsafe { ffi::opus_encoder_ctl(self.handle, request, value) }
    }

    fn get(&mut self, request: c_int, value: &mut c_int) -> c_int {
        if !ffi::ENCODER_GET_REQUESTS.contains(&request) {
            return ffi::OPUS_UNIMPLEMENTED;
        }
        unsafe { ffi::opus_encoder_ctl(self.handle, request, value as *mut c_int) }
    }
}

impl NativeEncoder for LibopusEncoder {
    fn encode(&mut self, pcm: &[i16], frame_size: c_int, out: &mut [u8]) -> c_int {
        if out.is_empty() || !holds_frame(pcm.len(), frame_size, self.channels) {
            return ffi::OPUS_BAD_ARG;
        }
        unsafe {
            ffi::opus_encode(
                self.handle,
                pcm.as_ptr(),
                frame_size,
                out.as_mut_ptr(),
                out.len().min(i32::MAX as usize) as i32,
            )
        }
    }
}

/// Owned `OpusDecoder*`.
pub struct LibopusDecoder {
    handle: *mut ffi::OpusDecoder,
    channels: i32,
}

// Safety: the handle is owned exclusively and never shared across threads.
unsafe impl Send for LibopusDecoder {}

impl Drop for LibopusDecoder {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { ffi::opus_decoder_destroy(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}

impl Control for LibopusDecoder {
    fn set(&mut self, request: c_int, value: c_int) -> c_int {
        if !ffi::DECODER_SET_REQUESTS.contains(&request) {
            return ffi::OPUS_UNIMPLEMENTED;
        }
        unsafe { ffi::opus_decoder_ctl(self.handle, request, value) }
    }

    fn get(&mut self, request: c_int, value: &mut c_int) -> c_int {
        if !ffi::DECODER_GET_REQUESTS.contains(&request) {
            return ffi::OPUS_UNIMPLEMENTED;
        }
        unsafe { ffi::opus_decoder_ctl(self.handle, request, value as *mut c_int) }
    }
}

impl NativeDecoder for LibopusDecoder {
    fn decode(&mut self, packet: &[u8], pcm: &mut [i16], frame_size: c_int, fec: bool) -> c_int {
        if !holds_frame(pcm.len(), frame_size, self.channels) {
            return ffi::OPUS_BAD_ARG;
        }
        // libopus treats a NULL packet as a loss.
        let (data, len) = if packet.is_empty() {
            (ptr::null(), 0)
        } else {
            (packet.as_ptr(), packet.len().min(i32::MAX as usize) as i32)
        };
        unsafe {
            ffi::opus_decode(
                self.handle,
                data,
                len,
                pcm.as_mut_ptr(),
                frame_size,
                fec as c_int,
            )
        }
    }
}
