//! In-process stand-in for libopus.
//!
//! [`FakeBackend`] enforces the libopus argument contract (sample rates,
//! channel counts, request ranges, frame sizes, buffer limits) and emits
//! packets with well-formed TOC headers, but it does not compress audio:
//! every decoded frame is silence of the duration the packet announces.
//! It counts live states and records every control request so tests can
//! check resource accounting and request translation.

use std::collections::HashMap;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{holds_frame, Backend, Control, NativeDecoder, NativeEncoder};
use crate::config::SAMPLE_RATES;
use crate::ffi;
use crate::packet::{self, FrameCode, Toc};

/// Largest packet libopus produces for a single frame.
const MAX_FRAME_BYTES: usize = 1275;

/// Silence needed before the fake encoder enters DTX, in milliseconds.
const DTX_AFTER_MS: i32 = 200;

#[derive(Default)]
struct Shared {
    live_encoders: AtomicUsize,
    live_decoders: AtomicUsize,
    created: AtomicUsize,
    requests: Mutex<Vec<(c_int, c_int)>>,
    fail_request: Mutex<Option<(c_int, c_int)>>,
    fail_create: Mutex<Option<c_int>>,
}

impl Shared {
    fn injected(&self, request: c_int) -> Option<c_int> {
        match *self.fail_request.lock() {
            Some((id, status)) if id == request => Some(status),
            _ => None,
        }
    }
}

/// Fake codec backend. Clones share counters and the request journal.
#[derive(Clone, Default)]
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    /// Creates a backend with no injected faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every set request with id `request` fail with `status`.
    pub fn fail_request(self, request: c_int, status: c_int) -> Self {
        *self.shared.fail_request.lock() = Some((request, status));
        self
    }

    /// Makes every create call fail with `status`.
    pub fn fail_create(self, status: c_int) -> Self {
        *self.shared.fail_create.lock() = Some(status);
        self
    }

    /// Number of encoder states currently allocated.
    pub fn live_encoders(&self) -> usize {
        self.shared.live_encoders.load(Ordering::SeqCst)
    }

    /// Number of decoder states currently allocated.
    pub fn live_decoders(&self) -> usize {
        self.shared.live_decoders.load(Ordering::SeqCst)
    }

    /// Number of states ever allocated.
    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }

    /// Set requests accepted so far, as `(request, value)` pairs.
    pub fn requests(&self) -> Vec<(c_int, c_int)> {
        self.shared.requests.lock().clone()
    }

    fn check_format(&self, sample_rate: i32, channels: i32) -> Result<(), c_int> {
        if let Some(status) = *self.shared.fail_create.lock() {
            return Err(status);
        }
        if !SAMPLE_RATES.contains(&sample_rate) || !(1..=2).contains(&channels) {
            return Err(ffi::OPUS_BAD_ARG);
        }
        Ok(())
    }
}

impl Backend for FakeBackend {
    type Encoder = FakeEncoder;
    type Decoder = FakeDecoder;

    fn create_encoder(
        &self,
        sample_rate: i32,
        channels: i32,
        application: c_int,
    ) -> Result<FakeEncoder, c_int> {
        self.check_format(sample_rate, channels)?;
        if ![
            ffi::OPUS_APPLICATION_VOIP,
            ffi::OPUS_APPLICATION_AUDIO,
            ffi::OPUS_APPLICATION_RESTRICTED_LOWDELAY,
        ]
        .contains(&application)
        {
            return Err(ffi::OPUS_BAD_ARG);
        }
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        self.shared.live_encoders.fetch_add(1, Ordering::SeqCst);
        Ok(FakeEncoder {
            shared: self.shared.clone(),
            sample_rate,
            channels,
            application,
            settings: HashMap::new(),
            silent_samples: 0,
        })
    }

    fn create_decoder(&self, sample_rate: i32, channels: i32) -> Result<FakeDecoder, c_int> {
        self.check_format(sample_rate, channels)?;
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        self.shared.live_decoders.fetch_add(1, Ordering::SeqCst);
        Ok(FakeDecoder {
            shared: self.shared.clone(),
            sample_rate,
            channels,
            gain: 0,
            last_duration: 0,
        })
    }
}

/// Fake encoder state.
pub struct FakeEncoder {
    shared: Arc<Shared>,
    sample_rate: i32,
    channels: i32,
    application: c_int,
    settings: HashMap<c_int, c_int>,
    silent_samples: i32,
}

impl FakeEncoder {
    fn setting(&self, request: c_int) -> Option<c_int> {
        self.settings.get(&request).copied()
    }

    fn accepts(&self, request: c_int, value: c_int) -> Result<(), c_int> {
        let ok = match request {
            ffi::OPUS_SET_DTX_REQUEST
            | ffi::OPUS_SET_PREDICTION_DISABLED_REQUEST
            | ffi::OPUS_SET_VBR_REQUEST
            | ffi::OPUS_SET_VBR_CONSTRAINT_REQUEST
            | ffi::OPUS_SET_PHASE_INVERSION_DISABLED_REQUEST => (0..=1).contains(&value),
            ffi::OPUS_SET_INBAND_FEC_REQUEST => (0..=2).contains(&value),
            ffi::OPUS_SET_BITRATE_REQUEST => {
                value == ffi::OPUS_AUTO || value == ffi::OPUS_BITRATE_MAX || value > 0
            }
            ffi::OPUS_SET_COMPLEXITY_REQUEST => (0..=10).contains(&value),
            ffi::OPUS_SET_MAX_BANDWIDTH_REQUEST => {
                (ffi::OPUS_BANDWIDTH_NARROWBAND..=ffi::OPUS_BANDWIDTH_FULLBAND).contains(&value)
            }
            ffi::OPUS_SET_BANDWIDTH_REQUEST => {
                value == ffi::OPUS_AUTO
                    || (ffi::OPUS_BANDWIDTH_NARROWBAND..=ffi::OPUS_BANDWIDTH_FULLBAND)
                        .contains(&value)
            }
            ffi::OPUS_SET_PACKET_LOSS_PERC_REQUEST => (0..=100).contains(&value),
            ffi::OPUS_SET_EXPERT_FRAME_DURATION_REQUEST => {
                (ffi::OPUS_FRAMESIZE_ARG..=ffi::OPUS_FRAMESIZE_120_MS).contains(&value)
            }
            ffi::OPUS_SET_SIGNAL_REQUEST => {
                value == ffi::OPUS_AUTO
                    || value == ffi::OPUS_SIGNAL_VOICE
                    || value == ffi::OPUS_SIGNAL_MUSIC
            }
            ffi::OPUS_SET_FORCE_CHANNELS_REQUEST => {
                value == ffi::OPUS_AUTO || (1..=self.channels).contains(&value)
            }
            ffi::OPUS_SET_LSB_DEPTH_REQUEST => (8..=24).contains(&value),
            _ => return Err(ffi::OPUS_UNIMPLEMENTED),
        };
        if ok { Ok(()) } else { Err(ffi::OPUS_BAD_ARG) }
    }

    /// Frame size after applying the expert frame duration, or `None`
    /// when the argument is not a valid Opus frame size.
    fn effective_frame_size(&self, frame_size: c_int) -> Option<c_int> {
        let unit = self.sample_rate / 400;
        let selected = match self.setting(ffi::OPUS_SET_EXPERT_FRAME_DURATION_REQUEST) {
            None | Some(ffi::OPUS_FRAMESIZE_ARG) => frame_size,
            Some(v) if v <= ffi::OPUS_FRAMESIZE_60_MS => {
                (unit << (v - ffi::OPUS_FRAMESIZE_2_5_MS)).min(self.sample_rate * 3 / 50)
            }
            Some(v) => (v - ffi::OPUS_FRAMESIZE_2_5_MS - 2) * self.sample_rate / 50,
        };
        if selected > frame_size {
            return None;
        }
        let valid = [1, 2, 4, 8, 16, 24, 32, 40, 48]
            .iter()
            .any(|&n| selected == unit * n);
        valid.then_some(selected)
    }

    fn target_bitrate(&self, frame_size: c_int) -> i64 {
        let fs = self.sample_rate as i64;
        match self.setting(ffi::OPUS_SET_BITRATE_REQUEST) {
            Some(ffi::OPUS_BITRATE_MAX) => 512_000 * self.channels as i64,
            Some(bps) if bps > 0 => bps as i64,
            _ => 60 * fs / frame_size as i64 + fs * self.channels as i64,
        }
    }

    fn in_dtx(&self) -> bool {
        self.setting(ffi::OPUS_SET_DTX_REQUEST) == Some(1)
            && self.silent_samples >= self.sample_rate / 1000 * DTX_AFTER_MS
    }

    /// TOC byte plus an optional frame count byte for `frame_size` samples.
    fn header(&self, frame_size: c_int) -> Vec<u8> {
        let stereo = match self.setting(ffi::OPUS_SET_FORCE_CHANNELS_REQUEST) {
            Some(1) => false,
            Some(2) => true,
            _ => self.channels == 2,
        };
        let units = frame_size / (self.sample_rate / 400);
        // CELT fullband for up to 20ms, SILK wideband for 40/60ms, and
        // repeated 20ms CELT frames beyond that.
        match units {
            1 => vec![Toc::from_parts(28, stereo, FrameCode::One).0],
            2 => vec![Toc::from_parts(29, stereo, FrameCode::One).0],
            4 => vec![Toc::from_parts(30, stereo, FrameCode::One).0],
            8 => vec![Toc::from_parts(31, stereo, FrameCode::One).0],
            16 => vec![Toc::from_parts(10, stereo, FrameCode::One).0],
            24 => vec![Toc::from_parts(11, stereo, FrameCode::One).0],
            n => vec![
                Toc::from_parts(31, stereo, FrameCode::Arbitrary).0,
                (n / 8) as u8,
            ],
        }
    }
}

impl Control for FakeEncoder {
    fn set(&mut self, request: c_int, value: c_int) -> c_int {
        if let Some(status) = self.shared.injected(request) {
            return status;
        }
        if let Err(status) = self.accepts(request, value) {
            return status;
        }
        self.settings.insert(request, value);
        self.shared.requests.lock().push((request, value));
        ffi::OPUS_OK
    }

    fn get(&mut self, request: c_int, value: &mut c_int) -> c_int {
        match request {
            ffi::OPUS_GET_LOOKAHEAD_REQUEST => {
                let mut lookahead = self.sample_rate / 400;
                if self.application != ffi::OPUS_APPLICATION_RESTRICTED_LOWDELAY {
                    lookahead += self.sample_rate / 250;
                }
                *value = lookahead;
            }
            ffi::OPUS_GET_IN_DTX_REQUEST => *value = self.in_dtx() as c_int,
            _ => return ffi::OPUS_UNIMPLEMENTED,
        }
        ffi::OPUS_OK
    }
}

impl NativeEncoder for FakeEncoder {
    fn encode(&mut self, pcm: &[i16], frame_size: c_int, out: &mut [u8]) -> c_int {
        if out.is_empty() || !holds_frame(pcm.len(), frame_size, self.channels) {
            return ffi::OPUS_BAD_ARG;
        }
        let Some(frame_size) = self.effective_frame_size(frame_size) else {
            return ffi::OPUS_BAD_ARG;
        };

        let used = &pcm[..(frame_size * self.channels) as usize];
        if used.iter().all(|&s| s == 0) {
            self.silent_samples = self.silent_samples.saturating_add(frame_size);
        } else {
            self.silent_samples = 0;
        }

        let header = self.header(frame_size);
        let len = if self.in_dtx() {
            header.len()
        } else {
            let frames = (frame_size / (self.sample_rate / 50)).max(1) as usize;
            let target = self.target_bitrate(frame_size) * frame_size as i64
                / self.sample_rate as i64
                / 8;
            let target = (target.max(0) as usize).clamp(header.len() + 1, MAX_FRAME_BYTES * frames);
            if out.len() < header.len() + 1 {
                return ffi::OPUS_BUFFER_TOO_SMALL;
            }
            target.min(out.len())
        };
        if out.len() < len {
            return ffi::OPUS_BUFFER_TOO_SMALL;
        }

        out[..header.len()].copy_from_slice(&header);
        out[header.len()..len].fill(0);
        len as c_int
    }
}

impl Drop for FakeEncoder {
    fn drop(&mut self) {
        self.shared.live_encoders.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fake decoder state.
pub struct FakeDecoder {
    shared: Arc<Shared>,
    sample_rate: i32,
    channels: i32,
    gain: c_int,
    last_duration: c_int,
}

impl Control for FakeDecoder {
    fn set(&mut self, request: c_int, value: c_int) -> c_int {
        if let Some(status) = self.shared.injected(request) {
            return status;
        }
        match request {
            ffi::OPUS_SET_GAIN_REQUEST => {
                if !(-32768..=32767).contains(&value) {
                    return ffi::OPUS_BAD_ARG;
                }
                self.gain = value;
            }
            _ => return ffi::OPUS_UNIMPLEMENTED,
        }
        self.shared.requests.lock().push((request, value));
        ffi::OPUS_OK
    }

    fn get(&mut self, request: c_int, value: &mut c_int) -> c_int {
        match request {
            ffi::OPUS_GET_GAIN_REQUEST => *value = self.gain,
            ffi::OPUS_GET_LAST_PACKET_DURATION_REQUEST => *value = self.last_duration,
            _ => return ffi::OPUS_UNIMPLEMENTED,
        }
        ffi::OPUS_OK
    }
}

impl NativeDecoder for FakeDecoder {
    fn decode(&mut self, packet: &[u8], pcm: &mut [i16], frame_size: c_int, fec: bool) -> c_int {
        if !holds_frame(pcm.len(), frame_size, self.channels) {
            return ffi::OPUS_BAD_ARG;
        }
        if (fec || packet.is_empty()) && frame_size % (self.sample_rate / 400) != 0 {
            return ffi::OPUS_BAD_ARG;
        }

        let n = if packet.is_empty() {
            frame_size
        } else {
            let samples = match packet::samples(packet, self.sample_rate) {
                Ok(0) => return ffi::OPUS_INVALID_PACKET,
                Ok(n) => n as c_int,
                Err(err) => return err.code(),
            };
            if Toc(packet[0]).frame_code() == FrameCode::TwoEqual && (packet.len() - 1) % 2 != 0 {
                return ffi::OPUS_INVALID_PACKET;
            }
            if fec {
                // Recovery conceals up to the redundant frame and fills the
                // whole request.
                frame_size
            } else if samples > frame_size {
                return ffi::OPUS_BUFFER_TOO_SMALL;
            } else {
                samples
            }
        };

        pcm[..(n * self.channels) as usize].fill(0);
        self.last_duration = n;
        n
    }
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        self.shared.live_decoders.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_bad_format() {
        let b = FakeBackend::new();
        assert!(matches!(
            b.create_encoder(44100, 2, ffi::OPUS_APPLICATION_AUDIO),
            Err(ffi::OPUS_BAD_ARG)
        ));
        assert!(matches!(
            b.create_encoder(48000, 3, ffi::OPUS_APPLICATION_AUDIO),
            Err(ffi::OPUS_BAD_ARG)
        ));
        assert!(matches!(b.create_encoder(48000, 2, 1234), Err(ffi::OPUS_BAD_ARG)));
        assert!(matches!(b.create_decoder(48000, 0), Err(ffi::OPUS_BAD_ARG)));
        assert_eq!(b.created(), 0);
    }

    #[test]
    fn test_live_counts() {
        let b = FakeBackend::new();
        let enc = b.create_encoder(48000, 2, ffi::OPUS_APPLICATION_AUDIO).ok();
        let dec = b.create_decoder(16000, 1).ok();
        assert_eq!(b.live_encoders(), 1);
        assert_eq!(b.live_decoders(), 1);
        drop(enc);
        drop(dec);
        assert_eq!(b.live_encoders(), 0);
        assert_eq!(b.live_decoders(), 0);
        assert_eq!(b.created(), 2);
    }

    #[test]
    fn test_encoder_set_ranges() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(48000, 1, ffi::OPUS_APPLICATION_VOIP).unwrap();
        assert_eq!(enc.set(ffi::OPUS_SET_COMPLEXITY_REQUEST, 11), ffi::OPUS_BAD_ARG);
        assert_eq!(enc.set(ffi::OPUS_SET_COMPLEXITY_REQUEST, 10), ffi::OPUS_OK);
        assert_eq!(enc.set(ffi::OPUS_SET_FORCE_CHANNELS_REQUEST, 2), ffi::OPUS_BAD_ARG);
        assert_eq!(enc.set(ffi::OPUS_SET_GAIN_REQUEST, 0), ffi::OPUS_UNIMPLEMENTED);
        assert_eq!(b.requests(), vec![(ffi::OPUS_SET_COMPLEXITY_REQUEST, 10)]);
    }

    #[test]
    fn test_encode_frame_sizes() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(48000, 1, ffi::OPUS_APPLICATION_AUDIO).unwrap();
        let pcm = vec![0i16; 5760];
        let mut out = vec![0u8; 4000];
        for fs in [120, 240, 480, 960, 1920, 2880, 3840, 4800, 5760] {
            let n = enc.encode(&pcm, fs, &mut out);
            assert!(n > 0, "frame size {} returned {}", fs, n);
            let samples = packet::samples(&out[..n as usize], 48000).unwrap();
            assert_eq!(samples, fs as usize);
        }
        assert_eq!(enc.encode(&pcm, 100, &mut out), ffi::OPUS_BAD_ARG);
    }

    #[test]
    fn test_encode_expert_duration() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(48000, 1, ffi::OPUS_APPLICATION_AUDIO).unwrap();
        enc.set(ffi::OPUS_SET_EXPERT_FRAME_DURATION_REQUEST, ffi::OPUS_FRAMESIZE_10_MS);
        let pcm = vec![0i16; 960];
        let mut out = vec![0u8; 4000];
        let n = enc.encode(&pcm, 960, &mut out);
        assert_eq!(packet::samples(&out[..n as usize], 48000), Ok(480));
        assert_eq!(enc.encode(&pcm, 240, &mut out), ffi::OPUS_BAD_ARG);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(16000, 1, ffi::OPUS_APPLICATION_VOIP).unwrap();
        let pcm = vec![1i16; 320];
        let mut out = [0u8; 1];
        assert_eq!(enc.encode(&pcm, 320, &mut out), ffi::OPUS_BUFFER_TOO_SMALL);
    }

    #[test]
    fn test_dtx_after_silence() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(16000, 1, ffi::OPUS_APPLICATION_VOIP).unwrap();
        enc.set(ffi::OPUS_SET_DTX_REQUEST, 1);
        let silence = vec![0i16; 320];
        let mut out = vec![0u8; 1000];
        let mut in_dtx = 0;
        for _ in 0..9 {
            enc.encode(&silence, 320, &mut out);
            enc.get(ffi::OPUS_GET_IN_DTX_REQUEST, &mut in_dtx);
            assert_eq!(in_dtx, 0);
        }
        assert_eq!(enc.encode(&silence, 320, &mut out), 1);
        enc.get(ffi::OPUS_GET_IN_DTX_REQUEST, &mut in_dtx);
        assert_eq!(in_dtx, 1);
    }

    #[test]
    fn test_decode_plc_requires_2_5ms_multiple() {
        let b = FakeBackend::new();
        let mut dec = b.create_decoder(48000, 1).unwrap();
        let mut pcm = vec![0i16; 2048];
        assert_eq!(dec.decode(&[], &mut pcm, 2048, false), ffi::OPUS_BAD_ARG);
        assert_eq!(dec.decode(&[], &mut pcm, 1920, false), 1920);
    }

    #[test]
    fn test_decode_packet() {
        let b = FakeBackend::new();
        let mut dec = b.create_decoder(48000, 1).unwrap();
        let mut pcm = vec![7i16; 2048];
        assert_eq!(dec.decode(&[0xEC, 0xFF, 0xFE], &mut pcm, 2048, false), 240);
        assert!(pcm[..240].iter().all(|&s| s == 0));
        assert_eq!(dec.decode(&[0xEC], &mut pcm, 100, false), ffi::OPUS_BUFFER_TOO_SMALL);
        assert_eq!(dec.decode(&[0x4B], &mut pcm, 2048, false), ffi::OPUS_INVALID_PACKET);
        assert_eq!(dec.decode(&[0x49, 0x00], &mut pcm, 2048, false), ffi::OPUS_INVALID_PACKET);
    }

    #[test]
    fn test_decode_fec_fills_frame() {
        let b = FakeBackend::new();
        let mut dec = b.create_decoder(48000, 1).unwrap();
        let mut pcm = vec![7i16; 2048];
        assert_eq!(dec.decode(&[0xEC, 0xFF, 0xFE], &mut pcm, 1920, true), 1920);
        assert!(pcm[..1920].iter().all(|&s| s == 0));
        let mut duration = 0;
        dec.get(ffi::OPUS_GET_LAST_PACKET_DURATION_REQUEST, &mut duration);
        assert_eq!(duration, 1920);
        assert_eq!(dec.decode(&[0x4B], &mut pcm, 1920, true), ffi::OPUS_INVALID_PACKET);
    }

    #[test]
    fn test_short_slices_are_rejected() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(48000, 2, ffi::OPUS_APPLICATION_AUDIO).unwrap();
        let mut dec = b.create_decoder(48000, 2).unwrap();
        let mut out = vec![0u8; 4000];
        assert_eq!(enc.encode(&[], 960, &mut out), ffi::OPUS_BAD_ARG);
        assert_eq!(enc.encode(&[0i16; 960], 960, &mut out), ffi::OPUS_BAD_ARG);
        let mut pcm = vec![0i16; 960];
        assert_eq!(dec.decode(&[0xEC], &mut pcm, 960, false), ffi::OPUS_BAD_ARG);
        assert_eq!(dec.decode(&[], &mut [], 120, false), ffi::OPUS_BAD_ARG);
    }

    #[test]
    fn test_get_ids_are_not_set_requests() {
        let b = FakeBackend::new();
        let mut enc = b.create_encoder(48000, 2, ffi::OPUS_APPLICATION_AUDIO).unwrap();
        let mut dec = b.create_decoder(48000, 2).unwrap();
        assert_eq!(enc.set(ffi::OPUS_GET_LOOKAHEAD_REQUEST, 0x10), ffi::OPUS_UNIMPLEMENTED);
        assert_eq!(dec.set(ffi::OPUS_GET_GAIN_REQUEST, 0x10), ffi::OPUS_UNIMPLEMENTED);
        let mut value = 0;
        assert_eq!(enc.get(ffi::OPUS_SET_BITRATE_REQUEST, &mut value), ffi::OPUS_UNIMPLEMENTED);
        assert!(b.requests().is_empty());
    }
}
