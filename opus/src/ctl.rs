//! Typed control requests.
//!
//! libopus tunes codec states through `opus_*_ctl(st, request, value)`.
//! Each request kind here carries its payload type, so a request id can
//! never be paired with a value of the wrong kind.

use std::os::raw::c_int;

use tracing::{debug, warn};

use crate::backend::Control;
use crate::config::{Bandwidth, Bitrate, DecoderConfig, EncoderConfig, FrameDuration, Signal};
use crate::error::{check, Result};
use crate::ffi;

/// A set request that can be sent to a codec state.
pub trait Request: std::fmt::Debug {
    /// Returns the libopus request id.
    fn id(&self) -> c_int;

    /// Returns the value passed with the request.
    fn value(&self) -> c_int;
}

/// Settable encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderRequest {
    Dtx(bool),
    InbandFec(bool),
    PredictionDisabled(bool),
    Vbr(bool),
    VbrConstraint(bool),
    PhaseInversionDisabled(bool),
    Bitrate(Bitrate),
    Complexity(i32),
    MaxBandwidth(Bandwidth),
    Bandwidth(Bandwidth),
    PacketLossPercent(i32),
    FrameDuration(FrameDuration),
    Signal(Signal),
    ForceChannels(i32),
    LsbDepth(i32),
}

impl Request for EncoderRequest {
    fn id(&self) -> c_int {
        match self {
            Self::Dtx(_) => ffi::OPUS_SET_DTX_REQUEST,
            Self::InbandFec(_) => ffi::OPUS_SET_INBAND_FEC_REQUEST,
            Self::PredictionDisabled(_) => ffi::OPUS_SET_PREDICTION_DISABLED_REQUEST,
            Self::Vbr(_) => ffi::OPUS_SET_VBR_REQUEST,
            Self::VbrConstraint(_) => ffi::OPUS_SET_VBR_CONSTRAINT_REQUEST,
            Self::PhaseInversionDisabled(_) => ffi::OPUS_SET_PHASE_INVERSION_DISABLED_REQUEST,
            Self::Bitrate(_) => ffi::OPUS_SET_BITRATE_REQUEST,
            Self::Complexity(_) => ffi::OPUS_SET_COMPLEXITY_REQUEST,
            Self::MaxBandwidth(_) => ffi::OPUS_SET_MAX_BANDWIDTH_REQUEST,
            Self::Bandwidth(_) => ffi::OPUS_SET_BANDWIDTH_REQUEST,
            Self::PacketLossPercent(_) => ffi::OPUS_SET_PACKET_LOSS_PERC_REQUEST,
            Self::FrameDuration(_) => ffi::OPUS_SET_EXPERT_FRAME_DURATION_REQUEST,
            Self::Signal(_) => ffi::OPUS_SET_SIGNAL_REQUEST,
            Self::ForceChannels(_) => ffi::OPUS_SET_FORCE_CHANNELS_REQUEST,
            Self::LsbDepth(_) => ffi::OPUS_SET_LSB_DEPTH_REQUEST,
        }
    }

    fn value(&self) -> c_int {
        match *self {
            Self::Dtx(on)
            | Self::InbandFec(on)
            | Self::PredictionDisabled(on)
            | Self::Vbr(on)
            | Self::VbrConstraint(on)
            | Self::PhaseInversionDisabled(on) => on as c_int,
            Self::Bitrate(b) => b.to_ffi(),
            Self::MaxBandwidth(bw) | Self::Bandwidth(bw) => bw.to_ffi(),
            Self::FrameDuration(fd) => fd.to_ffi(),
            Self::Signal(s) => s.to_ffi(),
            Self::Complexity(v)
            | Self::PacketLossPercent(v)
            | Self::ForceChannels(v)
            | Self::LsbDepth(v) => v,
        }
    }
}

/// Settable decoder parameters.
///
/// Inband FEC is not a decoder request in libopus; it is a per-call
/// decode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderRequest {
    Gain(i32),
}

impl Request for DecoderRequest {
    fn id(&self) -> c_int {
        match self {
            Self::Gain(_) => ffi::OPUS_SET_GAIN_REQUEST,
        }
    }

    fn value(&self) -> c_int {
        match *self {
            Self::Gain(v) => v,
        }
    }
}

/// Read-only encoder properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderQuery {
    /// Algorithmic delay in samples.
    Lookahead,
    /// Whether the encoder is currently in DTX.
    InDtx,
}

impl EncoderQuery {
    pub fn id(self) -> c_int {
        match self {
            Self::Lookahead => ffi::OPUS_GET_LOOKAHEAD_REQUEST,
            Self::InDtx => ffi::OPUS_GET_IN_DTX_REQUEST,
        }
    }
}

/// Read-only decoder properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderQuery {
    Gain,
    /// Duration in samples of the last decoded or concealed packet.
    LastPacketDuration,
}

impl DecoderQuery {
    pub fn id(self) -> c_int {
        match self {
            Self::Gain => ffi::OPUS_GET_GAIN_REQUEST,
            Self::LastPacketDuration => ffi::OPUS_GET_LAST_PACKET_DURATION_REQUEST,
        }
    }
}

impl EncoderConfig {
    /// Returns the requests needed to apply every set tunable.
    pub fn requests(&self) -> Vec<EncoderRequest> {
        let mut reqs = Vec::new();
        if self.enable_dtx {
            reqs.push(EncoderRequest::Dtx(true));
        }
        if self.enable_inband_fec {
            reqs.push(EncoderRequest::InbandFec(true));
        }
        if self.disable_prediction {
            reqs.push(EncoderRequest::PredictionDisabled(true));
        }
        if self.disable_vbr {
            reqs.push(EncoderRequest::Vbr(false));
        }
        if self.disable_constrained_vbr {
            reqs.push(EncoderRequest::VbrConstraint(false));
        }
        if self.disable_phase_inversion {
            reqs.push(EncoderRequest::PhaseInversionDisabled(true));
        }
        reqs.extend(self.bitrate.map(EncoderRequest::Bitrate));
        reqs.extend(self.complexity.map(EncoderRequest::Complexity));
        reqs.extend(self.max_bandwidth.map(EncoderRequest::MaxBandwidth));
        reqs.extend(self.bandwidth.map(EncoderRequest::Bandwidth));
        reqs.extend(self.packet_loss_percent.map(EncoderRequest::PacketLossPercent));
        reqs.extend(self.frame_duration.map(EncoderRequest::FrameDuration));
        reqs.extend(self.signal.map(EncoderRequest::Signal));
        reqs.extend(self.force_channels.map(EncoderRequest::ForceChannels));
        reqs.extend(self.lsb_depth.map(EncoderRequest::LsbDepth));
        reqs
    }
}

impl DecoderConfig {
    /// Returns the requests needed to apply every set tunable.
    pub fn requests(&self) -> Vec<DecoderRequest> {
        self.gain.map(DecoderRequest::Gain).into_iter().collect()
    }
}

/// Issues every request in order, stopping at the first failure.
pub fn apply<C, R>(st: &mut C, requests: &[R]) -> Result<()>
where
    C: Control + ?Sized,
    R: Request,
{
    for req in requests {
        let status = st.set(req.id(), req.value());
        if let Err(err) = check(status) {
            warn!("opus: control request {:?} failed: {}", req, err);
            return Err(err);
        }
    }
    Ok(())
}

/// Issues a get request.
pub fn query<C: Control + ?Sized>(st: &mut C, request: c_int) -> Result<c_int> {
    let mut value: c_int = 0;
    check(st.get(request, &mut value)).inspect_err(|err| {
        debug!("opus: get request {} failed: {}", request, err);
    })?;
    Ok(value)
}
