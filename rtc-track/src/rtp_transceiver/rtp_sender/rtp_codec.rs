use std::fmt;

use serde::{Deserialize, Serialize};
use unicase::UniCase;

use crate::constants::UNSPECIFIED_STR;
use crate::peer_connection::configuration::media_engine::*;
use crate::rtp_transceiver::fmtp;
use crate::rtp_transceiver::rtp_sender::rtcp_parameters::RTCPFeedback;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use shared::error::{Error, Result};

/// Codec kind identifying the media type.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtpCodecKind {
    /// Unspecified or unknown codec type
    #[default]
    Unspecified = 0,

    /// Audio codec
    Audio = 1,

    /// Video codec
    Video = 2,
}

impl RtpCodecKind {
    /// Derives the kind from the top-level type of a mime type, e.g. `video/VP8`.
    pub fn from_mime_type(mime_type: &str) -> Self {
        match mime_type.split_once('/') {
            Some((top, _)) => RtpCodecKind::from(top.to_ascii_lowercase().as_str()),
            None => RtpCodecKind::Unspecified,
        }
    }
}

impl From<&str> for RtpCodecKind {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RtpCodecKind::Audio,
            "video" => RtpCodecKind::Video,
            _ => RtpCodecKind::Unspecified,
        }
    }
}

impl From<u8> for RtpCodecKind {
    fn from(v: u8) -> Self {
        match v {
            1 => RtpCodecKind::Audio,
            2 => RtpCodecKind::Video,
            _ => RtpCodecKind::Unspecified,
        }
    }
}

impl fmt::Display for RtpCodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RtpCodecKind::Audio => "audio",
            RtpCodecKind::Video => "video",
            RtpCodecKind::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// RTP codec capability providing information about supported codecs.
///
/// ## Specifications
///
/// * [W3C](https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpcodeccapability-members)
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpCodecCapability {
    /// MIME type of the codec (e.g., "video/VP8", "audio/opus")
    pub mime_type: String,
    /// Codec clock rate in Hz
    pub clock_rate: u32,
    /// Number of audio channels (0 for video codecs)
    pub channels: u16,
    /// Format-specific parameters as SDP fmtp line
    pub sdp_fmtp_line: String,
    /// RTCP feedback mechanisms supported by this codec
    pub rtcp_feedback: Vec<RTCPFeedback>,
}

impl RTCRtpCodecCapability {
    /// Creates an RTP payloader for this codec.
    ///
    /// Returns a boxed trait object implementing the Payloader interface
    /// for packetizing media frames into RTP packets.
    ///
    /// # Errors
    ///
    /// Returns `Error::ErrNoPayloaderForCodec` if the codec is not supported.
    pub fn payloader_for_codec(&self) -> Result<Box<dyn rtp::packetizer::Payloader + Send + Sync>> {
        let mime_type = UniCase::new(self.mime_type.as_str());
        if mime_type == UniCase::new(MIME_TYPE_H264) {
            Ok(Box::<rtp::codecs::h264::H264Payloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_VP8) {
            let mut vp8_payloader = rtp::codecs::vp8::Vp8Payloader::default();
            vp8_payloader.enable_picture_id = true;
            Ok(Box::new(vp8_payloader))
        } else if mime_type == UniCase::new(MIME_TYPE_VP9) {
            Ok(Box::<rtp::codecs::vp9::Vp9Payloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_OPUS) {
            Ok(Box::<rtp::codecs::opus::OpusPayloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_G722)
            || mime_type == UniCase::new(MIME_TYPE_PCMU)
            || mime_type == UniCase::new(MIME_TYPE_PCMA)
            || mime_type == UniCase::new(MIME_TYPE_TELEPHONE_EVENT)
        {
            Ok(Box::<rtp::codecs::g7xx::G7xxPayloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_AV1) {
            Ok(Box::<rtp::codecs::av1::Av1Payloader>::default())
        } else {
            Err(Error::ErrNoPayloaderForCodec)
        }
    }

    /// kind derived from the mime type
    pub fn kind(&self) -> RtpCodecKind {
        RtpCodecKind::from_mime_type(&self.mime_type)
    }
}

/// Codec match quality result from fuzzy search.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub(crate) enum CodecMatch {
    /// No match found
    #[default]
    None = 0,
    /// Partial match (MIME type matches)
    Partial = 1,
    /// Exact match (MIME type and format parameters match)
    Exact = 2,
}

/// Performs fuzzy search for a codec in a list of available codecs.
///
/// First attempts an exact match on both MIME type and format parameters,
/// then falls back to matching only the MIME type.
pub(crate) fn codec_parameters_fuzzy_search(
    needle: &RTCRtpCodecCapability,
    haystack: &[RTCRtpCodecParameters],
) -> (RTCRtpCodecParameters, CodecMatch) {
    let needle_fmtp = fmtp::parse(&needle.mime_type, &needle.sdp_fmtp_line);

    // First attempt to match on mime_type + sdp_fmtp_line
    for c in haystack {
        let cfmtp = fmtp::parse(&c.capability.mime_type, &c.capability.sdp_fmtp_line);
        if needle_fmtp.match_fmtp(&*cfmtp) {
            return (c.clone(), CodecMatch::Exact);
        }
    }

    // Fallback to just mime_type
    for c in haystack {
        if UniCase::new(c.capability.mime_type.as_str()) == UniCase::new(needle.mime_type.as_str()) {
            return (c.clone(), CodecMatch::Partial);
        }
    }

    (RTCRtpCodecParameters::default(), CodecMatch::None)
}

/// Computes the intersection of two RTCP feedback lists.
///
/// Returns feedback mechanisms that are supported by both lists,
/// matching on both type and parameter fields.
pub(crate) fn rtcp_feedback_intersection(
    a: &[RTCPFeedback],
    b: &[RTCPFeedback],
) -> Vec<RTCPFeedback> {
    let mut out = vec![];
    for a_feedback in a {
        for b_feedback in b {
            if a_feedback.typ == b_feedback.typ && a_feedback.parameter == b_feedback.parameter {
                out.push(a_feedback.clone());
                break;
            }
        }
    }

    out
}
