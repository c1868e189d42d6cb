//! Media engine: the per-kind codec registry of a peer connection.
//!
//! The media engine defines which codecs a peer connection can offer and accept,
//! and under which locally chosen payload type each one is numbered. After a
//! remote description has been applied it also holds the negotiated codecs,
//! always expressed with the *local* payload types.
//!
//! # Examples
//!
//! ```
//! use rtc_track::peer_connection::configuration::media_engine::{MediaEngine, MIME_TYPE_OPUS};
//! use rtc_track::rtp_transceiver::rtp_sender::rtp_codec::{RTCRtpCodecCapability, RtpCodecKind};
//! use rtc_track::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut media_engine = MediaEngine::default();
//!
//! media_engine.register_codec(
//!     RTCRtpCodecParameters {
//!         capability: RTCRtpCodecCapability {
//!             mime_type: MIME_TYPE_OPUS.to_owned(),
//!             clock_rate: 48000,
//!             channels: 2,
//!             sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
//!             rtcp_feedback: vec![],
//!         },
//!         payload_type: 111,
//!         ..Default::default()
//!     },
//!     RtpCodecKind::Audio,
//! )?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use log::{debug, trace};
use unicase::UniCase;

use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::rtp_transceiver::PayloadType;
use crate::rtp_transceiver::fmtp;
use crate::rtp_transceiver::rtp_sender::rtcp_parameters::*;
use crate::rtp_transceiver::rtp_sender::rtp_codec::{
    RTCRtpCodecCapability, RtpCodecKind, rtcp_feedback_intersection,
};
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use shared::error::{Error, Result};

/// H.264 video codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_H264: &str = "video/H264";

/// H.265/HEVC video codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_HEVC: &str = "video/H265";

/// Opus audio codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_OPUS: &str = "audio/opus";

/// VP8 video codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_VP8: &str = "video/VP8";

/// VP9 video codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_VP9: &str = "video/VP9";

/// AV1 video codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_AV1: &str = "video/AV1";

/// G.722 audio codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_G722: &str = "audio/G722";

/// PCMU (G.711 μ-law) audio codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";

/// PCMA (G.711 A-law) audio codec MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";

/// ULP FEC (Uneven Level Protection Forward Error Correction) MIME type.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_ULP_FEC: &str = "video/ulpfec";

/// Telephone-event MIME type for DTMF tones.
/// Note: MIME type matching is case-insensitive.
pub const MIME_TYPE_TELEPHONE_EVENT: &str = "audio/telephone-event";

/// A MediaEngine defines the codecs supported by a PeerConnection, and the
/// configuration of those codecs.
///
/// The engine handed to [`APIBuilder`](crate::api::APIBuilder) is frozen once the
/// API is built; every peer connection works on its own copy.
#[derive(Default, Debug, Clone)]
pub struct MediaEngine {
    // If we have attempted to negotiate a codec type yet.
    pub(crate) negotiated_video: bool,
    pub(crate) negotiated_audio: bool,

    pub(crate) video_codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) audio_codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) negotiated_video_codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) negotiated_audio_codecs: Vec<RTCRtpCodecParameters>,
}

impl MediaEngine {
    /// register_default_codecs registers the default codecs supported by WebRTC:
    /// Opus, G722, PCMU, PCMA, VP8, VP9, H264, AV1, H265 and ulpfec.
    pub fn register_default_codecs(&mut self) -> Result<()> {
        // Default Audio Codecs
        for (mime_type, clock_rate, channels, sdp_fmtp_line, payload_type) in [
            (MIME_TYPE_OPUS, 48000, 2, "minptime=10;useinbandfec=1", 111),
            (MIME_TYPE_G722, 8000, 0, "", 9),
            (MIME_TYPE_PCMU, 8000, 0, "", 0),
            (MIME_TYPE_PCMA, 8000, 0, "", 8),
        ] {
            self.register_codec(
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: mime_type.to_owned(),
                        clock_rate,
                        channels,
                        sdp_fmtp_line: sdp_fmtp_line.to_owned(),
                        rtcp_feedback: vec![],
                    },
                    payload_type,
                    ..Default::default()
                },
                RtpCodecKind::Audio,
            )?;
        }

        let video_rtcp_feedback = vec![
            RTCPFeedback {
                typ: TYPE_RTCP_FB_GOOG_REMB.to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: TYPE_RTCP_FB_CCM.to_owned(),
                parameter: "fir".to_owned(),
            },
            RTCPFeedback {
                typ: TYPE_RTCP_FB_NACK.to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: TYPE_RTCP_FB_NACK.to_owned(),
                parameter: "pli".to_owned(),
            },
        ];

        // Default Video Codecs
        for (mime_type, sdp_fmtp_line, payload_type) in [
            (MIME_TYPE_VP8, "", 96),
            (MIME_TYPE_VP9, "profile-id=0", 98),
            (MIME_TYPE_VP9, "profile-id=1", 100),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42001f",
                102,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=0;profile-level-id=42001f",
                127,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
                125,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=0;profile-level-id=42e01f",
                108,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=640032",
                123,
            ),
            (MIME_TYPE_AV1, "profile-id=0", 41),
            (MIME_TYPE_HEVC, "", 126),
        ] {
            self.register_codec(
                RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: mime_type.to_owned(),
                        clock_rate: 90000,
                        channels: 0,
                        sdp_fmtp_line: sdp_fmtp_line.to_owned(),
                        rtcp_feedback: video_rtcp_feedback.clone(),
                    },
                    payload_type,
                    ..Default::default()
                },
                RtpCodecKind::Video,
            )?;
        }

        self.register_codec(
            RTCRtpCodecParameters {
                capability: RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_ULP_FEC.to_owned(),
                    clock_rate: 90000,
                    ..Default::default()
                },
                payload_type: 116,
                ..Default::default()
            },
            RtpCodecKind::Video,
        )
    }

    /// Registers a codec under its payload type for the given kind.
    ///
    /// Registration order is preference order: when several registered codecs
    /// accept a remote codec, the earliest one wins.
    ///
    /// # Errors
    ///
    /// * `ErrUnknownType` if `typ` is neither audio nor video
    /// * `ErrCodecMimeTypeEmpty` if the codec has no mime type
    /// * `ErrCodecPayloadTypeInUse` if the payload type is already taken for this kind
    /// * `ErrCodecAlreadyRegistered` if the same mime type, clock rate, channels and
    ///   fmtp parameters are already registered for this kind
    pub fn register_codec(&mut self, codec: RTCRtpCodecParameters, typ: RtpCodecKind) -> Result<()> {
        let codecs = match typ {
            RtpCodecKind::Audio => &mut self.audio_codecs,
            RtpCodecKind::Video => &mut self.video_codecs,
            RtpCodecKind::Unspecified => return Err(Error::ErrUnknownType),
        };

        if codec.capability.mime_type.is_empty() {
            return Err(Error::ErrCodecMimeTypeEmpty);
        }

        for c in codecs.iter() {
            if c.payload_type == codec.payload_type {
                return Err(Error::ErrCodecPayloadTypeInUse(codec.payload_type));
            }
            if UniCase::new(c.capability.mime_type.as_str())
                == UniCase::new(codec.capability.mime_type.as_str())
                && c.capability.clock_rate == codec.capability.clock_rate
                && c.capability.channels == codec.capability.channels
                && fmtp::equivalent(&c.capability.sdp_fmtp_line, &codec.capability.sdp_fmtp_line)
            {
                return Err(Error::ErrCodecAlreadyRegistered);
            }
        }

        trace!(
            "register {} codec {} with payload type {}",
            typ, codec.capability.mime_type, codec.payload_type
        );
        codecs.push(codec);
        Ok(())
    }

    /// register_feedback adds feedback mechanism to already registered codecs.
    pub fn register_feedback(&mut self, feedback: RTCPFeedback, typ: RtpCodecKind) {
        match typ {
            RtpCodecKind::Video => {
                for v in &mut self.video_codecs {
                    v.capability.rtcp_feedback.push(feedback.clone());
                }
            }
            RtpCodecKind::Audio => {
                for a in &mut self.audio_codecs {
                    a.capability.rtcp_feedback.push(feedback.clone());
                }
            }
            RtpCodecKind::Unspecified => {}
        }
    }

    /// registered_codecs returns the codecs registered for a kind, in preference order
    pub fn registered_codecs(&self, typ: RtpCodecKind) -> &[RTCRtpCodecParameters] {
        match typ {
            RtpCodecKind::Audio => &self.audio_codecs,
            RtpCodecKind::Video => &self.video_codecs,
            RtpCodecKind::Unspecified => &[],
        }
    }

    /// match_codec finds the registered codec that accepts a remote codec.
    ///
    /// Mime types compare case-insensitively, clock rate and channels must be
    /// equal and the fmtp parameters must be compatible. The returned parameters
    /// carry the *local* payload type.
    pub fn match_codec(
        &self,
        remote: &RTCRtpCodecCapability,
        typ: RtpCodecKind,
    ) -> Option<RTCRtpCodecParameters> {
        let remote_fmtp = fmtp::parse(&remote.mime_type, &remote.sdp_fmtp_line);

        self.registered_codecs(typ)
            .iter()
            .find(|c| {
                c.capability.clock_rate == remote.clock_rate
                    && c.capability.channels == remote.channels
                    && fmtp::parse(&c.capability.mime_type, &c.capability.sdp_fmtp_line)
                        .match_fmtp(&*remote_fmtp)
            })
            .cloned()
    }

    /// get_codec_by_payload looks up a registered codec by its local payload type
    pub(crate) fn get_codec_by_payload(
        &self,
        payload_type: PayloadType,
        typ: RtpCodecKind,
    ) -> Result<RTCRtpCodecParameters> {
        self.registered_codecs(typ)
            .iter()
            .find(|c| c.payload_type == payload_type)
            .cloned()
            .ok_or(Error::ErrCodecNotFound)
    }

    /// clone_to copies any user modifiable state of the MediaEngine
    /// all internal state is reset
    pub(crate) fn clone_to(&self) -> Self {
        MediaEngine {
            video_codecs: self.video_codecs.clone(),
            audio_codecs: self.audio_codecs.clone(),
            ..Default::default()
        }
    }

    /// add_codec will append codec if its payload type is not present yet
    fn add_codec(codecs: &mut Vec<RTCRtpCodecParameters>, codec: RTCRtpCodecParameters) {
        if codecs.iter().all(|c| c.payload_type != codec.payload_type) {
            codecs.push(codec);
        }
    }

    pub(crate) fn push_codecs(&mut self, codecs: Vec<RTCRtpCodecParameters>, typ: RtpCodecKind) {
        for codec in codecs {
            if typ == RtpCodecKind::Audio {
                MediaEngine::add_codec(&mut self.negotiated_audio_codecs, codec);
            } else if typ == RtpCodecKind::Video {
                MediaEngine::add_codec(&mut self.negotiated_video_codecs, codec);
            }
        }
    }

    /// map_remote_codecs maps every remote payload type accepted by this engine to
    /// the local codec parameters it stands for.
    pub(crate) fn map_remote_codecs(
        &self,
        remote_codecs: &[RTCRtpCodecParameters],
        typ: RtpCodecKind,
    ) -> HashMap<PayloadType, RTCRtpCodecParameters> {
        remote_codecs
            .iter()
            .filter_map(|remote| {
                self.match_codec(&remote.capability, typ)
                    .map(|local| (remote.payload_type, local))
            })
            .collect()
    }

    /// Update the MediaEngine from a remote description.
    ///
    /// The first media section of each kind fixes the negotiated codecs of that
    /// kind: the local parameters of every remote codec this engine accepts, with
    /// RTCP feedback reduced to what both sides support.
    pub(crate) fn update_from_remote_description(
        &mut self,
        desc: &RTCSessionDescription,
    ) -> Result<()> {
        for media in &desc.media_sections {
            let typ = media.kind;
            let already_negotiated = match typ {
                RtpCodecKind::Audio => self.negotiated_audio,
                RtpCodecKind::Video => self.negotiated_video,
                RtpCodecKind::Unspecified => continue,
            };
            if already_negotiated {
                continue;
            }

            let mut matched = vec![];
            for remote in &media.codecs {
                if let Some(mut local) = self.match_codec(&remote.capability, typ) {
                    local.capability.rtcp_feedback = rtcp_feedback_intersection(
                        &local.capability.rtcp_feedback,
                        &remote.capability.rtcp_feedback,
                    );
                    trace!(
                        "remote {} payload type {} matched local payload type {}",
                        remote.capability.mime_type, remote.payload_type, local.payload_type
                    );
                    matched.push(local);
                }
            }

            if matched.is_empty() {
                debug!("no {typ} codecs in mid {} are supported locally", media.mid);
            }

            match typ {
                RtpCodecKind::Audio => self.negotiated_audio = true,
                RtpCodecKind::Video => self.negotiated_video = true,
                RtpCodecKind::Unspecified => {}
            }
            self.push_codecs(matched, typ);
        }

        Ok(())
    }

    /// get_codecs_by_kind returns the negotiated codecs of a kind once negotiation
    /// happened, and the registered ones before that.
    pub(crate) fn get_codecs_by_kind(&self, typ: RtpCodecKind) -> Vec<RTCRtpCodecParameters> {
        if typ == RtpCodecKind::Video {
            if self.negotiated_video {
                self.negotiated_video_codecs.clone()
            } else {
                self.video_codecs.clone()
            }
        } else if typ == RtpCodecKind::Audio {
            if self.negotiated_audio {
                self.negotiated_audio_codecs.clone()
            } else {
                self.audio_codecs.clone()
            }
        } else {
            vec![]
        }
    }
}
