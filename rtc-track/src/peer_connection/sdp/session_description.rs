use std::fmt;

use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;
use crate::rtp_transceiver::SSRC;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::rtp_sender::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use shared::error::{Error, Result};

/// Represents a session description in the offer/answer model.
///
/// Instead of SDP text a description carries its media sections as structured
/// values. It travels over the signaling channel as JSON:
///
/// ```
/// use rtc_track::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let offer = RTCSessionDescription {
///     sdp_type: RTCSdpType::Offer,
///     ..Default::default()
/// };
///
/// let json = offer.to_json()?;
/// let received = RTCSessionDescription::from_json(&json)?;
/// assert_eq!(received, offer);
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    /// The type of this session description (offer, answer or rollback).
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    /// Identifies the session of the peer connection that created the description.
    #[serde(default)]
    pub session_id: String,

    /// Transport endpoint the remote peer delivers media to.
    #[serde(default)]
    pub transport_id: String,

    /// One section per transceiver, in mid order.
    #[serde(default)]
    pub media_sections: Vec<RTCMediaSection>,
}

/// One negotiated media line: a transceiver's mid, kind, direction and codecs.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCMediaSection {
    pub mid: String,
    pub kind: RtpCodecKind,
    pub direction: RTCRtpTransceiverDirection,
    /// Codecs in preference order, numbered with the creator's payload types.
    pub codecs: Vec<RTCRtpCodecParameters>,
    /// A rejected section carries no media in either direction.
    #[serde(default)]
    pub rejected: bool,
    /// The stream sent in this section, if the creator sends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<RTCMediaStreamInfo>,
}

/// Identifies the stream a sender transmits in a media section.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCMediaStreamInfo {
    pub ssrc: SSRC,
    pub stream_id: String,
    pub track_id: String,
}

impl fmt::Display for RTCSessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type: {}", self.sdp_type)?;
        for m in &self.media_sections {
            let codecs: Vec<String> = m
                .codecs
                .iter()
                .map(|c| format!("{}/{}", c.payload_type, c.capability.mime_type))
                .collect();
            write!(
                f,
                "\nmid {} {} {}{}: [{}]",
                m.mid,
                m.kind,
                m.direction,
                if m.rejected { " rejected" } else { "" },
                codecs.join(", ")
            )?;
        }
        Ok(())
    }
}

impl RTCSessionDescription {
    /// to_json serializes the description for the signaling channel
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::SessionDescription(e.to_string()))
    }

    /// from_json parses a description received over the signaling channel
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::SessionDescription(e.to_string()))
    }

    pub(crate) fn media_section(&self, mid: &str) -> Option<&RTCMediaSection> {
        self.media_sections.iter().find(|m| m.mid == mid)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rtp_transceiver::rtp_sender::rtp_codec::RTCRtpCodecCapability;

    #[test]
    fn test_session_description_json() -> Result<()> {
        let tests = vec![
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Offer,
                    ..Default::default()
                },
                r#"{"type":"offer","session_id":"","transport_id":"","media_sections":[]}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Answer,
                    ..Default::default()
                },
                r#"{"type":"answer","session_id":"","transport_id":"","media_sections":[]}"#,
            ),
            (
                RTCSessionDescription {
                    sdp_type: RTCSdpType::Rollback,
                    ..Default::default()
                },
                r#"{"type":"rollback","session_id":"","transport_id":"","media_sections":[]}"#,
            ),
            (
                RTCSessionDescription::default(),
                r#"{"type":"Unspecified","session_id":"","transport_id":"","media_sections":[]}"#,
            ),
        ];

        for (desc, expected_string) in tests {
            let desc_data = desc.to_json()?;
            assert_eq!(desc_data, expected_string, "string is not expected");

            let sd = RTCSessionDescription::from_json(&desc_data)?;
            assert_eq!(sd, desc);
        }

        Ok(())
    }

    #[test]
    fn test_session_description_media_sections_json() -> Result<()> {
        let desc = RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            session_id: "session".to_owned(),
            transport_id: "transport".to_owned(),
            media_sections: vec![RTCMediaSection {
                mid: "0".to_owned(),
                kind: RtpCodecKind::Video,
                direction: RTCRtpTransceiverDirection::Sendrecv,
                codecs: vec![RTCRtpCodecParameters {
                    capability: RTCRtpCodecCapability {
                        mime_type: "video/VP8".to_owned(),
                        clock_rate: 90000,
                        ..Default::default()
                    },
                    payload_type: 100,
                    ..Default::default()
                }],
                rejected: false,
                stream: Some(RTCMediaStreamInfo {
                    ssrc: 1234,
                    stream_id: "webrtc-rs".to_owned(),
                    track_id: "video".to_owned(),
                }),
            }],
        };

        let json = desc.to_json()?;
        assert!(json.contains(r#""kind":"video""#));
        assert!(json.contains(r#""direction":"sendrecv""#));
        assert_eq!(RTCSessionDescription::from_json(&json)?, desc);
        assert!(desc.media_section("0").is_some());
        assert!(desc.media_section("1").is_none());

        assert!(matches!(
            RTCSessionDescription::from_json("{"),
            Err(Error::SessionDescription(_))
        ));

        Ok(())
    }

    #[test]
    fn test_session_description_display() {
        let desc = RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            media_sections: vec![RTCMediaSection {
                mid: "0".to_owned(),
                kind: RtpCodecKind::Video,
                direction: RTCRtpTransceiverDirection::Recvonly,
                rejected: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(desc.to_string(), "type: answer\nmid 0 video recvonly rejected: []");
    }
}
