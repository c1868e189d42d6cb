use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::rtp_transceiver::rtp_sender::rtp_codec::*;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use shared::error::{Error, Result};

pub mod direction;
pub(crate) mod fmtp;
pub mod rtp_receiver;
pub mod rtp_sender;

/// SSRC represents a synchronization source
/// A synchronization source is a randomly chosen
/// value meant to be globally unique within a particular
/// RTP session. Used to identify a single stream of media.
/// <https://tools.ietf.org/html/rfc3550#section-3>
#[allow(clippy::upper_case_acronyms)]
pub type SSRC = u32;

/// PayloadType identifies the format of the RTP payload and determines
/// its interpretation by the application. Each codec in a RTP Session
/// will have a different payload_type
/// <https://tools.ietf.org/html/rfc3550#section-3>
pub type PayloadType = u8;

pub type RTCRtpTransceiverId = usize;

/// RTPTransceiverInit dictionary is used when calling the WebRTC function addTransceiver() to provide configuration options for the new transceiver.
#[derive(Default, Debug, Clone)]
pub struct RTCRtpTransceiverInit {
    pub direction: RTCRtpTransceiverDirection,
}

/// RTPTransceiver represents a combination of an RTPSender and an RTPReceiver that share a common mid.
pub(crate) struct RTCRtpTransceiver {
    id: RTCRtpTransceiverId,
    mid: Option<String>,
    kind: RtpCodecKind,
    sender: Option<Arc<RTCRtpSender>>,
    receiver: Arc<RTCRtpReceiver>,
    direction: RTCRtpTransceiverDirection,
    current_direction: RTCRtpTransceiverDirection,
    stopped: bool,
}

impl fmt::Debug for RTCRtpTransceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpTransceiver")
            .field("id", &self.id)
            .field("mid", &self.mid)
            .field("kind", &self.kind)
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("direction", &self.direction)
            .field("current_direction", &self.current_direction)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl RTCRtpTransceiver {
    pub(crate) fn new(
        id: RTCRtpTransceiverId,
        kind: RtpCodecKind,
        sender: Option<Arc<RTCRtpSender>>,
        direction: RTCRtpTransceiverDirection,
    ) -> Self {
        Self {
            id,
            mid: None,
            kind,
            sender,
            receiver: Arc::new(RTCRtpReceiver::new(kind)),
            direction,
            current_direction: RTCRtpTransceiverDirection::Unspecified,
            stopped: false,
        }
    }

    pub(crate) fn id(&self) -> RTCRtpTransceiverId {
        self.id
    }

    /// mid gets the Transceiver's mid value. When not already set, this value will be set in CreateOffer or create_answer.
    pub(crate) fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub(crate) fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    /// sender returns the RTPTransceiver's RTPSender if it has one
    pub(crate) fn sender(&self) -> Option<&Arc<RTCRtpSender>> {
        self.sender.as_ref()
    }

    pub(crate) fn set_sender(&mut self, sender: Option<Arc<RTCRtpSender>>) {
        self.sender = sender;
    }

    pub(crate) fn receiver(&self) -> &Arc<RTCRtpReceiver> {
        &self.receiver
    }

    /// direction returns the RTPTransceiver's desired direction.
    pub(crate) fn direction(&self) -> RTCRtpTransceiverDirection {
        self.direction
    }

    pub(crate) fn set_direction(&mut self, direction: RTCRtpTransceiverDirection) {
        let previous_direction = self.direction;
        self.direction = direction;

        if direction != previous_direction {
            trace!("Changing direction of transceiver from {previous_direction} to {direction}");
        }
    }

    /// current_direction returns the RTPTransceiver's current direction as negotiated.
    ///
    /// If this transceiver has never been negotiated this returns [`RTCRtpTransceiverDirection::Unspecified`].
    pub(crate) fn current_direction(&self) -> RTCRtpTransceiverDirection {
        self.current_direction
    }

    pub(crate) fn set_current_direction(&mut self, d: RTCRtpTransceiverDirection) {
        let previous = self.current_direction;
        self.current_direction = d;

        if d != previous {
            trace!("Changing current direction of transceiver from {previous} to {d}");
        }
    }

    /// set_mid sets the RTPTransceiver's mid. If it was already set, will return an error.
    pub(crate) fn set_mid(&mut self, mid: String) -> Result<()> {
        if self.mid.is_some() {
            return Err(Error::ErrRTPTransceiverCannotChangeMid);
        }

        self.mid = Some(mid);
        Ok(())
    }

    /// clear_mid forgets a mid that was assigned by a negotiation that got rolled back
    pub(crate) fn clear_mid(&mut self) {
        self.mid = None;
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stopped
    }

    /// stop marks the transceiver stopped; stopping its sender and receiver is up
    /// to the peer connection
    pub(crate) fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.direction = RTCRtpTransceiverDirection::Inactive;
        self.current_direction = RTCRtpTransceiverDirection::Inactive;
    }

    /// get_codecs returns the codecs usable by this transceiver, negotiated ones once negotiation happened
    pub(crate) fn get_codecs(&self, media_engine: &MediaEngine) -> Vec<RTCRtpCodecParameters> {
        media_engine.get_codecs_by_kind(self.kind)
    }
}

pub(crate) fn find_by_mid(mid: &str, local_transceivers: &[RTCRtpTransceiver]) -> Option<usize> {
    local_transceivers
        .iter()
        .position(|t| t.mid.as_deref() == Some(mid))
}

/// Given a direction+type pluck a transceiver from the passed list
/// if no entry satisfies the requested type+direction return None
pub(crate) fn satisfy_type_and_direction(
    remote_kind: RtpCodecKind,
    remote_direction: RTCRtpTransceiverDirection,
    local_transceivers: &[RTCRtpTransceiver],
) -> Option<usize> {
    // Get direction order from most preferred to least
    let get_preferred_directions = || -> Vec<RTCRtpTransceiverDirection> {
        match remote_direction {
            RTCRtpTransceiverDirection::Sendrecv => vec![
                RTCRtpTransceiverDirection::Recvonly,
                RTCRtpTransceiverDirection::Sendrecv,
            ],
            RTCRtpTransceiverDirection::Sendonly => vec![RTCRtpTransceiverDirection::Recvonly],
            RTCRtpTransceiverDirection::Recvonly => vec![
                RTCRtpTransceiverDirection::Sendonly,
                RTCRtpTransceiverDirection::Sendrecv,
            ],
            _ => vec![],
        }
    };

    for possible_direction in get_preferred_directions() {
        if let Some(index) = local_transceivers.iter().position(|t| {
            t.mid.is_none()
                && !t.stopped
                && t.kind() == remote_kind
                && possible_direction == t.direction
        }) {
            return Some(index);
        }
    }

    None
}
