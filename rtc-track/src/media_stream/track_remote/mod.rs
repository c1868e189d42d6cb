use std::fmt;

use tokio::sync::{Mutex, mpsc};

use crate::rtp_transceiver::rtp_sender::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use crate::rtp_transceiver::{PayloadType, SSRC};
use shared::error::{Error, Result};

/// TrackRemote represents a single inbound source of media
pub struct TrackRemote {
    id: String,
    stream_id: String,
    kind: RtpCodecKind,
    ssrc: SSRC,
    payload_type: PayloadType,
    codec: RTCRtpCodecParameters,
    packets: Mutex<mpsc::Receiver<rtp::packet::Packet>>,
}

impl fmt::Debug for TrackRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackRemote")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .field("ssrc", &self.ssrc)
            .field("payload_type", &self.payload_type)
            .field("codec", &self.codec)
            .finish()
    }
}

impl TrackRemote {
    pub(crate) fn new(
        id: String,
        stream_id: String,
        kind: RtpCodecKind,
        ssrc: SSRC,
        codec: RTCRtpCodecParameters,
        packets: mpsc::Receiver<rtp::packet::Packet>,
    ) -> Self {
        TrackRemote {
            id,
            stream_id,
            kind,
            ssrc,
            payload_type: codec.payload_type,
            codec,
            packets: Mutex::new(packets),
        }
    }

    /// id is the unique identifier for this Track. This should be unique for the
    /// stream, but doesn't have to globally unique. A common example would be 'audio' or 'video'
    /// and StreamID would be 'desktop' or 'webcam'
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// stream_id is the group this track belongs too. This must be unique
    pub fn stream_id(&self) -> &str {
        self.stream_id.as_str()
    }

    /// kind gets the Kind of the track
    pub fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    /// ssrc gets the SSRC of the track
    pub fn ssrc(&self) -> SSRC {
        self.ssrc
    }

    /// payload_type gets the PayloadType of the track, in the receiver's numbering
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// codec gets the Codec of the track
    pub fn codec(&self) -> &RTCRtpCodecParameters {
        &self.codec
    }

    /// read_rtp reads the next RTP packet, waiting until one arrives.
    /// Returns ErrClosedPipe once the receiver has been stopped and the buffered
    /// packets are drained.
    pub async fn read_rtp(&self) -> Result<rtp::packet::Packet> {
        let mut packets = self.packets.lock().await;
        packets.recv().await.ok_or(Error::ErrClosedPipe)
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_track_remote_read_rtp() -> Result<()> {
        let (tx, rx) = mpsc::channel(4);
        let codec = RTCRtpCodecParameters {
            payload_type: 100,
            ..Default::default()
        };
        let track = TrackRemote::new(
            "video".to_owned(),
            "webrtc-rs".to_owned(),
            RtpCodecKind::Video,
            1234,
            codec,
            rx,
        );
        assert_eq!(track.payload_type(), 100);

        let pkt = rtp::packet::Packet {
            header: rtp::header::Header {
                ssrc: 1234,
                payload_type: 100,
                ..Default::default()
            },
            payload: Bytes::from_static(&[0xAA]),
        };
        tx.send(pkt.clone())
            .await
            .map_err(|_| Error::ErrClosedPipe)?;
        assert_eq!(track.read_rtp().await?, pkt);

        drop(tx);
        assert_eq!(track.read_rtp().await, Err(Error::ErrClosedPipe));

        Ok(())
    }
}
