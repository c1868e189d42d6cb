use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use tokio::sync::{Mutex, mpsc};

use crate::constants::RTP_CHANNEL_CAPACITY;
use crate::media_stream::track_remote::TrackRemote;
use crate::rtp_transceiver::rtp_sender::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use crate::rtp_transceiver::{PayloadType, SSRC};

/// RTCRtpReceiveParameters describes the remote stream a receiver accepts
#[derive(Default, Debug, Clone)]
pub(crate) struct RTCRtpReceiveParameters {
    pub(crate) ssrc: SSRC,
    pub(crate) track_id: String,
    pub(crate) stream_id: String,
    /// remote payload type to local codec parameters
    pub(crate) codecs: HashMap<PayloadType, RTCRtpCodecParameters>,
}

#[derive(Default)]
struct RTCRtpReceiverInternal {
    params: Option<RTCRtpReceiveParameters>,
    track: Option<Arc<TrackRemote>>,
    track_tx: Option<mpsc::Sender<rtp::packet::Packet>>,
    stopped: bool,
}

/// RTPReceiver allows an application to inspect the receipt of a TrackRemote
pub struct RTCRtpReceiver {
    kind: RtpCodecKind,
    internal: Mutex<RTCRtpReceiverInternal>,
}

impl fmt::Debug for RTCRtpReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpReceiver")
            .field("kind", &self.kind)
            .finish()
    }
}

impl RTCRtpReceiver {
    pub(crate) fn new(kind: RtpCodecKind) -> Self {
        RTCRtpReceiver {
            kind,
            internal: Mutex::new(RTCRtpReceiverInternal::default()),
        }
    }

    pub fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    /// track returns the remote track, once the first packet has arrived
    pub async fn track(&self) -> Option<Arc<TrackRemote>> {
        let internal = self.internal.lock().await;
        internal.track.clone()
    }

    /// ssrc returns the SSRC of the remote stream this receiver accepts
    pub async fn ssrc(&self) -> Option<SSRC> {
        let internal = self.internal.lock().await;
        internal.params.as_ref().map(|p| p.ssrc)
    }

    /// receive configures the receiver for a remote stream. Renegotiating the same
    /// stream only refreshes the payload type mapping.
    pub(crate) async fn receive(&self, params: RTCRtpReceiveParameters) {
        let mut internal = self.internal.lock().await;
        if internal.stopped {
            return;
        }

        let same_stream = internal
            .params
            .as_ref()
            .is_some_and(|p| p.ssrc == params.ssrc);
        if !same_stream {
            internal.track = None;
            internal.track_tx = None;
        }

        debug!(
            "receiver for {} stream {} accepts payload types {:?}",
            self.kind,
            params.ssrc,
            params.codecs.keys().collect::<Vec<_>>()
        );
        internal.params = Some(params);
    }

    /// handle_rtp rewrites an inbound packet to the local payload type and hands
    /// it to the remote track. The first packet creates the track, which is
    /// returned so the caller can announce it.
    pub(crate) async fn handle_rtp(
        &self,
        mut pkt: rtp::packet::Packet,
    ) -> Option<Arc<TrackRemote>> {
        let mut guard = self.internal.lock().await;
        let internal = &mut *guard;
        if internal.stopped {
            return None;
        }
        let params = internal.params.as_ref()?;

        let Some(codec) = params.codecs.get(&pkt.header.payload_type).cloned() else {
            trace!(
                "dropping packet with unknown payload type {} on ssrc {}",
                pkt.header.payload_type, pkt.header.ssrc
            );
            return None;
        };
        pkt.header.payload_type = codec.payload_type;

        let mut new_track = None;
        if internal.track.is_none() {
            let (track_id, stream_id, ssrc) =
                (params.track_id.clone(), params.stream_id.clone(), params.ssrc);
            let (tx, rx) = mpsc::channel(RTP_CHANNEL_CAPACITY);
            let track = Arc::new(TrackRemote::new(
                track_id, stream_id, self.kind, ssrc, codec, rx,
            ));
            internal.track = Some(Arc::clone(&track));
            internal.track_tx = Some(tx);
            new_track = Some(track);
        }

        if let Some(tx) = &internal.track_tx
            && let Err(err) = tx.try_send(pkt)
        {
            trace!("remote track dropped packet: {err}");
        }

        new_track
    }

    /// stop irreversibly stops the RTPReceiver; the remote track reports
    /// ErrClosedPipe once its buffered packets are read
    pub(crate) async fn stop(&self) {
        let mut internal = self.internal.lock().await;
        internal.stopped = true;
        internal.track_tx = None;
    }
}
