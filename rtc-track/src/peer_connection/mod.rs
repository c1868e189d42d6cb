pub mod configuration;
mod internal;
pub mod sdp;
pub mod state;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::{API, APIBuilder};
use crate::media_stream::track_local::track_local_static_sample::TrackLocalStaticSample;
use crate::media_stream::track_local::{TrackLocal, TrackLocalWriter};
use crate::media_stream::track_remote::TrackRemote;
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::state::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::state::signaling_state::{RTCSignalingState, StateChangeOp};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::rtp_transceiver::rtp_sender::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverId, RTCRtpTransceiverInit, SSRC};
use crate::transport::RTPTransport;
use shared::error::{Error, Result, flatten_errs};
use shared::util::math_rand_alpha;

pub type OnTrackHdlrFn = Box<
    dyn (FnMut(
            Arc<TrackRemote>,
            Arc<RTCRtpReceiver>,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

#[derive(Default)]
struct RTCPeerConnectionInternal {
    media_engine: MediaEngine,
    rtp_transceivers: Vec<RTCRtpTransceiver>,

    signaling_state: RTCSignalingState,
    peer_connection_state: RTCPeerConnectionState,

    current_local_description: Option<RTCSessionDescription>,
    pending_local_description: Option<RTCSessionDescription>,
    current_remote_description: Option<RTCSessionDescription>,
    pending_remote_description: Option<RTCSessionDescription>,
    last_offer: Option<RTCSessionDescription>,
    last_answer: Option<RTCSessionDescription>,

    greater_mid: isize,
    next_transceiver_id: RTCRtpTransceiverId,
    read_loop: Option<JoinHandle<()>>,
}

/// PeerConnection represents a connection between the local peer and a remote
/// peer. Media travels over a loopback [`Net`](crate::transport::Net); the
/// session descriptions exchanged through [`create_offer`](Self::create_offer)
/// and [`create_answer`](Self::create_answer) decide which codecs local tracks
/// are bound with.
pub struct RTCPeerConnection {
    session_id: String,
    setting_engine: Arc<SettingEngine>,
    transport: Arc<RTPTransport>,
    is_closed: AtomicBool,

    internal: Mutex<RTCPeerConnectionInternal>,
    receivers_by_ssrc: Arc<Mutex<HashMap<SSRC, Arc<RTCRtpReceiver>>>>,
    on_track_handler: Arc<Mutex<Option<OnTrackHdlrFn>>>,
}

impl std::fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTCPeerConnection")
            .field("session_id", &self.session_id)
            .field("transport", &self.transport)
            .field("is_closed", &self.is_closed)
            .finish()
    }
}

impl RTCPeerConnection {
    /// new creates a PeerConnection with the default codecs and default settings.
    /// Use [`APIBuilder`] to control the MediaEngine and SettingEngine instead.
    pub fn new() -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        APIBuilder::new()
            .with_media_engine(media_engine)
            .build()
            .new_peer_connection()
    }

    pub(crate) fn new_with_api(api: &API) -> Result<Self> {
        let transport = Arc::new(RTPTransport::new(api.setting_engine.net())?);
        let session_id = math_rand_alpha(16);
        debug!("peer connection {session_id} created on transport {}", transport.id());

        Ok(RTCPeerConnection {
            session_id,
            setting_engine: Arc::clone(&api.setting_engine),
            transport,
            is_closed: AtomicBool::new(false),
            internal: Mutex::new(RTCPeerConnectionInternal {
                media_engine: api.media_engine.clone_to(),
                peer_connection_state: RTCPeerConnectionState::New,
                greater_mid: -1,
                ..Default::default()
            }),
            receivers_by_ssrc: Arc::new(Mutex::new(HashMap::new())),
            on_track_handler: Arc::new(Mutex::new(None)),
        })
    }

    fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    fn write_stream(&self) -> Arc<dyn TrackLocalWriter + Send + Sync> {
        Arc::clone(&self.transport) as Arc<dyn TrackLocalWriter + Send + Sync>
    }

    /// on_track sets an event handler which is called when remote track
    /// arrives from a remote peer.
    pub async fn on_track(&self, f: OnTrackHdlrFn) {
        let mut handler = self.on_track_handler.lock().await;
        *handler = Some(f);
    }

    /// add_track adds a Track to the PeerConnection
    ///
    /// An idle transceiver of the same kind is reused, otherwise a new
    /// `sendrecv` transceiver is created. The track is bound once an answer
    /// has been applied.
    pub async fn add_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpSender>> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut internal = self.internal.lock().await;
        for t in &internal.rtp_transceivers {
            if let Some(sender) = t.sender()
                && let Some(existing) = sender.track().await
                && std::ptr::addr_eq(Arc::as_ptr(&existing), Arc::as_ptr(&track))
            {
                return Err(Error::ErrExistingTrack);
            }
        }

        let kind = track.kind();
        let sender = Arc::new(RTCRtpSender::new(
            Some(track),
            kind,
            self.write_stream(),
        ));

        for t in internal.rtp_transceivers.iter_mut() {
            if !t.stopped()
                && t.kind() == kind
                && t.sender().is_none()
                && !t.current_direction().has_send()
            {
                t.set_sender(Some(Arc::clone(&sender)));
                t.set_direction(RTCRtpTransceiverDirection::from_send_recv(
                    true,
                    t.direction().has_recv(),
                ));
                trace!("{}: track added to transceiver {}", self.session_id, t.id());
                return Ok(sender);
            }
        }

        let id = internal.add_rtp_transceiver(
            kind,
            Some(Arc::clone(&sender)),
            RTCRtpTransceiverDirection::Sendrecv,
        );
        trace!("{}: track added to new transceiver {id}", self.session_id);

        Ok(sender)
    }

    /// add_transceiver_from_kind Create a new RtpTransceiver and adds it to the set of transceivers.
    ///
    /// A sending transceiver gets a [`TrackLocalStaticSample`] for the first
    /// codec of the kind; receive only and inactive transceivers get no sender.
    pub async fn add_transceiver_from_kind(
        &self,
        kind: RtpCodecKind,
        init: Option<RTCRtpTransceiverInit>,
    ) -> Result<RTCRtpTransceiverId> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }
        if kind == RtpCodecKind::Unspecified {
            return Err(Error::ErrUnknownType);
        }

        let direction = init
            .map(|init| init.direction)
            .unwrap_or(RTCRtpTransceiverDirection::Sendrecv);

        let mut internal = self.internal.lock().await;
        let sender = match direction {
            RTCRtpTransceiverDirection::Sendrecv | RTCRtpTransceiverDirection::Sendonly => {
                let codecs = internal.media_engine.get_codecs_by_kind(kind);
                let codec = codecs.first().ok_or(Error::ErrNoCodecsAvailable)?;
                let track: Arc<dyn TrackLocal + Send + Sync> =
                    Arc::new(TrackLocalStaticSample::new(
                        codec.capability.clone(),
                        math_rand_alpha(16),
                        math_rand_alpha(16),
                    )?);
                Some(Arc::new(RTCRtpSender::new(
                    Some(track),
                    kind,
                    self.write_stream(),
                )))
            }
            RTCRtpTransceiverDirection::Recvonly | RTCRtpTransceiverDirection::Inactive => None,
            RTCRtpTransceiverDirection::Unspecified => {
                return Err(Error::ErrInvalidTransceiverDirection);
            }
        };

        Ok(internal.add_rtp_transceiver(kind, sender, direction))
    }

    /// remove_track removes a Track from the PeerConnection
    ///
    /// The track is unbound and detached; the transceiver stops sending.
    pub async fn remove_track(&self, sender: &Arc<RTCRtpSender>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut internal = self.internal.lock().await;
        let transceiver = internal
            .rtp_transceivers
            .iter_mut()
            .find(|t| t.sender().is_some_and(|s| Arc::ptr_eq(s, sender)))
            .ok_or(Error::ErrSenderNotCreatedByConnection)?;

        transceiver.set_sender(None);
        transceiver.set_direction(transceiver.direction().without_send());

        let stop_result = sender.stop().await;
        let detach_result = sender.detach().await;
        stop_result.and(detach_result)
    }

    /// create_offer starts the PeerConnection and generates the localDescription
    pub async fn create_offer(&self) -> Result<RTCSessionDescription> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut internal = self.internal.lock().await;
        let media_sections = internal.generate_unmatched_sections().await?;

        let offer = RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            session_id: self.session_id.clone(),
            transport_id: self.transport.id().to_owned(),
            media_sections,
        };
        internal.last_offer = Some(offer.clone());

        Ok(offer)
    }

    /// create_answer starts the PeerConnection and generates the localDescription
    pub async fn create_answer(&self) -> Result<RTCSessionDescription> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut internal = self.internal.lock().await;
        let remote = match (&internal.pending_remote_description, internal.signaling_state) {
            (Some(remote), RTCSignalingState::HaveRemoteOffer) => remote.clone(),
            _ => return Err(Error::ErrNoRemoteDescription),
        };
        let media_sections = internal.generate_matched_sections(&remote).await?;

        let answer = RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            session_id: self.session_id.clone(),
            transport_id: self.transport.id().to_owned(),
            media_sections,
        };
        internal.last_answer = Some(answer.clone());

        Ok(answer)
    }

    /// set_local_description sets the SessionDescription of the local peer
    ///
    /// Applying an answer binds every local track with the negotiated codecs.
    /// When a track cannot be bound the whole call fails and tracks bound in
    /// the same call are unbound again.
    pub async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut internal = self.internal.lock().await;
        internal.set_description(&desc, StateChangeOp::SetLocal)?;

        if desc.sdp_type == RTCSdpType::Answer {
            let remote = internal
                .current_remote_description
                .clone()
                .ok_or(Error::ErrNoRemoteDescription)?;
            self.start_rtp(&mut internal, &desc, &remote).await?;
        }

        Ok(())
    }

    /// local_description returns pending_local_description if it is not null and
    /// otherwise it returns current_local_description.
    pub async fn local_description(&self) -> Option<RTCSessionDescription> {
        let internal = self.internal.lock().await;
        internal
            .pending_local_description
            .clone()
            .or_else(|| internal.current_local_description.clone())
    }

    /// set_remote_description sets the SessionDescription of the remote peer
    ///
    /// A remote offer fixes the negotiated codecs and associates its media
    /// sections with local transceivers; a remote answer binds the local tracks.
    pub async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let mut internal = self.internal.lock().await;
        internal.set_description(&desc, StateChangeOp::SetRemote)?;

        match desc.sdp_type {
            RTCSdpType::Offer => {
                internal.media_engine.update_from_remote_description(&desc)?;
                internal.associate_remote_sections(&desc)?;
            }
            RTCSdpType::Answer => {
                internal.media_engine.update_from_remote_description(&desc)?;
                let local = internal
                    .current_local_description
                    .clone()
                    .ok_or(Error::ErrSDPDoesNotMatchOffer)?;
                self.start_rtp(&mut internal, &local, &desc).await?;
            }
            _ => {}
        }

        Ok(())
    }

    /// remote_description returns pending_remote_description if it is not null and
    /// otherwise it returns current_remote_description.
    pub async fn remote_description(&self) -> Option<RTCSessionDescription> {
        let internal = self.internal.lock().await;
        internal
            .pending_remote_description
            .clone()
            .or_else(|| internal.current_remote_description.clone())
    }

    /// signaling_state attribute returns the signaling state of the
    /// PeerConnection instance.
    pub async fn signaling_state(&self) -> RTCSignalingState {
        self.internal.lock().await.signaling_state
    }

    /// connection_state attribute returns the connection state of the
    /// PeerConnection instance.
    pub async fn connection_state(&self) -> RTCPeerConnectionState {
        self.internal.lock().await.peer_connection_state
    }

    /// get_senders returns the RTPSender that are currently attached to this PeerConnection
    pub async fn get_senders(&self) -> Vec<Arc<RTCRtpSender>> {
        let internal = self.internal.lock().await;
        internal
            .rtp_transceivers
            .iter()
            .filter_map(|t| t.sender().cloned())
            .collect()
    }

    /// get_receivers returns the RTPReceivers that are currently attached to this PeerConnection
    pub async fn get_receivers(&self) -> Vec<Arc<RTCRtpReceiver>> {
        let internal = self.internal.lock().await;
        internal
            .rtp_transceivers
            .iter()
            .map(|t| Arc::clone(t.receiver()))
            .collect()
    }

    /// direction returns the desired direction of a transceiver
    pub async fn direction(&self, id: RTCRtpTransceiverId) -> Option<RTCRtpTransceiverDirection> {
        let internal = self.internal.lock().await;
        internal
            .rtp_transceivers
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.direction())
    }

    /// current_direction returns the negotiated direction of a transceiver
    pub async fn current_direction(
        &self,
        id: RTCRtpTransceiverId,
    ) -> Option<RTCRtpTransceiverDirection> {
        let internal = self.internal.lock().await;
        internal
            .rtp_transceivers
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.current_direction())
    }

    /// mid returns the mid a transceiver was associated with, if any
    pub async fn mid(&self, id: RTCRtpTransceiverId) -> Option<String> {
        let internal = self.internal.lock().await;
        internal
            .rtp_transceivers
            .iter()
            .find(|t| t.id() == id)
            .and_then(|t| t.mid().map(str::to_owned))
    }

    /// close ends the PeerConnection: every sender releases its binding, every
    /// receiver stops and the transport leaves the Net. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut internal = self.internal.lock().await;
        let mut close_errs = vec![];

        for t in internal.rtp_transceivers.iter_mut() {
            if let Some(sender) = t.sender()
                && let Err(err) = sender.stop().await
            {
                close_errs.push(err);
            }
            t.receiver().stop().await;
            t.stop();
        }

        self.receivers_by_ssrc.lock().await.clear();
        if let Some(read_loop) = internal.read_loop.take() {
            read_loop.abort();
        }
        if let Err(err) = self.transport.close() {
            close_errs.push(err);
        }

        internal.signaling_state = RTCSignalingState::Closed;
        internal.peer_connection_state = RTCPeerConnectionState::Closed;
        debug!("peer connection {} closed", self.session_id);

        flatten_errs(close_errs)
    }
}
