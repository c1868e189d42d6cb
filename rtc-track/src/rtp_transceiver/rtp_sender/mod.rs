pub mod rtcp_parameters;
pub mod rtp_codec;
pub mod rtp_codec_parameters;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::media_stream::track_local::{TrackLocal, TrackLocalContext, TrackLocalWriter};
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::rtp_transceiver::SSRC;
use crate::rtp_transceiver::rtp_sender::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use shared::error::{Error, Result};
use shared::util::math_rand_alpha;

#[derive(Default)]
struct RTCRtpSenderInternal {
    track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    /// context of the current binding, present while the track is bound
    context: Option<TrackLocalContext>,
}

/// RTPSender allows an application to control how a given Track is encoded and transmitted to a remote peer
pub struct RTCRtpSender {
    id: String,
    kind: RtpCodecKind,
    ssrc: SSRC,
    write_stream: Arc<dyn TrackLocalWriter + Send + Sync>,
    paused: Arc<AtomicBool>,
    stopped: AtomicBool,
    internal: Mutex<RTCRtpSenderInternal>,
}

impl fmt::Debug for RTCRtpSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpSender")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("ssrc", &self.ssrc)
            .field("paused", &self.paused)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl RTCRtpSender {
    pub(crate) fn new(
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
        kind: RtpCodecKind,
        write_stream: Arc<dyn TrackLocalWriter + Send + Sync>,
    ) -> Self {
        Self {
            id: math_rand_alpha(32),
            kind,
            ssrc: rand::random::<u32>(),
            write_stream,
            paused: Arc::new(AtomicBool::new(false)),
            stopped: AtomicBool::new(false),
            internal: Mutex::new(RTCRtpSenderInternal {
                track,
                context: None,
            }),
        }
    }

    /// id uniquely identifies this sender; it is also the id of the bindings it creates
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    /// ssrc is the synchronization source every packet sent through this sender carries
    pub fn ssrc(&self) -> SSRC {
        self.ssrc
    }

    /// track returns the RTCRtpTransceiver track, or None
    pub async fn track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        let internal = self.internal.lock().await;
        internal.track.clone()
    }

    /// is_bound reports whether the current track is bound through this sender
    pub async fn is_bound(&self) -> bool {
        let internal = self.internal.lock().await;
        internal.context.is_some()
    }

    /// negotiated_codecs returns the codecs the current binding was negotiated against
    pub async fn negotiated_codecs(&self) -> Vec<RTCRtpCodecParameters> {
        let internal = self.internal.lock().await;
        internal
            .context
            .as_ref()
            .map(|ctx| ctx.codec_parameters().to_vec())
            .unwrap_or_default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// send binds the track with the negotiated codecs of its kind.
    ///
    /// The bind must finish before `deadline`, otherwise the call fails with
    /// ErrDeadlineExceeded and the track is left unbound. A sender that is
    /// already bound keeps its binding.
    pub(crate) async fn send(
        &self,
        codecs: Vec<RTCRtpCodecParameters>,
        mid: Option<String>,
        media_engine: Arc<MediaEngine>,
        deadline: Instant,
    ) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::ErrRTPSenderStopped);
        }

        let mut internal = self.internal.lock().await;
        if internal.context.is_some() {
            return Ok(());
        }
        let Some(track) = internal.track.clone() else {
            return Ok(());
        };

        let context = TrackLocalContext {
            id: self.id.clone(),
            codecs,
            media_engine,
            ssrc: self.ssrc,
            write_stream: Arc::clone(&self.write_stream),
            paused: Arc::clone(&self.paused),
            mid,
        };

        let codec = match tokio::time::timeout_at(deadline, track.bind(&context)).await {
            Ok(result) => result?,
            Err(_) => {
                debug!("sender {} timed out binding track {}", self.id, track.id());
                return Err(Error::ErrDeadlineExceeded);
            }
        };

        trace!(
            "sender {} bound track {} with payload type {}",
            self.id,
            track.id(),
            codec.payload_type
        );
        internal.context = Some(context);

        Ok(())
    }

    /// unbind releases the binding of the current track, if any
    pub(crate) async fn unbind(&self) -> Result<()> {
        let mut internal = self.internal.lock().await;
        let Some(context) = internal.context.take() else {
            return Ok(());
        };
        match &internal.track {
            Some(track) => track.unbind(&context).await,
            None => Ok(()),
        }
    }

    /// stop irreversibly stops the RTPSender, releasing its binding
    pub(crate) async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.unbind().await
    }

    /// detach removes the track from this sender, releasing its binding first
    pub(crate) async fn detach(&self) -> Result<()> {
        let result = self.unbind().await;
        let mut internal = self.internal.lock().await;
        internal.track = None;
        result
    }

    /// replace_track replaces the track currently being used as the sender's source with a new TrackLocal.
    /// The new track must be of the same media kind (audio, video, etc) and switching the track should not
    /// require negotiation.
    pub async fn replace_track(
        &self,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Result<()> {
        if let Some(t) = &track
            && self.kind != t.kind()
        {
            return Err(Error::ErrRTPSenderNewTrackHasIncorrectKind);
        }

        let mut internal = self.internal.lock().await;

        let Some(context) = internal.context.take() else {
            internal.track = track;
            return Ok(());
        };

        if let Some(old) = &internal.track {
            old.unbind(&context).await?;
        }

        let Some(new_track) = track else {
            internal.track = None;
            return Ok(());
        };

        match new_track.bind(&context).await {
            Ok(_) => {
                internal.track = Some(new_track);
                internal.context = Some(context);
                Ok(())
            }
            Err(err) => {
                // keep sending the previous track
                if let Some(old) = &internal.track
                    && old.bind(&context).await.is_ok()
                {
                    internal.context = Some(context);
                }
                Err(err)
            }
        }
    }
}
