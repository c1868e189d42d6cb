pub mod track_local_static_rtp;
pub mod track_local_static_sample;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::rtp_transceiver::rtp_sender::rtp_codec::*;
use crate::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use crate::rtp_transceiver::{PayloadType, SSRC};
use shared::error::Result;

/// TrackLocalWriter is the Writer for outbound RTP Packets
#[async_trait]
pub trait TrackLocalWriter: fmt::Debug {
    /// write_rtp sends a RTP packet and returns the number of bytes written
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize>;
}

/// TrackLocalContext is the Context passed when a TrackLocal has been Binded/Unbinded from a PeerConnection, and used
/// in Interceptors.
#[derive(Clone)]
pub struct TrackLocalContext {
    pub(crate) id: String,
    pub(crate) codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) media_engine: Arc<MediaEngine>,
    pub(crate) ssrc: SSRC,
    pub(crate) write_stream: Arc<dyn TrackLocalWriter + Send + Sync>,
    pub(crate) paused: Arc<AtomicBool>,
    pub(crate) mid: Option<String>,
}

impl fmt::Debug for TrackLocalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackLocalContext")
            .field("id", &self.id)
            .field("codecs", &self.codecs)
            .field("ssrc", &self.ssrc)
            .field("paused", &self.paused)
            .field("mid", &self.mid)
            .finish()
    }
}

impl TrackLocalContext {
    /// codec_parameters returns the negotiated RTPCodecParameters. These are the codecs supported by both
    /// PeerConnections, numbered with the local payload types
    pub fn codec_parameters(&self) -> &[RTCRtpCodecParameters] {
        &self.codecs
    }

    /// media_engine returns the local MediaEngine the codecs were negotiated against
    pub fn media_engine(&self) -> &MediaEngine {
        &self.media_engine
    }

    /// ssrc requires the negotiated SSRC of this track
    pub fn ssrc(&self) -> SSRC {
        self.ssrc
    }

    /// write_stream returns the WriteStream for this TrackLocal. The implementer writes the outbound
    /// media packets to it
    pub fn write_stream(&self) -> Arc<dyn TrackLocalWriter + Send + Sync> {
        Arc::clone(&self.write_stream)
    }

    /// id is a unique identifier that is used for both bind/unbind
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// mid returns the id of media associated with the RTP stream
    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// TrackLocal is an interface that controls how the user can send media
/// The user can provide their own TrackLocal implementations, or use
/// [`TrackLocalStaticRTP`](track_local_static_rtp::TrackLocalStaticRTP) and
/// [`TrackLocalStaticSample`](track_local_static_sample::TrackLocalStaticSample)
#[async_trait]
pub trait TrackLocal: fmt::Debug {
    /// bind should implement the way how the media data flows from the Track to the PeerConnection
    /// This will be called internally after signaling is complete and the list of available
    /// codecs has been determined
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters>;

    /// unbind should implement the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()>;

    /// id is the unique identifier for this Track. This should be unique for the
    /// stream, but doesn't have to globally unique. A common example would be 'audio' or 'video'
    /// and stream_id would be 'desktop' or 'webcam'
    fn id(&self) -> &str;

    /// rid is the RTP Stream ID for this track.
    fn rid(&self) -> Option<&str> {
        None
    }

    /// stream_id is the group this track belongs too. This must be unique
    fn stream_id(&self) -> &str;

    /// kind controls if this TrackLocal is audio or video
    fn kind(&self) -> RtpCodecKind;

    /// codec is the capability this track was declared with; offers list the
    /// matching codec first
    fn codec(&self) -> RTCRtpCodecCapability;

    fn as_any(&self) -> &dyn Any;
}

/// TrackBinding is the state frozen for one negotiated session of a track.
#[derive(Debug, Clone)]
pub(crate) struct TrackBinding {
    pub(crate) id: String,
    pub(crate) ssrc: SSRC,
    pub(crate) payload_type: PayloadType,
    pub(crate) codec: RTCRtpCodecParameters,
    pub(crate) write_stream: Arc<dyn TrackLocalWriter + Send + Sync>,
    pub(crate) sender_paused: Arc<AtomicBool>,
}

impl TrackBinding {
    pub(crate) fn is_sender_paused(&self) -> bool {
        self.sender_paused.load(Ordering::SeqCst)
    }
}
