use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use log::{trace, warn};
use tokio::sync::Mutex;

use super::*;
use shared::error::{Error, flatten_errs};

/// TrackLocalStaticRTP  is a TrackLocal that has a pre-set codec and accepts RTP Packets.
/// If you wish to send a media.Sample use TrackLocalStaticSample
#[derive(Debug)]
pub struct TrackLocalStaticRTP {
    pub(crate) bindings: Mutex<Vec<Arc<TrackBinding>>>,
    codec: RTCRtpCodecCapability,
    id: String,
    rid: Option<String>,
    stream_id: String,
}

impl TrackLocalStaticRTP {
    /// returns a TrackLocalStaticRTP without rid.
    ///
    /// Unknown mime types are accepted; whether the codec is usable is only
    /// known once a peer connection tries to bind the track.
    pub fn new(codec: RTCRtpCodecCapability, id: String, stream_id: String) -> Result<Self> {
        if codec.mime_type.is_empty() {
            return Err(Error::ErrCodecMimeTypeEmpty);
        }
        if id.is_empty() {
            return Err(Error::ErrTrackIdEmpty);
        }

        Ok(TrackLocalStaticRTP {
            bindings: Mutex::new(vec![]),
            codec,
            id,
            rid: None,
            stream_id,
        })
    }

    /// returns a TrackLocalStaticRTP with rid.
    pub fn new_with_rid(
        codec: RTCRtpCodecCapability,
        id: String,
        rid: String,
        stream_id: String,
    ) -> Result<Self> {
        let mut track = Self::new(codec, id, stream_id)?;
        track.rid = Some(rid);
        Ok(track)
    }

    /// binding_count returns the number of peer connections this track is currently bound to
    pub async fn binding_count(&self) -> usize {
        self.bindings.lock().await.len()
    }

    pub async fn any_binding_paused(&self) -> bool {
        let bindings = self.bindings.lock().await;
        bindings.iter().any(|b| b.is_sender_paused())
    }

    /// bind_with binds the track and lets the caller validate the negotiated codec
    /// before the binding is recorded. `on_match` runs under the bindings lock and
    /// nothing is awaited after the lock is taken, so a cancelled bind leaves the
    /// binding set untouched.
    pub(crate) async fn bind_with<F>(
        &self,
        t: &TrackLocalContext,
        on_match: F,
    ) -> Result<RTCRtpCodecParameters>
    where
        F: FnOnce(&RTCRtpCodecParameters) -> Result<()> + Send,
    {
        let mut bindings = self.bindings.lock().await;

        if bindings.iter().any(|b| b.id == t.id()) {
            return Err(Error::ErrBindingAlreadyExists);
        }

        let (codec, match_type) = codec_parameters_fuzzy_search(&self.codec, t.codec_parameters());
        if match_type == CodecMatch::None {
            return Err(Error::ErrUnsupportedCodec);
        }

        // negotiated payload types are always the local ones
        t.media_engine()
            .get_codec_by_payload(codec.payload_type, self.kind())?;

        on_match(&codec)?;

        trace!(
            "track {} bound to {} with ssrc {} payload type {} ({:?} match)",
            self.id,
            t.id(),
            t.ssrc(),
            codec.payload_type,
            match_type
        );

        bindings.push(Arc::new(TrackBinding {
            id: t.id().to_owned(),
            ssrc: t.ssrc(),
            payload_type: codec.payload_type,
            codec: codec.clone(),
            write_stream: t.write_stream(),
            sender_paused: Arc::clone(&t.paused),
        }));

        Ok(codec)
    }
}

#[async_trait]
impl TrackLocal for TrackLocalStaticRTP {
    /// bind is called by the PeerConnection after negotiation is complete
    /// This asserts that the code requested is supported by the remote peer.
    /// If so it setups all the state (SSRC and PayloadType) to have a call
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters> {
        self.bind_with(t, |_| Ok(())).await
    }

    /// unbind implements the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()> {
        let mut bindings = self.bindings.lock().await;
        let idx = bindings
            .iter()
            .position(|b| b.id == t.id())
            .ok_or(Error::ErrUnbindFailed)?;
        bindings.remove(idx);
        trace!("track {} unbound from {}", self.id, t.id());
        Ok(())
    }

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn rid(&self) -> Option<&str> {
        self.rid.as_deref()
    }

    fn stream_id(&self) -> &str {
        self.stream_id.as_str()
    }

    fn kind(&self) -> RtpCodecKind {
        self.codec.kind()
    }

    fn codec(&self) -> RTCRtpCodecCapability {
        self.codec.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl TrackLocalWriter for TrackLocalStaticRTP {
    /// write_rtp writes a RTP Packet to every peer connection the track is bound to,
    /// rewriting SSRC and payload type per binding.
    ///
    /// All bindings are attempted. The write succeeds when there are no bindings or
    /// at least one binding accepted the packet; failed bindings are logged with
    /// their ids. Only when every attempted binding failed is the combined error
    /// returned. Bindings whose sender is paused are skipped.
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize> {
        let bindings = {
            let bindings = self.bindings.lock().await;
            bindings.clone()
        };

        let mut n = 0;
        let mut delivered = 0;
        let mut write_errs = vec![];
        let mut pkt = p.clone();

        for b in bindings.into_iter() {
            if b.is_sender_paused() {
                continue;
            }
            pkt.header.ssrc = b.ssrc;
            pkt.header.payload_type = b.payload_type;

            match b.write_stream.write_rtp(&pkt).await {
                Ok(m) => {
                    n += m;
                    delivered += 1;
                }
                Err(err) => {
                    warn!("track {} failed to write to binding {}: {err}", self.id, b.id);
                    write_errs.push(err);
                }
            }
        }

        if delivered == 0 {
            flatten_errs(write_errs)?;
        }
        Ok(n)
    }
}
