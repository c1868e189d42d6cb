/// Integration tests for binding local static tracks through peer connections
///
/// These tests verify that:
/// - negotiation fails with ErrUnsupportedCodec when no codec of a track is shared
/// - bindings are created by signaling and released when the connection closes
/// - each side writes with its own payload type and remote tracks see the local one
/// - binding is bounded by the negotiation timeout
/// - signaling state transitions and rollbacks are enforced
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;

use rtc_track::api::{API, APIBuilder};
use rtc_track::media::Sample;
use rtc_track::media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use rtc_track::media_stream::track_local::track_local_static_sample::TrackLocalStaticSample;
use rtc_track::media_stream::track_local::{TrackLocal, TrackLocalContext, TrackLocalWriter};
use rtc_track::peer_connection::RTCPeerConnection;
use rtc_track::peer_connection::configuration::media_engine::{MIME_TYPE_VP8, MIME_TYPE_VP9, MediaEngine};
use rtc_track::peer_connection::configuration::setting_engine::SettingEngine;
use rtc_track::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use rtc_track::peer_connection::state::{RTCPeerConnectionState, RTCSignalingState};
use rtc_track::rtp_transceiver::PayloadType;
use rtc_track::rtp_transceiver::RTCRtpTransceiverInit;
use rtc_track::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use rtc_track::rtp_transceiver::rtp_sender::rtp_codec::{RTCRtpCodecCapability, RtpCodecKind};
use rtc_track::rtp_transceiver::rtp_sender::rtp_codec_parameters::RTCRtpCodecParameters;
use rtc_track::transport::Net;
use shared::error::Error;

const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(30);

fn init_log() {
    env_logger::builder().is_test(true).try_init().ok();
}

fn new_api(net: &Arc<Net>, media_engine: MediaEngine) -> API {
    let mut setting_engine = SettingEngine::default();
    setting_engine.set_net(Arc::clone(net));

    APIBuilder::new()
        .with_setting_engine(setting_engine)
        .with_media_engine(media_engine)
        .build()
}

fn default_media_engine() -> Result<MediaEngine> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    Ok(m)
}

fn single_codec_media_engine(mime_type: &str, payload_type: PayloadType) -> Result<MediaEngine> {
    let mut m = MediaEngine::default();
    m.register_codec(
        RTCRtpCodecParameters {
            capability: RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            payload_type,
            ..Default::default()
        },
        RtpCodecKind::Video,
    )?;
    Ok(m)
}

fn new_pair(net: &Arc<Net>) -> Result<(RTCPeerConnection, RTCPeerConnection)> {
    let offerer = new_api(net, default_media_engine()?).new_peer_connection()?;
    let answerer = new_api(net, default_media_engine()?).new_peer_connection()?;
    Ok((offerer, answerer))
}

fn capability(mime_type: &str) -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: mime_type.to_owned(),
        ..Default::default()
    }
}

/// signal_pair runs a full offer/answer exchange, passing both descriptions
/// through their JSON form like a signaling channel would
async fn signal_pair(
    offerer: &RTCPeerConnection,
    answerer: &RTCPeerConnection,
) -> shared::error::Result<()> {
    let offer = offerer.create_offer().await?;
    offerer.set_local_description(offer.clone()).await?;
    answerer
        .set_remote_description(RTCSessionDescription::from_json(&offer.to_json()?)?)
        .await?;

    let answer = answerer.create_answer().await?;
    answerer.set_local_description(answer.clone()).await?;
    offerer
        .set_remote_description(RTCSessionDescription::from_json(&answer.to_json()?)?)
        .await
}

/// send_video_until_done writes a sample to every track each 20ms until `done` yields
async fn send_video_until_done<T>(
    done: &mut mpsc::Receiver<T>,
    tracks: &[Arc<TrackLocalStaticSample>],
) -> Result<T> {
    let sample = Sample {
        data: Bytes::from_static(&[0x00]),
        duration: Duration::from_secs(1),
        ..Default::default()
    };

    let result = timeout(DEFAULT_TIMEOUT_DURATION, async {
        loop {
            tokio::select! {
                value = done.recv() => return value,
                _ = tokio::time::sleep(Duration::from_millis(20)) => {
                    for track in tracks {
                        if let Err(err) = track.write_sample(&sample).await {
                            log::debug!("write_sample: {err}");
                        }
                    }
                }
            }
        }
    })
    .await?;

    result.ok_or_else(|| anyhow::anyhow!("done channel closed"))
}

#[tokio::test]
async fn test_track_local_static_no_codec_intersection_offerer() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let track = Arc::new(TrackLocalStaticSample::new(
        capability("video/vp8"),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);

    let pc = new_api(&net, default_media_engine()?).new_peer_connection()?;
    let no_codec_pc = new_api(&net, MediaEngine::default()).new_peer_connection()?;

    pc.add_track(track.clone()).await?;

    assert_eq!(
        signal_pair(&pc, &no_codec_pc).await,
        Err(Error::ErrUnsupportedCodec)
    );
    assert_eq!(pc.connection_state().await, RTCPeerConnectionState::Failed);
    assert_eq!(track.binding_count().await, 0);

    no_codec_pc.close().await?;
    pc.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_track_local_static_no_codec_intersection_answerer() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let track = Arc::new(TrackLocalStaticSample::new(
        capability("video/vp8"),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);

    let pc = new_api(&net, default_media_engine()?).new_peer_connection()?;
    let vp9_only_pc =
        new_api(&net, single_codec_media_engine(MIME_TYPE_VP9, 96)?).new_peer_connection()?;

    vp9_only_pc
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;
    pc.add_track(track.clone()).await?;

    assert_eq!(
        signal_pair(&vp9_only_pc, &pc).await,
        Err(Error::ErrUnsupportedCodec)
    );
    assert_eq!(track.binding_count().await, 0);

    vp9_only_pc.close().await?;
    pc.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_track_local_static_no_codec_intersection_local() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;

    let invalid_codec_track = Arc::new(TrackLocalStaticSample::new(
        capability("video/invalid-codec"),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    offerer.add_track(invalid_codec_track).await?;

    assert_eq!(
        signal_pair(&offerer, &answerer).await,
        Err(Error::ErrUnsupportedCodec)
    );

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_track_local_static_failed_bind_unbinds_earlier_tracks() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;

    let vp8_writer = Arc::new(TrackLocalStaticRTP::new(
        capability("video/vp8"),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    let invalid_codec_track = Arc::new(TrackLocalStaticRTP::new(
        capability("video/invalid-codec"),
        "invalid".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    offerer.add_track(vp8_writer.clone()).await?;
    offerer.add_track(invalid_codec_track.clone()).await?;

    assert_eq!(
        signal_pair(&offerer, &answerer).await,
        Err(Error::ErrUnsupportedCodec)
    );
    assert_eq!(vp8_writer.binding_count().await, 0);
    assert_eq!(invalid_codec_track.binding_count().await, 0);

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_track_local_static_closed() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (pc_offer, pc_answer) = new_pair(&net)?;

    pc_answer
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;

    let vp8_writer = Arc::new(TrackLocalStaticRTP::new(
        capability("video/vp8"),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    pc_offer.add_track(vp8_writer.clone()).await?;

    assert_eq!(
        vp8_writer.binding_count().await,
        0,
        "No binding should exist before signaling"
    );

    signal_pair(&pc_offer, &pc_answer).await?;

    assert_eq!(
        vp8_writer.binding_count().await,
        1,
        "binding should exist after signaling"
    );
    assert_eq!(pc_offer.connection_state().await, RTCPeerConnectionState::Connected);
    assert_eq!(pc_answer.connection_state().await, RTCPeerConnectionState::Connected);

    pc_offer.close().await?;
    pc_answer.close().await?;

    assert_eq!(
        vp8_writer.binding_count().await,
        0,
        "No binding should exist after close"
    );
    assert_eq!(net.endpoint_count()?, 0);

    Ok(())
}

#[tokio::test]
async fn test_track_local_static_payload_type() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let offerer =
        new_api(&net, single_codec_media_engine(MIME_TYPE_VP8, 100)?).new_peer_connection()?;
    let answerer =
        new_api(&net, single_codec_media_engine(MIME_TYPE_VP8, 200)?).new_peer_connection()?;

    let track = Arc::new(TrackLocalStaticSample::new(
        capability("video/vp8"),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);

    offerer
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;
    answerer.add_track(track.clone()).await?;

    let (on_track_tx, mut on_track_rx) = mpsc::channel(1);
    offerer
        .on_track(Box::new(move |track, _receiver| {
            let on_track_tx = on_track_tx.clone();
            Box::pin(async move {
                let _ = on_track_tx
                    .send((track.payload_type(), track.codec().capability.mime_type.clone()))
                    .await;
            })
        }))
        .await;

    signal_pair(&offerer, &answerer).await?;

    let (payload_type, mime_type) = send_video_until_done(&mut on_track_rx, &[track]).await?;
    assert_eq!(payload_type, 100);
    assert_eq!(mime_type, "video/VP8");

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_track_local_static_rtp_reaches_remote_track() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;

    let vp8_writer = Arc::new(TrackLocalStaticRTP::new(
        capability(MIME_TYPE_VP8),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    let sender = offerer.add_track(vp8_writer.clone()).await?;

    let (packet_tx, mut packet_rx) = mpsc::channel(1);
    answerer
        .on_track(Box::new(move |track, _receiver| {
            let packet_tx = packet_tx.clone();
            Box::pin(async move {
                let first = track.read_rtp().await;
                let _ = packet_tx
                    .send((track.id().to_owned(), track.stream_id().to_owned(), first))
                    .await;
            })
        }))
        .await;

    signal_pair(&offerer, &answerer).await?;

    let result = timeout(DEFAULT_TIMEOUT_DURATION, async {
        loop {
            tokio::select! {
                value = packet_rx.recv() => return value,
                _ = tokio::time::sleep(Duration::from_millis(20)) => {
                    let pkt = rtp::packet::Packet {
                        header: rtp::header::Header {
                            version: 2,
                            payload_type: 111,
                            ssrc: 1,
                            ..Default::default()
                        },
                        payload: Bytes::from_static(&[0x10, 0x01]),
                    };
                    if let Err(err) = vp8_writer.write_rtp(&pkt).await {
                        log::debug!("write_rtp: {err}");
                    }
                }
            }
        }
    })
    .await?;

    let (track_id, stream_id, first) =
        result.ok_or_else(|| anyhow::anyhow!("on_track never fired"))?;
    let first = first?;
    assert_eq!(track_id, "video");
    assert_eq!(stream_id, "webrtc-rs");
    assert_eq!(first.header.ssrc, sender.ssrc());
    assert_eq!(first.header.payload_type, 96);
    assert_eq!(first.payload, Bytes::from_static(&[0x10, 0x01]));

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

/// SlowTrack never finishes binding in time
#[derive(Debug)]
struct SlowTrack {
    delay: Duration,
}

#[async_trait]
impl TrackLocal for SlowTrack {
    async fn bind(&self, t: &TrackLocalContext) -> shared::error::Result<RTCRtpCodecParameters> {
        tokio::time::sleep(self.delay).await;
        t.codec_parameters()
            .first()
            .cloned()
            .ok_or(Error::ErrUnsupportedCodec)
    }

    async fn unbind(&self, _t: &TrackLocalContext) -> shared::error::Result<()> {
        Ok(())
    }

    fn id(&self) -> &str {
        "slow"
    }

    fn stream_id(&self) -> &str {
        "webrtc-rs"
    }

    fn kind(&self) -> RtpCodecKind {
        RtpCodecKind::Video
    }

    fn codec(&self) -> RTCRtpCodecCapability {
        capability(MIME_TYPE_VP8)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[tokio::test]
async fn test_track_local_bind_deadline_exceeded() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let mut setting_engine = SettingEngine::default();
    setting_engine.set_net(Arc::clone(&net));
    setting_engine.set_negotiation_timeout(Duration::from_millis(50));

    let offerer = APIBuilder::new()
        .with_setting_engine(setting_engine)
        .with_media_engine(default_media_engine()?)
        .build()
        .new_peer_connection()?;
    let answerer = new_api(&net, default_media_engine()?).new_peer_connection()?;

    let sender = offerer
        .add_track(Arc::new(SlowTrack {
            delay: Duration::from_secs(5),
        }))
        .await?;

    assert_eq!(
        signal_pair(&offerer, &answerer).await,
        Err(Error::ErrDeadlineExceeded)
    );
    assert!(!sender.is_bound().await);

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_remove_track_releases_binding() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;

    let vp8_writer = Arc::new(TrackLocalStaticRTP::new(
        capability(MIME_TYPE_VP8),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    let sender = offerer.add_track(vp8_writer.clone()).await?;
    assert_eq!(
        offerer.add_track(vp8_writer.clone()).await.err(),
        Some(Error::ErrExistingTrack)
    );

    signal_pair(&offerer, &answerer).await?;
    assert_eq!(vp8_writer.binding_count().await, 1);
    assert_eq!(sender.negotiated_codecs().await.first().map(|c| c.payload_type), Some(96));

    offerer.remove_track(&sender).await?;
    assert_eq!(vp8_writer.binding_count().await, 0);
    assert!(sender.track().await.is_none());
    assert_eq!(
        offerer.remove_track(&sender).await,
        Err(Error::ErrSenderNotCreatedByConnection)
    );
    assert!(offerer.get_senders().await.is_empty());

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_renegotiation_keeps_binding() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;

    let vp8_writer = Arc::new(TrackLocalStaticRTP::new(
        capability(MIME_TYPE_VP8),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    offerer.add_track(vp8_writer.clone()).await?;

    signal_pair(&offerer, &answerer).await?;
    signal_pair(&offerer, &answerer).await?;
    assert_eq!(vp8_writer.binding_count().await, 1);

    // a second connection binds the same track once more
    let (second_offerer, second_answerer) = new_pair(&net)?;
    second_offerer.add_track(vp8_writer.clone()).await?;
    signal_pair(&second_offerer, &second_answerer).await?;
    assert_eq!(vp8_writer.binding_count().await, 2);

    offerer.close().await?;
    assert_eq!(vp8_writer.binding_count().await, 1);

    second_offerer.close().await?;
    answerer.close().await?;
    second_answerer.close().await?;
    assert_eq!(vp8_writer.binding_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_answer_directions() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;

    let offer_id = offerer
        .add_transceiver_from_kind(
            RtpCodecKind::Video,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Sendonly,
            }),
        )
        .await?;

    signal_pair(&offerer, &answerer).await?;

    assert_eq!(
        offerer.current_direction(offer_id).await,
        Some(RTCRtpTransceiverDirection::Sendonly)
    );
    assert_eq!(offerer.mid(offer_id).await.as_deref(), Some("0"));

    let answer = answerer.local_description().await;
    let section = answer
        .as_ref()
        .and_then(|a| a.media_sections.first())
        .ok_or_else(|| anyhow::anyhow!("answer without media section"))?;
    assert_eq!(section.direction, RTCRtpTransceiverDirection::Recvonly);
    assert!(section.stream.is_none());
    assert_eq!(answerer.get_receivers().await.len(), 1);
    assert!(answerer.get_senders().await.is_empty());

    offerer.close().await?;
    answerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_signaling_state_transitions() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, answerer) = new_pair(&net)?;
    offerer
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;

    assert_eq!(
        answerer.create_answer().await.err(),
        Some(Error::ErrNoRemoteDescription)
    );

    let offer = offerer.create_offer().await?;
    let mut tampered = offer.clone();
    tampered.media_sections.clear();
    assert_eq!(
        offerer.set_local_description(tampered).await,
        Err(Error::ErrSDPDoesNotMatchOffer)
    );
    assert_eq!(
        offerer
            .set_local_description(RTCSessionDescription::default())
            .await,
        Err(Error::ErrPeerConnSDPTypeInvalidValue)
    );

    offerer.set_local_description(offer.clone()).await?;
    assert_eq!(offerer.signaling_state().await, RTCSignalingState::HaveLocalOffer);
    assert!(offerer.local_description().await.is_some());

    answerer.set_remote_description(offer).await?;
    assert_eq!(answerer.signaling_state().await, RTCSignalingState::HaveRemoteOffer);

    let answer = answerer.create_answer().await?;
    answerer.set_local_description(answer.clone()).await?;
    assert_eq!(answerer.signaling_state().await, RTCSignalingState::Stable);

    offerer.set_remote_description(answer).await?;
    assert_eq!(offerer.signaling_state().await, RTCSignalingState::Stable);
    assert!(offerer.remote_description().await.is_some());

    offerer.close().await?;
    answerer.close().await?;
    assert_eq!(offerer.signaling_state().await, RTCSignalingState::Closed);
    assert_eq!(offerer.connection_state().await, RTCPeerConnectionState::Closed);

    Ok(())
}

#[tokio::test]
async fn test_rollback_local_offer() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (offerer, _answerer) = new_pair(&net)?;
    let id = offerer
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;

    let rollback = RTCSessionDescription {
        sdp_type: RTCSdpType::Rollback,
        ..Default::default()
    };
    assert_eq!(
        offerer.set_local_description(rollback.clone()).await,
        Err(Error::ErrSignalingStateCannotRollback)
    );

    let offer = offerer.create_offer().await?;
    offerer.set_local_description(offer).await?;
    assert_eq!(offerer.mid(id).await.as_deref(), Some("0"));

    offerer.set_local_description(rollback).await?;
    assert_eq!(offerer.signaling_state().await, RTCSignalingState::Stable);
    assert!(offerer.local_description().await.is_none());
    assert_eq!(offerer.mid(id).await, None);

    let offer = offerer.create_offer().await?;
    assert_eq!(
        offer.media_sections.first().map(|m| m.mid.as_str()),
        Some("0")
    );

    offerer.close().await?;

    Ok(())
}

#[tokio::test]
async fn test_closed_peer_connection() -> Result<()> {
    init_log();

    let net = Arc::new(Net::new());
    let (pc, _) = new_pair(&net)?;

    pc.close().await?;
    pc.close().await?;

    let track = Arc::new(TrackLocalStaticRTP::new(
        capability(MIME_TYPE_VP8),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    )?);
    assert_eq!(pc.add_track(track).await.err(), Some(Error::ErrConnectionClosed));
    assert_eq!(pc.create_offer().await.err(), Some(Error::ErrConnectionClosed));
    assert_eq!(
        pc.add_transceiver_from_kind(RtpCodecKind::Video, None)
            .await
            .err(),
        Some(Error::ErrConnectionClosed)
    );

    Ok(())
}
