use std::any::Any;

use async_trait::async_trait;
use log::trace;
use tokio::sync::Mutex;

use super::track_local_static_rtp::TrackLocalStaticRTP;
use super::*;
use crate::constants::RTP_OUTBOUND_MTU;
use crate::media::Sample;
use shared::error::{Error, flatten_errs};

#[derive(Debug)]
struct TrackLocalStaticSampleInternal {
    packetizer: Option<Box<dyn rtp::packetizer::Packetizer + Send + Sync>>,
    clock_rate: f64,
}

/// TrackLocalStaticSample is a TrackLocal that has a pre-set codec and accepts Samples.
/// If you wish to send a RTP Packet use TrackLocalStaticRTP
#[derive(Debug)]
pub struct TrackLocalStaticSample {
    rtp_track: TrackLocalStaticRTP,
    internal: Mutex<TrackLocalStaticSampleInternal>,
}

impl TrackLocalStaticSample {
    /// returns a TrackLocalStaticSample
    pub fn new(codec: RTCRtpCodecCapability, id: String, stream_id: String) -> Result<Self> {
        let rtp_track = TrackLocalStaticRTP::new(codec, id, stream_id)?;

        Ok(TrackLocalStaticSample {
            rtp_track,
            internal: Mutex::new(TrackLocalStaticSampleInternal {
                packetizer: None,
                clock_rate: 0.0f64,
            }),
        })
    }

    /// returns a TrackLocalStaticSample with rid
    pub fn new_with_rid(
        codec: RTCRtpCodecCapability,
        id: String,
        rid: String,
        stream_id: String,
    ) -> Result<Self> {
        let rtp_track = TrackLocalStaticRTP::new_with_rid(codec, id, rid, stream_id)?;

        Ok(TrackLocalStaticSample {
            rtp_track,
            internal: Mutex::new(TrackLocalStaticSampleInternal {
                packetizer: None,
                clock_rate: 0.0f64,
            }),
        })
    }

    /// binding_count returns the number of peer connections this track is currently bound to
    pub async fn binding_count(&self) -> usize {
        self.rtp_track.binding_count().await
    }

    /// write_sample writes a Sample to the TrackLocalStaticSample
    /// If one PeerConnection fails the packets will still be sent to
    /// all PeerConnections. The error message will contain the ID of the failed
    /// PeerConnections so you can remove them
    ///
    /// Samples written before the first successful bind are dropped.
    pub async fn write_sample(&self, sample: &Sample) -> Result<()> {
        let packets = {
            let mut internal = self.internal.lock().await;
            let clock_rate = internal.clock_rate;

            let Some(packetizer) = internal.packetizer.as_mut() else {
                return Ok(());
            };

            // skip packets by the number of previously dropped packets
            let samples = (sample.duration.as_secs_f64() * clock_rate) as u32;
            if sample.prev_dropped_packets > 0 {
                packetizer.skip_samples(
                    samples.wrapping_mul(u32::from(sample.prev_dropped_packets)),
                );
            }

            packetizer
                .packetize(&sample.data, samples)
                .map_err(|e| Error::Rtp(e.to_string()))?
        };

        let mut write_errs = vec![];
        for p in packets {
            if let Err(err) = self.rtp_track.write_rtp(&p).await {
                write_errs.push(err);
            }
        }

        flatten_errs(write_errs)
    }
}

#[async_trait]
impl TrackLocal for TrackLocalStaticSample {
    /// Bind is called by the PeerConnection after negotiation is complete
    /// This asserts that the code requested is supported by the remote peer.
    /// If so it setups all the state (SSRC and PayloadType) to have a call
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters> {
        let mut internal = self.internal.lock().await;

        self.rtp_track
            .bind_with(t, |codec| {
                // We only need one packetizer
                if internal.packetizer.is_some() {
                    return Ok(());
                }

                let payloader = codec.capability.payloader_for_codec()?;
                let sequencer: Box<dyn rtp::sequence::Sequencer + Send + Sync> =
                    Box::new(rtp::sequence::new_random_sequencer());
                internal.packetizer = Some(Box::new(rtp::packetizer::new_packetizer(
                    RTP_OUTBOUND_MTU,
                    0, // Value is handled when writing
                    0, // Value is handled when writing
                    payloader,
                    sequencer,
                    codec.capability.clock_rate,
                )));
                internal.clock_rate = codec.capability.clock_rate as f64;
                trace!(
                    "packetizer for {} created at {} Hz",
                    codec.capability.mime_type, codec.capability.clock_rate
                );

                Ok(())
            })
            .await
    }

    /// unbind implements the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()> {
        self.rtp_track.unbind(t).await
    }

    /// id is the unique identifier for this Track. This should be unique for the
    /// stream, but doesn't have to globally unique. A common example would be 'audio' or 'video'
    /// and StreamID would be 'desktop' or 'webcam'
    fn id(&self) -> &str {
        self.rtp_track.id()
    }

    fn rid(&self) -> Option<&str> {
        self.rtp_track.rid()
    }

    /// stream_id is the group this track belongs too. This must be unique
    fn stream_id(&self) -> &str {
        self.rtp_track.stream_id()
    }

    /// kind controls if this TrackLocal is audio or video
    fn kind(&self) -> RtpCodecKind {
        self.rtp_track.kind()
    }

    fn codec(&self) -> RTCRtpCodecCapability {
        self.rtp_track.codec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl TrackLocalWriter for TrackLocalStaticSample {
    /// write_rtp bypasses the packetizer and writes a RTP packet as is, with
    /// SSRC and payload type rewritten per binding
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize> {
        self.rtp_track.write_rtp(p).await
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use bytes::Bytes;

    use super::super::test::*;
    use super::*;

    fn vp8_sample_track() -> Result<TrackLocalStaticSample> {
        TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: "video/VP8".to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            "video".to_owned(),
            "webrtc-rs".to_owned(),
        )
    }

    fn sample(len: usize) -> Sample {
        Sample {
            data: Bytes::from(vec![0xAAu8; len]),
            duration: Duration::from_millis(33),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_track_local_static_sample_write_before_bind() -> Result<()> {
        let track = vp8_sample_track()?;
        track.write_sample(&sample(16)).await?;
        assert_eq!(track.binding_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_track_local_static_sample_packetizes() -> Result<()> {
        let track = vp8_sample_track()?;
        let writer = Arc::new(WriterMock::default());
        let ctx = context("a", 4242, engine_with_vp8(96)?, writer.clone());

        let codec = track.bind(&ctx).await?;
        assert_eq!(codec.payload_type, 96);

        // larger than one MTU so it is split
        track.write_sample(&sample(3000)).await?;
        track.write_sample(&sample(10)).await?;

        let packets = writer.packets.lock().await;
        assert!(packets.len() >= 4);
        for p in packets.iter() {
            assert_eq!(p.header.ssrc, 4242);
            assert_eq!(p.header.payload_type, 96);
        }
        for w in packets.windows(2) {
            assert_eq!(
                w[1].header.sequence_number,
                w[0].header.sequence_number.wrapping_add(1)
            );
        }
        let last = &packets[packets.len() - 1];
        assert!(last.header.marker);
        // 33ms at 90kHz
        assert_eq!(
            last.header.timestamp.wrapping_sub(packets[0].header.timestamp),
            2970
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_track_local_static_sample_no_payloader() -> Result<()> {
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: "video/H265".to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            "video".to_owned(),
            "webrtc-rs".to_owned(),
        )?;

        let mut engine = MediaEngine::default();
        engine.register_codec(
            RTCRtpCodecParameters {
                capability: track.codec(),
                payload_type: 126,
                ..Default::default()
            },
            RtpCodecKind::Video,
        )?;
        let writer = Arc::new(WriterMock::default());
        let ctx = context("a", 1, Arc::new(engine), writer);

        assert_eq!(track.bind(&ctx).await, Err(Error::ErrNoPayloaderForCodec));
        // the failed bind left nothing behind
        assert_eq!(track.binding_count().await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_track_local_static_sample_write_fails_everywhere() -> Result<()> {
        let track = vp8_sample_track()?;
        let writer = Arc::new(WriterMock {
            fail: true,
            ..Default::default()
        });
        track
            .bind(&context("a", 1, engine_with_vp8(96)?, writer))
            .await?;

        assert!(track.write_sample(&sample(10)).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_track_local_static_sample_large_drop_count() -> Result<()> {
        let track = vp8_sample_track()?;
        let writer = Arc::new(WriterMock::default());
        let ctx = context("a", 4242, engine_with_vp8(96)?, writer.clone());
        track.bind(&ctx).await?;

        let one_second = Sample {
            data: Bytes::from_static(&[0xAA; 8]),
            duration: Duration::from_secs(1),
            ..Default::default()
        };
        track.write_sample(&one_second).await?;
        track
            .write_sample(&Sample {
                prev_dropped_packets: u16::MAX,
                ..one_second.clone()
            })
            .await?;

        let packets = writer.packets.lock().await;
        assert_eq!(packets.len(), 2);
        let expected = packets[0]
            .header
            .timestamp
            .wrapping_add(90000)
            .wrapping_add(90000u32.wrapping_mul(u32::from(u16::MAX)));
        assert_eq!(packets[1].header.timestamp, expected);

        Ok(())
    }
}
