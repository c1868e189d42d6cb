//! # RTC Track - local static tracks and their negotiation lifecycle
//!
//! This crate implements the locally-sourced media track of a WebRTC peer
//! connection and the negotiation glue that binds it to remote peers:
//!
//! - [`media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP`] accepts RTP packets
//! - [`media_stream::track_local::track_local_static_sample::TrackLocalStaticSample`] accepts media samples
//! - [`peer_connection::configuration::media_engine::MediaEngine`] holds the codec registry
//! - [`peer_connection::RTCPeerConnection`] negotiates, binds and tears down tracks
//!
//! A track is *bound* once per negotiated peer connection. Every bind freezes the
//! SSRC, the negotiated payload type and the write sink for that session; writes
//! fan out to all bindings. When the peer connection closes, its bindings are
//! released.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rtc_track::media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP;
//! use rtc_track::peer_connection::RTCPeerConnection;
//! use rtc_track::peer_connection::configuration::media_engine::MIME_TYPE_VP8;
//! use rtc_track::rtp_transceiver::rtp_sender::rtp_codec::RTCRtpCodecCapability;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let offerer = RTCPeerConnection::new()?;
//! let answerer = RTCPeerConnection::new()?;
//!
//! let track = Arc::new(TrackLocalStaticRTP::new(
//!     RTCRtpCodecCapability {
//!         mime_type: MIME_TYPE_VP8.to_owned(),
//!         ..Default::default()
//!     },
//!     "video".to_owned(),
//!     "webrtc-rs".to_owned(),
//! )?);
//! offerer.add_track(track.clone()).await?;
//!
//! let offer = offerer.create_offer().await?;
//! offerer.set_local_description(offer.clone()).await?;
//! answerer.set_remote_description(offer).await?;
//! let answer = answerer.create_answer().await?;
//! answerer.set_local_description(answer.clone()).await?;
//! offerer.set_remote_description(answer).await?;
//!
//! assert_eq!(track.binding_count().await, 1);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod api;
pub(crate) mod constants;
pub mod media;
pub mod media_stream;
pub mod peer_connection;
pub mod rtp_transceiver;
pub mod transport;
