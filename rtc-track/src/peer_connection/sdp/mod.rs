//! Structured session descriptions exchanged during offer/answer.

pub mod sdp_type;
pub mod session_description;

pub use sdp_type::RTCSdpType;
pub use session_description::{RTCMediaSection, RTCMediaStreamInfo, RTCSessionDescription};
