pub(crate) mod peer_connection_state;
pub(crate) mod signaling_state;

pub use peer_connection_state::RTCPeerConnectionState;
pub use signaling_state::RTCSignalingState;
