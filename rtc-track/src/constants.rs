use std::time::Duration;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Maximum size of a packet produced by the sample packetizer
pub(crate) const RTP_OUTBOUND_MTU: usize = 1200;

/// Number of packets a loopback endpoint or a remote track buffers before writers wait
pub(crate) const RTP_CHANNEL_CAPACITY: usize = 256;

pub(crate) const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(10);
