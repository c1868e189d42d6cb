use std::time::{Duration, SystemTime};

use bytes::Bytes;

/// A Sample contains encoded media and timing information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// The assembled data in the sample, as a bitstream.
    ///
    /// The format is Codec dependant, but is always a byte stream of media
    /// that a payloader for that codec can split into RTP payloads.
    pub data: Bytes,

    /// Wallclock time when this sample was generated.
    pub timestamp: SystemTime,

    /// The duration of this sample, used to advance the RTP timestamp.
    pub duration: Duration,

    /// The number of packets that were dropped prior to building this sample.
    ///
    /// Packets being dropped doesn't necessarily indicate something is wrong, e.g., packets are sometimes
    /// dropped because they aren't relevant for sample building.
    pub prev_dropped_packets: u16,
}

impl Default for Sample {
    fn default() -> Self {
        Sample {
            data: Bytes::new(),
            timestamp: SystemTime::now(),
            duration: Duration::from_secs(0),
            prev_dropped_packets: 0,
        }
    }
}
