use serde::{Deserialize, Serialize};

/// Google REMB (Receiver Estimated Maximum Bitrate) feedback type
pub const TYPE_RTCP_FB_GOOG_REMB: &str = "goog-remb";

/// Codec Control Message feedback type
pub const TYPE_RTCP_FB_CCM: &str = "ccm";

/// Negative Acknowledgment feedback type
pub const TYPE_RTCP_FB_NACK: &str = "nack";

/// Transport-wide congestion control feedback type
pub const TYPE_RTCP_FB_TRANSPORT_CC: &str = "transport-cc";

/// RTCP feedback parameters for specifying additional packet types.
///
/// Used to signal support for specific RTCP feedback mechanisms such as NACK, PLI, FIR, etc.
///
/// ## Specifications
///
/// * [ORTC](https://draft.ortc.org/#dom-rtcrtcpfeedback)
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCPFeedback {
    /// The type of feedback mechanism.
    ///
    /// Valid values: `ack`, `ccm`, `nack`, `goog-remb`, `transport-cc`
    pub typ: String,

    /// Additional parameter specific to the feedback type.
    ///
    /// For example: `type="nack" parameter="pli"` indicates Picture Loss Indicator packets.
    pub parameter: String,
}
