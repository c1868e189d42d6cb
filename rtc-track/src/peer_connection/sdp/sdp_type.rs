use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::UNSPECIFIED_STR;

/// Describes the type of a session description in the offer/answer model.
///
/// # Examples
///
/// ```
/// use rtc_track::peer_connection::sdp::RTCSdpType;
///
/// let offer_type = RTCSdpType::Offer;
/// assert_eq!(offer_type.to_string(), "offer");
///
/// let parsed: RTCSdpType = "answer".into();
/// assert_eq!(parsed, RTCSdpType::Answer);
/// ```
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCSdpType {
    /// Type not specified. This is the default value and should not be used
    /// in actual negotiation.
    #[default]
    Unspecified = 0,

    /// Indicates that a description MUST be treated as an offer.
    #[serde(rename = "offer")]
    Offer,

    /// Indicates that a description MUST be treated as a final answer.
    ///
    /// Applying an answer completes the exchange: negotiated codecs are fixed
    /// and local tracks are bound.
    #[serde(rename = "answer")]
    Answer,

    /// Indicates that a description MUST be treated as canceling the current
    /// negotiation, returning the signaling state to stable.
    #[serde(rename = "rollback")]
    Rollback,
}

const SDP_TYPE_OFFER_STR: &str = "offer";
const SDP_TYPE_ANSWER_STR: &str = "answer";
const SDP_TYPE_ROLLBACK_STR: &str = "rollback";

/// creates an SDPType from a string
impl From<&str> for RTCSdpType {
    fn from(raw: &str) -> Self {
        match raw {
            SDP_TYPE_OFFER_STR => RTCSdpType::Offer,
            SDP_TYPE_ANSWER_STR => RTCSdpType::Answer,
            SDP_TYPE_ROLLBACK_STR => RTCSdpType::Rollback,
            _ => RTCSdpType::Unspecified,
        }
    }
}

impl fmt::Display for RTCSdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCSdpType::Offer => write!(f, "{SDP_TYPE_OFFER_STR}"),
            RTCSdpType::Answer => write!(f, "{SDP_TYPE_ANSWER_STR}"),
            RTCSdpType::Rollback => write!(f, "{SDP_TYPE_ROLLBACK_STR}"),
            _ => write!(f, "{}", UNSPECIFIED_STR),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_sdp_type() {
        let tests = vec![
            ("Unspecified", RTCSdpType::Unspecified),
            ("offer", RTCSdpType::Offer),
            ("answer", RTCSdpType::Answer),
            ("rollback", RTCSdpType::Rollback),
        ];

        for (sdp_type_string, expected_sdp_type) in tests {
            assert_eq!(RTCSdpType::from(sdp_type_string), expected_sdp_type);
        }
    }

    #[test]
    fn test_sdp_type_string() {
        let tests = vec![
            (RTCSdpType::Unspecified, "Unspecified"),
            (RTCSdpType::Offer, "offer"),
            (RTCSdpType::Answer, "answer"),
            (RTCSdpType::Rollback, "rollback"),
        ];

        for (sdp_type, expected_string) in tests {
            assert_eq!(sdp_type.to_string(), expected_string);
        }
    }
}
