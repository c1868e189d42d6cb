use std::fmt;

use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use shared::error::{Error, Result};

/// Side of the connection a description is applied to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateChangeOp::SetLocal => f.write_str("local"),
            StateChangeOp::SetRemote => f.write_str("remote"),
        }
    }
}

/// Where a peer connection is in the offer/answer exchange.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSignalingState {
    /// No exchange in progress. Initial state, and the state after every
    /// completed or rolled back exchange.
    #[default]
    Stable,
    /// A local offer was applied and an answer is awaited.
    HaveLocalOffer,
    /// A remote offer was applied and a local answer is awaited.
    HaveRemoteOffer,
    Closed,
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RTCSignalingState::Stable => "stable",
            RTCSignalingState::HaveLocalOffer => "have-local-offer",
            RTCSignalingState::HaveRemoteOffer => "have-remote-offer",
            RTCSignalingState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Validates moving from `cur` to `next` by applying a `sdp_type` description
/// on the `op` side, returning `next` when allowed.
pub(crate) fn check_next_signaling_state(
    cur: RTCSignalingState,
    next: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    use RTCSdpType::{Answer, Offer, Rollback};
    use RTCSignalingState::{HaveLocalOffer, HaveRemoteOffer, Stable};
    use StateChangeOp::{SetLocal, SetRemote};

    if sdp_type == Rollback && cur == Stable {
        return Err(Error::ErrSignalingStateCannotRollback);
    }

    // only the side that applied the offer may roll it back
    let allowed = matches!(
        (cur, op, sdp_type, next),
        (Stable, SetLocal, Offer, HaveLocalOffer)
            | (Stable, SetRemote, Offer, HaveRemoteOffer)
            | (HaveLocalOffer, SetLocal, Offer, HaveLocalOffer)
            | (HaveLocalOffer, SetRemote, Answer, Stable)
            | (HaveRemoteOffer, SetLocal, Answer, Stable)
            | (HaveLocalOffer, SetLocal, Rollback, Stable)
            | (HaveRemoteOffer, SetRemote, Rollback, Stable)
    );

    if allowed {
        Ok(next)
    } else {
        Err(Error::ErrSignalingStateProposedTransitionInvalid(format!(
            "{cur} -> {next} applying {op} {sdp_type}"
        )))
    }
}
