//! Low level knobs of a peer connection that are not part of the W3C API.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use rtc_track::peer_connection::configuration::setting_engine::SettingEngine;
//!
//! let mut setting_engine = SettingEngine::default();
//! // Fail negotiation if tracks cannot be bound within two seconds
//! setting_engine.set_negotiation_timeout(Duration::from_secs(2));
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::constants::DEFAULT_NEGOTIATION_TIMEOUT;
use crate::transport::Net;

#[derive(Default, Debug, Clone)]
pub struct Timeout {
    pub(crate) negotiation: Option<Duration>,
}

/// SettingEngine allows influencing behavior in ways that are not
/// supported by the WebRTC API. This allows us to support additional
/// use-cases without deviating from the WebRTC API elsewhere.
#[derive(Default, Debug, Clone)]
pub struct SettingEngine {
    pub(crate) timeout: Timeout,
    pub(crate) net: Option<Arc<Net>>,
}

impl SettingEngine {
    /// set_negotiation_timeout sets how long binding tracks after an answer may take
    /// before the negotiation fails with `ErrDeadlineExceeded`. Defaults to ten seconds.
    pub fn set_negotiation_timeout(&mut self, timeout: Duration) {
        self.timeout.negotiation = Some(timeout);
    }

    /// set_net sets the loopback network peer connections exchange media over.
    /// Peer connections that should reach each other must share the same Net;
    /// when unset, the process wide default Net is used.
    pub fn set_net(&mut self, net: Arc<Net>) {
        self.net = Some(net);
    }

    pub(crate) fn negotiation_timeout(&self) -> Duration {
        self.timeout.negotiation.unwrap_or(DEFAULT_NEGOTIATION_TIMEOUT)
    }

    pub(crate) fn net(&self) -> Arc<Net> {
        self.net.clone().unwrap_or_else(Net::default_net)
    }
}
