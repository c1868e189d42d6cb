//! In-process loopback network carrying RTP packets between peer connections.
//!
//! Every peer connection owns one [`RTPTransport`] endpoint registered on a
//! [`Net`] under a random id. Session descriptions carry that id, so once
//! negotiation completes each side knows where to deliver its packets. A
//! bounded channel per endpoint buffers packets; like a UDP socket, an endpoint
//! that is not drained drops what does not fit instead of stalling its writers.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::sync::mpsc;

use crate::constants::RTP_CHANNEL_CAPACITY;
use crate::media_stream::track_local::TrackLocalWriter;
use shared::error::{Error, Result};
use shared::util::math_rand_alpha;

static DEFAULT_NET: LazyLock<Arc<Net>> = LazyLock::new(|| Arc::new(Net::new()));

/// Net is a hub of transport endpoints keyed by id.
#[derive(Default)]
pub struct Net {
    endpoints: Mutex<HashMap<String, mpsc::Sender<rtp::packet::Packet>>>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoints = self.endpoints.lock().map(|e| e.len()).unwrap_or_default();
        f.debug_struct("Net").field("endpoints", &endpoints).finish()
    }
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn default_net() -> Arc<Net> {
        Arc::clone(&DEFAULT_NET)
    }

    /// endpoint_count returns how many endpoints are registered
    pub fn endpoint_count(&self) -> Result<usize> {
        Ok(self.endpoints.lock()?.len())
    }

    fn bind(&self, id: &str) -> Result<mpsc::Receiver<rtp::packet::Packet>> {
        let (tx, rx) = mpsc::channel(RTP_CHANNEL_CAPACITY);
        self.endpoints.lock()?.insert(id.to_owned(), tx);
        Ok(rx)
    }

    fn unbind(&self, id: &str) -> Result<()> {
        self.endpoints.lock()?.remove(id);
        Ok(())
    }

    fn endpoint(&self, id: &str) -> Result<mpsc::Sender<rtp::packet::Packet>> {
        self.endpoints
            .lock()?
            .get(id)
            .cloned()
            .ok_or(Error::ErrClosedPipe)
    }
}

/// RTPTransport is the endpoint of one peer connection on a [`Net`].
pub struct RTPTransport {
    id: String,
    net: Arc<Net>,
    remote_id: Mutex<Option<String>>,
    inbound: Mutex<Option<mpsc::Receiver<rtp::packet::Packet>>>,
    closed: AtomicBool,
}

impl fmt::Debug for RTPTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTPTransport")
            .field("id", &self.id)
            .field("remote_id", &self.remote_id)
            .field("closed", &self.closed)
            .finish()
    }
}

impl RTPTransport {
    pub(crate) fn new(net: Arc<Net>) -> Result<Self> {
        let id = math_rand_alpha(16);
        let inbound = net.bind(&id)?;
        trace!("transport endpoint {id} registered");

        Ok(Self {
            id,
            net,
            remote_id: Mutex::new(None),
            inbound: Mutex::new(Some(inbound)),
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// connect points outbound packets to the endpoint of the remote peer
    pub(crate) fn connect(&self, remote_id: &str) -> Result<()> {
        debug!("transport {} connected to {remote_id}", self.id);
        *self.remote_id.lock()? = Some(remote_id.to_owned());
        Ok(())
    }

    /// take_inbound hands the receiving side of this endpoint to the read loop, once
    pub(crate) fn take_inbound(&self) -> Result<Option<mpsc::Receiver<rtp::packet::Packet>>> {
        Ok(self.inbound.lock()?.take())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.remote_id.lock()?.take();
        self.inbound.lock()?.take();
        self.net.unbind(&self.id)
    }
}

impl Drop for RTPTransport {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("failed to close transport {}: {err}", self.id);
        }
    }
}

#[async_trait]
impl TrackLocalWriter for RTPTransport {
    /// write_rtp delivers a packet to the remote endpoint and returns the number
    /// of payload bytes written.
    async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::ErrClosedPipe);
        }
        let remote_id = self.remote_id.lock()?.clone().ok_or(Error::ErrClosedPipe)?;
        let endpoint = self.net.endpoint(&remote_id)?;

        match endpoint.try_send(pkt.clone()) {
            Ok(()) => Ok(pkt.payload.len()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(
                    "endpoint {remote_id} is full, dropping packet {}",
                    pkt.header.sequence_number
                );
                Err(Error::ErrBufferFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::ErrClosedPipe),
        }
    }
}
