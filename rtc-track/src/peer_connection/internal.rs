use super::*;
use crate::peer_connection::sdp::session_description::{RTCMediaSection, RTCMediaStreamInfo};
use crate::peer_connection::state::signaling_state::check_next_signaling_state;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiveParameters;
use crate::rtp_transceiver::rtp_sender::rtp_codec::{CodecMatch, codec_parameters_fuzzy_search};
use crate::rtp_transceiver::{find_by_mid, satisfy_type_and_direction};
use log::{info, warn};

impl RTCPeerConnectionInternal {
    pub(super) fn add_rtp_transceiver(
        &mut self,
        kind: RtpCodecKind,
        sender: Option<Arc<RTCRtpSender>>,
        direction: RTCRtpTransceiverDirection,
    ) -> RTCRtpTransceiverId {
        let id = self.next_transceiver_id;
        self.next_transceiver_id += 1;
        self.rtp_transceivers
            .push(RTCRtpTransceiver::new(id, kind, sender, direction));
        id
    }

    pub(super) fn set_description(
        &mut self,
        sd: &RTCSessionDescription,
        op: StateChangeOp,
    ) -> Result<()> {
        if sd.sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrPeerConnSDPTypeInvalidValue);
        }

        let cur = self.signaling_state;
        let next_state = match op {
            StateChangeOp::SetLocal => match sd.sdp_type {
                // stable->SetLocal(offer)->have-local-offer
                RTCSdpType::Offer => {
                    if self.last_offer.as_ref() != Some(sd) {
                        return Err(Error::ErrSDPDoesNotMatchOffer);
                    }
                    let next_state = check_next_signaling_state(
                        cur,
                        RTCSignalingState::HaveLocalOffer,
                        op,
                        sd.sdp_type,
                    )?;
                    self.pending_local_description = Some(sd.clone());
                    next_state
                }
                // have-remote-offer->SetLocal(answer)->stable
                RTCSdpType::Answer => {
                    if self.last_answer.as_ref() != Some(sd) {
                        return Err(Error::ErrSDPDoesNotMatchAnswer);
                    }
                    let next_state =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    self.pending_local_description = None;
                    self.current_local_description = Some(sd.clone());
                    self.current_remote_description = self.pending_remote_description.take();
                    next_state
                }
                RTCSdpType::Rollback => {
                    let next_state =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    self.pending_local_description = None;
                    self.rollback();
                    next_state
                }
                RTCSdpType::Unspecified => return Err(Error::ErrPeerConnSDPTypeInvalidValue),
            },
            StateChangeOp::SetRemote => match sd.sdp_type {
                // stable->SetRemote(offer)->have-remote-offer
                RTCSdpType::Offer => {
                    let next_state = check_next_signaling_state(
                        cur,
                        RTCSignalingState::HaveRemoteOffer,
                        op,
                        sd.sdp_type,
                    )?;
                    self.pending_remote_description = Some(sd.clone());
                    next_state
                }
                // have-local-offer->SetRemote(answer)->stable
                RTCSdpType::Answer => {
                    let next_state =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    self.pending_remote_description = None;
                    self.current_remote_description = Some(sd.clone());
                    self.current_local_description = self.pending_local_description.take();
                    next_state
                }
                RTCSdpType::Rollback => {
                    let next_state =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    self.pending_remote_description = None;
                    self.rollback();
                    next_state
                }
                RTCSdpType::Unspecified => return Err(Error::ErrPeerConnSDPTypeInvalidValue),
            },
        };

        if next_state != self.signaling_state {
            info!("signaling state changed to {next_state}");
        }
        self.signaling_state = next_state;

        Ok(())
    }

    /// rollback forgets the mids handed out by the abandoned offer. Transceivers
    /// that were negotiated before keep theirs.
    fn rollback(&mut self) {
        for t in self.rtp_transceivers.iter_mut() {
            if t.current_direction() == RTCRtpTransceiverDirection::Unspecified {
                t.clear_mid();
            }
        }

        self.greater_mid = self
            .rtp_transceivers
            .iter()
            .filter_map(|t| t.mid().and_then(|mid| mid.parse::<isize>().ok()))
            .max()
            .unwrap_or(-1);

        if self.current_remote_description.is_none() {
            self.media_engine = self.media_engine.clone_to();
        }
    }

    /// generate_unmatched_sections assigns mids to new transceivers and returns
    /// one offer section per transceiver
    pub(super) async fn generate_unmatched_sections(&mut self) -> Result<Vec<RTCMediaSection>> {
        for t in self.rtp_transceivers.iter_mut() {
            if t.mid().is_none() && !t.stopped() {
                self.greater_mid += 1;
                t.set_mid(self.greater_mid.to_string())?;
            }
        }

        let mut media_sections = vec![];
        for t in &self.rtp_transceivers {
            if t.mid().is_none() {
                continue;
            }
            media_sections.push(local_media_section(t, &self.media_engine, t.direction()).await?);
        }

        Ok(media_sections)
    }

    /// generate_matched_sections answers every section of the remote offer, in
    /// the offer's order
    pub(super) async fn generate_matched_sections(
        &self,
        remote: &RTCSessionDescription,
    ) -> Result<Vec<RTCMediaSection>> {
        let mut media_sections = vec![];

        for remote_section in &remote.media_sections {
            let transceiver = find_by_mid(&remote_section.mid, &self.rtp_transceivers)
                .map(|i| &self.rtp_transceivers[i]);

            let section = match transceiver {
                Some(t)
                    if !remote_section.rejected
                        && !t.stopped()
                        && !t.get_codecs(&self.media_engine).is_empty() =>
                {
                    let direction = t.direction().intersect(remote_section.direction.reverse());
                    local_media_section(t, &self.media_engine, direction).await?
                }
                _ => {
                    debug!("rejecting {} section {}", remote_section.kind, remote_section.mid);
                    rejected_media_section(remote_section.mid.clone(), remote_section.kind)
                }
            };
            media_sections.push(section);
        }

        Ok(media_sections)
    }

    /// associate_remote_sections pairs every section of a remote offer with a
    /// local transceiver, creating receive only transceivers as needed
    pub(super) fn associate_remote_sections(&mut self, desc: &RTCSessionDescription) -> Result<()> {
        for section in &desc.media_sections {
            if let Ok(mid) = section.mid.parse::<isize>()
                && mid > self.greater_mid
            {
                self.greater_mid = mid;
            }

            if section.rejected
                || section.kind == RtpCodecKind::Unspecified
                || find_by_mid(&section.mid, &self.rtp_transceivers).is_some()
            {
                continue;
            }

            let index =
                match satisfy_type_and_direction(section.kind, section.direction, &self.rtp_transceivers) {
                    Some(index) => index,
                    None => {
                        let direction = if section.direction.has_send() {
                            RTCRtpTransceiverDirection::Recvonly
                        } else {
                            RTCRtpTransceiverDirection::Inactive
                        };
                        self.add_rtp_transceiver(section.kind, None, direction);
                        self.rtp_transceivers.len() - 1
                    }
                };

            trace!(
                "remote {} section {} associated with transceiver {}",
                section.kind,
                section.mid,
                self.rtp_transceivers[index].id()
            );
            self.rtp_transceivers[index].set_mid(section.mid.clone())?;
        }

        Ok(())
    }
}

fn rejected_media_section(mid: String, kind: RtpCodecKind) -> RTCMediaSection {
    RTCMediaSection {
        mid,
        kind,
        direction: RTCRtpTransceiverDirection::Inactive,
        codecs: vec![],
        rejected: true,
        stream: None,
    }
}

/// local_media_section describes a transceiver; the codec of its track leads
/// the codec list when the engine has one that matches
async fn local_media_section(
    t: &RTCRtpTransceiver,
    media_engine: &MediaEngine,
    direction: RTCRtpTransceiverDirection,
) -> Result<RTCMediaSection> {
    let mid = t.mid().unwrap_or_default().to_owned();
    if t.stopped() {
        return Ok(rejected_media_section(mid, t.kind()));
    }

    let mut codecs = t.get_codecs(media_engine);
    let track = match t.sender() {
        Some(sender) => sender.track().await.map(|track| (sender.ssrc(), track)),
        None => None,
    };

    let mut stream = None;
    if let Some((ssrc, track)) = track {
        if codecs.is_empty() {
            return Err(Error::ErrSenderWithNoCodecs);
        }

        let (preferred, codec_match) = codec_parameters_fuzzy_search(&track.codec(), &codecs);
        if codec_match != CodecMatch::None
            && let Some(pos) = codecs
                .iter()
                .position(|c| c.payload_type == preferred.payload_type)
        {
            let codec = codecs.remove(pos);
            codecs.insert(0, codec);
        }

        if direction.has_send() {
            stream = Some(RTCMediaStreamInfo {
                ssrc,
                stream_id: track.stream_id().to_owned(),
                track_id: track.id().to_owned(),
            });
        }
    }

    Ok(RTCMediaSection {
        mid,
        kind: t.kind(),
        direction,
        codecs,
        rejected: false,
        stream,
    })
}

impl RTCPeerConnection {
    /// start_rtp applies a completed offer/answer exchange: it fixes the current
    /// direction of every transceiver, prepares the receivers and binds the local
    /// tracks. The peer connection fails when a track cannot be bound.
    pub(super) async fn start_rtp(
        &self,
        internal: &mut RTCPeerConnectionInternal,
        local: &RTCSessionDescription,
        remote: &RTCSessionDescription,
    ) -> Result<()> {
        let result = self.start_rtp_senders_and_receivers(internal, local, remote).await;

        let next_state = if result.is_ok() {
            RTCPeerConnectionState::Connected
        } else {
            RTCPeerConnectionState::Failed
        };
        if next_state != internal.peer_connection_state {
            info!("peer connection state changed to {next_state}");
            internal.peer_connection_state = next_state;
        }

        result
    }

    async fn start_rtp_senders_and_receivers(
        &self,
        internal: &mut RTCPeerConnectionInternal,
        local: &RTCSessionDescription,
        remote: &RTCSessionDescription,
    ) -> Result<()> {
        self.transport.connect(&remote.transport_id)?;

        let (answer, answer_is_local) = if local.sdp_type == RTCSdpType::Answer {
            (local, true)
        } else {
            (remote, false)
        };

        for t in internal.rtp_transceivers.iter_mut() {
            let Some(mid) = t.mid().map(str::to_owned) else {
                continue;
            };
            let current_direction = match answer.media_section(&mid) {
                Some(section) if !section.rejected && !t.stopped() => {
                    if answer_is_local {
                        section.direction
                    } else {
                        section.direction.reverse()
                    }
                }
                _ => RTCRtpTransceiverDirection::Inactive,
            };
            t.set_current_direction(current_direction);
        }

        self.start_receivers(internal, remote).await;
        self.start_senders(internal, local).await?;
        self.start_read_loop(internal)
    }

    async fn start_receivers(
        &self,
        internal: &RTCPeerConnectionInternal,
        remote: &RTCSessionDescription,
    ) {
        for t in &internal.rtp_transceivers {
            if !t.current_direction().has_recv() {
                continue;
            }
            let Some((section, stream)) = t
                .mid()
                .and_then(|mid| remote.media_section(mid))
                .and_then(|section| section.stream.as_ref().map(|stream| (section, stream)))
            else {
                continue;
            };

            let params = RTCRtpReceiveParameters {
                ssrc: stream.ssrc,
                track_id: stream.track_id.clone(),
                stream_id: stream.stream_id.clone(),
                codecs: internal
                    .media_engine
                    .map_remote_codecs(&section.codecs, t.kind()),
            };
            t.receiver().receive(params).await;

            let mut receivers = self.receivers_by_ssrc.lock().await;
            receivers.insert(stream.ssrc, Arc::clone(t.receiver()));
        }
    }

    /// start_senders binds every sender of the local description. A failure
    /// unbinds the senders bound by this call before it is returned.
    async fn start_senders(
        &self,
        internal: &RTCPeerConnectionInternal,
        local: &RTCSessionDescription,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.setting_engine.negotiation_timeout();
        let media_engine = Arc::new(internal.media_engine.clone());
        let mut bound_senders: Vec<Arc<RTCRtpSender>> = vec![];

        for t in &internal.rtp_transceivers {
            if t.stopped() {
                continue;
            }
            let (Some(sender), Some(mid)) = (t.sender(), t.mid()) else {
                continue;
            };
            if local.media_section(mid).is_none() || sender.is_stopped() {
                continue;
            }

            sender.set_paused(!t.current_direction().has_send());

            let was_bound = sender.is_bound().await;
            let result = sender
                .send(
                    t.get_codecs(&internal.media_engine),
                    Some(mid.to_owned()),
                    Arc::clone(&media_engine),
                    deadline,
                )
                .await;

            if let Err(err) = result {
                warn!("{}: failed to bind sender {}: {err}", self.session_id, sender.id());
                for bound in bound_senders {
                    if let Err(unbind_err) = bound.unbind().await {
                        warn!("{}: failed to unbind sender {}: {unbind_err}", self.session_id, bound.id());
                    }
                }
                return Err(err);
            }

            if !was_bound && sender.is_bound().await {
                bound_senders.push(Arc::clone(sender));
            }
        }

        Ok(())
    }

    /// start_read_loop dispatches inbound packets to receivers by SSRC, once per
    /// peer connection
    fn start_read_loop(&self, internal: &mut RTCPeerConnectionInternal) -> Result<()> {
        if internal.read_loop.is_some() {
            return Ok(());
        }
        let Some(mut inbound) = self.transport.take_inbound()? else {
            return Ok(());
        };

        let receivers_by_ssrc = Arc::clone(&self.receivers_by_ssrc);
        let on_track_handler = Arc::clone(&self.on_track_handler);
        let session_id = self.session_id.clone();

        internal.read_loop = Some(tokio::spawn(async move {
            while let Some(pkt) = inbound.recv().await {
                let ssrc = pkt.header.ssrc;
                let receiver = {
                    let receivers = receivers_by_ssrc.lock().await;
                    receivers.get(&ssrc).cloned()
                };
                let Some(receiver) = receiver else {
                    trace!("{session_id}: no receiver for ssrc {ssrc}");
                    continue;
                };

                if let Some(track) = receiver.handle_rtp(pkt).await {
                    debug!(
                        "{session_id}: remote track {} arrived with payload type {}",
                        track.id(),
                        track.payload_type()
                    );
                    let mut handler = on_track_handler.lock().await;
                    if let Some(f) = handler.as_mut() {
                        tokio::spawn(f(track, receiver));
                    }
                }
            }
            trace!("{session_id}: read loop finished");
        }));

        Ok(())
    }
}
