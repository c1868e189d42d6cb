#![allow(dead_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("io: read/write on closed pipe")]
    ErrClosedPipe,
    #[error("buffer: full")]
    ErrBufferFull,
    #[error("Unknown type")]
    ErrUnknownType,
    #[error("mutex poison: {0}")]
    PoisonError(String),

    //Codec registration
    /// ErrCodecMimeTypeEmpty indicates a codec or track was declared without a mime type
    #[error("codec mime type must not be empty")]
    ErrCodecMimeTypeEmpty,
    /// ErrCodecPayloadTypeInUse indicates the payload type is already registered for the kind
    #[error("payload type {0} is already registered for this kind")]
    ErrCodecPayloadTypeInUse(u8),
    /// ErrCodecAlreadyRegistered indicates an identical codec is already registered for the kind
    #[error("codec is already registered")]
    ErrCodecAlreadyRegistered,
    /// ErrCodecNotFound is returned when a codec search to the Media Engine fails
    #[error("codec not found")]
    ErrCodecNotFound,
    /// ErrNoCodecsAvailable indicates that operation isn't possible because the MediaEngine has no codecs available
    #[error("operation failed no codecs are available")]
    ErrNoCodecsAvailable,
    /// ErrNoPayloaderForCodec indicates that the requested codec does not have a payloader
    #[error("the requested codec does not have a payloader")]
    ErrNoPayloaderForCodec,

    //Track
    /// ErrTrackIdEmpty indicates a local track was declared without an id
    #[error("track id must not be empty")]
    ErrTrackIdEmpty,
    /// ErrUnsupportedCodec indicates the remote peer doesn't support the requested codec
    #[error("unable to start track, codec is not supported by remote")]
    ErrUnsupportedCodec,
    /// ErrUnbindFailed indicates that a TrackLocal was not able to be unbind
    #[error("failed to unbind TrackLocal from PeerConnection")]
    ErrUnbindFailed,
    /// ErrBindingAlreadyExists indicates a TrackLocal is already bound through the same sender
    #[error("TrackLocal is already bound to this RTPSender")]
    ErrBindingAlreadyExists,
    /// ErrDeadlineExceeded indicates negotiation did not finish binding in time
    #[error("negotiation deadline exceeded")]
    ErrDeadlineExceeded,

    //RTC
    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,
    /// ErrExistingTrack indicates that a track already exists.
    #[error("track already exists")]
    ErrExistingTrack,
    /// ErrNoRemoteDescription indicates that an operation was rejected because
    /// the remote description is not set
    #[error("remote description is not set")]
    ErrNoRemoteDescription,
    /// ErrSenderWithNoCodecs indicates that a RTPSender was created without any codecs. To send media the MediaEngine needs at
    /// least one codec for the kind of the track
    #[error("unable to populate media section, RTPSender created with no codecs")]
    ErrSenderWithNoCodecs,
    /// ErrSenderNotCreatedByConnection indicates remove_track was called with a
    /// RtpSender not created by this PeerConnection
    #[error("RtpSender not created by this PeerConnection")]
    ErrSenderNotCreatedByConnection,
    /// ErrRTPSenderNewTrackHasIncorrectKind indicates that the new track is of a different kind than the previous/original
    #[error("new track must be of the same kind as previous")]
    ErrRTPSenderNewTrackHasIncorrectKind,
    #[error("RTPSender has been stopped")]
    ErrRTPSenderStopped,
    #[error("cannot change mid of a negotiated RTPTransceiver")]
    ErrRTPTransceiverCannotChangeMid,
    /// ErrInvalidTransceiverDirection indicates a transceiver was requested with an unusable direction
    #[error("invalid transceiver direction")]
    ErrInvalidTransceiverDirection,
    #[error("new sdp does not match previous offer")]
    ErrSDPDoesNotMatchOffer,
    #[error("new sdp does not match previous answer")]
    ErrSDPDoesNotMatchAnswer,
    /// ErrPeerConnSDPTypeInvalidValue indicates a description without a type was applied
    #[error("invalid value for SDPType")]
    ErrPeerConnSDPTypeInvalidValue,
    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,
    #[error("invalid proposed signaling state transition: {0}")]
    ErrSignalingStateProposedTransitionInvalid(String),

    #[error("rtp: {0}")]
    Rtp(String),
    #[error("session description: {0}")]
    SessionDescription(String),
    #[error("{0}")]
    Other(String),
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::Other(errs_strs.join("\n")))
    }
}
