//! Media tracks: locally sourced tracks that are bound to peer connections and
//! remote tracks surfaced by them.

pub mod track_local;
pub mod track_remote;
