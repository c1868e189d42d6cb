use std::any::Any;
use std::collections::HashMap;

use super::Fmtp;
use crate::peer_connection::configuration::media_engine::MIME_TYPE_H264;

/// profile_level_id_matches compares the profile_idc and profile_iop bytes
/// (the first two bytes) of two hex encoded profile-level-id values.
fn profile_level_id_matches(a: &str, b: &str) -> bool {
    fn profile(id: &str) -> Option<(u8, u8)> {
        if id.len() < 4 || !id.is_char_boundary(4) {
            return None;
        }
        let idc = u8::from_str_radix(&id[0..2], 16).ok()?;
        let iop = u8::from_str_radix(&id[2..4], 16).ok()?;
        Some((idc, iop))
    }

    match (profile(a), profile(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct H264Fmtp {
    pub(crate) parameters: HashMap<String, String>,
}

impl Fmtp for H264Fmtp {
    fn mime_type(&self) -> &str {
        MIME_TYPE_H264
    }

    /// Match returns true if h and b are compatible fmtp descriptions
    /// Based on RFC6184 Section 8.2.2:
    ///   The parameters identifying a media format configuration for H.264
    ///   are profile-level-id and packetization-mode.  These media format
    ///   configuration parameters (except for the level part of profile-
    ///   level-id) MUST be used symmetrically; that is, the answerer MUST
    ///   either maintain all configuration parameters or remove the media
    ///   format (payload type) completely if one or more of the parameter
    ///   values are not supported.
    ///     Informative note: The requirement for symmetric use does not
    ///     apply for the level part of profile-level-id and does not apply
    ///     for the other stream properties and capability parameters.
    fn match_fmtp(&self, f: &(dyn Fmtp)) -> bool {
        let Some(c) = f.as_any().downcast_ref::<H264Fmtp>() else {
            return false;
        };

        // test packetization-mode
        let hpmode = self
            .parameters
            .get("packetization-mode")
            .map(String::as_str)
            .unwrap_or("0");
        let cpmode = c
            .parameters
            .get("packetization-mode")
            .map(String::as_str)
            .unwrap_or("0");
        if hpmode != cpmode {
            return false;
        }

        // test profile-level-id
        let (Some(hplid), Some(cplid)) = (
            self.parameters.get("profile-level-id"),
            c.parameters.get("profile-level-id"),
        ) else {
            return false;
        };

        profile_level_id_matches(hplid, cplid)
    }

    fn parameter(&self, key: &str) -> Option<&String> {
        self.parameters.get(key)
    }

    fn as_any(&self) -> &(dyn Any) {
        self
    }
}
