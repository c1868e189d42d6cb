//! Format parameters (`a=fmtp`) parsing and compatibility checks.

mod generic;
mod h264;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use unicase::UniCase;

use crate::peer_connection::configuration::media_engine::MIME_TYPE_H264;
use generic::GenericFmtp;
use h264::H264Fmtp;

/// Fmtp interface for handling the format parameters of a codec
pub(crate) trait Fmtp: fmt::Debug {
    /// mime_type returns the mime type associated with the fmtp
    fn mime_type(&self) -> &str;

    /// match_fmtp compares two fmtp descriptions for compatibility based on the mime type
    fn match_fmtp(&self, f: &(dyn Fmtp)) -> bool;

    /// parameter returns a value for the associated key if contained in the parsed fmtp string
    fn parameter(&self, key: &str) -> Option<&String>;

    fn as_any(&self) -> &(dyn Any);
}

/// normalize parses a fmtp line into lower-cased keys and trimmed values.
///
/// Parameters without a value map to an empty string.
pub(crate) fn normalize(line: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    for p in line.split(';') {
        let p = p.trim();
        if p.is_empty() {
            continue;
        }
        let (key, value) = match p.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (p, ""),
        };
        parameters.insert(key.to_lowercase(), value.to_owned());
    }
    parameters
}

/// parse parses a fmtp string based on the mime type
pub(crate) fn parse(mime_type: &str, line: &str) -> Box<dyn Fmtp> {
    let parameters = normalize(line);

    if UniCase::new(mime_type) == UniCase::new(MIME_TYPE_H264) {
        Box::new(H264Fmtp {
            parameters,
        })
    } else {
        Box::new(GenericFmtp {
            mime_type: mime_type.to_owned(),
            parameters,
        })
    }
}

/// equivalent reports whether two fmtp lines carry the same parameters,
/// ignoring whitespace, key case and parameter order.
pub(crate) fn equivalent(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).is_some_and(|w| w.eq_ignore_ascii_case(v)))
}
