use std::any::Any;
use std::collections::HashMap;

use unicase::UniCase;

use super::Fmtp;

#[derive(Debug, PartialEq)]
pub(crate) struct GenericFmtp {
    pub(crate) mime_type: String,
    pub(crate) parameters: HashMap<String, String>,
}

impl Fmtp for GenericFmtp {
    fn mime_type(&self) -> &str {
        self.mime_type.as_str()
    }

    /// Match returns true if g and b are compatible fmtp descriptions
    /// The generic implementation is used for MimeTypes that are not defined
    fn match_fmtp(&self, f: &(dyn Fmtp)) -> bool {
        let Some(c) = f.as_any().downcast_ref::<GenericFmtp>() else {
            return false;
        };

        if UniCase::new(self.mime_type.as_str()) != UniCase::new(c.mime_type.as_str()) {
            return false;
        }

        self.parameters.iter().all(|(k, v)| match c.parameter(k) {
            Some(vb) => vb.eq_ignore_ascii_case(v),
            None => true,
        })
    }

    fn parameter(&self, key: &str) -> Option<&String> {
        self.parameters.get(key)
    }

    fn as_any(&self) -> &(dyn Any) {
        self
    }
}
