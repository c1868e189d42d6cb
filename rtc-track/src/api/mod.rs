use std::sync::Arc;

use crate::peer_connection::RTCPeerConnection;
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use shared::error::Result;

/// API bundles the global functions of this crate: every peer connection it
/// creates gets its own copy of the media engine and shares the setting engine.
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) media_engine: MediaEngine,
}

impl API {
    /// new_peer_connection creates a new PeerConnection with the codecs and settings of this API
    pub fn new_peer_connection(&self) -> Result<RTCPeerConnection> {
        RTCPeerConnection::new_with_api(self)
    }

    pub fn setting_engine(&self) -> &SettingEngine {
        &self.setting_engine
    }

    pub fn media_engine(&self) -> &MediaEngine {
        &self.media_engine
    }
}

/// APIBuilder configures an [`API`].
///
/// Without a media engine the API has no codecs at all; use
/// [`MediaEngine::register_default_codecs`] to get the standard set.
#[derive(Default)]
pub struct APIBuilder {
    setting_engine: Option<Arc<SettingEngine>>,
    media_engine: Option<MediaEngine>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    pub fn build(mut self) -> API {
        API {
            setting_engine: if let Some(setting_engine) = self.setting_engine.take() {
                setting_engine
            } else {
                Arc::new(SettingEngine::default())
            },
            media_engine: if let Some(media_engine) = self.media_engine.take() {
                media_engine
            } else {
                MediaEngine::default()
            },
        }
    }

    /// with_setting_engine allows providing a SettingEngine to the API.
    /// Settings should not be changed after passing the engine to an API.
    pub fn with_setting_engine(mut self, setting_engine: SettingEngine) -> Self {
        self.setting_engine = Some(Arc::new(setting_engine));
        self
    }

    /// with_media_engine allows providing a MediaEngine to the API.
    /// Settings can be changed after passing the engine to an API.
    pub fn with_media_engine(mut self, media_engine: MediaEngine) -> Self {
        self.media_engine = Some(media_engine);
        self
    }
}
