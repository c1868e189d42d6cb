//! Configuration of peer connections: the codec registry and the setting engine.

pub mod media_engine;
pub mod setting_engine;
