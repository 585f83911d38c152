//! Application state shared across routes

use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::game::RoomRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let rooms = Arc::new(RoomRegistry::new(config.game.clone())?);

        Ok(Self {
            config: Arc::new(config),
            rooms,
        })
    }
}
