//! Registry of live rooms keyed by join code

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, GameSettings};

use super::arena::{catalog, Arena};
use super::task::{RoomHandle, RoomTask};
use super::Outbound;

/// Length of generated room codes
pub const ROOM_CODE_LEN: usize = 5;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Why a join was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinRejection {
    #[error("room is full")]
    RoomFull,

    #[error("match already in progress")]
    MatchInProgress,

    #[error("room not found")]
    RoomNotFound,

    #[error("display name must be 1-16 characters")]
    InvalidName,

    #[error("room is closed")]
    RoomClosed,
}

impl JoinRejection {
    /// Machine-readable reason sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            JoinRejection::RoomFull => "room_full",
            JoinRejection::MatchInProgress => "match_in_progress",
            JoinRejection::RoomNotFound => "room_not_found",
            JoinRejection::InvalidName => "invalid_name",
            JoinRejection::RoomClosed => "room_closed",
        }
    }
}

/// Outcome of a successful join
pub struct JoinedRoom {
    pub handle: RoomHandle,
    pub events_rx: broadcast::Receiver<Outbound>,
}

/// Registry of all live rooms
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    settings: GameSettings,
    arena: &'static Arena,
}

impl RoomRegistry {
    pub fn new(settings: GameSettings) -> Result<Self, ConfigError> {
        let arena = catalog()
            .get(&settings.arena_id)
            .ok_or_else(|| ConfigError::UnknownArena(settings.arena_id.clone()))?;
        Ok(Self {
            rooms: DashMap::new(),
            settings,
            arena,
        })
    }

    /// Create a room under a fresh code and start its task
    pub fn create_room(self: &Arc<Self>) -> RoomHandle {
        let mut rng = rand::thread_rng();
        loop {
            let code = generate_code(&mut rng);
            let handle = match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let seed = rng.gen::<u64>();
                    let (task, handle) =
                        RoomTask::new(code.clone(), self.settings.clone(), self.arena, seed);
                    slot.insert(handle.clone());

                    let registry = Arc::clone(self);
                    tokio::spawn(async move {
                        task.run().await;
                        registry.remove(&code);
                        info!(room = %code, "Room removed from registry");
                    });
                    handle
                }
            };

            info!(room = %handle.code, "Created new room");
            return handle;
        }
    }

    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    pub fn remove(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.remove(code).map(|(_, h)| h)
    }

    /// First room sitting in its lobby with a free slot
    pub fn find_open(&self) -> Option<RoomHandle> {
        self.rooms
            .iter()
            .find(|r| r.value().is_open())
            .map(|r| r.value().clone())
    }

    /// Join by code, or quick-join the first open lobby (creating one when
    /// none is available).
    pub async fn join(
        self: &Arc<Self>,
        player_id: Uuid,
        display_name: String,
        room_code: Option<&str>,
    ) -> Result<JoinedRoom, JoinRejection> {
        if let Some(code) = room_code {
            let code = code.trim().to_ascii_uppercase();
            let handle = self.get(&code).ok_or(JoinRejection::RoomNotFound)?;
            let events_rx = handle.join(player_id, display_name).await?;
            return Ok(JoinedRoom { handle, events_rx });
        }

        // Lobbies can fill or close between the lookup and the join
        const QUICK_JOIN_ATTEMPTS: usize = 3;
        for _ in 0..QUICK_JOIN_ATTEMPTS {
            let Some(handle) = self.find_open() else {
                break;
            };
            match handle.join(player_id, display_name.clone()).await {
                Ok(events_rx) => return Ok(JoinedRoom { handle, events_rx }),
                Err(reason) => {
                    warn!(room = %handle.code, player_id = %player_id, %reason, "Quick join raced")
                }
            }
        }

        let handle = self.create_room();
        let events_rx = handle.join(player_id, display_name).await?;
        Ok(JoinedRoom { handle, events_rx })
    }

    /// Snapshot of every live room handle
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.iter().map(|r| r.value().clone()).collect()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().player_count()).sum()
    }

    pub fn open_rooms(&self) -> usize {
        self.rooms.iter().filter(|r| r.value().is_open()).count()
    }
}

fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}
