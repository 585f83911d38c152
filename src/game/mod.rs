//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod combatant;
pub mod geometry;
pub mod physics;
pub mod registry;
pub mod room;
pub mod snapshot;
pub mod task;
pub mod tick;
pub mod timers;

pub use registry::{JoinRejection, RoomRegistry};
pub use room::RoomPhase;
pub use task::RoomHandle;

use crate::ws::protocol::{ClientMsg, ServerMsg};
use uuid::Uuid;

/// Player message routed to a room
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Input state for a single tick (processed from ClientMsg::Input)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub seq: u32,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub ascend: bool,
    pub descend: bool,
    pub shoot: bool,
    pub aim: f32,
}

/// A server message addressed to the whole room or a single player
#[derive(Debug, Clone)]
pub struct Outbound {
    pub to: Option<Uuid>,
    pub msg: ServerMsg,
}

impl Outbound {
    pub fn is_for(&self, player_id: Uuid) -> bool {
        self.to.map_or(true, |to| to == player_id)
    }
}
