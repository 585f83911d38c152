//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::RoomPhase;

/// Movement archetypes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Fuel-gated thrust, falls when idle
    Jetpack,
    /// Fast but slippery, glides while moving
    Wings,
    /// Slow but precise, hovers freely
    Levitation,
}

impl Default for MovementType {
    fn default() -> Self {
        Self::Jetpack
    }
}

/// Weapon archetypes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    /// Standard traveling bolt
    Blaster,
    /// Slow heavy projectile
    Launcher,
    /// Rapid hitscan with wide spread
    Repeater,
    /// One-shot hitscan
    Railgun,
}

impl Default for WeaponType {
    fn default() -> Self {
        Self::Blaster
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to join a room
    Join {
        display_name: String,
        /// Specific room code, otherwise the first open lobby is used
        #[serde(default)]
        room_code: Option<String>,
    },

    /// Leave the current room
    Leave,

    /// Lobby ready flag
    SetReady { ready: bool },

    /// Pick movement and weapon archetypes
    SelectLoadout {
        movement: MovementType,
        weapon: WeaponType,
    },

    /// Loadout-phase ready flag
    SetLoadoutReady { ready: bool },

    /// Host request to leave the lobby and begin a match
    StartMatch,

    /// Player input for current tick
    Input {
        /// Monotonic sequence number, stale inputs are dropped
        seq: u32,
        #[serde(default)]
        up: bool,
        #[serde(default)]
        down: bool,
        #[serde(default)]
        left: bool,
        #[serde(default)]
        right: bool,
        #[serde(default)]
        ascend: bool,
        #[serde(default)]
        descend: bool,
        #[serde(default)]
        shoot: bool,
        /// Aim direction in radians
        aim: f32,
    },

    /// Manual reload
    Reload,

    /// Respawn after death
    Respawn,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { player_id: Uuid, server_time: u64 },

    /// Confirmation of room join
    Joined { room_code: String, player_id: Uuid },

    /// Join refused
    JoinRejected { reason: String },

    /// Lobby roster, sent on every roster change
    Roster {
        room_code: String,
        phase: RoomPhase,
        host_id: Option<Uuid>,
        members: Vec<MemberInfo>,
    },

    /// Match setup began, players pick loadouts. Carries the geometry of
    /// the start arena and every arena reachable from it.
    LoadoutPhase {
        arena_id: String,
        arenas: Vec<ArenaInfo>,
    },

    /// Countdown before combat
    Countdown { seconds_remaining: u32 },

    /// Combat has started
    MatchStarted { tick: u64 },

    /// World state snapshot (sent every tick while active)
    Snapshot {
        tick: u64,
        timestamp: u64,
        combatants: Vec<CombatantSnapshot>,
        projectiles: Vec<ProjectileSnapshot>,
        obstacles: Vec<ObstacleSnapshot>,
        /// Events that occurred during this tick
        events: Vec<GameEvent>,
    },

    /// Match finished
    MatchEnded {
        winner_id: Option<Uuid>,
        scores: Vec<PlayerScore>,
    },

    /// Outcome of a request, sent to the requester only
    ActionResult { action: String, ok: bool },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Lobby roster entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub player_id: Uuid,
    pub display_name: String,
    pub ready: bool,
    pub loadout_ready: bool,
    pub movement: MovementType,
    pub weapon: WeaponType,
    pub is_host: bool,
}

/// Combatant state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub player_id: Uuid,
    pub arena_id: String,
    pub x: f32,
    pub y: f32,
    /// Altitude (0-100)
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub facing: f32,
    pub health: f32,
    pub max_health: f32,
    pub fuel: f32,
    pub max_fuel: f32,
    pub movement: MovementType,
    pub weapon: WeaponType,
    pub ammo: u32,
    pub clip_size: u32,
    pub reloading: bool,
    pub spawn_protected: bool,
    pub dead: bool,
    pub kills: u32,
    pub deaths: u32,
    /// Last processed input sequence
    pub last_input_seq: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub owner_id: Uuid,
    pub arena_id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,
    pub weapon: WeaponType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    pub id: u32,
    pub arena_id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub health: f32,
    pub max_health: f32,
}

/// Axis-aligned rectangle on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectInfo {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointInfo {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub rect: RectInfo,
    pub elevation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorInfo {
    pub rect: RectInfo,
    pub target_arena: String,
    pub target: PointInfo,
}

/// Static arena layout sent once per match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaInfo {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub walls: Vec<RectInfo>,
    pub platforms: Vec<PlatformInfo>,
    pub spawn_points: Vec<PointInfo>,
    pub doors: Vec<DoorInfo>,
}

/// Discrete combat events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Damage landed on a combatant
    Hit {
        target_id: Uuid,
        source_id: Uuid,
        damage: f32,
    },

    /// Combatant killed. No killer when the source is gone or was the victim.
    Kill {
        killer_id: Option<Uuid>,
        victim_id: Uuid,
    },

    /// Instant-travel shot, from muzzle to impact point
    HitscanBeam {
        source_id: Uuid,
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
    },

    /// Breakable obstacle reduced to zero health
    ObstacleDestroyed { obstacle_id: u32 },
}

/// Final tally per player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: Uuid,
    pub display_name: String,
    pub kills: u32,
    pub deaths: u32,
}
