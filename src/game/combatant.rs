//! In-match player state

use uuid::Uuid;

use crate::ws::protocol::{MovementType, WeaponType};

use super::arena::Arena;
use super::combat::{WeaponStats, HIT_ALTITUDE_TOLERANCE};
use super::geometry::Vec2;
use super::physics::MovementStats;

/// Player state in a match (authoritative)
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: Uuid,
    pub display_name: String,
    pub arena: &'static Arena,

    // Position and movement
    pub x: f32,
    pub y: f32,
    /// Altitude in [0, 100]
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub facing: f32,

    // Loadout
    pub movement: MovementType,
    pub weapon: WeaponType,

    // Resources
    pub health: f32,
    pub fuel: f32,
    pub ammo: u32,
    pub reloading: bool,
    pub last_shot_at: Option<u64>,

    pub spawn_protected: bool,
    pub dead: bool,

    // Input tracking
    pub last_input_seq: u32,

    // Stats
    pub kills: u32,
    pub deaths: u32,
}

impl Combatant {
    pub fn new(
        id: Uuid,
        display_name: String,
        movement: MovementType,
        weapon: WeaponType,
        arena: &'static Arena,
        spawn: Vec2,
    ) -> Self {
        let stats = MovementStats::for_type(movement);
        Self {
            id,
            display_name,
            arena,
            x: spawn.x,
            y: spawn.y,
            z: 0.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            facing: 0.0,
            movement,
            weapon,
            health: stats.max_health,
            fuel: stats.max_fuel,
            ammo: WeaponStats::for_type(weapon).clip_size,
            reloading: false,
            last_shot_at: None,
            spawn_protected: false,
            dead: false,
            last_input_seq: 0,
            kills: 0,
            deaths: 0,
        }
    }

    pub fn movement_stats(&self) -> MovementStats {
        MovementStats::for_type(self.movement)
    }

    pub fn weapon_stats(&self) -> WeaponStats {
        WeaponStats::for_type(self.weapon)
    }

    pub fn radius(&self) -> f32 {
        self.movement_stats().radius
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Put the combatant back into play at `spawn` with full resources.
    /// Kill and death counts are kept.
    pub fn reset_at(&mut self, arena: &'static Arena, spawn: Vec2) {
        let stats = self.movement_stats();
        self.arena = arena;
        self.x = spawn.x;
        self.y = spawn.y;
        self.z = 0.0;
        self.vx = 0.0;
        self.vy = 0.0;
        self.vz = 0.0;
        self.health = stats.max_health;
        self.fuel = stats.max_fuel;
        self.ammo = self.weapon_stats().clip_size;
        self.reloading = false;
        self.last_shot_at = None;
        self.dead = false;
    }

    /// Switch archetypes. Any reload in progress is dropped and the clip is
    /// refilled for the new weapon; a live combatant is topped up to the new
    /// maxima.
    pub fn apply_loadout(&mut self, movement: MovementType, weapon: WeaponType) {
        self.movement = movement;
        self.weapon = weapon;
        self.ammo = self.weapon_stats().clip_size;
        self.reloading = false;
        if !self.dead {
            let stats = self.movement_stats();
            self.health = stats.max_health;
            self.fuel = stats.max_fuel;
        }
    }

    /// Whether a shot from `source` at `altitude` in `arena_id` may damage
    /// this combatant.
    pub fn can_be_hit_by(&self, source: Uuid, arena_id: &str, altitude: f32) -> bool {
        self.id != source
            && !self.dead
            && !self.spawn_protected
            && self.arena.id == arena_id
            && (self.z - altitude).abs() <= HIT_ALTITUDE_TOLERANCE
    }
}
