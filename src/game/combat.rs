//! Combat system - weapons, projectiles, hitscan tracing, damage

use rand::Rng;
use uuid::Uuid;

use crate::util::time::ticks_to_millis;
use crate::ws::protocol::WeaponType;

use super::arena::Arena;
use super::geometry::{ray_circle, ray_rect, Rect, Vec2};

/// Maximum altitude difference at which a shot can connect
pub const HIT_ALTITUDE_TOLERANCE: f32 = 25.0;

/// Distance beyond the shooter's radius at which projectiles spawn
pub const MUZZLE_OFFSET: f32 = 4.0;

/// Weapon stats per archetype
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Damage per hit
    pub damage: f32,
    /// Shots per second
    pub fire_rate: f32,
    pub clip_size: u32,
    /// Reload duration in simulation ticks
    pub reload_ticks: u32,
    /// Total spread cone in radians
    pub spread: f32,
    /// Resolves instantly by ray cast instead of spawning a projectile
    pub hitscan: bool,
    /// Hitscan reach
    pub range: f32,
    /// Projectile travel per tick
    pub projectile_speed: f32,
    /// Age at which an unspent projectile is discarded
    pub projectile_lifetime_ms: u64,
}

impl WeaponStats {
    pub fn for_type(weapon: WeaponType) -> Self {
        match weapon {
            WeaponType::Blaster => Self {
                damage: 20.0,
                fire_rate: 5.0,
                clip_size: 20,
                reload_ticks: 30,
                spread: 0.06,
                hitscan: false,
                range: 0.0,
                projectile_speed: 18.0,
                projectile_lifetime_ms: 2000,
            },
            WeaponType::Launcher => Self {
                damage: 45.0,
                fire_rate: 1.2,
                clip_size: 4,
                reload_ticks: 50,
                spread: 0.02,
                hitscan: false,
                range: 0.0,
                projectile_speed: 10.0,
                projectile_lifetime_ms: 4000,
            },
            WeaponType::Repeater => Self {
                damage: 9.0,
                fire_rate: 10.0,
                clip_size: 30,
                reload_ticks: 40,
                spread: 0.16,
                hitscan: true,
                range: 550.0,
                projectile_speed: 0.0,
                projectile_lifetime_ms: 0,
            },
            WeaponType::Railgun => Self {
                damage: 100.0,
                fire_rate: 0.8,
                clip_size: 3,
                reload_ticks: 60,
                spread: 0.0,
                hitscan: true,
                range: 1400.0,
                projectile_speed: 0.0,
                projectile_lifetime_ms: 0,
            },
        }
    }

    /// Minimum wall-clock gap between shots
    pub fn fire_interval_ms(&self) -> u64 {
        (1000.0 / self.fire_rate) as u64
    }

    pub fn reload_ms(&self) -> u64 {
        ticks_to_millis(self.reload_ticks)
    }
}

/// Active projectile in the game
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    pub owner_id: Uuid,
    pub arena: &'static Arena,
    pub x: f32,
    pub y: f32,
    /// Altitude the shot was fired at
    pub z: f32,
    pub angle: f32,
    pub speed: f32,
    pub damage: f32,
    pub weapon: WeaponType,
    pub created_at: u64,
    pub lifetime_ms: u64,
}

impl Projectile {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Move one tick along the fixed heading
    pub fn advance(&mut self) {
        self.x += self.angle.cos() * self.speed;
        self.y += self.angle.sin() * self.speed;
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.lifetime_ms
    }
}

/// What a hitscan ray connected with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitscanHit {
    Combatant(Uuid),
    Obstacle(u32),
}

/// Result of a hitscan trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitscanTrace {
    pub hit: Option<HitscanHit>,
    /// Where the beam stops: the impact point, or max range on a miss
    pub impact: Vec2,
    pub distance: f32,
}

/// Combat system for managing weapons and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if enough wall-clock time has passed since the last shot
    pub fn can_fire(now: u64, last_shot_at: Option<u64>, stats: &WeaponStats) -> bool {
        match last_shot_at {
            Some(last) => now.saturating_sub(last) >= stats.fire_interval_ms(),
            None => true,
        }
    }

    /// Uniform offset in [-spread/2, +spread/2]
    pub fn spread_offset<R: Rng>(rng: &mut R, spread: f32) -> f32 {
        if spread <= 0.0 {
            return 0.0;
        }
        rng.gen_range(-spread / 2.0..=spread / 2.0)
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = (current_health - damage).max(0.0);
        (new_health, new_health <= 0.0)
    }

    /// Cast a hitscan ray.
    ///
    /// Walls and obstacles occlude: only combatants closer than the nearest
    /// wall or obstacle (and within range) are considered. The nearest such
    /// combatant is hit; otherwise the nearest obstacle if it comes before
    /// any wall. `targets` must already be filtered for eligibility.
    pub fn trace_hitscan(
        origin: Vec2,
        dir: Vec2,
        range: f32,
        walls: &[Rect],
        obstacles: &[(u32, Rect)],
        targets: &[(Uuid, Vec2, f32)],
    ) -> HitscanTrace {
        let wall_t = walls
            .iter()
            .filter_map(|w| ray_rect(origin, dir, w))
            .fold(f32::INFINITY, f32::min);

        let nearest_obstacle = obstacles
            .iter()
            .filter_map(|(id, rect)| ray_rect(origin, dir, rect).map(|t| (*id, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let obstacle_t = nearest_obstacle.map(|(_, t)| t).unwrap_or(f32::INFINITY);

        let block_t = wall_t.min(obstacle_t).min(range);

        let nearest_target = targets
            .iter()
            .filter_map(|(id, center, radius)| {
                ray_circle(origin, dir, *center, *radius).map(|t| (*id, t))
            })
            .filter(|(_, t)| *t <= block_t)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let (hit, distance) = match (nearest_target, nearest_obstacle) {
            (Some((id, t)), _) => (Some(HitscanHit::Combatant(id)), t),
            (None, Some((id, t))) if t < wall_t && t <= range => (Some(HitscanHit::Obstacle(id)), t),
            _ => (None, wall_t.min(range)),
        };

        HitscanTrace {
            hit,
            impact: origin + dir * distance,
            distance,
        }
    }
}
