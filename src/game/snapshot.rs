//! Snapshot building for network transmission

use uuid::Uuid;

use crate::ws::protocol::{
    ArenaInfo, CombatantSnapshot, DoorInfo, GameEvent, MemberInfo, ObstacleSnapshot,
    PlatformInfo, PlayerScore, PointInfo, ProjectileSnapshot, RectInfo, ServerMsg,
};

use super::arena::{Arena, Obstacle};
use super::geometry::{Rect, Vec2};
use super::combat::Projectile;
use super::combatant::Combatant;
use super::room::{LobbyMember, RoomPhase};

/// Turns authoritative room state into outbound messages
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Full world state for one tick
    pub fn world(
        tick: u64,
        timestamp: u64,
        combatants: &[Combatant],
        projectiles: &[Projectile],
        obstacles: &[Obstacle],
        events: Vec<GameEvent>,
    ) -> ServerMsg {
        ServerMsg::Snapshot {
            tick,
            timestamp,
            combatants: combatants.iter().map(Self::combatant).collect(),
            projectiles: projectiles.iter().map(Self::projectile).collect(),
            obstacles: obstacles.iter().map(Self::obstacle).collect(),
            events,
        }
    }

    pub fn roster(
        code: &str,
        phase: RoomPhase,
        host: Option<Uuid>,
        roster: &[LobbyMember],
    ) -> ServerMsg {
        let members = roster
            .iter()
            .map(|m| MemberInfo {
                player_id: m.id,
                display_name: m.display_name.clone(),
                ready: m.ready,
                loadout_ready: m.loadout_ready,
                movement: m.movement,
                weapon: m.weapon,
                is_host: host == Some(m.id),
            })
            .collect();

        ServerMsg::Roster {
            room_code: code.to_string(),
            phase,
            host_id: host,
            members,
        }
    }

    /// Final tally, most kills first (participant order on ties)
    pub fn scores(combatants: &[Combatant]) -> Vec<PlayerScore> {
        let mut scores: Vec<PlayerScore> = combatants
            .iter()
            .map(|c| PlayerScore {
                player_id: c.id,
                display_name: c.display_name.clone(),
                kills: c.kills,
                deaths: c.deaths,
            })
            .collect();
        scores.sort_by(|a, b| b.kills.cmp(&a.kills));
        scores
    }

    /// Static layout of an arena
    pub fn arena(arena: &Arena) -> ArenaInfo {
        ArenaInfo {
            id: arena.id.to_string(),
            width: arena.width,
            height: arena.height,
            walls: arena.walls.iter().map(Self::rect).collect(),
            platforms: arena
                .platforms
                .iter()
                .map(|p| PlatformInfo {
                    rect: Self::rect(&p.rect),
                    elevation: p.height,
                })
                .collect(),
            spawn_points: arena.spawn_points.iter().copied().map(Self::point).collect(),
            doors: arena
                .doors
                .iter()
                .map(|d| DoorInfo {
                    rect: Self::rect(&d.rect),
                    target_arena: d.target_arena.to_string(),
                    target: Self::point(d.target),
                })
                .collect(),
        }
    }

    fn rect(r: &Rect) -> RectInfo {
        RectInfo {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }

    fn point(p: Vec2) -> PointInfo {
        PointInfo { x: p.x, y: p.y }
    }

    fn combatant(c: &Combatant) -> CombatantSnapshot {
        let movement = c.movement_stats();
        let weapon = c.weapon_stats();
        CombatantSnapshot {
            player_id: c.id,
            arena_id: c.arena.id.to_string(),
            x: c.x,
            y: c.y,
            z: c.z,
            vx: c.vx,
            vy: c.vy,
            vz: c.vz,
            facing: c.facing,
            health: c.health,
            max_health: movement.max_health,
            fuel: c.fuel,
            max_fuel: movement.max_fuel,
            movement: c.movement,
            weapon: c.weapon,
            ammo: c.ammo,
            clip_size: weapon.clip_size,
            reloading: c.reloading,
            spawn_protected: c.spawn_protected,
            dead: c.dead,
            kills: c.kills,
            deaths: c.deaths,
            last_input_seq: c.last_input_seq,
        }
    }

    fn projectile(p: &Projectile) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: p.id,
            owner_id: p.owner_id,
            arena_id: p.arena.id.to_string(),
            x: p.x,
            y: p.y,
            z: p.z,
            angle: p.angle,
            weapon: p.weapon,
        }
    }

    fn obstacle(o: &Obstacle) -> ObstacleSnapshot {
        ObstacleSnapshot {
            id: o.id,
            arena_id: o.arena_id.to_string(),
            x: o.rect.x,
            y: o.rect.y,
            width: o.rect.width,
            height: o.rect.height,
            health: o.health,
            max_health: o.max_health,
        }
    }
}
