//! Fixed-rate simulation step
//!
//! Order per tick: motion and weapons per combatant, projectile advance,
//! projectile-vs-combatant hits, snapshot. Damage that ends the match stops
//! the tick on the spot.

use tracing::{info, trace};
use uuid::Uuid;

use super::arena::catalog;
use super::combat::{CombatSystem, HitscanHit, Projectile, WeaponStats, MUZZLE_OFFSET};
use super::geometry::{point_in_rect, Vec2};
use super::physics::{PhysicsSystem, VerticalState, GLIDE_MIN_SPEED};
use super::room::{Room, RoomPhase};
use super::snapshot::SnapshotBuilder;
use super::timers::TimerKey;
use super::TickInput;
use crate::ws::protocol::GameEvent;

impl Room {
    /// Run a single simulation tick. Does nothing unless the match is active.
    pub fn tick(&mut self, now: u64) {
        if self.phase != RoomPhase::Active {
            return;
        }
        self.tick += 1;

        for idx in 0..self.combatants.len() {
            if !self.combatants[idx].is_alive() {
                continue;
            }
            let id = self.combatants[idx].id;
            let input = self.inputs.get(&id).copied().unwrap_or_default();

            self.update_motion(idx, &input);
            self.update_weapon(idx, &input, now);
            if self.phase != RoomPhase::Active {
                return;
            }
        }

        self.update_projectiles(now);
        if self.phase != RoomPhase::Active {
            return;
        }

        self.emit_snapshot(now);
    }

    /// Broadcast the world snapshot along with this tick's events
    pub(crate) fn emit_snapshot(&mut self, now: u64) {
        let events = std::mem::take(&mut self.events);
        let msg = SnapshotBuilder::world(
            self.tick,
            now,
            &self.combatants,
            &self.projectiles,
            &self.obstacles,
            events,
        );
        self.broadcast(msg);
    }

    fn update_motion(&mut self, idx: usize, input: &TickInput) {
        let c = &mut self.combatants[idx];
        let stats = c.movement_stats();

        let velocity = PhysicsSystem::update_horizontal(Vec2::new(c.vx, c.vy), input, &stats);
        c.vx = velocity.x;
        c.vy = velocity.y;

        let moving = velocity.length() > GLIDE_MIN_SPEED;
        let vertical = PhysicsSystem::update_vertical(
            VerticalState {
                z: c.z,
                vz: c.vz,
                fuel: c.fuel,
            },
            input,
            moving,
            &stats,
        );
        c.z = vertical.z;
        c.vz = vertical.vz;
        c.fuel = vertical.fuel;

        let pos = PhysicsSystem::integrate(c.position(), velocity, stats.radius, c.arena);
        c.x = pos.x;
        c.y = pos.y;
        if input.aim.is_finite() {
            c.facing = input.aim;
        }

        let arena = c.arena;
        if let Some(door) = arena.door_at(pos) {
            if let Some(target) = catalog().get(door.target_arena) {
                trace!(player_id = %c.id, arena = target.id, "Combatant passed through door");
                c.arena = target;
                c.x = door.target.x;
                c.y = door.target.y;
            }
        }
    }

    fn update_weapon(&mut self, idx: usize, input: &TickInput, now: u64) {
        if !input.shoot {
            return;
        }
        let c = &self.combatants[idx];
        let weapon = c.weapon_stats();
        if c.reloading || c.ammo == 0 {
            return;
        }
        if !CombatSystem::can_fire(now, c.last_shot_at, &weapon) {
            return;
        }
        let owner = c.id;
        let live = self.projectiles.iter().filter(|p| p.owner_id == owner).count();
        if live >= self.settings.max_projectiles_per_player {
            return;
        }

        let aim = input.aim + CombatSystem::spread_offset(&mut self.rng, weapon.spread);
        let c = &mut self.combatants[idx];
        c.ammo -= 1;
        c.last_shot_at = Some(now);
        if c.ammo == 0 {
            self.start_reload(idx, now);
        }

        if weapon.hitscan {
            self.resolve_hitscan(idx, aim, &weapon, now);
        } else {
            self.spawn_projectile(idx, aim, &weapon, now);
        }
    }

    fn spawn_projectile(&mut self, idx: usize, aim: f32, weapon: &WeaponStats, now: u64) {
        let c = &self.combatants[idx];
        let muzzle = c.position() + Vec2::from_angle(aim) * (c.radius() + MUZZLE_OFFSET);
        self.next_projectile_id += 1;
        let projectile = Projectile {
            id: self.next_projectile_id,
            owner_id: c.id,
            arena: c.arena,
            x: muzzle.x,
            y: muzzle.y,
            z: c.z,
            angle: aim,
            speed: weapon.projectile_speed,
            damage: weapon.damage,
            weapon: c.weapon,
            created_at: now,
            lifetime_ms: weapon.projectile_lifetime_ms,
        };
        self.projectiles.push(projectile);
    }

    fn resolve_hitscan(&mut self, idx: usize, aim: f32, weapon: &WeaponStats, now: u64) {
        let shooter = &self.combatants[idx];
        let origin = shooter.position();
        let dir = Vec2::from_angle(aim);
        let arena = shooter.arena;

        let obstacles: Vec<(u32, _)> = self
            .obstacles
            .iter()
            .filter(|o| o.arena_id == arena.id)
            .map(|o| (o.id, o.rect))
            .collect();
        let targets: Vec<(Uuid, Vec2, f32)> = self
            .combatants
            .iter()
            .filter(|t| t.can_be_hit_by(shooter.id, arena.id, shooter.z))
            .map(|t| (t.id, t.position(), t.radius()))
            .collect();

        let trace = CombatSystem::trace_hitscan(
            origin,
            dir,
            weapon.range,
            &arena.walls,
            &obstacles,
            &targets,
        );

        let source_id = shooter.id;
        self.events.push(GameEvent::HitscanBeam {
            source_id,
            start_x: origin.x,
            start_y: origin.y,
            end_x: trace.impact.x,
            end_y: trace.impact.y,
        });

        match trace.hit {
            Some(HitscanHit::Combatant(target_id)) => {
                self.apply_damage(target_id, source_id, weapon.damage, now)
            }
            Some(HitscanHit::Obstacle(obstacle_id)) => {
                self.damage_obstacle(obstacle_id, weapon.damage)
            }
            None => {}
        }
    }

    fn update_projectiles(&mut self, now: u64) {
        // Movement and static geometry
        let mut survivors = Vec::with_capacity(self.projectiles.len());
        for mut p in std::mem::take(&mut self.projectiles) {
            p.advance();
            let pos = p.position();
            if !p.arena.contains_point(pos) || p.is_expired(now) {
                continue;
            }
            if p.arena.walls.iter().any(|w| point_in_rect(pos, w)) {
                continue;
            }
            let struck = self
                .obstacles
                .iter()
                .find(|o| o.arena_id == p.arena.id && point_in_rect(pos, &o.rect))
                .map(|o| o.id);
            if let Some(obstacle_id) = struck {
                self.damage_obstacle(obstacle_id, p.damage);
                continue;
            }
            survivors.push(p);
        }
        self.projectiles = survivors;

        // Combatants
        let mut i = 0;
        while i < self.projectiles.len() {
            let p = &self.projectiles[i];
            let pos = p.position();
            let target = self
                .combatants
                .iter()
                .find(|c| {
                    c.can_be_hit_by(p.owner_id, p.arena.id, p.z)
                        && c.position().distance(pos) < c.radius()
                })
                .map(|c| c.id);

            match target {
                Some(target_id) => {
                    let p = self.projectiles.remove(i);
                    self.apply_damage(target_id, p.owner_id, p.damage, now);
                    if self.phase != RoomPhase::Active {
                        return;
                    }
                }
                None => i += 1,
            }
        }
    }

    /// Shared damage resolution for hitscan and projectile hits
    pub(crate) fn apply_damage(&mut self, target_id: Uuid, source_id: Uuid, damage: f32, now: u64) {
        if self
            .combatant(source_id)
            .map_or(false, |s| s.spawn_protected)
        {
            return;
        }
        let Some(target_idx) = self.combatant_index(target_id) else {
            return;
        };
        let target = &mut self.combatants[target_idx];
        if target.dead || target.spawn_protected {
            return;
        }

        let (health, killed) = CombatSystem::apply_damage(target.health, damage);
        target.health = health;
        self.events.push(GameEvent::Hit {
            target_id,
            source_id,
            damage,
        });
        if !killed {
            return;
        }

        target.dead = true;
        target.deaths += 1;
        target.reloading = false;
        self.timers.cancel(TimerKey::Reload(target_id));

        let mut killer_id = None;
        let mut reached_limit = false;
        if source_id != target_id {
            if let Some(idx) = self.combatant_index(source_id) {
                let killer = &mut self.combatants[idx];
                killer.kills += 1;
                killer_id = Some(killer.id);
                reached_limit = killer.kills >= self.settings.kill_limit;
            }
        }

        info!(
            room = %self.code,
            victim_id = %target_id,
            killer_id = ?killer_id,
            "Combatant killed"
        );
        self.events.push(GameEvent::Kill {
            killer_id,
            victim_id: target_id,
        });

        if reached_limit {
            self.finish_match(now, killer_id);
        }
    }

    fn damage_obstacle(&mut self, obstacle_id: u32, damage: f32) {
        let Some(idx) = self.obstacles.iter().position(|o| o.id == obstacle_id) else {
            return;
        };
        let obstacle = &mut self.obstacles[idx];
        obstacle.health = (obstacle.health - damage).max(0.0);
        if obstacle.health <= 0.0 {
            self.obstacles.remove(idx);
            self.events
                .push(GameEvent::ObstacleDestroyed { obstacle_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::Obstacle;
    use crate::game::geometry::Rect;
    use crate::game::room::test_support::*;
    use crate::ws::protocol::{MovementType, ServerMsg, WeaponType};

    fn set_weapon(room: &mut Room, id: Uuid, weapon: WeaponType) {
        let idx = room.combatant_index(id).unwrap();
        room.combatants[idx].weapon = weapon;
        room.combatants[idx].ammo = WeaponStats::for_type(weapon).clip_size;
    }

    fn fire_at(room: &mut Room, id: Uuid, seq: u32, aim: f32) {
        assert!(room.submit_input(
            id,
            TickInput {
                seq,
                shoot: true,
                aim,
                ..TickInput::default()
            },
        ));
    }

    fn hold(room: &mut Room, id: Uuid, seq: u32) {
        assert!(room.submit_input(
            id,
            TickInput {
                seq,
                ..TickInput::default()
            },
        ));
    }

    fn snapshot_events(room: &mut Room) -> Vec<GameEvent> {
        room.drain_outbox()
            .into_iter()
            .filter_map(|o| match o.msg {
                ServerMsg::Snapshot { events, .. } => Some(events),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Two levitators facing each other across open floor in the foundry
    fn duel(weapon: WeaponType) -> (Room, Uuid, Uuid, u64) {
        let (mut room, ids, now) = active_room(2);
        for id in &ids {
            let idx = room.combatant_index(*id).unwrap();
            room.combatants[idx].apply_loadout(MovementType::Levitation, weapon);
        }
        room.obstacles.clear();
        place(&mut room, ids[0], 1000.0, 100.0, 0.0);
        place(&mut room, ids[1], 1300.0, 100.0, 0.0);
        (room, ids[0], ids[1], now)
    }

    #[test]
    fn test_tick_only_runs_when_active() {
        let (mut room, _) = ready_lobby(2);
        room.tick(T0);
        assert_eq!(room.tick, 0);
        assert!(room.drain_outbox().iter().all(|o| !matches!(o.msg, ServerMsg::Snapshot { .. })));
    }

    #[test]
    fn test_tick_emits_snapshot() {
        let (mut room, ids, now) = active_room(3);
        room.tick(now);
        let out = room.drain_outbox();
        let snapshot = out.iter().find_map(|o| match &o.msg {
            ServerMsg::Snapshot {
                tick, combatants, obstacles, ..
            } => Some((*tick, combatants.len(), obstacles.len())),
            _ => None,
        });
        assert_eq!(snapshot, Some((1, ids.len(), 4)));
    }

    #[test]
    fn test_movement_from_input() {
        let (mut room, ids, now) = active_room(2);
        place(&mut room, ids[0], 1000.0, 100.0, 0.0);
        assert!(room.submit_input(
            ids[0],
            TickInput {
                seq: 1,
                right: true,
                ..TickInput::default()
            },
        ));
        for t in 0..10 {
            room.tick(now + t * 50);
        }
        assert!(room.combatant(ids[0]).unwrap().x > 1000.0);
    }

    #[test]
    fn test_dead_combatant_does_not_move() {
        let (mut room, ids, now) = active_room(2);
        place(&mut room, ids[0], 1000.0, 100.0, 50.0);
        let idx = room.combatant_index(ids[0]).unwrap();
        room.combatants[idx].dead = true;
        room.combatants[idx].vx = 5.0;
        assert!(room.submit_input(
            ids[0],
            TickInput {
                seq: 1,
                right: true,
                shoot: true,
                ..TickInput::default()
            },
        ));
        room.tick(now);
        let c = room.combatant(ids[0]).unwrap();
        assert_eq!(c.x, 1000.0);
        assert_eq!(c.z, 50.0);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_resources_stay_bounded() {
        let (mut room, ids, mut now) = active_room(4);
        let patterns = [
            TickInput {
                up: true,
                left: true,
                ascend: true,
                shoot: true,
                aim: 0.3,
                ..TickInput::default()
            },
            TickInput {
                down: true,
                right: true,
                descend: true,
                shoot: true,
                aim: 2.0,
                ..TickInput::default()
            },
            TickInput {
                right: true,
                shoot: true,
                aim: -1.0,
                ..TickInput::default()
            },
        ];
        let movements = [
            MovementType::Jetpack,
            MovementType::Wings,
            MovementType::Levitation,
            MovementType::Wings,
        ];
        for (i, id) in ids.iter().enumerate() {
            let idx = room.combatant_index(*id).unwrap();
            room.combatants[idx].apply_loadout(movements[i], WeaponType::Blaster);
        }

        for step in 0..400u32 {
            for (i, id) in ids.iter().enumerate() {
                let mut input = patterns[(step as usize / 40 + i) % patterns.len()];
                input.seq = step + 1;
                room.submit_input(*id, input);
            }
            now += 50;
            room.fire_due_timers(now);
            room.tick(now);
            if room.phase != RoomPhase::Active {
                break;
            }
            for c in &room.combatants {
                let m = c.movement_stats();
                assert!((0.0..=100.0).contains(&c.z));
                assert!((0.0..=m.max_health).contains(&c.health));
                assert!((0.0..=m.max_fuel).contains(&c.fuel));
                assert!(c.ammo <= c.weapon_stats().clip_size);
            }
        }
    }

    #[test]
    fn test_projectile_cap_never_exceeded() {
        let (mut room, ids, mut now) = active_room(2);
        room.settings.max_projectiles_per_player = 3;
        room.obstacles.clear();
        set_weapon(&mut room, ids[0], WeaponType::Blaster);
        place(&mut room, ids[0], 100.0, 100.0, 0.0);
        place(&mut room, ids[1], 100.0, 900.0, 0.0);

        for seq in 1..=60 {
            // Keep the clip topped up so only the cap limits shots
            let idx = room.combatant_index(ids[0]).unwrap();
            room.combatants[idx].ammo = 20;
            fire_at(&mut room, ids[0], seq, 0.0);
            now += 250;
            room.tick(now);
            let live = room.projectiles.iter().filter(|p| p.owner_id == ids[0]).count();
            assert!(live <= 3);
        }
    }

    #[test]
    fn test_fire_rate_limits_shots() {
        let (mut room, a, _b, now) = duel(WeaponType::Blaster);
        fire_at(&mut room, a, 1, -std::f32::consts::FRAC_PI_2);
        // Two ticks 50ms apart: the second is inside the 200ms cooldown
        room.tick(now);
        room.tick(now + 50);
        assert_eq!(room.combatant(a).unwrap().ammo, 19);
        room.tick(now + 200);
        assert_eq!(room.combatant(a).unwrap().ammo, 18);
    }

    #[test]
    fn test_empty_clip_triggers_reload() {
        let (mut room, a, _b, now) = duel(WeaponType::Railgun);
        let idx = room.combatant_index(a).unwrap();
        room.combatants[idx].ammo = 1;
        fire_at(&mut room, a, 1, std::f32::consts::PI);
        room.tick(now);

        let c = room.combatant(a).unwrap();
        assert_eq!(c.ammo, 0);
        assert!(c.reloading);

        let reload_ms = c.weapon_stats().reload_ms();
        room.fire_due_timers(now + reload_ms);
        let c = room.combatant(a).unwrap();
        assert!(!c.reloading);
        assert_eq!(c.ammo, 3);
    }

    #[test]
    fn test_railgun_one_shot_kill() {
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        let idx = room.combatant_index(b).unwrap();
        room.combatants[idx].health = 100.0;

        fire_at(&mut room, a, 1, 0.0);
        hold(&mut room, b, 1);
        room.tick(now);

        let victim = room.combatant(b).unwrap();
        assert_eq!(victim.health, 0.0);
        assert!(victim.dead);
        assert_eq!(victim.deaths, 1);
        assert_eq!(room.combatant(a).unwrap().kills, 1);

        let events = snapshot_events(&mut room);
        assert!(events.contains(&GameEvent::Kill {
            killer_id: Some(a),
            victim_id: b
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::HitscanBeam { source_id, .. } if *source_id == a)));
    }

    #[test]
    fn test_dead_target_not_hit_again() {
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        let idx = room.combatant_index(b).unwrap();
        room.combatants[idx].dead = true;
        room.combatants[idx].health = 0.0;

        fire_at(&mut room, a, 1, 0.0);
        room.tick(now);
        let victim = room.combatant(b).unwrap();
        assert_eq!(victim.deaths, 0);
        assert_eq!(room.combatant(a).unwrap().kills, 0);
        assert!(!snapshot_events(&mut room)
            .iter()
            .any(|e| matches!(e, GameEvent::Hit { .. })));
    }

    #[test]
    fn test_spawn_protection_blocks_damage_both_ways() {
        // Protected target
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        let idx = room.combatant_index(b).unwrap();
        room.combatants[idx].spawn_protected = true;
        fire_at(&mut room, a, 1, 0.0);
        room.tick(now);
        assert_eq!(room.combatant(b).unwrap().health, 110.0);

        // Protected shooter still fires, but the shot does no damage
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        let idx = room.combatant_index(a).unwrap();
        room.combatants[idx].spawn_protected = true;
        fire_at(&mut room, a, 1, 0.0);
        room.tick(now);
        assert_eq!(room.combatant(a).unwrap().ammo, 2);
        assert_eq!(room.combatant(b).unwrap().health, 110.0);
        let events = snapshot_events(&mut room);
        let beams = events
            .iter()
            .filter(|e| matches!(e, GameEvent::HitscanBeam { source_id, .. } if *source_id == a))
            .count();
        assert_eq!(beams, 1);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Hit { .. })));

        // Projectile fired before protection lands while protected
        let (mut room, a, b, now) = duel(WeaponType::Blaster);
        let idx = room.combatant_index(a).unwrap();
        room.projectiles.push(Projectile {
            id: 99,
            owner_id: a,
            arena: room.arena,
            x: 1290.0,
            y: 100.0,
            z: 0.0,
            angle: 0.0,
            speed: 1.0,
            damage: 20.0,
            weapon: WeaponType::Blaster,
            created_at: now,
            lifetime_ms: 2000,
        });
        room.combatants[idx].spawn_protected = true;
        room.tick(now);
        assert_eq!(room.combatant(b).unwrap().health, 110.0);
    }

    #[test]
    fn test_kill_limit_ends_match_mid_tick() {
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        let limit = room.settings.kill_limit;
        let idx = room.combatant_index(a).unwrap();
        room.combatants[idx].kills = limit - 1;

        fire_at(&mut room, a, 1, 0.0);
        hold(&mut room, b, 1);
        room.tick(now);

        assert_eq!(room.phase, RoomPhase::Lobby);
        assert!(room.combatants.is_empty());
        assert!(room.projectiles.is_empty());
        assert!(room.timers.is_empty());

        let out = room.drain_outbox();
        let ended = out.iter().find_map(|o| match &o.msg {
            ServerMsg::MatchEnded { winner_id, scores } => Some((*winner_id, scores.clone())),
            _ => None,
        });
        let (winner, scores) = ended.expect("match ended message");
        assert_eq!(winner, Some(a));
        let shooter = scores.iter().find(|s| s.player_id == a).unwrap();
        assert_eq!(shooter.kills, limit);
        let victim = scores.iter().find(|s| s.player_id == b).unwrap();
        assert_eq!(victim.deaths, 1);

        // Final snapshot carries the killing blow, then no more ticks run
        let tick_before = room.tick;
        room.tick(now + 50);
        assert_eq!(room.tick, tick_before);
        assert!(room.drain_outbox().is_empty());
    }

    #[test]
    fn test_obstacle_destroyed_after_two_hits() {
        let (mut room, a, _b, now) = duel(WeaponType::Blaster);
        room.obstacles = vec![Obstacle {
            id: 1,
            arena_id: room.arena.id,
            rect: Rect::new(1100.0, 80.0, 40.0, 40.0),
            health: 50.0,
            max_health: 50.0,
        }];
        for p in 0..2 {
            room.projectiles.push(Projectile {
                id: 100 + p,
                owner_id: a,
                arena: room.arena,
                x: 1097.0,
                y: 100.0,
                z: 0.0,
                angle: 0.0,
                speed: 5.0,
                damage: 25.0,
                weapon: WeaponType::Blaster,
                created_at: now,
                lifetime_ms: 2000,
            });
            room.tick(now);
            if p == 0 {
                assert_eq!(room.obstacles[0].health, 25.0);
            }
        }
        assert!(room.obstacles.is_empty());
        assert!(room.projectiles.is_empty());
        let events = snapshot_events(&mut room);
        assert!(events.contains(&GameEvent::ObstacleDestroyed { obstacle_id: 1 }));

        room.tick(now + 50);
        let out = room.drain_outbox();
        let obstacles = out.iter().find_map(|o| match &o.msg {
            ServerMsg::Snapshot { obstacles, .. } => Some(obstacles.len()),
            _ => None,
        });
        assert_eq!(obstacles, Some(0));
    }

    #[test]
    fn test_hitscan_wall_occludes_player() {
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        // Wall 100 units east of the shooter, target 300 units east
        let idx = room.combatant_index(a).unwrap();
        let wall = room.arena.walls[3];
        let y = wall.center().y;
        place(&mut room, a, wall.x - 100.0, y, 0.0);
        place(&mut room, b, wall.x + 200.0, y, 0.0);
        room.combatants[idx].facing = 0.0;

        fire_at(&mut room, a, 1, 0.0);
        room.tick(now);

        assert_eq!(room.combatant(b).unwrap().health, 110.0);
        let events = snapshot_events(&mut room);
        let beam = events
            .iter()
            .find_map(|e| match e {
                GameEvent::HitscanBeam { start_x, end_x, .. } => Some(end_x - start_x),
                _ => None,
            })
            .unwrap();
        assert!((beam - 100.0).abs() < 0.01);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Hit { .. })));
    }

    #[test]
    fn test_miss_beam_reaches_max_range() {
        let (mut room, a, _b, now) = duel(WeaponType::Railgun);
        // Nothing south of here; the beam runs its full length
        place(&mut room, a, 100.0, 100.0, 0.0);
        fire_at(&mut room, a, 1, std::f32::consts::FRAC_PI_2);
        room.tick(now);
        let events = snapshot_events(&mut room);
        let (start_y, end_y) = events
            .iter()
            .find_map(|e| match e {
                GameEvent::HitscanBeam { start_y, end_y, .. } => Some((*start_y, *end_y)),
                _ => None,
            })
            .unwrap();
        assert!((end_y - start_y - 1400.0).abs() < 0.01);
    }

    #[test]
    fn test_altitude_band_respected() {
        let (mut room, a, b, now) = duel(WeaponType::Railgun);
        place(&mut room, b, 1300.0, 100.0, 60.0);
        hold(&mut room, b, 1);
        fire_at(&mut room, a, 1, 0.0);
        room.tick(now);
        assert_eq!(room.combatant(b).unwrap().health, 110.0);
    }

    #[test]
    fn test_projectile_hits_combatant() {
        let (mut room, a, b, mut now) = duel(WeaponType::Launcher);
        place(&mut room, b, 1100.0, 100.0, 0.0);
        fire_at(&mut room, a, 1, 0.0);
        hold(&mut room, b, 1);
        room.tick(now);
        assert_eq!(room.projectiles.len(), 1);
        room.inputs.remove(&a);

        let mut hit = false;
        for _ in 0..20 {
            now += 50;
            room.tick(now);
            let events = snapshot_events(&mut room);
            if events
                .iter()
                .any(|e| matches!(e, GameEvent::Hit { target_id, .. } if *target_id == b))
            {
                hit = true;
                break;
            }
        }
        assert!(hit);
        assert_eq!(room.combatant(b).unwrap().health, 110.0 - 45.0);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_projectile_removed_at_wall() {
        let (mut room, a, _b, now) = duel(WeaponType::Blaster);
        let wall = room.arena.walls[0];
        room.projectiles.push(Projectile {
            id: 1,
            owner_id: a,
            arena: room.arena,
            x: wall.x - 2.0,
            y: wall.center().y,
            z: 0.0,
            angle: 0.0,
            speed: 10.0,
            damage: 20.0,
            weapon: WeaponType::Blaster,
            created_at: now,
            lifetime_ms: 2000,
        });
        room.tick(now);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_projectile_lifetime_per_weapon() {
        let (mut room, a, _b, now) = duel(WeaponType::Blaster);
        room.inputs.clear();
        for (id, weapon) in [(1, WeaponType::Blaster), (2, WeaponType::Launcher)] {
            room.projectiles.push(Projectile {
                id,
                owner_id: a,
                arena: room.arena,
                x: 800.0,
                y: 100.0 + id as f32 * 20.0,
                z: 0.0,
                angle: std::f32::consts::PI,
                speed: 0.5,
                damage: 20.0,
                weapon,
                created_at: now,
                lifetime_ms: WeaponStats::for_type(weapon).projectile_lifetime_ms,
            });
        }

        room.tick(now + 2000);
        assert_eq!(room.projectiles.len(), 2);
        room.tick(now + 2001);
        let left: Vec<WeaponType> = room.projectiles.iter().map(|p| p.weapon).collect();
        assert_eq!(left, vec![WeaponType::Launcher]);
        room.tick(now + 4001);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_departed_owner_awards_no_kill() {
        let (mut room, ids, now) = active_room(3);
        let (a, b) = (ids[0], ids[1]);
        room.obstacles.clear();
        place(&mut room, b, 1000.0, 100.0, 0.0);
        let idx = room.combatant_index(b).unwrap();
        room.combatants[idx].health = 10.0;
        room.projectiles.push(Projectile {
            id: 7,
            owner_id: a,
            arena: room.arena,
            x: 990.0,
            y: 100.0,
            z: 0.0,
            angle: 0.0,
            speed: 5.0,
            damage: 20.0,
            weapon: WeaponType::Blaster,
            created_at: now,
            lifetime_ms: 2000,
        });
        room.leave(a, now);
        room.tick(now);

        let victim = room.combatant(b).unwrap();
        assert!(victim.dead);
        assert_eq!(victim.deaths, 1);
        let events = snapshot_events(&mut room);
        assert!(events.contains(&GameEvent::Kill {
            killer_id: None,
            victim_id: b
        }));
    }

    #[test]
    fn test_door_moves_combatant_between_arenas() {
        let (mut room, ids, now) = active_room(2);
        let door = room.arena.doors[0].clone();
        let c = door.rect.center();
        place(&mut room, ids[0], c.x - 5.0, c.y, 0.0);
        assert!(room.submit_input(
            ids[0],
            TickInput {
                seq: 1,
                right: true,
                ..TickInput::default()
            },
        ));
        let idx = room.combatant_index(ids[0]).unwrap();
        room.combatants[idx].vx = 6.0;
        room.tick(now);

        let moved = room.combatant(ids[0]).unwrap();
        assert_eq!(moved.arena.id, door.target_arena);
        assert_eq!(moved.position(), door.target);
    }
}
