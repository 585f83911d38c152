//! Room lifecycle: lobby roster, loadout phase, countdown, match end
//!
//! A `Room` is plain state driven by its owning task. Every time-dependent
//! operation takes `now` in unix milliseconds. Rejected requests return
//! `false` and leave the room untouched.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameSettings;
use crate::ws::protocol::{GameEvent, MovementType, ServerMsg, WeaponType};

use super::arena::{catalog, Arena, Obstacle};
use super::combat::Projectile;
use super::combatant::Combatant;
use super::registry::JoinRejection;
use super::snapshot::SnapshotBuilder;
use super::timers::{TimerKey, Timers};
use super::{Outbound, TickInput};

/// Gap between countdown steps
pub const COUNTDOWN_STEP_MS: u64 = 1000;

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Gathering players, ready checks
    Lobby,
    /// Combatants placed, players confirm loadouts
    LoadoutPhase,
    /// 3-2-1 before combat
    Countdown,
    /// Tick engine running
    Active,
    /// Final scores being published, immediately followed by `Lobby`
    Ended,
}

/// Persistent roster entry, independent of any running match
#[derive(Debug, Clone)]
pub struct LobbyMember {
    pub id: Uuid,
    pub display_name: String,
    pub ready: bool,
    pub loadout_ready: bool,
    pub movement: MovementType,
    pub weapon: WeaponType,
}

impl LobbyMember {
    pub fn new(id: Uuid, display_name: String) -> Self {
        Self {
            id,
            display_name,
            ready: false,
            loadout_ready: false,
            movement: MovementType::default(),
            weapon: WeaponType::default(),
        }
    }
}

/// Room state (owned by the room task)
pub struct Room {
    pub code: String,
    pub settings: GameSettings,
    /// Arena matches start and respawn in
    pub arena: &'static Arena,
    pub host: Option<Uuid>,
    pub phase: RoomPhase,
    pub tick: u64,
    /// Lobby members in join order
    pub roster: Vec<LobbyMember>,
    /// Match participants in roster order at match start
    pub combatants: Vec<Combatant>,
    pub projectiles: Vec<Projectile>,
    pub obstacles: Vec<Obstacle>,
    /// Latest input per player, consumed every tick
    pub inputs: HashMap<Uuid, TickInput>,
    pub timers: Timers,
    pub countdown_remaining: u32,
    pub rng: ChaCha8Rng,
    pub next_projectile_id: u64,
    /// Combat events gathered during the current tick
    pub events: Vec<GameEvent>,
    outbox: Vec<Outbound>,
}

impl Room {
    pub fn new(code: String, settings: GameSettings, arena: &'static Arena, seed: u64) -> Self {
        Self {
            code,
            settings,
            arena,
            host: None,
            phase: RoomPhase::Lobby,
            tick: 0,
            roster: Vec::new(),
            combatants: Vec::new(),
            projectiles: Vec::new(),
            obstacles: Vec::new(),
            inputs: HashMap::new(),
            timers: Timers::new(),
            countdown_remaining: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_projectile_id: 0,
            events: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Whether a newcomer could join right now
    pub fn is_open(&self) -> bool {
        self.phase == RoomPhase::Lobby && self.roster.len() < self.settings.max_players
    }

    pub fn member(&self, id: Uuid) -> Option<&LobbyMember> {
        self.roster.iter().find(|m| m.id == id)
    }

    pub fn combatant(&self, id: Uuid) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub(crate) fn combatant_index(&self, id: Uuid) -> Option<usize> {
        self.combatants.iter().position(|c| c.id == id)
    }

    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn broadcast(&mut self, msg: ServerMsg) {
        self.outbox.push(Outbound { to: None, msg });
    }

    pub(crate) fn send_to(&mut self, player_id: Uuid, msg: ServerMsg) {
        self.outbox.push(Outbound {
            to: Some(player_id),
            msg,
        });
    }

    fn emit_roster(&mut self) {
        let msg = SnapshotBuilder::roster(&self.code, self.phase, self.host, &self.roster);
        self.broadcast(msg);
    }

    // ------------------------------------------------------------------
    // Lobby membership
    // ------------------------------------------------------------------

    /// Add a player to the roster. The first member becomes host.
    pub fn join(&mut self, id: Uuid, display_name: String) -> Result<(), JoinRejection> {
        if self.member(id).is_some() {
            return Ok(());
        }
        if self.phase != RoomPhase::Lobby {
            return Err(JoinRejection::MatchInProgress);
        }
        if self.roster.len() >= self.settings.max_players {
            return Err(JoinRejection::RoomFull);
        }

        self.roster.push(LobbyMember::new(id, display_name));
        if self.host.is_none() {
            self.host = Some(id);
        }

        info!(
            room = %self.code,
            player_id = %id,
            player_count = self.roster.len(),
            "Player joined room"
        );
        self.emit_roster();
        Ok(())
    }

    /// Remove a player from the roster and from any running match
    pub fn leave(&mut self, id: Uuid, now: u64) {
        let Some(pos) = self.roster.iter().position(|m| m.id == id) else {
            return;
        };
        self.roster.remove(pos);
        self.combatants.retain(|c| c.id != id);
        self.inputs.remove(&id);
        self.timers.cancel_player(id);

        info!(room = %self.code, player_id = %id, "Player left room");

        if self.host == Some(id) {
            self.host = self.roster.first().map(|m| m.id);
            if let Some(host) = self.host {
                info!(room = %self.code, host_id = %host, "Host reassigned");
            }
        }

        if self.roster.is_empty() {
            self.shutdown();
            return;
        }

        let in_match = matches!(
            self.phase,
            RoomPhase::LoadoutPhase | RoomPhase::Countdown | RoomPhase::Active
        );
        if in_match && self.roster.len() < self.settings.min_players {
            let winner = if self.phase == RoomPhase::Active {
                self.kill_leader()
            } else {
                None
            };
            self.finish_match(now, winner);
            return;
        }

        self.emit_roster();
        self.check_loadout_complete(now);
    }

    pub fn set_ready(&mut self, id: Uuid, ready: bool) -> bool {
        if self.phase != RoomPhase::Lobby {
            return false;
        }
        let Some(member) = self.roster.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if member.ready != ready {
            member.ready = ready;
            self.emit_roster();
        }
        true
    }

    /// Change archetypes. Allowed in the lobby, during loadout, and while
    /// dead in an active match.
    pub fn select_loadout(&mut self, id: Uuid, movement: MovementType, weapon: WeaponType) -> bool {
        let allowed = match self.phase {
            RoomPhase::Lobby | RoomPhase::LoadoutPhase => true,
            RoomPhase::Active => self.combatant(id).map_or(false, |c| c.dead),
            RoomPhase::Countdown | RoomPhase::Ended => false,
        };
        if !allowed {
            return false;
        }
        let Some(member) = self.roster.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        member.movement = movement;
        member.weapon = weapon;

        if let Some(idx) = self.combatant_index(id) {
            self.timers.cancel(TimerKey::Reload(id));
            self.combatants[idx].apply_loadout(movement, weapon);
        }

        self.emit_roster();
        true
    }

    // ------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------

    /// Host request to move from the lobby into the loadout phase
    pub fn start_match(&mut self, requester: Uuid, now: u64) -> bool {
        if self.phase != RoomPhase::Lobby
            || self.host != Some(requester)
            || self.roster.len() < self.settings.min_players
            || !self.roster.iter().all(|m| m.ready)
        {
            debug!(room = %self.code, player_id = %requester, "Start request rejected");
            return false;
        }

        let arena = self.arena;
        self.combatants = self
            .roster
            .iter()
            .enumerate()
            .map(|(i, m)| {
                Combatant::new(
                    m.id,
                    m.display_name.clone(),
                    m.movement,
                    m.weapon,
                    arena,
                    arena.spawn_point(i),
                )
            })
            .collect();
        self.obstacles = catalog().instantiate_obstacles(arena.id);
        self.projectiles.clear();
        self.inputs.clear();
        self.events.clear();
        self.timers.clear();
        for member in &mut self.roster {
            member.loadout_ready = false;
        }

        self.phase = RoomPhase::LoadoutPhase;
        info!(
            room = %self.code,
            player_count = self.combatants.len(),
            arena = arena.id,
            "Loadout phase started"
        );
        let arenas = catalog()
            .connected(arena.id)
            .into_iter()
            .map(SnapshotBuilder::arena)
            .collect();
        self.broadcast(ServerMsg::LoadoutPhase {
            arena_id: arena.id.to_string(),
            arenas,
        });
        self.emit_roster();
        self.check_loadout_complete(now);
        true
    }

    pub fn set_loadout_ready(&mut self, id: Uuid, ready: bool, now: u64) -> bool {
        if !matches!(self.phase, RoomPhase::LoadoutPhase | RoomPhase::Countdown) {
            return false;
        }
        let Some(member) = self.roster.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if member.loadout_ready != ready {
            member.loadout_ready = ready;
            self.emit_roster();
        }
        self.check_loadout_complete(now);
        true
    }

    fn check_loadout_complete(&mut self, now: u64) {
        if self.phase != RoomPhase::LoadoutPhase || self.roster.len() < self.settings.min_players {
            return;
        }
        if self.roster.iter().all(|m| m.loadout_ready) {
            self.begin_countdown(now);
        }
    }

    fn begin_countdown(&mut self, now: u64) {
        self.phase = RoomPhase::Countdown;
        self.countdown_remaining = self.settings.countdown_secs;
        info!(room = %self.code, "Countdown started");

        if self.countdown_remaining == 0 {
            self.activate(now);
            return;
        }
        self.broadcast(ServerMsg::Countdown {
            seconds_remaining: self.countdown_remaining,
        });
        self.timers
            .schedule(TimerKey::Countdown, now + COUNTDOWN_STEP_MS);
    }

    fn advance_countdown(&mut self, now: u64) {
        if self.phase != RoomPhase::Countdown {
            return;
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining > 0 {
            self.broadcast(ServerMsg::Countdown {
                seconds_remaining: self.countdown_remaining,
            });
            self.timers
                .schedule(TimerKey::Countdown, now + COUNTDOWN_STEP_MS);
        } else {
            self.activate(now);
        }
    }

    fn activate(&mut self, now: u64) {
        self.phase = RoomPhase::Active;
        self.tick = 0;
        for idx in 0..self.combatants.len() {
            self.grant_protection(idx, now);
        }
        info!(room = %self.code, "Match started");
        self.broadcast(ServerMsg::MatchStarted { tick: self.tick });
    }

    /// Publish final scores, then reset everything for a rematch
    pub(crate) fn finish_match(&mut self, now: u64, winner: Option<Uuid>) {
        let was_active = self.phase == RoomPhase::Active;
        self.phase = RoomPhase::Ended;
        if was_active {
            self.emit_snapshot(now);
        }

        let scores = SnapshotBuilder::scores(&self.combatants);
        info!(room = %self.code, winner = ?winner, "Match ended");
        self.broadcast(ServerMsg::MatchEnded {
            winner_id: winner,
            scores,
        });

        self.clear_match();
        for member in &mut self.roster {
            member.ready = false;
            member.loadout_ready = false;
        }
        self.phase = RoomPhase::Lobby;
        self.emit_roster();
    }

    /// Highest kill count, earliest participant on ties
    fn kill_leader(&self) -> Option<Uuid> {
        self.combatants
            .iter()
            .fold(None::<&Combatant>, |best, c| match best {
                Some(b) if b.kills >= c.kills => Some(b),
                _ => Some(c),
            })
            .map(|c| c.id)
    }

    fn clear_match(&mut self) {
        self.timers.clear();
        self.combatants.clear();
        self.projectiles.clear();
        self.obstacles.clear();
        self.inputs.clear();
        self.events.clear();
    }

    /// Stop every timer and drop all match state before the room is released
    pub fn shutdown(&mut self) {
        self.clear_match();
        self.phase = RoomPhase::Lobby;
    }

    // ------------------------------------------------------------------
    // In-match requests
    // ------------------------------------------------------------------

    /// Buffer the latest input for the next tick. Stale sequence numbers
    /// are dropped.
    pub fn submit_input(&mut self, id: Uuid, input: TickInput) -> bool {
        if self.phase != RoomPhase::Active {
            return false;
        }
        let Some(idx) = self.combatant_index(id) else {
            return false;
        };
        let combatant = &mut self.combatants[idx];
        if input.seq <= combatant.last_input_seq {
            return false;
        }
        combatant.last_input_seq = input.seq;
        self.inputs.insert(id, input);
        true
    }

    pub fn request_reload(&mut self, id: Uuid, now: u64) -> bool {
        if self.phase != RoomPhase::Active {
            return false;
        }
        let Some(idx) = self.combatant_index(id) else {
            return false;
        };
        let c = &self.combatants[idx];
        if c.dead || c.reloading || c.ammo >= c.weapon_stats().clip_size {
            return false;
        }
        self.start_reload(idx, now);
        true
    }

    pub(crate) fn start_reload(&mut self, idx: usize, now: u64) {
        let c = &mut self.combatants[idx];
        c.reloading = true;
        let at = now + c.weapon_stats().reload_ms();
        let key = TimerKey::Reload(c.id);
        self.timers.schedule(key, at);
    }

    pub fn respawn(&mut self, id: Uuid, now: u64) -> bool {
        if self.phase != RoomPhase::Active {
            return false;
        }
        let Some(idx) = self.combatant_index(id) else {
            return false;
        };
        if !self.combatants[idx].dead {
            return false;
        }

        let arena = self.arena;
        self.combatants[idx].reset_at(arena, arena.spawn_point(idx));
        self.timers.cancel(TimerKey::Reload(id));
        self.grant_protection(idx, now);
        debug!(room = %self.code, player_id = %id, "Combatant respawned");
        true
    }

    pub(crate) fn grant_protection(&mut self, idx: usize, now: u64) {
        let c = &mut self.combatants[idx];
        c.spawn_protected = true;
        let key = TimerKey::SpawnProtection(c.id);
        self.timers
            .schedule(key, now + self.settings.spawn_protection_ms);
    }

    /// Run every timer due at `now`
    pub fn fire_due_timers(&mut self, now: u64) {
        for key in self.timers.take_due(now) {
            match key {
                TimerKey::Countdown => self.advance_countdown(now),
                TimerKey::Reload(id) => {
                    if let Some(c) = self.combatants.iter_mut().find(|c| c.id == id) {
                        if c.reloading {
                            c.ammo = c.weapon_stats().clip_size;
                            c.reloading = false;
                        }
                    }
                }
                TimerKey::SpawnProtection(id) => {
                    if let Some(c) = self.combatants.iter_mut().find(|c| c.id == id) {
                        c.spawn_protected = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const T0: u64 = 1_000_000;

    pub fn room() -> Room {
        Room::new(
            "TEST1".to_string(),
            GameSettings::default(),
            catalog().get("foundry").unwrap(),
            42,
        )
    }

    /// Lobby with `n` ready members
    pub fn ready_lobby(n: usize) -> (Room, Vec<Uuid>) {
        let mut room = room();
        let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        for (i, id) in ids.iter().enumerate() {
            room.join(*id, format!("pilot{}", i)).unwrap();
            assert!(room.set_ready(*id, true));
        }
        (room, ids)
    }

    /// Active match with `n` combatants, spawn protection already expired.
    /// Returns the room clock.
    pub fn active_room(n: usize) -> (Room, Vec<Uuid>, u64) {
        let (mut room, ids) = ready_lobby(n);
        assert!(room.start_match(ids[0], T0));
        for id in &ids {
            assert!(room.set_loadout_ready(*id, true, T0));
        }
        let mut now = T0;
        for _ in 0..room.settings.countdown_secs {
            now += COUNTDOWN_STEP_MS;
            room.fire_due_timers(now);
        }
        assert_eq!(room.phase, RoomPhase::Active);
        now += room.settings.spawn_protection_ms;
        room.fire_due_timers(now);
        room.drain_outbox();
        (room, ids, now)
    }

    /// Place a combatant somewhere deterministic
    pub fn place(room: &mut Room, id: Uuid, x: f32, y: f32, z: f32) {
        let idx = room.combatant_index(id).unwrap();
        let c = &mut room.combatants[idx];
        c.x = x;
        c.y = y;
        c.z = z;
        c.vx = 0.0;
        c.vy = 0.0;
        c.vz = 0.0;
    }
}
