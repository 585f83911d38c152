//! Per-room actor: owns a `Room` and drives it from commands, the tick
//! interval and pending timers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameSettings;
use crate::util::time::{unix_millis, TICK_MS};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::arena::Arena;
use super::registry::JoinRejection;
use super::room::{Room, RoomPhase};
use super::{Outbound, PlayerInput, TickInput};

/// Requests delivered to a room task
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: Uuid,
        display_name: String,
        reply: oneshot::Sender<Result<(), JoinRejection>>,
    },
    Client(PlayerInput),
}

/// Handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub code: String,
    pub cmd_tx: mpsc::Sender<RoomCommand>,
    pub events_tx: broadcast::Sender<Outbound>,
    pub player_count: Arc<AtomicUsize>,
    pub open: Arc<AtomicBool>,
}

impl RoomHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    /// Whether the room is in its lobby with a free slot
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Join the room. On success the returned receiver carries every
    /// message emitted from the moment of joining.
    pub async fn join(
        &self,
        player_id: Uuid,
        display_name: String,
    ) -> Result<broadcast::Receiver<Outbound>, JoinRejection> {
        // Subscribe first so the roster triggered by this join is not missed
        let events_rx = self.events_tx.subscribe();
        let (reply, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(RoomCommand::Join {
                player_id,
                display_name,
                reply,
            })
            .await
            .map_err(|_| JoinRejection::RoomClosed)?;

        reply_rx.await.map_err(|_| JoinRejection::RoomClosed)??;
        Ok(events_rx)
    }

    /// Forward a client message. Returns false once the room has shut down.
    pub async fn send(&self, input: PlayerInput) -> bool {
        self.cmd_tx.send(RoomCommand::Client(input)).await.is_ok()
    }
}

/// The authoritative room task
pub struct RoomTask {
    room: Room,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    events_tx: broadcast::Sender<Outbound>,
    player_count: Arc<AtomicUsize>,
    open: Arc<AtomicBool>,
}

impl RoomTask {
    pub fn new(
        code: String,
        settings: GameSettings,
        arena: &'static Arena,
        seed: u64,
    ) -> (Self, RoomHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));
        let open = Arc::new(AtomicBool::new(true));

        let handle = RoomHandle {
            code: code.clone(),
            cmd_tx,
            events_tx: events_tx.clone(),
            player_count: player_count.clone(),
            open: open.clone(),
        };

        let task = Self {
            room: Room::new(code, settings, arena, seed),
            cmd_rx,
            events_tx,
            player_count,
            open,
        };

        (task, handle)
    }

    /// Run until the last member leaves or every handle is dropped
    pub async fn run(mut self) {
        info!(room = %self.room.code, "Room opened");

        let mut tick_interval = interval(Duration::from_millis(TICK_MS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let active = self.room.phase == RoomPhase::Active;
            let next_timer = self.room.timers.next_deadline();
            let timer_wait = next_timer
                .map(|at| at.saturating_sub(unix_millis()))
                .unwrap_or(0);

            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        break;
                    };
                    self.handle_command(cmd);
                    self.flush();
                    if self.room.is_empty() {
                        info!(room = %self.room.code, "Last player left");
                        break;
                    }
                }
                _ = tick_interval.tick(), if active => {
                    let now = unix_millis();
                    self.room.fire_due_timers(now);
                    self.room.tick(now);
                    self.flush();
                }
                _ = sleep(Duration::from_millis(timer_wait)), if next_timer.is_some() => {
                    self.room.fire_due_timers(unix_millis());
                    self.flush();
                }
            }
        }

        self.open.store(false, Ordering::Relaxed);
        self.room.shutdown();
        self.player_count.store(0, Ordering::Relaxed);
        info!(room = %self.room.code, "Room closed");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_id,
                display_name,
                reply,
            } => {
                let result = self.room.join(player_id, display_name);
                if let Err(reason) = &result {
                    debug!(room = %self.room.code, player_id = %player_id, %reason, "Join rejected");
                }
                // Handle state must reflect the join before the caller resumes
                self.flush();
                let _ = reply.send(result);
            }
            RoomCommand::Client(input) => self.handle_client(input),
        }
    }

    fn handle_client(&mut self, input: PlayerInput) {
        let id = input.player_id;
        let now = input.received_at;
        let room = &mut self.room;

        match input.msg {
            ClientMsg::Join { .. } => {
                room.send_to(
                    id,
                    ServerMsg::Error {
                        code: "already_joined".to_string(),
                        message: "Already in a room".to_string(),
                    },
                );
            }
            ClientMsg::Leave => room.leave(id, now),
            ClientMsg::SetReady { ready } => {
                let ok = room.set_ready(id, ready);
                Self::reply(room, id, "set_ready", ok);
            }
            ClientMsg::SelectLoadout { movement, weapon } => {
                let ok = room.select_loadout(id, movement, weapon);
                Self::reply(room, id, "select_loadout", ok);
            }
            ClientMsg::SetLoadoutReady { ready } => {
                let ok = room.set_loadout_ready(id, ready, now);
                Self::reply(room, id, "set_loadout_ready", ok);
            }
            ClientMsg::StartMatch => {
                let ok = room.start_match(id, now);
                Self::reply(room, id, "start_match", ok);
            }
            ClientMsg::Input {
                seq,
                up,
                down,
                left,
                right,
                ascend,
                descend,
                shoot,
                aim,
            } => {
                room.submit_input(
                    id,
                    TickInput {
                        seq,
                        up,
                        down,
                        left,
                        right,
                        ascend,
                        descend,
                        shoot,
                        aim,
                    },
                );
            }
            ClientMsg::Reload => {
                let ok = room.request_reload(id, now);
                Self::reply(room, id, "reload", ok);
            }
            ClientMsg::Respawn => {
                let ok = room.respawn(id, now);
                Self::reply(room, id, "respawn", ok);
            }
            ClientMsg::Ping { t } => room.send_to(id, ServerMsg::Pong { t }),
        }
    }

    fn reply(room: &mut Room, id: Uuid, action: &str, ok: bool) {
        room.send_to(
            id,
            ServerMsg::ActionResult {
                action: action.to_string(),
                ok,
            },
        );
    }

    /// Publish queued messages and refresh the lock-free handle state
    fn flush(&mut self) {
        for out in self.room.drain_outbox() {
            // No subscribers is fine
            let _ = self.events_tx.send(out);
        }
        self.player_count
            .store(self.room.roster.len(), Ordering::Relaxed);
        self.open.store(self.room.is_open(), Ordering::Relaxed);
    }
}
