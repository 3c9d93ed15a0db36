//! Synchronization engine: the decide/mutate core of the canvas server
//!
//! Owns the session registry, the grid store, the edit log, and the cooldown
//! policy. Every operation is synchronous and returns the outbound messages
//! it produced as plain [`Effect`] values; the network layer is a thin
//! fan-out over those. This keeps the whole request pipeline testable
//! without a socket, and the caller (the server's single main loop) is the
//! serialization point that makes last-write-wins well-defined.

use log::info;
use std::time::Instant;
use thiserror::Error;

use shared::{epoch_millis, in_bounds, parse_character, EditRecord, GridCell, Packet, HISTORY_WINDOW};

use crate::cooldown::CooldownPolicy;
use crate::grid::GridStore;
use crate::history::EditLog;
use crate::session::SessionRegistry;

/// Why a client request was rejected. All variants are client-input errors:
/// they are reported to the offending connection only and are never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Player not registered")]
    NotRegistered,
    #[error("Invalid grid coordinates")]
    OutOfBounds { row: i32, col: i32 },
    #[error("Character must be a single Unicode character")]
    InvalidCharacter,
    #[error("Cooldown active. Try again in {remaining_secs} seconds")]
    CooldownActive { remaining_secs: u64 },
    #[error("Display name must not be empty")]
    InvalidInput,
}

impl EditError {
    /// Wire representation: the rejection notice for the requester.
    pub fn to_packet(&self) -> Packet {
        let cooldown_remaining = match self {
            EditError::CooldownActive { remaining_secs } => Some(*remaining_secs),
            _ => None,
        };
        Packet::Error {
            message: self.to_string(),
            cooldown_remaining,
        }
    }
}

/// Outbound message produced by an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver to one connection.
    Send { to: u32, packet: Packet },
    /// Deliver to every live connection.
    Broadcast { packet: Packet },
}

/// The authoritative canvas state machine.
pub struct Engine {
    sessions: SessionRegistry,
    grid: GridStore,
    log: EditLog,
    policy: CooldownPolicy,
}

impl Engine {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            grid: GridStore::new(),
            log: EditLog::new(),
            policy,
        }
    }

    /// Presence count, also served by the liveness probe.
    pub fn online_players(&self) -> u32 {
        self.sessions.count() as u32
    }

    fn grid_update(&self) -> Packet {
        Packet::GridUpdate {
            grid: self.grid.snapshot(),
            online_players: self.online_players(),
            history: self.log.recent(HISTORY_WINDOW),
        }
    }

    /// `Register { name }`: creates (or replaces) the session for this
    /// connection, pushes the full state to it, and broadcasts the new
    /// presence count.
    pub fn register(&mut self, connection_id: u32, name: &str) -> Vec<Effect> {
        if let Err(err) = self.sessions.register(connection_id, name) {
            return vec![Effect::Send {
                to: connection_id,
                packet: err.to_packet(),
            }];
        }

        vec![
            Effect::Send {
                to: connection_id,
                packet: self.grid_update(),
            },
            Effect::Broadcast {
                packet: Packet::PlayerCountUpdate {
                    online_players: self.online_players(),
                },
            },
        ]
    }

    /// `UpdateCell`: the full validation pipeline, then mutation and
    /// broadcast. A rejected request mutates nothing and arms no cooldown.
    pub fn update_cell(
        &mut self,
        connection_id: u32,
        row: i32,
        col: i32,
        character: &str,
        now: Instant,
    ) -> Vec<Effect> {
        match self.try_update_cell(connection_id, row, col, character, now) {
            Ok(()) => vec![
                Effect::Broadcast {
                    packet: self.grid_update(),
                },
                Effect::Send {
                    to: connection_id,
                    packet: Packet::UpdateSuccess {
                        message: "Grid updated successfully".to_string(),
                    },
                },
            ],
            Err(err) => vec![Effect::Send {
                to: connection_id,
                packet: err.to_packet(),
            }],
        }
    }

    /// Validation order matters: registration, bounds, character, cooldown.
    /// Short-circuits on the first failure, before any mutation.
    fn try_update_cell(
        &mut self,
        connection_id: u32,
        row: i32,
        col: i32,
        character: &str,
        now: Instant,
    ) -> Result<(), EditError> {
        let session = self
            .sessions
            .lookup(connection_id)
            .ok_or(EditError::NotRegistered)?;

        if !in_bounds(row, col) {
            return Err(EditError::OutOfBounds { row, col });
        }

        let ch = parse_character(character).ok_or(EditError::InvalidCharacter)?;

        if !self.policy.may_edit(session, now) {
            return Err(EditError::CooldownActive {
                remaining_secs: self.policy.remaining_secs(session, now),
            });
        }

        let player_id = session.id;
        let player_name = session.name.clone();
        let timestamp = epoch_millis();

        self.grid.set(
            row as usize,
            col as usize,
            GridCell {
                character: ch,
                player_id,
                player_name: player_name.clone(),
                timestamp,
            },
        )?;

        self.log.append(EditRecord {
            row: row as u32,
            col: col as u32,
            character: ch,
            player_id,
            player_name: player_name.clone(),
            timestamp,
        });

        if let Some(session) = self.sessions.lookup_mut(connection_id) {
            self.policy.arm(session, now);
        }

        info!(
            "Grid updated: [{}, {}] = \"{}\" by {}",
            row, col, ch, player_name
        );
        Ok(())
    }

    /// Connection gone (explicit disconnect or idle timeout). Removing an
    /// unregistered connection produces no traffic at all.
    pub fn disconnect(&mut self, connection_id: u32) -> Vec<Effect> {
        if self.sessions.remove(connection_id) {
            vec![Effect::Broadcast {
                packet: Packet::PlayerCountUpdate {
                    online_players: self.online_players(),
                },
            }]
        } else {
            Vec::new()
        }
    }

    /// `GetGridState`: full snapshot to the requester only.
    pub fn grid_state(&self, connection_id: u32) -> Vec<Effect> {
        vec![Effect::Send {
            to: connection_id,
            packet: self.grid_update(),
        }]
    }

    /// `GetHistory`: recent edit window to the requester only.
    pub fn history(&self, connection_id: u32) -> Vec<Effect> {
        vec![Effect::Send {
            to: connection_id,
            packet: Packet::HistoryUpdate {
                history: self.log.recent(HISTORY_WINDOW),
            },
        }]
    }

    /// `GetCooldownStatus`: the requester's own countdown. An unregistered
    /// connection simply reads as "not on cooldown".
    pub fn cooldown_status(&self, connection_id: u32, now: Instant) -> Vec<Effect> {
        let remaining = self
            .sessions
            .lookup(connection_id)
            .map(|session| self.policy.remaining_secs(session, now))
            .unwrap_or(0);

        vec![Effect::Send {
            to: connection_id,
            packet: Packet::CooldownStatus {
                on_cooldown: remaining > 0,
                remaining_seconds: remaining,
            },
        }]
    }
}
