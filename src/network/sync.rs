//! State Synchronization Loop
//!
//! The single consumer of all game-affecting events. Connection tasks parse
//! wire messages at the boundary and forward [`GameCommand`]s over one mpsc
//! channel; this loop processes them FIFO, one to completion at a time,
//! while exclusively owning the round coordinator, the player registry, and
//! every client's outbound sender. That serialization is the concurrency
//! contract: no locks anywhere in game state, and no two commands ever
//! interleave their mutations.
//!
//! Broadcast policy (who gets what):
//! - admission: `newId` + full `dungeon data` to the new connection only,
//!   then the full roster to everyone
//! - successful non-goal move: one-player `updatePlayers` to everyone
//! - round transition: full `dungeon data` then full roster to everyone
//! - disconnect: `removedPlayers` (registry index) to everyone remaining

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::game::movement::{try_move, Direction, MoveResult};
use crate::game::registry::{ConnectionId, PlayerRegistry};
use crate::game::round::RoundCoordinator;
use crate::network::protocol::ServerMessage;

/// Game-affecting events, queued by connection tasks and drained FIFO by
/// [`GameWorld::run`].
#[derive(Debug)]
pub enum GameCommand {
    /// A WebSocket connection completed its handshake.
    Connect {
        /// Transient identity of the connection.
        connection_id: ConnectionId,
        /// Outbound channel drained by the connection's writer task.
        sender: mpsc::Sender<ServerMessage>,
    },
    /// A validated move request.
    Move {
        /// Requesting connection.
        connection_id: ConnectionId,
        /// Requested direction.
        direction: Direction,
    },
    /// The connection closed (cleanly or not).
    Disconnect {
        /// The closed connection.
        connection_id: ConnectionId,
    },
}

/// Exclusive owner of all authoritative game state.
pub struct GameWorld {
    round: RoundCoordinator,
    registry: PlayerRegistry,
    clients: BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>,
}

impl GameWorld {
    /// Create a world around an initialized round coordinator.
    pub fn new(round: RoundCoordinator) -> Self {
        Self {
            round,
            registry: PlayerRegistry::new(),
            clients: BTreeMap::new(),
        }
    }

    /// Drain the command queue until every sender is dropped (shutdown).
    pub async fn run(mut self, mut commands: mpsc::Receiver<GameCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        info!("Game loop stopped");
    }

    fn handle(&mut self, command: GameCommand) {
        match command {
            GameCommand::Connect {
                connection_id,
                sender,
            } => self.handle_connect(connection_id, sender),
            GameCommand::Move {
                connection_id,
                direction,
            } => self.handle_move(connection_id, direction),
            GameCommand::Disconnect { connection_id } => self.handle_disconnect(connection_id),
        }
    }

    fn handle_connect(&mut self, connection_id: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        let player_id = self
            .registry
            .admit(connection_id, self.round.start_point())
            .id;
        self.clients.insert(connection_id, sender);

        info!(
            "Player {} connected ({} online), sending dungeon data",
            player_id,
            self.registry.len()
        );

        // Full snapshot to the new connection only, then the roster to
        // everyone including the new connection.
        self.send_to(connection_id, ServerMessage::NewId { id: player_id });
        self.send_to(connection_id, self.dungeon_snapshot());
        self.broadcast(ServerMessage::GetPlayers {
            instance: self.registry.snapshot_public(),
        });
    }

    fn handle_move(&mut self, connection_id: ConnectionId, direction: Direction) {
        // A queued move can race the disconnect that removed the player;
        // that is a silent no-op, never an error.
        let Some(player) = self.registry.get(connection_id) else {
            debug!("Move from unknown connection {}", connection_id);
            return;
        };

        match try_move(player.position(), direction, self.round.dungeon()) {
            MoveResult::Blocked => {
                // No state change and nothing broadcast; the client simply
                // sees no movement.
            }
            MoveResult::Moved {
                position,
                facing_right,
            } => {
                let updated = self.registry.apply_move(connection_id, position, facing_right);

                if self.round.is_goal(position) {
                    self.round.complete_round(&mut self.registry);
                    self.broadcast(self.dungeon_snapshot());
                    self.broadcast(ServerMessage::GetPlayers {
                        instance: self.registry.snapshot_public(),
                    });
                } else if let Some(player) = updated {
                    self.broadcast(ServerMessage::UpdatePlayers { player });
                }
            }
        }
    }

    fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        self.clients.remove(&connection_id);

        // Emit the removal immediately: later roster-indexed messages assume
        // clients have already spliced this index out.
        if let Some(index) = self.registry.remove(connection_id) {
            info!(
                "Player at index {} disconnected ({} online)",
                index,
                self.registry.len()
            );
            self.broadcast(ServerMessage::RemovedPlayers { index });
        }
    }

    fn dungeon_snapshot(&self) -> ServerMessage {
        ServerMessage::DungeonData {
            dungeon: self.round.dungeon().clone(),
            starting_point: self.round.start_point(),
            ending_point: self.round.end_point(),
        }
    }

    fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) {
        if let Some(sender) = self.clients.get(&connection_id) {
            // Best-effort, at-most-once: a slow client loses messages
            // rather than stalling the game loop.
            let _ = sender.try_send(message);
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for sender in self.clients.values() {
            let _ = sender.try_send(message.clone());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
