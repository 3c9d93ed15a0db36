//! Server network layer: UDP transport around the synchronization engine
//!
//! Packets from all endpoints are funneled through one mpsc channel into the
//! main loop, which applies them to the engine one at a time. That loop is
//! the single serialization point for every mutation (register, edit,
//! disconnect, timeout), so edit-log order always matches acceptance order
//! and last-write-wins is decided by arrival at the loop, not by timestamps.

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

use crate::connection::ConnectionTable;
use crate::cooldown::CooldownPolicy;
use crate::engine::{Effect, Engine};

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ConnectionTimeout {
        connection_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    Send { packet: Packet, addr: SocketAddr },
    Broadcast { packet: Packet },
}

/// The canvas server: socket, connection table, and the engine.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionTable>>,
    engine: Engine,
    idle_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        cooldown: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionTable::new())),
            engine: Engine::new(CooldownPolicy::new(cooldown)),
            idle_timeout,
            server_tx,
            server_rx,
            out_tx,
            out_rx,
        })
    }

    /// Bound address, useful when binding to port 0 in tests.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 8192];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing message queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let mut out_rx = std::mem::replace(&mut self.out_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                match message {
                    OutboundMessage::Send { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::Broadcast { packet } => {
                        let addrs = {
                            let connections_guard = connections.read().await;
                            connections_guard.addrs()
                        };

                        for (connection_id, addr) in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to connection {}: {}", connection_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps idle connections
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut connections_guard = connections.write().await;
                    connections_guard.check_timeouts(idle_timeout)
                };

                for connection_id in timed_out {
                    if let Err(e) =
                        server_tx.send(ServerMessage::ConnectionTimeout { connection_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn queue_send(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.out_tx.send(OutboundMessage::Send { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Resolves engine effects to concrete outbound messages. A `Send` to a
    /// connection that vanished mid-request is dropped silently: the
    /// request simply never completed for anyone.
    async fn dispatch_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, packet } => {
                    let addr = {
                        let connections = self.connections.read().await;
                        connections.addr_of(to)
                    };

                    if let Some(addr) = addr {
                        self.queue_send(packet, addr);
                    } else {
                        debug!("Dropping packet for departed connection {}", to);
                    }
                }
                Effect::Broadcast { packet } => {
                    if let Err(e) = self.out_tx.send(OutboundMessage::Broadcast { packet }) {
                        error!("Failed to queue broadcast packet: {}", e);
                    }
                }
            }
        }
    }

    /// Applies one incoming packet to the connection table and the engine.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            info!(
                "Client connecting from {} (version: {})",
                addr, client_version
            );

            // A reconnect from the same address replaces the old connection
            // and tears down its session first.
            let existing = {
                let connections = self.connections.read().await;
                connections.find_by_addr(addr)
            };

            if let Some(existing_id) = existing {
                info!(
                    "Replacing existing connection {} from {}",
                    existing_id, addr
                );
                {
                    let mut connections = self.connections.write().await;
                    connections.remove(existing_id);
                }
                let effects = self.engine.disconnect(existing_id);
                self.dispatch_effects(effects).await;
            }

            let connection_id = {
                let mut connections = self.connections.write().await;
                connections.add(addr)
            };

            self.queue_send(
                Packet::Connected {
                    client_id: connection_id,
                },
                addr,
            );
            return;
        }

        let connection_id = {
            let connections = self.connections.read().await;
            connections.find_by_addr(addr)
        };

        let Some(connection_id) = connection_id else {
            warn!("Packet from unknown endpoint {}", addr);
            return;
        };

        {
            let mut connections = self.connections.write().await;
            connections.touch(connection_id);
        }

        let now = Instant::now();
        let effects = match packet {
            Packet::Register { name } => self.engine.register(connection_id, &name),
            Packet::UpdateCell {
                row,
                col,
                character,
            } => self
                .engine
                .update_cell(connection_id, row, col, &character, now),
            Packet::GetGridState => self.engine.grid_state(connection_id),
            Packet::GetHistory => self.engine.history(connection_id),
            Packet::GetCooldownStatus => self.engine.cooldown_status(connection_id, now),
            Packet::Ping => vec![Effect::Send {
                to: connection_id,
                packet: Packet::Pong {
                    online_players: self.engine.online_players(),
                },
            }],
            Packet::Disconnect => {
                {
                    let mut connections = self.connections.write().await;
                    connections.remove(connection_id);
                }
                self.engine.disconnect(connection_id)
            }
            _ => {
                warn!("Unexpected packet type from client at {}", addr);
                Vec::new()
            }
        };

        self.dispatch_effects(effects).await;
    }

    /// Idle timeout: the connection is already gone from the table, but the
    /// session teardown still goes through the main loop like any other
    /// mutation.
    async fn handle_timeout(&mut self, connection_id: u32) {
        info!("Connection {} timed out", connection_id);
        let effects = self.engine.disconnect(connection_id);
        self.dispatch_effects(effects).await;
    }

    /// Main server loop: the single serialization point for all mutations.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ConnectionTimeout { connection_id } => {
                    self.handle_timeout(connection_id).await;
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
