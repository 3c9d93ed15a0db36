//! Client network layer: connection handshake, commands, server pushes
//!
//! Runs a line-oriented terminal session against the canvas server: stdin
//! commands become request packets, server pushes update the local view,
//! and a periodic ping keeps the connection alive under the server's idle
//! timeout (the reply doubles as a presence readout).

use crate::view::ClientView;
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{Packet, GRID_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};

/// Seconds between keep-alive pings.
const PING_INTERVAL_SECS: u64 = 2;

/// A parsed terminal command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        row: i32,
        col: i32,
        character: String,
    },
    Grid,
    History,
    Cooldown,
    Quit,
}

/// Parses one input line. Coordinates are passed through unvalidated; the
/// server is the authority on bounds and character validity.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();

    match parts.next() {
        Some("set") => {
            let row = parts
                .next()
                .and_then(|s| s.parse::<i32>().ok())
                .ok_or("usage: set <row> <col> <char>")?;
            let col = parts
                .next()
                .and_then(|s| s.parse::<i32>().ok())
                .ok_or("usage: set <row> <col> <char>")?;
            let character = parts.next().ok_or("usage: set <row> <col> <char>")?;
            Ok(Command::Set {
                row,
                col,
                character: character.to_string(),
            })
        }
        Some("grid") => Ok(Command::Grid),
        Some("history") => Ok(Command::History),
        Some("cooldown") => Ok(Command::Cooldown),
        Some("quit") | Some("exit") => Ok(Command::Quit),
        Some(other) => Err(format!("unknown command: {}", other)),
        None => {
            Err("commands: set <row> <col> <char> | grid | history | cooldown | quit".to_string())
        }
    }
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,

    view: ClientView,
}

impl Client {
    pub async fn new(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            view: ClientView::new(),
        })
    }

    /// Handshake: `Connect` out, `Connected { client_id }` back.
    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await?;

        let mut buffer = [0u8; 8192];
        let len = timeout(Duration::from_secs(5), self.socket.recv(&mut buffer)).await??;

        match deserialize::<Packet>(&buffer[0..len])? {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                Ok(())
            }
            Packet::Disconnected { reason } => Err(reason.into()),
            _ => Err("unexpected handshake response".into()),
        }
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::GridUpdate {
                grid,
                online_players,
                history,
            } => {
                self.view.apply_grid_update(grid, online_players, history);
                println!("{}", self.view.render_grid());
            }

            Packet::PlayerCountUpdate { online_players } => {
                self.view.apply_player_count(online_players);
                println!("players online: {}", online_players);
            }

            Packet::HistoryUpdate { history } => {
                self.view.apply_history(history);
                println!("{}", self.view.render_history());
            }

            Packet::CooldownStatus {
                on_cooldown,
                remaining_seconds,
            } => {
                if on_cooldown {
                    println!("on cooldown: {} seconds remaining", remaining_seconds);
                } else {
                    println!("ready to edit");
                }
            }

            Packet::UpdateSuccess { message } => {
                println!("{}", message);
            }

            Packet::Error {
                message,
                cooldown_remaining,
            } => match cooldown_remaining {
                Some(secs) => println!("rejected: {} ({}s left)", message, secs),
                None => println!("rejected: {}", message),
            },

            Packet::Pong { online_players } => {
                self.view.apply_player_count(online_players);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Sends the request for one input line. Returns false for `Quit`.
    async fn handle_command(&mut self, line: &str) -> bool {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                return true;
            }
        };

        let packet = match command {
            Command::Set {
                row,
                col,
                character,
            } => Packet::UpdateCell {
                row,
                col,
                character,
            },
            Command::Grid => Packet::GetGridState,
            Command::History => Packet::GetHistory,
            Command::Cooldown => Packet::GetCooldownStatus,
            Command::Quit => return false,
        };

        if let Err(e) = self.send_packet(&packet).await {
            error!("Error sending request: {}", e);
        }
        true
    }

    pub async fn run(&mut self, name: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        // Registration is acknowledged by a full-state push.
        self.send_packet(&Packet::Register {
            name: name.to_string(),
        })
        .await?;
        if let Some(client_id) = self.client_id {
            info!("Registering as \"{}\" (client {})", name, client_id);
        }

        println!(
            "Claim a cell with: set <row> <col> <char>  (rows and columns 0..{})",
            GRID_SIZE - 1
        );

        let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; 8192];

        loop {
            tokio::select! {
                result = self.socket.recv(&mut buffer) => {
                    match result {
                        Ok(len) => {
                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet);
                            } else {
                                warn!("Failed to deserialize packet from server");
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.handle_command(&line).await {
                                break;
                            }
                        }
                        Ok(None) => break, // stdin closed
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            break;
                        }
                    }
                },

                _ = ping_interval.tick() => {
                    if let Err(e) = self.send_packet(&Packet::Ping).await {
                        error!("Error sending ping: {}", e);
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
