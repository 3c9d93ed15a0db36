use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Grid side length; the canvas is GRID_SIZE x GRID_SIZE cells.
pub const GRID_SIZE: usize = 10;
/// Seconds a player must wait between two accepted edits.
pub const COOLDOWN_SECS: u64 = 60;
/// Number of recent edits exposed to clients.
pub const HISTORY_WINDOW: usize = 50;
pub const PROTOCOL_VERSION: u32 = 1;

/// Full canvas snapshot as it travels on the wire: row-major, `None` for
/// cells nobody has claimed yet.
pub type Grid = Vec<Vec<Option<GridCell>>>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // client -> server
    Connect {
        client_version: u32,
    },
    Register {
        name: String,
    },
    /// Coordinates are signed so that out-of-range requests reach the
    /// server and are rejected there, rather than failing to encode.
    UpdateCell {
        row: i32,
        col: i32,
        character: String,
    },
    GetGridState,
    GetHistory,
    GetCooldownStatus,
    Ping,
    Disconnect,

    // server -> client
    Connected {
        client_id: u32,
    },
    GridUpdate {
        grid: Grid,
        online_players: u32,
        history: Vec<EditRecord>,
    },
    PlayerCountUpdate {
        online_players: u32,
    },
    HistoryUpdate {
        history: Vec<EditRecord>,
    },
    CooldownStatus {
        on_cooldown: bool,
        remaining_seconds: u64,
    },
    UpdateSuccess {
        message: String,
    },
    Error {
        message: String,
        cooldown_remaining: Option<u64>,
    },
    Pong {
        online_players: u32,
    },
    Disconnected {
        reason: String,
    },
}

/// Occupant of a single grid cell. The author fields are historical data:
/// they stay valid after the authoring player disconnects.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GridCell {
    pub character: char,
    pub player_id: u32,
    pub player_name: String,
    /// Epoch milliseconds at acceptance.
    pub timestamp: u64,
}

/// One accepted mutation, as recorded in the edit log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EditRecord {
    pub row: u32,
    pub col: u32,
    pub character: char,
    pub player_id: u32,
    pub player_name: String,
    pub timestamp: u64,
}

/// Builds an all-empty GRID_SIZE x GRID_SIZE snapshot.
pub fn empty_grid() -> Grid {
    vec![vec![None; GRID_SIZE]; GRID_SIZE]
}

/// True iff the signed coordinates land inside the grid.
pub fn in_bounds(row: i32, col: i32) -> bool {
    (0..GRID_SIZE as i32).contains(&row) && (0..GRID_SIZE as i32).contains(&col)
}

/// Validates the character payload of an edit request: exactly one Unicode
/// scalar value, and displayable (control characters are rejected).
pub fn parse_character(input: &str) -> Option<char> {
    let mut chars = input.chars();
    let ch = chars.next()?;
    if chars.next().is_some() || ch.is_control() {
        return None;
    }
    Some(ch)
}

/// Current time as epoch milliseconds, the timestamp unit used on the wire.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grid_dimensions() {
        let grid = empty_grid();
        assert_eq!(grid.len(), GRID_SIZE);
        for row in &grid {
            assert_eq!(row.len(), GRID_SIZE);
            assert!(row.iter().all(|cell| cell.is_none()));
        }
    }

    #[test]
    fn test_in_bounds() {
        assert!(in_bounds(0, 0));
        assert!(in_bounds(9, 9));
        assert!(in_bounds(5, 0));

        assert!(!in_bounds(-1, 0));
        assert!(!in_bounds(0, -1));
        assert!(!in_bounds(10, 0));
        assert!(!in_bounds(0, 10));
    }

    #[test]
    fn test_parse_character_accepts_single_scalar() {
        assert_eq!(parse_character("X"), Some('X'));
        assert_eq!(parse_character("7"), Some('7'));
        assert_eq!(parse_character("é"), Some('é'));
        assert_eq!(parse_character("☃"), Some('☃'));
    }

    #[test]
    fn test_parse_character_rejects_invalid() {
        assert_eq!(parse_character(""), None);
        assert_eq!(parse_character("ab"), None);
        assert_eq!(parse_character("XY"), None);
        assert_eq!(parse_character("\n"), None);
        assert_eq!(parse_character("\u{7}"), None);
    }

    #[test]
    fn test_packet_serialization_register() {
        let packet = Packet::Register {
            name: "Alice".to_string(),
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Register { name } => assert_eq!(name, "Alice"),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_update_cell() {
        let packet = Packet::UpdateCell {
            row: -1,
            col: 10,
            character: "ab".to_string(),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::UpdateCell {
                row,
                col,
                character,
            } => {
                assert_eq!(row, -1);
                assert_eq!(col, 10);
                assert_eq!(character, "ab");
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_grid_update() {
        let mut grid = empty_grid();
        grid[3][4] = Some(GridCell {
            character: 'Q',
            player_id: 7,
            player_name: "Bob".to_string(),
            timestamp: 123456789,
        });

        let history = vec![EditRecord {
            row: 3,
            col: 4,
            character: 'Q',
            player_id: 7,
            player_name: "Bob".to_string(),
            timestamp: 123456789,
        }];

        let packet = Packet::GridUpdate {
            grid,
            online_players: 2,
            history,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::GridUpdate {
                grid,
                online_players,
                history,
            } => {
                assert_eq!(online_players, 2);
                assert_eq!(history.len(), 1);
                let cell = grid[3][4].as_ref().unwrap();
                assert_eq!(cell.character, 'Q');
                assert_eq!(cell.player_id, 7);
                assert_eq!(cell.player_name, "Bob");
                assert!(grid[0][0].is_none());
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_error_with_cooldown() {
        let packet = Packet::Error {
            message: "Cooldown active. Try again in 42 seconds".to_string(),
            cooldown_remaining: Some(42),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Error {
                message,
                cooldown_remaining,
            } => {
                assert!(message.contains("42"));
                assert_eq!(cooldown_remaining, Some(42));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_epoch_millis_advances() {
        let t1 = epoch_millis();
        std::thread::sleep(Duration::from_millis(2));
        let t2 = epoch_millis();
        assert!(t2 > t1);
    }
}
