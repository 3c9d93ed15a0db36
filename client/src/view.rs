//! Client-side replica of the canvas state
//!
//! Kept in sync from server pushes (`GridUpdate`, `PlayerCountUpdate`,
//! `HistoryUpdate`) and rendered as plain text for the terminal.

use shared::{empty_grid, EditRecord, Grid, GRID_SIZE};

/// Local copy of everything the server has told us.
pub struct ClientView {
    pub grid: Grid,
    pub online_players: u32,
    pub history: Vec<EditRecord>,
}

impl ClientView {
    pub fn new() -> Self {
        Self {
            grid: empty_grid(),
            online_players: 0,
            history: Vec::new(),
        }
    }

    /// Replaces the replica with a full-state push.
    pub fn apply_grid_update(
        &mut self,
        grid: Grid,
        online_players: u32,
        history: Vec<EditRecord>,
    ) {
        self.grid = grid;
        self.online_players = online_players;
        self.history = history;
    }

    pub fn apply_player_count(&mut self, online_players: u32) {
        self.online_players = online_players;
    }

    pub fn apply_history(&mut self, history: Vec<EditRecord>) {
        self.history = history;
    }

    /// Renders the grid with row/column headers; empty cells print as dots.
    pub fn render_grid(&self) -> String {
        let mut out = String::new();

        out.push_str("    ");
        for col in 0..GRID_SIZE {
            out.push_str(&format!("{} ", col));
        }
        out.push('\n');

        for (row_idx, row) in self.grid.iter().enumerate() {
            out.push_str(&format!("{:>2}  ", row_idx));
            for cell in row {
                match cell {
                    Some(cell) => out.push(cell.character),
                    None => out.push('.'),
                }
                out.push(' ');
            }
            out.push('\n');
        }

        out.push_str(&format!("players online: {}\n", self.online_players));
        out
    }

    /// Renders the recent edit window, oldest first.
    pub fn render_history(&self) -> String {
        if self.history.is_empty() {
            return "no edits yet\n".to_string();
        }

        let mut out = String::new();
        for record in &self.history {
            out.push_str(&format!(
                "[{}, {}] = \"{}\" by {}\n",
                record.row, record.col, record.character, record.player_name
            ));
        }
        out
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self::new()
    }
}
