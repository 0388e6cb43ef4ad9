use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::constants::CLASSIC_LAYOUT;
use crate::types::{Direction, GhostRole, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Open,
    Pellet,
    PowerPellet,
    /// Ghost-house door: floor for ghosts, wall for the player.
    Door,
}

impl Cell {
    fn glyph(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Open => ' ',
            Cell::Pellet => '.',
            Cell::PowerPellet => 'o',
            Cell::Door => '-',
        }
    }

    pub fn is_consumable(self) -> bool {
        matches!(self, Cell::Pellet | Cell::PowerPellet)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mover {
    Player,
    Ghost,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("layout has no rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at ({x},{y})")]
    UnknownGlyph { x: i32, y: i32, glyph: char },
    #[error("layout has no player spawn (P)")]
    MissingPlayerSpawn,
    #[error("layout has more than one player spawn, second at ({x},{y})")]
    DuplicatePlayerSpawn { x: i32, y: i32 },
    #[error("layout needs exactly 4 ghost homes (G), found {found}")]
    GhostHomeCount { found: usize },
    #[error("layout has more than one fruit cell, second at ({x},{y})")]
    DuplicateFruitCell { x: i32, y: i32 },
    #[error("layout has no pellets")]
    NoPellets,
    #[error("pellet at ({x},{y}) cannot be reached from the player spawn")]
    UnreachablePellet { x: i32, y: i32 },
    #[error("{role:?} home at ({x},{y}) cannot reach the player spawn")]
    UnreachableGhostHome { role: GhostRole, x: i32, y: i32 },
}

#[derive(Clone, Debug)]
pub struct Board {
    pub width: i32,
    pub height: i32,
    pub player_spawn: Vec2,
    pub ghost_homes: [Vec2; 4],
    pub fruit_cell: Vec2,
    initial: Vec<Vec<Cell>>,
    cells: Vec<Vec<Cell>>,
    tunnel_rows: Vec<bool>,
    total_pellets: usize,
    pellets_remaining: usize,
}

impl Board {
    pub fn classic() -> Result<Self, BoardError> {
        Self::parse(&CLASSIC_LAYOUT)
    }

    /// Builds a board from row strings. Rows whose first and last cells are both
    /// non-wall become tunnel rows.
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, BoardError> {
        if rows.is_empty() {
            return Err(BoardError::Empty);
        }
        let expected = rows[0].as_ref().chars().count();
        if expected == 0 {
            return Err(BoardError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len());
        let mut player_spawn = None;
        let mut fruit_cell = None;
        let mut ghost_homes = Vec::new();
        let mut total_pellets = 0;

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != expected {
                return Err(BoardError::InconsistentWidth {
                    row: y,
                    expected,
                    found,
                });
            }
            let mut line = Vec::with_capacity(expected);
            for (x, glyph) in row.chars().enumerate() {
                let pos = Vec2::new(x as i32, y as i32);
                let cell = match glyph {
                    '#' => Cell::Wall,
                    ' ' => Cell::Open,
                    '.' => Cell::Pellet,
                    'o' => Cell::PowerPellet,
                    '-' => Cell::Door,
                    'P' => {
                        if player_spawn.is_some() {
                            return Err(BoardError::DuplicatePlayerSpawn { x: pos.x, y: pos.y });
                        }
                        player_spawn = Some(pos);
                        Cell::Open
                    }
                    'G' => {
                        ghost_homes.push(pos);
                        Cell::Open
                    }
                    'F' => {
                        if fruit_cell.is_some() {
                            return Err(BoardError::DuplicateFruitCell { x: pos.x, y: pos.y });
                        }
                        fruit_cell = Some(pos);
                        Cell::Open
                    }
                    _ => {
                        return Err(BoardError::UnknownGlyph {
                            x: pos.x,
                            y: pos.y,
                            glyph,
                        })
                    }
                };
                if cell.is_consumable() {
                    total_pellets += 1;
                }
                line.push(cell);
            }
            cells.push(line);
        }

        let player_spawn = player_spawn.ok_or(BoardError::MissingPlayerSpawn)?;
        let ghost_homes: [Vec2; 4] = ghost_homes
            .try_into()
            .map_err(|homes: Vec<Vec2>| BoardError::GhostHomeCount { found: homes.len() })?;
        if total_pellets == 0 {
            return Err(BoardError::NoPellets);
        }

        let tunnel_rows = cells
            .iter()
            .map(|line| {
                line.first().is_some_and(|cell| *cell != Cell::Wall)
                    && line.last().is_some_and(|cell| *cell != Cell::Wall)
            })
            .collect();

        let board = Self {
            width: expected as i32,
            height: rows.len() as i32,
            player_spawn,
            ghost_homes,
            fruit_cell: fruit_cell.unwrap_or(player_spawn),
            initial: cells.clone(),
            cells,
            tunnel_rows,
            total_pellets,
            pellets_remaining: total_pellets,
        };
        board.validate_reachability()?;
        Ok(board)
    }

    fn validate_reachability(&self) -> Result<(), BoardError> {
        let reachable = self.reachable_from(self.player_spawn, Mover::Player);
        for (y, line) in self.initial.iter().enumerate() {
            for (x, cell) in line.iter().enumerate() {
                if cell.is_consumable() && !reachable.contains(&Vec2::new(x as i32, y as i32)) {
                    return Err(BoardError::UnreachablePellet {
                        x: x as i32,
                        y: y as i32,
                    });
                }
            }
        }

        for (role, home) in GhostRole::ALL.iter().zip(self.ghost_homes.iter()) {
            if !self.reachable_from(*home, Mover::Ghost).contains(&self.player_spawn) {
                return Err(BoardError::UnreachableGhostHome {
                    role: *role,
                    x: home.x,
                    y: home.y,
                });
            }
        }
        Ok(())
    }

    fn reachable_from(&self, start: Vec2, mover: Mover) -> HashSet<Vec2> {
        let mut out = HashSet::new();
        if !self.is_walkable(start.x, start.y, mover) {
            return out;
        }
        let mut queue = VecDeque::new();
        out.insert(start);
        queue.push_back(start);

        while let Some(pos) = queue.pop_front() {
            for (_, next) in self.legal_neighbors(pos, mover) {
                if out.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        out
    }

    pub fn cell(&self, x: i32, y: i32) -> Cell {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Cell::Wall;
        }
        self.cells[y as usize][x as usize]
    }

    pub fn is_tunnel_row(&self, y: i32) -> bool {
        y >= 0 && self.tunnel_rows.get(y as usize).copied().unwrap_or(false)
    }

    pub fn is_walkable(&self, x: i32, y: i32, mover: Mover) -> bool {
        match self.cell(x, y) {
            Cell::Wall => false,
            Cell::Door => mover == Mover::Ghost,
            Cell::Open | Cell::Pellet | Cell::PowerPellet => true,
        }
    }

    /// Resolves the cell one step from `from`, wrapping horizontally on tunnel rows.
    /// Vertical edges never wrap.
    pub fn wrap_step(&self, from: Vec2, dir: Direction) -> Option<Vec2> {
        if dir == Direction::None {
            return None;
        }
        let (dx, dy) = dir.vector();
        let ny = from.y + dy;
        if ny < 0 || ny >= self.height {
            return None;
        }
        let mut nx = from.x + dx;
        if nx < 0 || nx >= self.width {
            if !self.is_tunnel_row(ny) {
                return None;
            }
            nx = nx.rem_euclid(self.width);
        }
        Some(Vec2::new(nx, ny))
    }

    pub fn try_step(&self, from: Vec2, dir: Direction, mover: Mover) -> Option<Vec2> {
        self.wrap_step(from, dir)
            .filter(|next| self.is_walkable(next.x, next.y, mover))
    }

    /// Up to four non-wall neighbors, in `Direction::ORTHOGONAL` order.
    pub fn legal_neighbors(&self, from: Vec2, mover: Mover) -> Vec<(Direction, Vec2)> {
        Direction::ORTHOGONAL
            .iter()
            .filter_map(|dir| self.try_step(from, *dir, mover).map(|next| (*dir, next)))
            .collect()
    }

    /// Clears a pellet or power pellet, returning what was there.
    pub fn consume(&mut self, x: i32, y: i32) -> Option<Cell> {
        let cell = self.cell(x, y);
        if !cell.is_consumable() {
            return None;
        }
        self.cells[y as usize][x as usize] = Cell::Open;
        self.pellets_remaining = self.pellets_remaining.saturating_sub(1);
        Some(cell)
    }

    pub fn reset(&mut self) {
        self.cells = self.initial.clone();
        self.pellets_remaining = self.total_pellets;
    }

    pub fn pellets_remaining(&self) -> usize {
        self.pellets_remaining
    }

    pub fn total_pellets(&self) -> usize {
        self.total_pellets
    }

    pub fn pellets_eaten(&self) -> usize {
        self.total_pellets - self.pellets_remaining
    }

    pub fn tiles(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|line| line.iter().map(|cell| cell.glyph()).collect())
            .collect()
    }
}
