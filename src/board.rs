//! Board: fixed grid of cells, gravity, connected-group detection and clearing.

use crate::pair::Pair;

/// Default playfield width in cells.
pub const DEFAULT_WIDTH: usize = 6;

/// Default playfield height in cells.
pub const DEFAULT_HEIGHT: usize = 12;

/// Smallest connected group that clears.
pub const MIN_GROUP_SIZE: usize = 4;

const NEIGHBOURS_4: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// The five puyo colours. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PuyoColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
}

impl PuyoColor {
    pub const ALL: [Self; 5] = [Self::Red, Self::Blue, Self::Green, Self::Yellow, Self::Purple];

    /// Palette index 0..5 for theme.puyo_color().
    pub fn index(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Purple => 4,
        }
    }
}

/// Single cell: either empty or a puyo of some colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Puyo(PuyoColor),
}

impl Cell {
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// Result of one find-and-clear pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clear {
    /// Total cells cleared across all groups.
    pub cleared: usize,
    /// Number of distinct groups of MIN_GROUP_SIZE or more.
    pub groups: usize,
    /// Cleared coordinates as (x, y).
    pub cells: Vec<(usize, usize)>,
}

impl Clear {
    pub fn is_empty(&self) -> bool {
        self.cleared == 0
    }
}

/// Playfield grid. y=0 is top; rows[y][x].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    rows: Vec<Vec<Cell>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![Cell::Empty; width]; height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at (x, y), or None when out of range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Signed lookup; negative or too-large coordinates are None.
    fn get_signed(&self, x: i32, y: i32) -> Option<Cell> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        self.get(x, y)
    }

    /// True iff (x, y) is on the board and empty.
    #[inline]
    pub fn is_occupiable(&self, x: i32, y: i32) -> bool {
        self.get_signed(x, y).is_some_and(Cell::is_empty)
    }

    /// True iff both halves of the pair are occupiable. The only collision check.
    pub fn can_place_pair(&self, pair: &Pair) -> bool {
        pair.positions()
            .iter()
            .all(|&(x, y)| self.is_occupiable(x, y))
    }

    /// Write a cell. Out of range is a no-op.
    pub fn place(&mut self, x: i32, y: i32, cell: Cell) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    /// Compact every column downward, keeping the order of its puyos.
    pub fn apply_gravity(&mut self) {
        for x in 0..self.width {
            let mut write = self.height;
            for y in (0..self.height).rev() {
                let cell = self.rows[y][x];
                if cell.is_empty() {
                    continue;
                }
                write -= 1;
                if write != y {
                    self.rows[write][x] = cell;
                    self.rows[y][x] = Cell::Empty;
                }
            }
        }
    }

    /// Every 4-connected same-colour component, in scan order (top-to-bottom, left-to-right).
    pub fn components(&self) -> Vec<Vec<(usize, usize)>> {
        let mut visited = vec![vec![false; self.width]; self.height];
        let mut found = Vec::new();

        for start_y in 0..self.height {
            for start_x in 0..self.width {
                if visited[start_y][start_x] {
                    continue;
                }
                let Cell::Puyo(color) = self.rows[start_y][start_x] else {
                    continue;
                };

                let mut component = Vec::new();
                let mut stack = vec![(start_x, start_y)];
                visited[start_y][start_x] = true;

                while let Some((x, y)) = stack.pop() {
                    component.push((x, y));
                    for (dx, dy) in NEIGHBOURS_4 {
                        let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                        if self.get_signed(nx, ny) != Some(Cell::Puyo(color)) {
                            continue;
                        }
                        let (nx, ny) = (nx as usize, ny as usize);
                        if !visited[ny][nx] {
                            visited[ny][nx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
                found.push(component);
            }
        }
        found
    }

    /// Clear every group of MIN_GROUP_SIZE or more in a single batch.
    pub fn find_and_clear_groups(&mut self) -> Clear {
        let mut result = Clear::default();
        for component in self.components() {
            if component.len() >= MIN_GROUP_SIZE {
                result.groups += 1;
                result.cells.extend(component);
            }
        }
        for &(x, y) in &result.cells {
            self.rows[y][x] = Cell::Empty;
        }
        result.cells.sort_unstable_by_key(|&(x, y)| (y, x));
        result.cleared = result.cells.len();
        result
    }

    /// True if anything sits in the top row.
    pub fn is_game_over(&self) -> bool {
        self.rows
            .first()
            .is_some_and(|row| row.iter().any(|c| !c.is_empty()))
    }

    pub fn occupied(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|c| !c.is_empty())
            .count()
    }

    /// Reset every cell to Empty.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(Cell::Empty);
        }
    }

    /// Build a board from text rows (top first): `R B G Y P` for colours, anything else empty.
    #[cfg(test)]
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut board = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let cell = match ch {
                    'R' => Cell::Puyo(PuyoColor::Red),
                    'B' => Cell::Puyo(PuyoColor::Blue),
                    'G' => Cell::Puyo(PuyoColor::Green),
                    'Y' => Cell::Puyo(PuyoColor::Yellow),
                    'P' => Cell::Puyo(PuyoColor::Purple),
                    _ => Cell::Empty,
                };
                board.place(x as i32, y as i32, cell);
            }
        }
        board
    }

    /// Pad `rows` with empty rows on top up to DEFAULT_HEIGHT.
    #[cfg(test)]
    pub fn from_bottom_rows(rows: &[&str]) -> Self {
        let blank = ".".repeat(DEFAULT_WIDTH);
        let mut all: Vec<&str> = vec![blank.as_str(); DEFAULT_HEIGHT - rows.len()];
        all.extend_from_slice(rows);
        Self::from_rows(&all)
    }

    #[cfg(test)]
    pub fn column(&self, x: usize) -> Vec<Cell> {
        (0..self.height).map(|y| self.rows[y][x]).collect()
    }
}
