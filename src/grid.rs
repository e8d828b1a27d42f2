//! This module implements the grid model: a square cell array with symmetric
//! block placement, fixed letters, slot enumeration, and entry numbering.

use smallvec::SmallVec;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::GridCoord;
use crate::MAX_SLOT_LENGTH;

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Across => "across",
            Direction::Down => "down",
        }
    }
}

/// What kind of cell this is. A letter cell may or may not hold a letter yet;
/// a block never does.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CellKind {
    Block,
    Letter,
}

/// A single cell in the grid.
#[derive(Debug, Clone)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub kind: CellKind,

    /// The fixed or solved letter, always uppercase A-Z. `None` for blocks
    /// and for letter cells that haven't been filled.
    pub letter: Option<char>,

    /// The entry number assigned during slot enumeration, if this cell starts
    /// an across or down slot.
    pub number: Option<u32>,
}

impl Cell {
    #[must_use]
    pub fn is_block(&self) -> bool {
        self.kind == CellKind::Block
    }

    #[must_use]
    pub fn is_letter(&self) -> bool {
        self.kind == CellKind::Letter
    }
}

/// A maximal run of letter cells in one orientation; the unit an entry fills.
/// Identity is the pair (start, direction); slots are immutable once
/// enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub start: GridCoord,
    pub direction: Direction,
    pub length: usize,
    pub cells: SmallVec<[GridCoord; MAX_SLOT_LENGTH]>,
    pub number: Option<u32>,
}

impl Slot {
    /// Build a slot from its start, direction, and length, deriving the cell
    /// list.
    #[must_use]
    pub fn new(start: GridCoord, direction: Direction, length: usize) -> Slot {
        let cells = (0..length)
            .map(|idx| match direction {
                Direction::Across => (start.0, start.1 + idx),
                Direction::Down => (start.0 + idx, start.1),
            })
            .collect();

        Slot {
            start,
            direction,
            length,
            cells,
            number: None,
        }
    }

    /// Represent this slot as a string like "1,2,down,5" (row, col,
    /// direction, length).
    #[must_use]
    pub fn to_key(&self) -> String {
        format!(
            "{},{},{},{}",
            self.start.0,
            self.start.1,
            self.direction.as_str(),
            self.length,
        )
    }

    /// Parse a string like "1,2,down,5" into a `Slot`. The entry number is
    /// not part of the key and comes back as `None`.
    pub fn from_key(key: &str) -> Result<Slot, String> {
        let key_parts: Vec<&str> = key.split(',').collect();
        if key_parts.len() != 4 {
            return Err(format!("invalid slot key: {key}"));
        }

        let row: Result<usize, _> = key_parts[0].parse();
        let col: Result<usize, _> = key_parts[1].parse();
        let direction = match key_parts[2] {
            "across" => Some(Direction::Across),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let length: Result<usize, _> = key_parts[3].parse();

        if let (Ok(row), Ok(col), Some(direction), Ok(length)) = (row, col, direction, length) {
            Ok(Slot::new((row, col), direction, length))
        } else {
            Err(format!("invalid slot key: {key:?}"))
        }
    }
}

/// Serialize a `Slot` into its string key.
#[cfg(feature = "serde")]
impl Serialize for Slot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_key())
    }
}

/// Deserialize a `Slot` from its string key.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_string = String::deserialize(deserializer)?;
        Slot::from_key(&raw_string).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    OutOfBounds { cell: GridCoord },
    FixedLetterConflict { cell: GridCoord },
    BlockConflict { cell: GridCoord },
    InvalidLetter { ch: char },
    MalformedTemplate(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            GridError::OutOfBounds { cell } => {
                format!("cell ({}, {}) is outside the grid", cell.0, cell.1)
            }
            GridError::FixedLetterConflict { cell } => format!(
                "cell ({}, {}) holds a fixed letter and can't become a block",
                cell.0, cell.1
            ),
            GridError::BlockConflict { cell } => format!(
                "cell ({}, {}) is a block and can't hold a letter",
                cell.0, cell.1
            ),
            GridError::InvalidLetter { ch } => {
                format!("{ch:?} is not an uppercase letter")
            }
            GridError::MalformedTemplate(reason) => format!("malformed grid template: {reason}"),
        };
        write!(f, "{string}")
    }
}

/// The square crossword grid: the single source of truth for blocks and fixed
/// letters. Block mutations maintain 180-degree rotational symmetry; the
/// other editorial invariants are checked by the structural validator before
/// a grid reaches the fill engine.
#[derive(Clone)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build an all-letter (fully open) grid of the given size.
    #[must_use]
    pub fn new(size: usize) -> Grid {
        let cells = (0..size * size)
            .map(|idx| Cell {
                row: idx / size,
                col: idx % size,
                kind: CellKind::Letter,
                letter: None,
                number: None,
            })
            .collect();

        Grid { size, cells }
    }

    /// Build a grid from a block mask, applying rotational symmetry on
    /// ingest: the mask only needs to list one representative of each
    /// symmetric pair.
    pub fn from_block_mask(size: usize, blocks: &[GridCoord]) -> Result<Grid, GridError> {
        let mut grid = Grid::new(size);
        for &(row, col) in blocks {
            grid.place_block(row, col)?;
        }
        Ok(grid)
    }

    /// Parse a template string with `#` representing blocks, `.` representing
    /// empty letter cells, and letters representing fixed letters. The
    /// template is taken verbatim -- no symmetry coupling -- so that
    /// hand-drawn masks can be checked by the validator as-is.
    pub fn from_template(template: &str) -> Result<Grid, GridError> {
        let rows: Vec<&str> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let size = rows.len();
        if size == 0 {
            return Err(GridError::MalformedTemplate("no rows".into()));
        }
        if rows.iter().any(|row| row.chars().count() != size) {
            return Err(GridError::MalformedTemplate(format!(
                "expected {size} chars in each of {size} rows"
            )));
        }

        let mut grid = Grid::new(size);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                match ch {
                    '#' => grid.cells[row * size + col].kind = CellKind::Block,
                    '.' => {}
                    ch => grid.fix_letter(row, col, ch)?,
                }
            }
        }

        Ok(grid)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<&Cell, GridError> {
        if row >= self.size || col >= self.size {
            return Err(GridError::OutOfBounds { cell: (row, col) });
        }
        Ok(&self.cells[row * self.size + col])
    }

    /// The rotational twin of a coordinate: (N-1-r, N-1-c).
    #[must_use]
    pub fn twin(&self, (row, col): GridCoord) -> GridCoord {
        (self.size - 1 - row, self.size - 1 - col)
    }

    /// Set the cell and its rotational twin to blocks. Fails if either cell
    /// holds a fixed letter.
    pub fn place_block(&mut self, row: usize, col: usize) -> Result<(), GridError> {
        let (twin_row, twin_col) = self.twin((row, col));
        if self.cell(row, col)?.letter.is_some() {
            return Err(GridError::FixedLetterConflict { cell: (row, col) });
        }
        if self.cell(twin_row, twin_col)?.letter.is_some() {
            return Err(GridError::FixedLetterConflict {
                cell: (twin_row, twin_col),
            });
        }

        self.cells[row * self.size + col].kind = CellKind::Block;
        self.cells[twin_row * self.size + twin_col].kind = CellKind::Block;
        Ok(())
    }

    /// Fix a letter into a cell. Letters have no symmetry coupling.
    pub fn fix_letter(&mut self, row: usize, col: usize, ch: char) -> Result<(), GridError> {
        if self.cell(row, col)?.is_block() {
            return Err(GridError::BlockConflict { cell: (row, col) });
        }
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(GridError::InvalidLetter { ch });
        }

        let cell = &mut self.cells[row * self.size + col];
        cell.kind = CellKind::Letter;
        cell.letter = Some(upper);
        Ok(())
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_block()).count()
    }

    #[must_use]
    pub fn block_ratio(&self) -> f32 {
        self.block_count() as f32 / (self.size * self.size) as f32
    }

    /// Is every letter cell reachable from every other letter cell by
    /// 4-connected moves through letter cells?
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.cells.iter().find(|cell| cell.is_letter()) else {
            return true;
        };

        let mut visited = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([(start.row, start.col)]);
        visited[start.row * self.size + start.col] = true;
        let mut seen = 1;

        while let Some((row, col)) = queue.pop_front() {
            for (next_row, next_col) in self.orthogonal_neighbors(row, col) {
                let idx = next_row * self.size + next_col;
                if !visited[idx] && self.cells[idx].is_letter() {
                    visited[idx] = true;
                    seen += 1;
                    queue.push_back((next_row, next_col));
                }
            }
        }

        seen == self.cells.iter().filter(|cell| cell.is_letter()).count()
    }

    fn orthogonal_neighbors(&self, row: usize, col: usize) -> SmallVec<[GridCoord; 4]> {
        let mut result = SmallVec::new();
        if row > 0 {
            result.push((row - 1, col));
        }
        if row + 1 < self.size {
            result.push((row + 1, col));
        }
        if col > 0 {
            result.push((row, col - 1));
        }
        if col + 1 < self.size {
            result.push((row, col + 1));
        }
        result
    }

    /// Scan for maximal letter runs of length >= 2 and emit slots: across
    /// slots in row-major order, then down slots. Entry numbers are assigned
    /// by traversing cells in row-major order -- a cell takes the next number
    /// if it starts an across or a down slot, and coincident starts share one
    /// number -- and are written back into both the slots and the grid cells.
    pub fn enumerate_slots(&mut self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = vec![];

        for row in 0..self.size {
            let mut col = 0;
            while col < self.size {
                let starts_run = self.cells[row * self.size + col].is_letter()
                    && (col == 0 || self.cells[row * self.size + col - 1].is_block());
                if starts_run {
                    let mut length = 0;
                    while col + length < self.size
                        && self.cells[row * self.size + col + length].is_letter()
                    {
                        length += 1;
                    }
                    if length >= 2 {
                        slots.push(Slot::new((row, col), Direction::Across, length));
                    }
                    col += length.max(1);
                } else {
                    col += 1;
                }
            }
        }

        for row in 0..self.size {
            for col in 0..self.size {
                let starts_run = self.cells[row * self.size + col].is_letter()
                    && (row == 0 || self.cells[(row - 1) * self.size + col].is_block());
                if starts_run {
                    let mut length = 0;
                    while row + length < self.size
                        && self.cells[(row + length) * self.size + col].is_letter()
                    {
                        length += 1;
                    }
                    if length >= 2 {
                        slots.push(Slot::new((row, col), Direction::Down, length));
                    }
                }
            }
        }

        let starts: HashSet<GridCoord> = slots.iter().map(|slot| slot.start).collect();

        let mut current_number = 0;
        for row in 0..self.size {
            for col in 0..self.size {
                if starts.contains(&(row, col)) {
                    current_number += 1;
                    self.cells[row * self.size + col].number = Some(current_number);
                    for slot in slots.iter_mut().filter(|slot| slot.start == (row, col)) {
                        slot.number = Some(current_number);
                    }
                }
            }
        }

        slots
    }

    /// Render the grid as ASCII: `#` for blocks, `.` for empty letter cells,
    /// and the letter itself for filled cells.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        self.cells
            .chunks(self.size)
            .map(|line| {
                line.iter()
                    .map(|cell| {
                        if cell.is_block() {
                            '#'
                        } else {
                            cell.letter.unwrap_or('.')
                        }
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid {}x{}:\n{}", self.size, self.size, self.to_display_string())
    }
}
