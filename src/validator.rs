//! Structural validation of grids against editorial constraints. The
//! validator runs before the fill engine ever sees a grid and again after a
//! solution is written back; it reports the first failing invariant and never
//! repairs anything.

use std::fmt;

use crate::grid::{Direction, Grid};
use crate::types::GridCoord;

/// The default ceiling on blocks / N².
pub const DEFAULT_MAX_BLOCK_RATIO: f32 = 0.16;

/// The first invariant a grid failed, in checking order: symmetry,
/// connectivity, slot length, checkedness, block ratio.
#[derive(Debug, Clone, PartialEq)]
pub enum GridViolation {
    /// A block whose 180-degree rotational twin is not a block.
    AsymmetricBlock { cell: GridCoord },

    /// The letter region is not 4-connected.
    Disconnected,

    /// A maximal run of exactly two letter cells.
    SlotTooShort {
        start: GridCoord,
        direction: Direction,
    },

    /// A letter cell that is not part of both an across and a down run of
    /// length >= 2 (this covers runs of length one).
    UncheckedCell { cell: GridCoord },

    /// Too many blocks for the configured ceiling.
    BlockRatioExceeded { blocks: usize, ratio: f32, limit: f32 },
}

impl fmt::Display for GridViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            GridViolation::AsymmetricBlock { cell } => format!(
                "block at ({}, {}) has no rotationally symmetric twin",
                cell.0, cell.1
            ),
            GridViolation::Disconnected => "letter region is not fully connected".to_string(),
            GridViolation::SlotTooShort { start, direction } => format!(
                "{} run at ({}, {}) is shorter than three letters",
                direction.as_str(),
                start.0,
                start.1
            ),
            GridViolation::UncheckedCell { cell } => format!(
                "letter cell at ({}, {}) is not crossed by both an across and a down entry",
                cell.0, cell.1
            ),
            GridViolation::BlockRatioExceeded {
                blocks,
                ratio,
                limit,
            } => {
                format!("{blocks} blocks ({ratio:.3} of the grid) exceed the {limit:.3} ceiling")
            }
        };
        write!(f, "{string}")
    }
}

/// Check every structural invariant, returning the first violation found.
pub fn validate_grid(grid: &Grid, max_block_ratio: f32) -> Result<(), GridViolation> {
    let size = grid.size();

    for row in 0..size {
        for col in 0..size {
            let (twin_row, twin_col) = grid.twin((row, col));
            let cell_is_block = grid.cell(row, col).unwrap().is_block();
            let twin_is_block = grid.cell(twin_row, twin_col).unwrap().is_block();
            if cell_is_block && !twin_is_block {
                return Err(GridViolation::AsymmetricBlock { cell: (row, col) });
            }
        }
    }

    if !grid.is_connected() {
        return Err(GridViolation::Disconnected);
    }

    // Gather the maximal run length through every letter cell in both
    // directions. Runs of exactly two violate the minimum slot length; runs
    // of one leave the cell unchecked in that direction.
    let run_lengths = |direction: Direction| -> Vec<(GridCoord, usize)> {
        let mut runs = vec![];
        for outer in 0..size {
            let mut start: Option<usize> = None;
            for inner in 0..=size {
                let (row, col) = match direction {
                    Direction::Across => (outer, inner),
                    Direction::Down => (inner, outer),
                };
                let is_letter =
                    inner < size && grid.cell(row, col).map_or(false, |cell| cell.is_letter());
                match (start, is_letter) {
                    (None, true) => start = Some(inner),
                    (Some(run_start), false) => {
                        let coord = match direction {
                            Direction::Across => (outer, run_start),
                            Direction::Down => (run_start, outer),
                        };
                        runs.push((coord, inner - run_start));
                        start = None;
                    }
                    _ => {}
                }
            }
        }
        runs
    };

    let across_runs = run_lengths(Direction::Across);
    let down_runs = run_lengths(Direction::Down);

    for (&(start, length), direction) in across_runs
        .iter()
        .map(|run| (run, Direction::Across))
        .chain(down_runs.iter().map(|run| (run, Direction::Down)))
    {
        if length == 2 {
            return Err(GridViolation::SlotTooShort { start, direction });
        }
    }

    // Checkedness: every letter cell must lie inside an across run of length
    // >= 2 and a down run of length >= 2. Having ruled out runs of exactly
    // two above, this also makes every crossing entry at least three long.
    let mut checked = vec![0u8; size * size];
    for (&(start, length), horizontal) in across_runs
        .iter()
        .map(|run| (run, true))
        .chain(down_runs.iter().map(|run| (run, false)))
    {
        if length < 2 {
            continue;
        }
        for idx in 0..length {
            let (row, col) = if horizontal {
                (start.0, start.1 + idx)
            } else {
                (start.0 + idx, start.1)
            };
            checked[row * size + col] += 1;
        }
    }
    for row in 0..size {
        for col in 0..size {
            if grid.cell(row, col).unwrap().is_letter() && checked[row * size + col] != 2 {
                return Err(GridViolation::UncheckedCell { cell: (row, col) });
            }
        }
    }

    let blocks = grid.block_count();
    let ratio = grid.block_ratio();
    if ratio > max_block_ratio {
        return Err(GridViolation::BlockRatioExceeded {
            blocks,
            ratio,
            limit: max_block_ratio,
        });
    }

    Ok(())
}
