//! A library of pre-validated skeleton patterns keyed by grid size. Each
//! pattern stores only representative block positions; rotational symmetry is
//! applied when the grid is built. Every stored pattern satisfies all of the
//! structural invariants at the default block-ratio ceiling.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

use crate::grid::Grid;
use crate::types::GridCoord;

lazy_static! {
    static ref SKELETONS: HashMap<usize, Vec<Vec<GridCoord>>> = {
        let mut patterns: HashMap<usize, Vec<Vec<GridCoord>>> = HashMap::new();

        // Mini: fully open.
        patterns.insert(5, vec![vec![]]);

        // Weekday-style 7x7 with a pinwheel of edge blocks.
        patterns.insert(7, vec![vec![(0, 3), (3, 0)]]);

        patterns.insert(9, vec![vec![(0, 4), (1, 4), (4, 0), (4, 1)]]);

        patterns.insert(11, vec![vec![(0, 5), (1, 5), (5, 0), (5, 1)], vec![]]);

        patterns.insert(
            13,
            vec![vec![(0, 6), (1, 6), (6, 0), (6, 1), (3, 3)]],
        );

        // Daily-style 15x15 with stacked edge blocks and a staircase middle,
        // plus the fully open fallback.
        patterns.insert(
            15,
            vec![
                vec![
                    (0, 4),
                    (0, 10),
                    (1, 4),
                    (1, 10),
                    (2, 4),
                    (2, 10),
                    (3, 0),
                    (3, 1),
                    (3, 7),
                    (3, 13),
                    (3, 14),
                    (4, 7),
                    (5, 3),
                    (5, 11),
                    (6, 3),
                    (6, 11),
                    (7, 3),
                    (7, 11),
                ],
                vec![],
            ],
        );

        // Sunday-sized 21x21: a sparse frame and a denser variant.
        patterns.insert(
            21,
            vec![
                vec![
                    (0, 10),
                    (1, 10),
                    (2, 10),
                    (10, 0),
                    (10, 1),
                    (10, 2),
                    (4, 4),
                    (4, 16),
                ],
                vec![(0, 10), (1, 10), (2, 10), (10, 0), (10, 1), (10, 2)],
            ],
        );

        patterns
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    UnsupportedSize { size: usize },
    NoSuchPattern { size: usize, index: usize },
}

impl fmt::Display for SkeletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            SkeletonError::UnsupportedSize { size } => {
                format!("no skeleton patterns for size {size}")
            }
            SkeletonError::NoSuchPattern { size, index } => {
                format!("size {size} has no pattern with index {index}")
            }
        };
        write!(f, "{string}")
    }
}

/// The grid sizes the library covers, ascending.
#[must_use]
pub fn skeleton_sizes() -> Vec<usize> {
    let mut sizes: Vec<usize> = SKELETONS.keys().copied().collect();
    sizes.sort_unstable();
    sizes
}

/// How many patterns are stored for the given size.
#[must_use]
pub fn skeleton_count(size: usize) -> usize {
    SKELETONS.get(&size).map_or(0, Vec::len)
}

/// Build a grid from the library, applying rotational symmetry to the stored
/// block positions.
pub fn grid_from_skeleton(size: usize, index: usize) -> Result<Grid, SkeletonError> {
    let patterns = SKELETONS
        .get(&size)
        .ok_or(SkeletonError::UnsupportedSize { size })?;
    let pattern = patterns
        .get(index)
        .ok_or(SkeletonError::NoSuchPattern { size, index })?;

    // Stored patterns never collide with fixed letters, so ingest can't fail.
    Ok(Grid::from_block_mask(size, pattern).expect("library pattern failed to ingest"))
}
