//! The constraint graph derived from enumerated slots: adjacency lists
//! recording where perpendicular slots intersect. Adjacency is keyed by slot
//! index (the enumeration order), never by object identity, and parallel
//! slots are skipped without test because their orientations forbid
//! intersection.

use smallvec::SmallVec;
use std::collections::HashMap;

use crate::grid::Slot;
use crate::types::{GridCoord, SlotId};
use crate::MAX_SLOT_LENGTH;

/// One intersection as seen from a particular slot: the other slot's id, the
/// cell index within this slot, and the cell index within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub slot: SlotId,
    pub cell: usize,
    pub other_cell: usize,
}

/// Intersection adjacency for a full slot list.
#[derive(Debug, Clone)]
pub struct ConstraintGraph {
    neighbors: Vec<SmallVec<[Neighbor; MAX_SLOT_LENGTH]>>,
    edge_count: usize,
}

impl ConstraintGraph {
    /// Build the graph by mapping each coordinate to the slots that use it.
    /// Any pair of slots shares at most one coordinate, and in a 2D grid at
    /// most two slots can use one cell.
    #[must_use]
    pub fn build(slots: &[Slot]) -> ConstraintGraph {
        let mut slots_by_coord: HashMap<GridCoord, SmallVec<[(SlotId, usize); 2]>> = HashMap::new();

        for (slot_id, slot) in slots.iter().enumerate() {
            for (cell_idx, &coord) in slot.cells.iter().enumerate() {
                slots_by_coord
                    .entry(coord)
                    .or_default()
                    .push((slot_id, cell_idx));
            }
        }

        let mut neighbors: Vec<SmallVec<[Neighbor; MAX_SLOT_LENGTH]>> =
            vec![SmallVec::new(); slots.len()];
        let mut edge_count = 0;

        for (slot_id, slot) in slots.iter().enumerate() {
            for (cell_idx, &coord) in slot.cells.iter().enumerate() {
                let sharers = &slots_by_coord[&coord];
                assert!(
                    sharers.len() <= 2,
                    "more than two slots crossing in cell {coord:?}?"
                );

                for &(other_id, other_cell) in sharers.iter().filter(|&&(id, _)| id != slot_id) {
                    neighbors[slot_id].push(Neighbor {
                        slot: other_id,
                        cell: cell_idx,
                        other_cell,
                    });
                    if other_id > slot_id {
                        edge_count += 1;
                    }
                }
            }
        }

        ConstraintGraph {
            neighbors,
            edge_count,
        }
    }

    /// The intersections involving the given slot, in cell order.
    #[must_use]
    pub fn neighbors(&self, slot: SlotId) -> &[Neighbor] {
        &self.neighbors[slot]
    }

    /// The overlap indices between two slots, if they intersect: the cell
    /// index in `slot` and the cell index in `other`.
    #[must_use]
    pub fn crossing(&self, slot: SlotId, other: SlotId) -> Option<(usize, usize)> {
        self.neighbors[slot]
            .iter()
            .find(|neighbor| neighbor.slot == other)
            .map(|neighbor| (neighbor.cell, neighbor.other_cell))
    }

    /// How many distinct intersections the grid has (checked squares).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.neighbors.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::constraint_graph::{ConstraintGraph, Neighbor};
    use crate::grid::{Direction, Grid};

    #[test]
    fn test_open_grid_adjacency() {
        let mut grid = Grid::new(3);
        let slots = grid.enumerate_slots();
        let graph = ConstraintGraph::build(&slots);

        // Across slots are 0..3, down slots 3..6; every across crosses every
        // down exactly once.
        assert_eq!(graph.edge_count(), 9);
        assert_eq!(
            graph.neighbors(0),
            &[
                Neighbor {
                    slot: 3,
                    cell: 0,
                    other_cell: 0
                },
                Neighbor {
                    slot: 4,
                    cell: 1,
                    other_cell: 0
                },
                Neighbor {
                    slot: 5,
                    cell: 2,
                    other_cell: 0
                },
            ]
        );
        assert_eq!(
            graph.neighbors(4),
            &[
                Neighbor {
                    slot: 0,
                    cell: 0,
                    other_cell: 1
                },
                Neighbor {
                    slot: 1,
                    cell: 1,
                    other_cell: 1
                },
                Neighbor {
                    slot: 2,
                    cell: 2,
                    other_cell: 1
                },
            ]
        );
    }

    #[test]
    fn test_parallel_slots_never_share_edges() {
        let mut grid = Grid::new(5);
        let slots = grid.enumerate_slots();
        let graph = ConstraintGraph::build(&slots);

        for (slot_id, slot) in slots.iter().enumerate() {
            for neighbor in graph.neighbors(slot_id) {
                assert_ne!(slot.direction, slots[neighbor.slot].direction);
            }
        }
    }

    #[test]
    fn test_crossing_indices_with_blocks() {
        let mut grid = Grid::from_block_mask(5, &[(0, 0)]).unwrap();
        let slots = grid.enumerate_slots();
        let graph = ConstraintGraph::build(&slots);

        let across_top = slots
            .iter()
            .position(|slot| slot.start == (0, 1) && slot.direction == Direction::Across)
            .unwrap();
        let down_right = slots
            .iter()
            .position(|slot| slot.start == (0, 4) && slot.direction == Direction::Down)
            .unwrap();

        assert_eq!(graph.crossing(across_top, down_right), Some((3, 0)));
        assert_eq!(graph.crossing(down_right, across_top), Some((0, 3)));

        // The corner blocks cost the grid two checked squares.
        assert_eq!(graph.edge_count(), 23);
    }
}
