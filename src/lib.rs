pub mod arc_consistency;
pub mod backtracking_search;
pub mod constraint_graph;
pub mod grid;
pub mod oracle;
pub mod patterns;
pub mod types;
pub mod validator;
pub mod word_supply;

pub const CHECK_INVARIANTS: bool = cfg!(feature = "check_invariants");

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

pub use backtracking_search::{
    apply_fill, fill_grid, find_fill, Choice, FillError, FillFailure, FillParams, FillReport,
    FillSuccess,
};
pub use constraint_graph::ConstraintGraph;
pub use grid::{Cell, CellKind, Direction, Grid, GridError, Slot};
pub use oracle::{OracleError, Pattern, WordOracle};
pub use patterns::grid_from_skeleton;
pub use validator::{validate_grid, GridViolation, DEFAULT_MAX_BLOCK_RATIO};
pub use word_supply::{Entry, EntryOrigin, WordSupply};
