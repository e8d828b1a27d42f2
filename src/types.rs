/// Zero-indexed row and column for a cell in the grid, where row 0 is the top.
pub type GridCoord = (usize, usize);

/// An identifier for a given slot, based on its index in the enumerated slot
/// list (across slots in row-major order, then down slots).
pub type SlotId = usize;

/// An identifier for a given entry, based on its index in the `WordSupply`'s
/// bucket for the relevant length.
pub type EntryId = usize;

/// An identifier that fully specifies an entry by including both its length
/// and `EntryId`.
pub type GlobalEntryId = (usize, EntryId);
