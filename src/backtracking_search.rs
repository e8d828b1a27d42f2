//! Backtracking search over slot assignments, maintaining arc consistency
//! after every decision (MAC). Variable order is minimum-remaining-values
//! with an unassigned-degree tie-break; value order is least-constraining
//! first. Every tie falls through to a deterministic order -- slot position,
//! entry quality, entry text -- so identical inputs produce identical fills
//! and identical counter traces.
//!
//! The search owns the domains, the partial assignment, and the used-entry
//! set; the word supply owns the entries and lends them by id; the grid is
//! read-only once its slots are enumerated.

use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use float_ord::FloatOrd;

#[cfg(feature = "serde")]
use serde_derive::Serialize;

use crate::arc_consistency::{all_arcs, arcs_toward, propagate, recover};
use crate::constraint_graph::ConstraintGraph;
use crate::grid::{Grid, GridError, Slot};
use crate::oracle::{Pattern, WordOracle};
use crate::types::{EntryId, GlobalEntryId, SlotId};
use crate::validator::{validate_grid, GridViolation, DEFAULT_MAX_BLOCK_RATIO};
use crate::word_supply::WordSupply;

/// Knobs for a fill run. `abort` is an optional cancellation flag polled
/// between arcs and between backtracks.
#[derive(Debug, Clone)]
pub struct FillParams {
    /// Maximum entries to request per oracle call.
    pub neighbor_quota: usize,

    /// Maximum oracle calls for the whole run. Once spent, further recovery
    /// attempts fail without calling out, and a failed run reports
    /// `OracleBudgetExhausted`.
    pub oracle_budget: usize,

    /// Maximum backtracks before the run aborts.
    pub backtrack_budget: usize,

    /// Block-ratio ceiling used by `fill_grid` validation and write-back.
    pub max_block_ratio: f32,

    pub abort: Option<Arc<AtomicBool>>,
}

impl Default for FillParams {
    fn default() -> FillParams {
        FillParams {
            neighbor_quota: 20,
            oracle_budget: 50,
            backtrack_budget: 10_000,
            max_block_ratio: DEFAULT_MAX_BLOCK_RATIO,
            abort: None,
        }
    }
}

/// Counters describing a run, attached to both successes and failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FillReport {
    pub backtracks: usize,
    pub oracle_calls: usize,
    pub arc_revisions: usize,

    /// The pattern of the most recent slot whose domain emptied.
    pub last_empty_pattern: Option<String>,
}

/// A slot assignment made during the fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Choice {
    pub slot_id: SlotId,
    pub entry: GlobalEntryId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillSuccess {
    /// One choice per slot, in slot-id order.
    pub choices: Vec<Choice>,
    pub report: FillReport,
}

/// Terminal failure reasons, each carrying the run's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillFailure {
    Unsolvable(FillReport),
    OracleBudgetExhausted(FillReport),
    BacktrackBudgetExhausted(FillReport),
    Cancelled(FillReport),
}

impl FillFailure {
    #[must_use]
    pub fn report(&self) -> &FillReport {
        match self {
            FillFailure::Unsolvable(report)
            | FillFailure::OracleBudgetExhausted(report)
            | FillFailure::BacktrackBudgetExhausted(report)
            | FillFailure::Cancelled(report) => report,
        }
    }
}

impl fmt::Display for FillFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            FillFailure::Unsolvable(_) => "no fill exists for this grid and supply",
            FillFailure::OracleBudgetExhausted(_) => "oracle call budget exhausted",
            FillFailure::BacktrackBudgetExhausted(_) => "backtrack budget exhausted",
            FillFailure::Cancelled(_) => "fill cancelled",
        };
        write!(f, "{string}")
    }
}

/// Everything that can go wrong in the validate-solve-write-back driver.
#[derive(Debug)]
pub enum FillError {
    Grid(GridError),
    Invalid(GridViolation),
    Fill(FillFailure),
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::Grid(err) => write!(f, "{err}"),
            FillError::Invalid(violation) => write!(f, "invalid grid: {violation}"),
            FillError::Fill(failure) => write!(f, "{failure}"),
        }
    }
}

/// Why the search unwound early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Cancelled,
    BacktrackBudget,
}

/// The engine's mutable state for one run, shared between the search and the
/// propagation module.
pub(crate) struct FillState<'a, 'o> {
    pub grid: &'a Grid,
    pub slots: &'a [Slot],
    pub graph: &'a ConstraintGraph,
    pub supply: &'a mut WordSupply,
    pub oracle: Option<&'o mut dyn WordOracle>,
    pub params: &'a FillParams,

    /// Per-slot candidate entry ids, kept in supply `candidates` order.
    pub domains: Vec<Vec<EntryId>>,

    pub assignment: Vec<Option<EntryId>>,
    pub used: HashSet<GlobalEntryId>,
    pub report: FillReport,
}

impl<'a, 'o> FillState<'a, 'o> {
    pub(crate) fn new(
        grid: &'a Grid,
        slots: &'a [Slot],
        graph: &'a ConstraintGraph,
        supply: &'a mut WordSupply,
        oracle: Option<&'o mut dyn WordOracle>,
        params: &'a FillParams,
    ) -> FillState<'a, 'o> {
        FillState {
            grid,
            slots,
            graph,
            supply,
            oracle,
            params,
            domains: vec![vec![]; slots.len()],
            assignment: vec![None; slots.len()],
            used: HashSet::new(),
            report: FillReport::default(),
        }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.params
            .abort
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    /// The slot's current letter pattern: grid-fixed letters first, then
    /// letters implied by assigned crossing entries, wildcards elsewhere.
    pub(crate) fn pattern_of(&self, slot_id: SlotId) -> Pattern {
        let slot = &self.slots[slot_id];
        Pattern::from_letters(slot.cells.iter().enumerate().map(|(cell_idx, &(row, col))| {
            if let Some(letter) = self
                .grid
                .cell(row, col)
                .expect("slot cells are in bounds")
                .letter
            {
                return Some(letter);
            }

            for neighbor in self.graph.neighbors(slot_id) {
                if neighbor.cell != cell_idx {
                    continue;
                }
                if let Some(assigned) = self.assignment[neighbor.slot] {
                    let length = self.slots[neighbor.slot].length;
                    let text = &self.supply.entry((length, assigned)).text;
                    return Some(text.as_bytes()[neighbor.other_cell] as char);
                }
            }
            None
        }))
    }

    /// Node consistency for one slot: every supply entry of the right length
    /// that satisfies the grid's fixed letters, in quality order.
    pub(crate) fn build_domain(&mut self, slot_id: SlotId) {
        let length = self.slots[slot_id].length;
        let pattern = self.pattern_of(slot_id);
        let ids = self.supply.candidates(length);

        let supply = &self.supply;
        self.domains[slot_id] = ids
            .into_iter()
            .filter(|&id| pattern.matches(&supply.entry((length, id)).text))
            .collect();
    }
}

/// MRV slot selection: smallest live domain, then the most unassigned
/// neighbours, then fixed slot order (row, column, across before down).
fn select_slot(state: &FillState) -> Option<SlotId> {
    (0..state.slots.len())
        .filter(|&slot_id| state.assignment[slot_id].is_none())
        .min_by_key(|&slot_id| {
            let unassigned_degree = state
                .graph
                .neighbors(slot_id)
                .iter()
                .filter(|neighbor| state.assignment[neighbor.slot].is_none())
                .count();
            let slot = &state.slots[slot_id];
            (
                state.domains[slot_id].len(),
                Reverse(unassigned_degree),
                slot.start.0,
                slot.start.1,
                slot.direction,
            )
        })
}

/// Least-constraining-value order: candidates that would remove the fewest
/// entries from unassigned neighbours first, then quality-descending, then
/// lexicographic.
fn order_candidates(state: &FillState, slot_id: SlotId) -> Vec<EntryId> {
    let length = state.slots[slot_id].length;
    let mut ids = state.domains[slot_id].clone();

    ids.sort_by_cached_key(|&entry| {
        let text = &state.supply.entry((length, entry)).text;

        let mut removed = 0usize;
        for neighbor in state.graph.neighbors(slot_id) {
            if state.assignment[neighbor.slot].is_some() {
                continue;
            }
            let needed = text.as_bytes()[neighbor.cell];
            let neighbor_length = state.slots[neighbor.slot].length;

            for &other in &state.domains[neighbor.slot] {
                let other_text = &state.supply.entry((neighbor_length, other)).text;
                if other_text.as_bytes()[neighbor.other_cell] != needed || other_text == text {
                    removed += 1;
                }
            }
        }

        let entry_ref = state.supply.entry((length, entry));
        (
            removed,
            Reverse(FloatOrd(entry_ref.quality)),
            entry_ref.text.clone(),
        )
    });

    ids
}

/// Is the candidate compatible with the entries already assigned around it?
fn consistent_with_assigned(state: &FillState, slot_id: SlotId, entry: EntryId) -> bool {
    let length = state.slots[slot_id].length;
    let text = &state.supply.entry((length, entry)).text;

    for neighbor in state.graph.neighbors(slot_id) {
        if let Some(assigned) = state.assignment[neighbor.slot] {
            let neighbor_length = state.slots[neighbor.slot].length;
            let neighbor_text = &state.supply.entry((neighbor_length, assigned)).text;
            if neighbor_text.as_bytes()[neighbor.other_cell] != text.as_bytes()[neighbor.cell] {
                return false;
            }
        }
    }
    true
}

/// The recursive decision procedure. Returns whether a complete assignment
/// was reached; budget and cancellation aborts unwind through `Interrupt`.
fn search(state: &mut FillState) -> Result<bool, Interrupt> {
    if state.assignment.iter().all(Option::is_some) {
        return Ok(true);
    }

    let slot_id = select_slot(state).expect("incomplete assignment must leave a slot");
    let length = state.slots[slot_id].length;

    for entry in order_candidates(state, slot_id) {
        if state.cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if state.used.contains(&(length, entry)) {
            continue;
        }
        if !consistent_with_assigned(state, slot_id, entry) {
            continue;
        }

        trace!(
            "assigning {} to slot {slot_id}",
            state.supply.entry((length, entry)).text
        );

        let snapshot = state.domains.clone();
        let _oracle_calls_before = state.report.oracle_calls;
        state.domains[slot_id] = vec![entry];
        state.used.insert((length, entry));
        state.assignment[slot_id] = Some(entry);

        let queue = arcs_toward(state.graph, slot_id);
        let consistent = propagate(state, queue)?;

        #[cfg(feature = "check_invariants")]
        {
            // Between a decision and its undo, domains only shrink -- unless
            // recovery grew the world through the oracle.
            if consistent && state.report.oracle_calls == _oracle_calls_before {
                for (domain, saved) in state.domains.iter().zip(&snapshot) {
                    assert!(
                        domain.iter().all(|id| saved.contains(id)),
                        "domain grew without an oracle recovery"
                    );
                }
            }
        }

        if consistent && search(state)? {
            return Ok(true);
        }

        state.assignment[slot_id] = None;
        state.used.remove(&(length, entry));
        state.domains = snapshot;
        state.report.backtracks += 1;
        trace!(
            "backtrack {} out of slot {slot_id}",
            state.report.backtracks
        );

        if state.report.backtracks > state.params.backtrack_budget {
            return Err(Interrupt::BacktrackBudget);
        }
    }

    Ok(false)
}

fn terminal_failure(oracle_present: bool, params: &FillParams, report: FillReport) -> FillFailure {
    if oracle_present && report.oracle_calls >= params.oracle_budget {
        FillFailure::OracleBudgetExhausted(report)
    } else {
        FillFailure::Unsolvable(report)
    }
}

fn interrupt_failure(interrupt: Interrupt, report: FillReport) -> FillFailure {
    match interrupt {
        Interrupt::Cancelled => FillFailure::Cancelled(report),
        Interrupt::BacktrackBudget => FillFailure::BacktrackBudgetExhausted(report),
    }
}

/// Fill a validated grid: build node-consistent domains (recovering empty
/// ones through the oracle), establish arc consistency, then search. The
/// grid is read-only here; on success each slot maps to exactly one entry.
pub fn find_fill(
    grid: &Grid,
    slots: &[Slot],
    graph: &ConstraintGraph,
    supply: &mut WordSupply,
    oracle: Option<&mut dyn WordOracle>,
    params: &FillParams,
) -> Result<FillSuccess, FillFailure> {
    let oracle_present = oracle.is_some();
    let mut state = FillState::new(grid, slots, graph, supply, oracle, params);

    debug!("building domains for {} slots", slots.len());
    for slot_id in 0..slots.len() {
        state.build_domain(slot_id);
        if state.domains[slot_id].is_empty() && !recover(&mut state, slot_id) {
            return Err(terminal_failure(oracle_present, params, state.report));
        }
    }

    debug!(
        "establishing arc consistency across {} crossings",
        graph.edge_count()
    );
    match propagate(&mut state, all_arcs(graph)) {
        Ok(true) => {}
        Ok(false) => return Err(terminal_failure(oracle_present, params, state.report)),
        Err(interrupt) => return Err(interrupt_failure(interrupt, state.report)),
    }

    match search(&mut state) {
        Ok(true) => {
            let report = state.report;
            debug!(
                "fill found after {} backtracks, {} oracle calls, {} revisions",
                report.backtracks, report.oracle_calls, report.arc_revisions
            );
            let choices = state
                .assignment
                .iter()
                .enumerate()
                .map(|(slot_id, entry)| Choice {
                    slot_id,
                    entry: (
                        slots[slot_id].length,
                        entry.expect("complete assignment covers every slot"),
                    ),
                })
                .collect();
            Ok(FillSuccess { choices, report })
        }
        Ok(false) => Err(terminal_failure(oracle_present, params, state.report)),
        Err(interrupt) => Err(interrupt_failure(interrupt, state.report)),
    }
}

/// Write a complete assignment into the grid, then re-run structural
/// validation as a safety net.
pub fn apply_fill(
    grid: &mut Grid,
    slots: &[Slot],
    supply: &WordSupply,
    choices: &[Choice],
    max_block_ratio: f32,
) -> Result<(), FillError> {
    for choice in choices {
        let slot = &slots[choice.slot_id];
        let text = &supply.entry(choice.entry).text;

        for (cell_idx, &(row, col)) in slot.cells.iter().enumerate() {
            grid.fix_letter(row, col, text.as_bytes()[cell_idx] as char)
                .map_err(FillError::Grid)?;
        }
    }

    validate_grid(grid, max_block_ratio).map_err(FillError::Invalid)
}

/// The whole pipeline: validate the skeleton, enumerate slots, build the
/// constraint graph, fill, and write the solution back into the grid.
pub fn fill_grid(
    grid: &mut Grid,
    supply: &mut WordSupply,
    oracle: Option<&mut dyn WordOracle>,
    params: &FillParams,
) -> Result<FillSuccess, FillError> {
    validate_grid(grid, params.max_block_ratio).map_err(FillError::Invalid)?;

    let slots = grid.enumerate_slots();
    let graph = ConstraintGraph::build(&slots);

    let success =
        find_fill(grid, &slots, &graph, supply, oracle, params).map_err(FillError::Fill)?;
    apply_fill(grid, &slots, supply, &success.choices, params.max_block_ratio)?;

    Ok(success)
}

#[cfg(test)]
mod tests {
    use crate::backtracking_search::{
        fill_grid, find_fill, FillError, FillFailure, FillParams, FillSuccess,
    };
    use crate::constraint_graph::ConstraintGraph;
    use crate::grid::{Grid, Slot};
    use crate::oracle::{OracleError, Pattern, WordOracle};
    use crate::validator::{validate_grid, GridViolation, DEFAULT_MAX_BLOCK_RATIO};
    use crate::word_supply::{EntryOrigin, WordSupply};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Ten interlocking five-letter entries: the rows and columns of one
    /// double word square.
    const SQUARE_WORDS: &[&str] = &[
        "ACTOR", "DRIVE", "MALES", "INERT", "TESTS", "ADMIT", "CRANE", "TILES", "OVERT", "RESTS",
    ];

    const DECOY_WORDS: &[&str] = &[
        "APPLE", "ABOUT", "LASER", "ELATE", "STEEP", "PLEAT", "LEAST",
    ];

    /// A wider dictionary that still contains the square above.
    const WIDE_SUPPLY: &[&str] = &[
        "ABOUT", "ABOVE", "ACTOR", "ADMIT", "AIDED", "ANGER", "AORTA", "APPLE", "ARDOR", "ARROW",
        "ASIDE", "ASKED", "ASSES", "ATTIC", "AUTOS", "AWARD", "BADLY", "BALES", "BASIC", "BATON",
        "BLEND", "BLESS", "BLIND", "BOARD", "BOOTS", "BOXER", "BRASS", "BROKE", "BUNCH", "CABIN",
        "CACHE", "CADET", "CARDS", "CATCH", "CEDAR", "CHEST", "CLIFF", "CLING", "CLOAK", "COATS",
        "COINS", "COSTS", "COUGH", "CRAFT", "CRANE", "CRATE", "CREPT", "CROWN", "CROWS", "CRUMB",
        "CRUSH", "CURES", "CURLY", "CURVE", "CYCLE", "DAILY", "DEATH", "DECAY", "DENSE", "DIMES",
        "DINGY", "DITCH", "DIVER", "DOSES", "DOUGH", "DRAWN", "DREAM", "DRIVE", "DRONE", "DUELS",
        "EGRET", "ELATE", "EMPTY", "ERROR", "ERUPT", "ESTER", "EXITS", "FANCY", "FATAL", "FEATS",
        "FLANK", "FLASK", "FLOAT", "FLOUR", "FLOWS", "FORCE", "FORMS", "FORTH", "FORTS", "FORUM",
        "FRAUD", "FROWN", "FUNDS", "GAMES", "GENIE", "GRABS", "GREAT", "GRIEF", "HEADS", "HEARS",
        "HOLES", "HONEY", "HORSE", "IDEAL", "INDEX", "INERT", "IONIC", "ISSUE", "JELLY", "JOKER",
        "JOLLY", "JUICE", "KNOTS", "LAMPS", "LASER", "LAYER", "LEAVE", "LEPER", "LOADS", "LOCKS",
        "LOGIN", "LOTUS", "LOVES", "LOYAL", "LUCID", "LUMPY", "LUNAR", "MALES", "MASKS", "MINOR",
        "MISER", "MIXED", "MORAL", "MUMMY", "NASTY", "NAVAL", "NEVER", "NOTCH", "OCTET", "ODDLY",
        "OMENS", "OUNCE", "OVERT", "OWING", "OXIDE", "PAGAN", "PAGES", "PAIRS", "PHOTO", "PIECE",
        "PLANS", "PLEAS", "PLUGS", "POINT", "POLES", "PONDS", "PROBE", "PROWL", "PUPIL", "PURGE",
        "QUARK", "RADAR", "RAKES", "RANDY", "RECUR", "REFER", "RELAX", "RELIC", "RENTS", "RESTS",
        "RIGOR", "RIPES", "ROAST", "RODEO", "RUMBA", "RURAL", "SALON", "SANDY", "SATED", "SAVOR",
        "SCOLD", "SEEDS", "SEEMS", "SHEEN", "SHELF", "SHOCK", "SHRED", "SISSY", "SLAPS", "SLASH",
        "SLEEK", "SLOTH", "SMIRK", "SNIPE", "SOLES", "SONIC", "SORTS", "SPADE", "SPANS", "SPECK",
        "SPEED", "SPITE", "SPORT", "SPRAY", "SPURT", "STAFF", "STARK", "STEWS", "STOIC", "STOVE",
        "STRUM", "SUAVE", "SWAMI", "SWARM", "SWIFT", "SWING", "SWOOP", "SWORN", "TENDS", "TESTS",
        "TILES", "TILTS", "TIPSY", "TIRES", "TORES", "TOUCH", "TOWER", "TRAPS", "TRASH", "TREES",
        "TRIAL", "TRIBE", "TRIED", "TRIES", "TRYST", "TSARS", "TYPES", "UNDER", "UNFIT", "UNITS",
        "USUAL", "VALOR", "VEILS", "VERGE", "VESTS", "VISTA", "VOGUE", "VOUCH", "VOWEL", "WAGES",
        "WARDS", "WARTS", "WHACK", "WHITE", "WINCH", "WINES", "WISPY", "WOMEN", "YIELD", "YOUTH",
    ];

    fn no_square_supply() -> Vec<&'static str> {
        WIDE_SUPPLY
            .iter()
            .copied()
            .filter(|word| !SQUARE_WORDS.contains(word))
            .collect()
    }

    struct ScriptedOracle {
        replies: Vec<&'static str>,
        calls: usize,
    }

    impl WordOracle for ScriptedOracle {
        fn request(
            &mut self,
            _pattern: &Pattern,
            _count: usize,
            _used: &HashSet<String>,
        ) -> Result<Vec<String>, OracleError> {
            self.calls += 1;
            Ok(self.replies.iter().map(|reply| reply.to_string()).collect())
        }
    }

    struct FailingOracle;

    impl WordOracle for FailingOracle {
        fn request(
            &mut self,
            _pattern: &Pattern,
            _count: usize,
            _used: &HashSet<String>,
        ) -> Result<Vec<String>, OracleError> {
            Err(OracleError("oracle offline".into()))
        }
    }

    fn enumerate(grid: &mut Grid) -> (Vec<Slot>, ConstraintGraph) {
        let slots = grid.enumerate_slots();
        let graph = ConstraintGraph::build(&slots);
        (slots, graph)
    }

    fn supply_of(words: &[&str]) -> WordSupply {
        let mut supply = WordSupply::new();
        supply.load_base(words);
        supply
    }

    fn assert_sound(
        slots: &[Slot],
        graph: &ConstraintGraph,
        supply: &WordSupply,
        success: &FillSuccess,
    ) {
        assert_eq!(success.choices.len(), slots.len());

        let mut seen = HashSet::new();
        for (idx, choice) in success.choices.iter().enumerate() {
            assert_eq!(choice.slot_id, idx);
            let entry = supply.entry(choice.entry);
            assert_eq!(entry.text.len(), slots[choice.slot_id].length);
            assert!(
                seen.insert(entry.text.clone()),
                "entry {} assigned twice",
                entry.text
            );
        }

        for choice in &success.choices {
            let text = &supply.entry(choice.entry).text;
            for neighbor in graph.neighbors(choice.slot_id) {
                let other_text = &supply.entry(success.choices[neighbor.slot].entry).text;
                assert_eq!(
                    text.as_bytes()[neighbor.cell],
                    other_text.as_bytes()[neighbor.other_cell],
                    "crossing disagrees between slots {} and {}",
                    choice.slot_id,
                    neighbor.slot
                );
            }
        }
    }

    #[test]
    fn test_fill_open_5x5() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&[SQUARE_WORDS, DECOY_WORDS].concat());
        let params = FillParams::default();

        let success = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap();

        assert_sound(&slots, &graph, &supply, &success);
        assert_eq!(success.report.oracle_calls, 0);
        assert!(success.report.backtracks <= 200);
    }

    #[test]
    fn test_fill_open_3x3_mini() {
        let mut grid = Grid::new(3);
        let (slots, graph) = enumerate(&mut grid);
        let words = ["SOD", "PAY", "ARE", "SPA", "OAR", "DYE"];
        let mut supply = supply_of(&words);
        let params = FillParams::default();

        let success = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap();

        assert_sound(&slots, &graph, &supply, &success);
        assert_eq!(success.report.oracle_calls, 0);
        assert!(success.report.backtracks <= 5);

        // With exactly six entries for six slots, the classic mini fill (or
        // its transpose) is the only place to land: every word is used.
        let assigned: HashSet<&str> = success
            .choices
            .iter()
            .map(|choice| supply.entry(choice.entry).text.as_str())
            .collect();
        assert_eq!(assigned, words.iter().copied().collect());
    }

    #[test]
    fn test_oracle_recovers_missing_length() {
        // Corner blocks make four 4-letter slots, but the supply only has
        // 5-letter entries. The first empty domain asks the oracle; one call
        // covers all four slots because survivors go into the shared supply.
        let mut grid = Grid::from_block_mask(5, &[(0, 0)]).unwrap();
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&[
            "GROWN", "LEGAL", "UNITY", "ARENA", "LOGIC", "SWATH", "STEEP", "PLEAT",
        ]);
        let mut oracle = ScriptedOracle {
            replies: vec!["glue", "also", "EACH", "ONLY", "LEAF", "OBOE", "ox", "NO PE!"],
            calls: 0,
        };
        let params = FillParams::default();

        let success =
            find_fill(&grid, &slots, &graph, &mut supply, Some(&mut oracle), &params).unwrap();

        assert_sound(&slots, &graph, &supply, &success);
        assert_eq!(oracle.calls, 1);
        assert_eq!(success.report.oracle_calls, 1);

        let glue = supply.entry(supply.lookup("GLUE").unwrap());
        assert_eq!(glue.origin, EntryOrigin::Oracle);
        // The invalid replies never made it into the supply.
        assert!(supply.lookup("NOPE").is_none());
    }

    #[test]
    fn test_unsolvable_single_entry_supply() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&["AAAAA"]);
        let mut oracle = ScriptedOracle {
            replies: vec![],
            calls: 0,
        };
        let params = FillParams::default();

        let failure =
            find_fill(&grid, &slots, &graph, &mut supply, Some(&mut oracle), &params).unwrap_err();

        // The first revision wipes a domain (AAAAA can't support itself), the
        // oracle has nothing, and the run dies in initial propagation.
        assert!(matches!(failure, FillFailure::Unsolvable(_)));
        assert_eq!(failure.report().oracle_calls, 1);
        assert_eq!(failure.report().last_empty_pattern.as_deref(), Some("....."));
    }

    #[test]
    fn test_unsolvable_without_oracle() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&["AAAAA"]);
        let params = FillParams::default();

        let failure = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap_err();

        assert!(matches!(failure, FillFailure::Unsolvable(_)));
        assert_eq!(failure.report().oracle_calls, 0);
    }

    #[test]
    fn test_oracle_errors_become_empty_replies() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&["AAAAA"]);
        let mut oracle = FailingOracle;
        let params = FillParams::default();

        let failure =
            find_fill(&grid, &slots, &graph, &mut supply, Some(&mut oracle), &params).unwrap_err();

        assert!(matches!(failure, FillFailure::Unsolvable(_)));
        assert_eq!(failure.report().oracle_calls, 1);
    }

    #[test]
    fn test_oracle_budget_exhaustion() {
        // DYE is missing, and the oracle keeps proposing a junk word that
        // matches every pattern but supports nothing. Each recovery succeeds
        // nominally, wipes out again, and burns a call; after the third the
        // budget is spent and the run surfaces it.
        let mut grid = Grid::new(3);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&["SOD", "PAY", "ARE", "SPA", "OAR"]);
        let mut oracle = ScriptedOracle {
            replies: vec!["ZZZ"],
            calls: 0,
        };
        let params = FillParams {
            oracle_budget: 3,
            ..FillParams::default()
        };

        let failure =
            find_fill(&grid, &slots, &graph, &mut supply, Some(&mut oracle), &params).unwrap_err();

        assert!(matches!(failure, FillFailure::OracleBudgetExhausted(_)));
        assert_eq!(failure.report().oracle_calls, 3);
        assert_eq!(oracle.calls, 3);
        assert_eq!(failure.report().backtracks, 0);
    }

    #[test]
    fn test_backtrack_budget_exhaustion() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&no_square_supply());
        let params = FillParams {
            backtrack_budget: 25,
            ..FillParams::default()
        };

        let failure = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap_err();

        assert!(matches!(failure, FillFailure::BacktrackBudgetExhausted(_)));
        // The terminating backtrack is the budget-plus-first.
        assert_eq!(failure.report().backtracks, 26);
    }

    #[test]
    fn test_fill_wide_supply() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(WIDE_SUPPLY);
        let params = FillParams::default();

        let success = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap();

        assert_sound(&slots, &graph, &supply, &success);
        assert!(success.report.backtracks <= 200);
    }

    #[test]
    fn test_exhaustion_reports_unsolvable() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(&no_square_supply());
        let params = FillParams::default();

        let failure = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap_err();

        assert!(matches!(failure, FillFailure::Unsolvable(_)));
        // Proving unsolvability here takes real search, not an early wipeout.
        assert!(failure.report().backtracks > 25);
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let mut grid = Grid::new(5);
            let (slots, graph) = enumerate(&mut grid);
            let mut supply = supply_of(WIDE_SUPPLY);
            let params = FillParams::default();
            find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first.choices, second.choices);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn test_cancellation() {
        let mut grid = Grid::new(5);
        let (slots, graph) = enumerate(&mut grid);
        let mut supply = supply_of(WIDE_SUPPLY);
        let abort = Arc::new(AtomicBool::new(false));
        abort.store(true, Ordering::Relaxed);
        let params = FillParams {
            abort: Some(abort),
            ..FillParams::default()
        };

        let failure = find_fill(&grid, &slots, &graph, &mut supply, None, &params).unwrap_err();
        assert!(matches!(failure, FillFailure::Cancelled(_)));
    }

    #[test]
    fn test_fill_grid_writes_back() {
        let mut grid = Grid::new(3);
        let mut supply = supply_of(&["SOD", "PAY", "ARE", "SPA", "OAR", "DYE"]);
        let params = FillParams::default();

        fill_grid(&mut grid, &mut supply, None, &params).unwrap();

        let rendered = grid.to_display_string();
        assert!(!rendered.contains('.'));
        assert_eq!(validate_grid(&grid, DEFAULT_MAX_BLOCK_RATIO), Ok(()));
    }

    #[test]
    fn test_fill_grid_rejects_invalid_skeleton() {
        let mut grid = Grid::from_template("#....\n.....\n.....\n.....\n.....").unwrap();
        let mut supply = supply_of(WIDE_SUPPLY);
        let params = FillParams::default();

        let error = fill_grid(&mut grid, &mut supply, None, &params).unwrap_err();
        assert!(matches!(
            error,
            FillError::Invalid(GridViolation::AsymmetricBlock { cell: (0, 0) })
        ));
    }
}
