//! The AC-3 arc-consistency algorithm, specialized for crossword fill. A
//! directed arc (X, Y) is consistent when every entry left in X's domain has
//! a supporter in Y's domain: an entry with the matching letter at the
//! crossing that is not the same entry (the global uniqueness constraint
//! forbids reusing a supporter that Y itself would need).
//!
//! Propagation only ever shrinks domains, with one exception: when a domain
//! empties, the recovery protocol may consult the word oracle and grow the
//! supply. Recovery is also invoked by initial domain construction, so it
//! lives here alongside the propagation loop that triggers it most often.

use log::{debug, warn};
use std::collections::{HashSet, VecDeque};

use crate::backtracking_search::{FillState, Interrupt};
use crate::constraint_graph::ConstraintGraph;
use crate::types::{EntryId, SlotId};
use crate::word_supply::{normalize_entry, EntryOrigin};

/// A directed arc: revise the first slot against the second.
pub(crate) type Arc = (SlotId, SlotId);

/// Every directed arc in the graph, used to establish initial consistency.
pub(crate) fn all_arcs(graph: &ConstraintGraph) -> VecDeque<Arc> {
    let mut queue = VecDeque::new();
    for slot_id in 0..graph.slot_count() {
        for neighbor in graph.neighbors(slot_id) {
            queue.push_back((slot_id, neighbor.slot));
        }
    }
    queue
}

/// The arcs pointing at a just-restricted slot, used to maintain consistency
/// after a decision.
pub(crate) fn arcs_toward(graph: &ConstraintGraph, slot_id: SlotId) -> VecDeque<Arc> {
    graph
        .neighbors(slot_id)
        .iter()
        .map(|neighbor| (neighbor.slot, slot_id))
        .collect()
}

/// Remove every entry of Dom(x) that has no supporter in Dom(y) at the
/// crossing (xi, yj). Returns whether anything was removed.
pub(crate) fn revise(state: &mut FillState, x: SlotId, y: SlotId, xi: usize, yj: usize) -> bool {
    state.report.arc_revisions += 1;

    let len_x = state.slots[x].length;
    let len_y = state.slots[y].length;

    // Dom(y) is read while Dom(x) is rewritten; take a cheap id snapshot.
    let dom_y: Vec<EntryId> = state.domains[y].clone();

    let supply = &state.supply;
    let domain_x = &mut state.domains[x];
    let before = domain_x.len();

    domain_x.retain(|&wx| {
        let needed = supply.entry((len_x, wx)).text.as_bytes()[xi];
        dom_y.iter().any(|&wy| {
            let distinct = len_x != len_y || wx != wy;
            distinct && supply.entry((len_y, wy)).text.as_bytes()[yj] == needed
        })
    });

    domain_x.len() != before
}

/// Drain the arc queue, revising as we go. An emptied domain hands control to
/// the recovery protocol; if recovery also fails, the whole propagation fails
/// and the caller unwinds. The cancellation flag is polled between arcs.
pub(crate) fn propagate(state: &mut FillState, mut queue: VecDeque<Arc>) -> Result<bool, Interrupt> {
    while let Some((x, y)) = queue.pop_front() {
        if state.cancelled() {
            return Err(Interrupt::Cancelled);
        }

        let Some((xi, yj)) = state.graph.crossing(x, y) else {
            continue;
        };

        if revise(state, x, y, xi, yj) {
            if state.domains[x].is_empty() {
                if !recover(state, x) {
                    return Ok(false);
                }
                // The refilled domain may invalidate its neighbours' support.
                for neighbor in state.graph.neighbors(x) {
                    queue.push_back((neighbor.slot, x));
                }
                continue;
            }

            for neighbor in state.graph.neighbors(x) {
                if neighbor.slot != y {
                    queue.push_back((neighbor.slot, x));
                }
            }
        }
    }

    Ok(true)
}

/// The empty-domain recovery protocol: describe the slot as a letter pattern,
/// ask the oracle for fresh candidates, and filter the reply hard before
/// letting anything into the supply and the domain. This is the only point
/// at which the engine's world grows.
pub(crate) fn recover(state: &mut FillState, slot_id: SlotId) -> bool {
    let pattern = state.pattern_of(slot_id);
    state.report.last_empty_pattern = Some(pattern.as_str().to_string());

    if state.oracle.is_none() {
        debug!("domain wiped for slot {slot_id} ({pattern}) with no oracle");
        return false;
    }
    if state.report.oracle_calls >= state.params.oracle_budget {
        debug!("domain wiped for slot {slot_id} ({pattern}) with oracle budget spent");
        return false;
    }

    let used_texts: HashSet<String> = state
        .used
        .iter()
        .map(|&entry| state.supply.entry(entry).text.clone())
        .collect();

    let quota = state.params.neighbor_quota;
    let reply = state
        .oracle
        .as_mut()
        .expect("oracle presence checked above")
        .request(&pattern, quota, &used_texts)
        .unwrap_or_else(|err| {
            warn!("{err}");
            vec![]
        });
    state.report.oracle_calls += 1;
    debug!(
        "oracle call {} for slot {slot_id} ({pattern}) returned {} candidates",
        state.report.oracle_calls,
        reply.len()
    );

    let matcher = pattern.to_regex();
    for raw in reply {
        let Some(text) = normalize_entry(&raw) else {
            continue;
        };
        if text.len() != pattern.len() || !matcher.is_match(&text).unwrap_or(false) {
            continue;
        }
        if used_texts.contains(&text) {
            continue;
        }

        let Some((length, id)) = state.supply.absorb(&text, EntryOrigin::Oracle) else {
            continue;
        };
        debug_assert_eq!(length, pattern.len());
        if !state.domains[slot_id].contains(&id) {
            state.domains[slot_id].push(id);
        }
    }

    !state.domains[slot_id].is_empty()
}
