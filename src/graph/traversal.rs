//! Generation-labeled BFS over parent or child edges.
//!
//! The parent graph is expected to be acyclic but is not guaranteed to be:
//! textual inconsistencies and legendary attributions can loop. Expansion
//! therefore keeps a visited set per direction and truncates any branch that
//! reaches an already-visited person, logging the anomaly instead of
//! failing the query.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::error::{Result, TheomcpError};
use crate::graph::{Direction, GraphIndex, PersonRef, RelationKind};

/// Hard ceiling on the generation bound, applied after the configured clamp.
pub const GENERATION_CAP: u32 = 50;

/// How an entry relates to the focal person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lineage {
    Focal,
    Ancestor,
    Descendant,
}

/// One person in a genealogy result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenealogyEntry {
    pub person: PersonRef,
    /// BFS depth from the focal person; the focal person is generation 0.
    pub generation: u32,
    pub lineage: Lineage,
}

/// The result of a genealogy traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenealogyTree {
    pub focal: PersonRef,
    /// Focal entry first, then BFS order per direction.
    pub entries: Vec<GenealogyEntry>,
    /// True when the frontier cap stopped expansion early.
    pub truncated: bool,
    /// Number of branches truncated by the cycle guard.
    pub cycle_branches: u32,
}

/// Expand from the focal person over parent edges (ancestors), child edges
/// (descendants), or both. `max_generations` is clamped to [`GENERATION_CAP`].
pub fn traverse(
    index: &GraphIndex,
    person_id: &str,
    direction: Direction,
    max_generations: u32,
    max_frontier: usize,
) -> Result<GenealogyTree> {
    let start = index
        .ix(person_id)
        .ok_or_else(|| TheomcpError::PersonNotFound(person_id.to_string()))?;

    let max_generations = max_generations.min(GENERATION_CAP);

    let mut entries = vec![GenealogyEntry {
        person: index.person_ref(start),
        generation: 0,
        lineage: Lineage::Focal,
    }];
    let mut truncated = false;
    let mut cycle_branches = 0;

    if matches!(direction, Direction::Ancestors | Direction::Both) {
        let (t, c) = expand(
            index,
            start,
            RelationKind::Parent,
            Lineage::Ancestor,
            max_generations,
            max_frontier,
            &mut entries,
        );
        truncated |= t;
        cycle_branches += c;
    }
    if matches!(direction, Direction::Descendants | Direction::Both) {
        let (t, c) = expand(
            index,
            start,
            RelationKind::Child,
            Lineage::Descendant,
            max_generations,
            max_frontier,
            &mut entries,
        );
        truncated |= t;
        cycle_branches += c;
    }

    Ok(GenealogyTree {
        focal: index.person_ref(start),
        entries,
        truncated,
        cycle_branches,
    })
}

/// BFS in one direction. The visited set is per call, so an ancestor
/// expansion never interferes with a descendant expansion of the same
/// traversal. Returns (frontier truncated, cycle branches truncated).
fn expand(
    index: &GraphIndex,
    start: usize,
    kind: RelationKind,
    lineage: Lineage,
    max_generations: u32,
    max_frontier: usize,
    entries: &mut Vec<GenealogyEntry>,
) -> (bool, u32) {
    let mut visited: HashSet<usize> = HashSet::new();
    visited.insert(start);

    let mut queue: VecDeque<(usize, u32)> = VecDeque::new();
    queue.push_back((start, 0));

    let mut truncated = false;
    let mut cycle_branches = 0;

    'search: while let Some((ix, generation)) = queue.pop_front() {
        if generation >= max_generations {
            continue;
        }
        for &next in index.neighbors(ix, kind) {
            if visited.len() >= max_frontier {
                log::warn!(
                    "frontier cap {} reached expanding {} of '{}'; result truncated",
                    max_frontier,
                    kind.label(),
                    index.id(start)
                );
                truncated = true;
                break 'search;
            }
            if !visited.insert(next) {
                // BFS already recorded this person at its first (minimal)
                // generation. Reaching the focal person again means the
                // parentage data loops.
                if next == start {
                    log::warn!(
                        "cycle guard: '{}' is its own {} via '{}'; branch truncated",
                        index.id(start),
                        if kind == RelationKind::Parent { "ancestor" } else { "descendant" },
                        index.id(ix)
                    );
                    cycle_branches += 1;
                }
                continue;
            }
            entries.push(GenealogyEntry {
                person: index.person_ref(next),
                generation: generation + 1,
                lineage,
            });
            queue.push_back((next, generation + 1));
        }
    }

    (truncated, cycle_branches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{cyclic_pair, davidic_line};

    fn generation_of(tree: &GenealogyTree, id: &str) -> Option<u32> {
        tree.entries
            .iter()
            .find(|e| e.person.id == id)
            .map(|e| e.generation)
    }

    #[test]
    fn test_focal_person_at_generation_zero() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let tree = traverse(&index, "david_1", Direction::Ancestors, 5, 1000).unwrap();
        assert_eq!(tree.entries[0].person.id, "david_1");
        assert_eq!(tree.entries[0].generation, 0);
        assert_eq!(tree.entries[0].lineage, Lineage::Focal);
    }

    #[test]
    fn test_davids_ancestors_by_generation() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let tree = traverse(&index, "david_1", Direction::Ancestors, 5, 1000).unwrap();
        assert_eq!(generation_of(&tree, "jesse_1"), Some(1));
        assert_eq!(generation_of(&tree, "obed_1"), Some(2));
        assert_eq!(generation_of(&tree, "boaz_1"), Some(3));
        assert_eq!(generation_of(&tree, "ruth_1"), Some(3));
        // No descendants in an ancestors-only traversal
        assert_eq!(generation_of(&tree, "solomon_1"), None);
    }

    #[test]
    fn test_generation_bound_respected() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        for bound in 0..4 {
            let tree = traverse(&index, "david_1", Direction::Ancestors, bound, 1000).unwrap();
            assert!(tree.entries.iter().all(|e| e.generation <= bound));
        }

        let tree = traverse(&index, "david_1", Direction::Ancestors, 2, 1000).unwrap();
        assert_eq!(generation_of(&tree, "obed_1"), Some(2));
        assert_eq!(generation_of(&tree, "boaz_1"), None);
    }

    #[test]
    fn test_generation_bound_clamped_to_cap() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);
        // Absurd bound must not panic or loop; clamp applies
        let tree = traverse(&index, "david_1", Direction::Both, u32::MAX, 1000).unwrap();
        assert!(tree.entries.iter().all(|e| e.generation <= GENERATION_CAP));
    }

    #[test]
    fn test_both_directions_disjoint_without_cycles() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let tree = traverse(&index, "david_1", Direction::Both, 10, 1000).unwrap();
        let ancestors: Vec<&str> = tree
            .entries
            .iter()
            .filter(|e| e.lineage == Lineage::Ancestor)
            .map(|e| e.person.id.as_str())
            .collect();
        let descendants: Vec<&str> = tree
            .entries
            .iter()
            .filter(|e| e.lineage == Lineage::Descendant)
            .map(|e| e.person.id.as_str())
            .collect();

        assert!(ancestors.contains(&"ruth_1"));
        assert!(descendants.contains(&"jesus_1"));
        assert!(ancestors.iter().all(|id| !descendants.contains(id)));
        assert_eq!(tree.cycle_branches, 0);
    }

    #[test]
    fn test_no_relations_is_empty_not_error() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let tree = traverse(&index, "orpah_1", Direction::Ancestors, 5, 1000).unwrap();
        assert_eq!(tree.entries.len(), 1); // only the focal entry
    }

    #[test]
    fn test_unknown_person_is_an_error() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let err = traverse(&index, "nobody_1", Direction::Ancestors, 3, 1000).unwrap_err();
        assert!(matches!(err, TheomcpError::PersonNotFound(_)));
    }

    #[test]
    fn test_cyclic_parentage_terminates() {
        let store = cyclic_pair();
        let index = GraphIndex::build(&store);

        let tree = traverse(&index, "alpha_1", Direction::Ancestors, 50, 1000).unwrap();
        // alpha at 0, beta at 1; the loop back to alpha is truncated
        assert_eq!(tree.entries.len(), 2);
        assert_eq!(generation_of(&tree, "beta_1"), Some(1));
        assert!(tree.cycle_branches >= 1);
    }

    #[test]
    fn test_frontier_cap_truncates() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let tree = traverse(&index, "david_1", Direction::Ancestors, 10, 2).unwrap();
        assert!(tree.truncated);
        assert!(tree.entries.len() <= 3);
    }

    #[test]
    fn test_idempotent() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let a = traverse(&index, "david_1", Direction::Both, 10, 1000).unwrap();
        let b = traverse(&index, "david_1", Direction::Both, 10, 1000).unwrap();
        assert_eq!(a, b);
    }
}
