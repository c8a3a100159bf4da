//! The immutable adjacency index built once from the entity store.
//!
//! Person ids are interned to dense indices so that visited-set checks and
//! adjacency lookups during BFS are cheap. Sibling adjacency is derived here
//! from shared-parent groups; it is never loaded from storage, so it cannot
//! disagree with the parent graph.

use std::collections::HashMap;

use crate::graph::{PersonRef, RelationKind};
use crate::store::EntityStore;

pub struct GraphIndex {
    ids: Vec<String>,
    names: Vec<String>,
    ix_by_id: HashMap<String, usize>,
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
    spouses: Vec<Vec<usize>>,
    siblings: Vec<Vec<usize>>,
    /// Event ids per person, for participation lookups.
    person_events: Vec<Vec<String>>,
}

/// The focal person's immediate relations, used as the generation-0
/// side-list of a genealogy result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImmediateFamily {
    pub parents: Vec<PersonRef>,
    pub spouses: Vec<PersonRef>,
    pub siblings: Vec<PersonRef>,
    pub children: Vec<PersonRef>,
}

impl GraphIndex {
    /// Build the index from the store. Adjacency lists are kept in id order
    /// so traversal output is deterministic.
    pub fn build(store: &EntityStore) -> Self {
        let mut ids: Vec<String> = store.people().map(|p| p.id.clone()).collect();
        ids.sort();

        let ix_by_id: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let n = ids.len();
        let mut names = vec![String::new(); n];
        let mut parents = vec![Vec::new(); n];
        let mut children = vec![Vec::new(); n];
        let mut spouses = vec![Vec::new(); n];
        let mut person_events = vec![Vec::new(); n];

        for person in store.people() {
            let i = ix_by_id[&person.id];
            names[i] = person.name.clone();
            // Store adjacency is already sorted and validated; id order maps
            // monotonically onto index order.
            parents[i] = person.parents.iter().map(|id| ix_by_id[id]).collect();
            children[i] = person.children.iter().map(|id| ix_by_id[id]).collect();
            spouses[i] = person.spouses.iter().map(|id| ix_by_id[id]).collect();
            person_events[i] = person.events.clone();
        }

        // Siblings: everyone sharing at least one parent, excluding self.
        let mut siblings = vec![Vec::new(); n];
        for i in 0..n {
            let mut sibs: Vec<usize> = parents[i]
                .iter()
                .flat_map(|&p| children[p].iter().copied())
                .filter(|&c| c != i)
                .collect();
            sibs.sort_unstable();
            sibs.dedup();
            siblings[i] = sibs;
        }

        GraphIndex {
            ids,
            names,
            ix_by_id,
            parents,
            children,
            spouses,
            siblings,
            person_events,
        }
    }

    pub fn ix(&self, person_id: &str) -> Option<usize> {
        self.ix_by_id.get(person_id).copied()
    }

    pub fn id(&self, ix: usize) -> &str {
        &self.ids[ix]
    }

    pub fn name(&self, ix: usize) -> &str {
        &self.names[ix]
    }

    pub fn person_ref(&self, ix: usize) -> PersonRef {
        PersonRef {
            id: self.ids[ix].clone(),
            name: self.names[ix].clone(),
        }
    }

    pub fn neighbors(&self, ix: usize, kind: RelationKind) -> &[usize] {
        match kind {
            RelationKind::Parent => &self.parents[ix],
            RelationKind::Child => &self.children[ix],
            RelationKind::Spouse => &self.spouses[ix],
            RelationKind::Sibling => &self.siblings[ix],
        }
    }

    pub fn event_ids(&self, ix: usize) -> &[String] {
        &self.person_events[ix]
    }

    pub fn person_count(&self) -> usize {
        self.ids.len()
    }

    pub fn immediate_family(&self, ix: usize) -> ImmediateFamily {
        let refs = |list: &[usize]| list.iter().map(|&i| self.person_ref(i)).collect();
        ImmediateFamily {
            parents: refs(&self.parents[ix]),
            spouses: refs(&self.spouses[ix]),
            siblings: refs(&self.siblings[ix]),
            children: refs(&self.children[ix]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::davidic_line;

    #[test]
    fn test_adjacency_lookup() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let david = index.ix("david_1").unwrap();
        let jesse = index.ix("jesse_1").unwrap();

        assert_eq!(index.neighbors(david, RelationKind::Parent), &[jesse]);
        assert!(index
            .neighbors(jesse, RelationKind::Child)
            .contains(&david));
        assert_eq!(index.name(david), "David");
    }

    #[test]
    fn test_siblings_derived_from_shared_parents() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let david = index.ix("david_1").unwrap();
        let eliab = index.ix("eliab_1").unwrap();

        assert_eq!(index.neighbors(david, RelationKind::Sibling), &[eliab]);
        assert_eq!(index.neighbors(eliab, RelationKind::Sibling), &[david]);
    }

    #[test]
    fn test_half_siblings_count() {
        use crate::store::testutil::{person, with_parents};
        use crate::store::EntityStore;

        // ishmael and isaac share abraham only
        let people = vec![
            person("abraham_1", "Abraham"),
            person("hagar_1", "Hagar"),
            person("sarah_1", "Sarah"),
            with_parents(person("ishmael_1", "Ishmael"), &["abraham_1", "hagar_1"]),
            with_parents(person("isaac_1", "Isaac"), &["abraham_1", "sarah_1"]),
        ];
        let store = EntityStore::from_parts(people, vec![], vec![]);
        let index = GraphIndex::build(&store);

        let isaac = index.ix("isaac_1").unwrap();
        let ishmael = index.ix("ishmael_1").unwrap();
        assert_eq!(index.neighbors(isaac, RelationKind::Sibling), &[ishmael]);
    }

    #[test]
    fn test_immediate_family() {
        let store = davidic_line();
        let index = GraphIndex::build(&store);

        let ruth = index.ix("ruth_1").unwrap();
        let family = index.immediate_family(ruth);

        assert!(family.parents.is_empty());
        assert_eq!(family.spouses.len(), 1);
        assert_eq!(family.spouses[0].id, "boaz_1");
        assert_eq!(family.children.len(), 1);
        assert_eq!(family.children[0].name, "Obed");
    }
}
