//! The immutable in-memory world shared by all request handlers.
//!
//! Built once at startup from the persisted snapshot: entity store, graph
//! index, name resolvers, and passage index. Queries are pure reads with no
//! locking; the absence of writers after warm-up is the whole concurrency
//! strategy. A data refresh builds a fresh snapshot out-of-band and
//! publishes it through [`SnapshotHandle`] without touching the live one.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::config::{Config, GraphConfig};
use crate::db::Db;
use crate::error::{Result, TheomcpError};
use crate::graph::{
    find_path, traverse, Direction, GenealogyTree, GraphIndex, ImmediateFamily, PathHop,
    PersonRef,
};
use crate::passage::{EntityKind, PassageIndex};
use crate::refs::{normalize, NormalizedRef};
use crate::resolve::{Candidate, NameEntry, NameResolver, ResolveFailure};
use crate::store::EntityStore;

/// A genealogy query result: the generation-labeled tree plus the focal
/// person's immediate family side-list (not counted toward depth).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenealogyReport {
    pub tree: GenealogyTree,
    pub family: ImmediateFamily,
    pub description: Option<String>,
}

/// A short entity description for passage listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
    pub detail: Option<String>,
}

/// Entities mentioned in a passage, grouped by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassageEntities {
    pub reference: NormalizedRef,
    pub people: Vec<EntitySummary>,
    pub places: Vec<EntitySummary>,
    pub events: Vec<EntitySummary>,
}

/// An event with its resolved place names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub event_type: Option<String>,
    pub start_year: Option<i32>,
    pub era: Option<String>,
    pub places: Vec<String>,
}

/// Timeline of one person's recorded events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonEvents {
    pub person: PersonRef,
    pub events: Vec<EventSummary>,
}

/// A place, the events that happened there, and the people involved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceProfile {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub events: Vec<EventSummary>,
    pub people: Vec<PersonRef>,
}

pub struct GraphSnapshot {
    store: EntityStore,
    index: GraphIndex,
    people_resolver: NameResolver,
    place_resolver: NameResolver,
    passages: PassageIndex,
    graph: GraphConfig,
}

impl GraphSnapshot {
    /// Load everything from the database and build the indexes.
    pub async fn load(db: &Db, config: &Config) -> Result<Self> {
        let store = EntityStore::load(db).await?;
        let passages = PassageIndex::load(db).await?;
        let snapshot = Self::from_parts(store, passages, config.graph.clone());
        log::info!(
            "graph snapshot ready: {} people, {} places, {} events, {} mentions",
            snapshot.store.person_count(),
            snapshot.store.place_count(),
            snapshot.store.event_count(),
            snapshot.passages.mention_count()
        );
        Ok(snapshot)
    }

    /// Assemble a snapshot from an already-loaded store and passage index.
    pub fn from_parts(store: EntityStore, passages: PassageIndex, graph: GraphConfig) -> Self {
        let people_entries: Vec<NameEntry> = store
            .people()
            .map(|p| NameEntry {
                id: p.id.clone(),
                name: p.name.clone(),
                variants: p.variants.clone(),
            })
            .collect();
        let place_entries: Vec<NameEntry> = store
            .places()
            .map(|p| NameEntry {
                id: p.id.clone(),
                name: p.name.clone(),
                variants: Vec::new(),
            })
            .collect();

        let people_resolver = NameResolver::new(
            people_entries,
            graph.fuzzy_min_similarity,
            graph.fuzzy_max_candidates,
        );
        let place_resolver = NameResolver::new(
            place_entries,
            graph.fuzzy_min_similarity,
            graph.fuzzy_max_candidates,
        );
        let index = GraphIndex::build(&store);

        GraphSnapshot {
            store,
            index,
            people_resolver,
            place_resolver,
            passages,
            graph,
        }
    }

    /// Resolve a person name to a single candidate.
    pub fn resolve_person(&self, name: &str) -> Result<Candidate> {
        self.people_resolver
            .resolve_one(name)
            .map_err(|failure| match failure {
                ResolveFailure::NotFound => TheomcpError::PersonNotFound(name.to_string()),
                ResolveFailure::Ambiguous(tied) => TheomcpError::AmbiguousName {
                    query: name.to_string(),
                    candidates: tied
                        .into_iter()
                        .map(|c| format!("{} ({})", c.name, c.id))
                        .collect(),
                },
            })
    }

    /// Resolve a place name to a single candidate.
    pub fn resolve_place(&self, name: &str) -> Result<Candidate> {
        self.place_resolver
            .resolve_one(name)
            .map_err(|failure| match failure {
                ResolveFailure::NotFound => TheomcpError::PlaceNotFound(name.to_string()),
                ResolveFailure::Ambiguous(tied) => TheomcpError::AmbiguousName {
                    query: name.to_string(),
                    candidates: tied
                        .into_iter()
                        .map(|c| format!("{} ({})", c.name, c.id))
                        .collect(),
                },
            })
    }

    /// Generation-labeled ancestor/descendant tree for a named person.
    pub fn explore_genealogy(
        &self,
        person: &str,
        direction: Direction,
        generations: u32,
    ) -> Result<GenealogyReport> {
        let focal = self.resolve_person(person)?;
        let generations = generations.min(self.graph.max_generations);
        let tree = traverse(
            &self.index,
            &focal.id,
            direction,
            generations,
            self.graph.max_frontier,
        )?;

        let ix = self
            .index
            .ix(&focal.id)
            .ok_or_else(|| TheomcpError::PersonNotFound(person.to_string()))?;
        let family = self.index.immediate_family(ix);
        let description = self
            .store
            .person(&focal.id)
            .and_then(|p| p.description.clone());

        Ok(GenealogyReport {
            tree,
            family,
            description,
        })
    }

    /// Shortest relationship path between two named persons.
    pub fn find_connection(&self, person1: &str, person2: &str) -> Result<Vec<PathHop>> {
        let a = self.resolve_person(person1)?;
        let b = self.resolve_person(person2)?;
        find_path(&self.index, &a.id, &b.id, self.graph.max_frontier)
    }

    /// Entities whose recorded mention ranges cover the reference.
    pub fn entities_in_passage(&self, reference: &str) -> Result<PassageEntities> {
        let normalized = normalize(reference)?;
        let hits = self.passages.entities_in(&normalized);

        let mut people = Vec::new();
        let mut places = Vec::new();
        let mut events = Vec::new();

        for (kind, id) in hits {
            match kind {
                EntityKind::Person => {
                    if let Some(p) = self.store.person(id) {
                        people.push(EntitySummary {
                            kind,
                            id: p.id.clone(),
                            name: p.name.clone(),
                            detail: p.description.clone(),
                        });
                    } else {
                        log::debug!("mention references unknown person '{}'", id);
                    }
                }
                EntityKind::Place => {
                    if let Some(p) = self.store.place(id) {
                        places.push(EntitySummary {
                            kind,
                            id: p.id.clone(),
                            name: p.name.clone(),
                            detail: p.feature_type.clone(),
                        });
                    } else {
                        log::debug!("mention references unknown place '{}'", id);
                    }
                }
                EntityKind::Event => {
                    if let Some(e) = self.store.event(id) {
                        events.push(EntitySummary {
                            kind,
                            id: e.id.clone(),
                            name: e.title.clone(),
                            detail: e.event_type.clone(),
                        });
                    } else {
                        log::debug!("mention references unknown event '{}'", id);
                    }
                }
            }
        }

        Ok(PassageEntities {
            reference: normalized,
            people,
            places,
            events,
        })
    }

    /// Chronology of events a named person participates in.
    pub fn person_events(&self, person: &str) -> Result<PersonEvents> {
        let focal = self.resolve_person(person)?;
        let ix = self
            .index
            .ix(&focal.id)
            .ok_or_else(|| TheomcpError::PersonNotFound(person.to_string()))?;

        let mut events: Vec<EventSummary> = self
            .index
            .event_ids(ix)
            .iter()
            .filter_map(|eid| self.store.event(eid))
            .map(|e| self.event_summary(e))
            .collect();
        sort_events(&mut events);

        Ok(PersonEvents {
            person: self.index.person_ref(ix),
            events,
        })
    }

    /// Events recorded at a named place and the people connected to it.
    pub fn place_profile(&self, place: &str) -> Result<PlaceProfile> {
        let focal = self.resolve_place(place)?;
        let record = self
            .store
            .place(&focal.id)
            .ok_or_else(|| TheomcpError::PlaceNotFound(place.to_string()))?;

        let mut events: Vec<EventSummary> = record
            .events
            .iter()
            .filter_map(|eid| self.store.event(eid))
            .map(|e| self.event_summary(e))
            .collect();
        sort_events(&mut events);

        // Everyone participating in any event at this place
        let mut people: Vec<PersonRef> = record
            .events
            .iter()
            .filter_map(|eid| self.store.event(eid))
            .flat_map(|e| e.participants.iter())
            .filter_map(|pid| self.index.ix(pid).map(|ix| self.index.person_ref(ix)))
            .collect();
        people.sort_by(|a, b| a.id.cmp(&b.id));
        people.dedup();

        Ok(PlaceProfile {
            id: record.id.clone(),
            name: record.name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            events,
            people,
        })
    }

    fn event_summary(&self, event: &crate::store::Event) -> EventSummary {
        EventSummary {
            id: event.id.clone(),
            title: event.title.clone(),
            event_type: event.event_type.clone(),
            start_year: event.start_year,
            era: event.era.clone(),
            places: event
                .place_ids
                .iter()
                .filter_map(|pid| self.store.place(pid))
                .map(|p| p.name.clone())
                .collect(),
        }
    }

    pub fn person_count(&self) -> usize {
        self.store.person_count()
    }

    pub fn place_count(&self) -> usize {
        self.store.place_count()
    }

    pub fn event_count(&self) -> usize {
        self.store.event_count()
    }

    pub fn mention_count(&self) -> usize {
        self.passages.mention_count()
    }
}

/// Chronological order: dated events first by year, undated last by title.
fn sort_events(events: &mut [EventSummary]) {
    events.sort_by(|a, b| match (a.start_year, b.start_year) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.title.cmp(&b.title)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.title.cmp(&b.title),
    });
}

/// Shared holder for the current snapshot. Readers clone the `Arc` once per
/// request; a rebuild swaps the pointer and never mutates the live snapshot,
/// so queries in flight keep reading the world they started with.
pub struct SnapshotHandle {
    inner: RwLock<Arc<GraphSnapshot>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        SnapshotHandle {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn current(&self) -> Arc<GraphSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace(&self, snapshot: GraphSnapshot) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(snapshot);
    }
}
