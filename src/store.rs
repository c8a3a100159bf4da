//! Entity store: canonical person, place, and event records.
//!
//! The store is loaded wholesale from the SQLite snapshot at startup and is
//! immutable afterwards. Declared relationships are reconciled on load:
//! parent/child and spouse links are repaired additively (never dropped) and
//! every repair is logged. Name resolution and adjacency indexing are
//! separate concerns built on top of this store.

use std::collections::HashMap;

use crate::db::Db;
use crate::error::Result;

/// A person record with declared family relationships.
#[derive(Debug, Clone, Default)]
pub struct Person {
    pub id: String,
    pub name: String,
    /// Variant spellings and transliterations (e.g. Abram for Abraham).
    pub variants: Vec<String>,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub description: Option<String>,
    /// Parent ids. Usually 0-2, but source ambiguity may record more.
    pub parents: Vec<String>,
    pub spouses: Vec<String>,
    pub children: Vec<String>,
    /// Event ids this person participates in (derived from event records).
    pub events: Vec<String>,
}

/// A place record.
#[derive(Debug, Clone, Default)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub feature_type: Option<String>,
    /// Event ids that occurred here (derived from event records).
    pub events: Vec<String>,
}

/// An event record.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub event_type: Option<String>,
    pub start_year: Option<i32>,
    /// Free-form era text, display only.
    pub era: Option<String>,
    pub place_ids: Vec<String>,
    pub participants: Vec<String>,
}

/// Immutable collection of all entities.
pub struct EntityStore {
    people: HashMap<String, Person>,
    places: HashMap<String, Place>,
    events: HashMap<String, Event>,
}

impl EntityStore {
    /// Load the full snapshot from the database.
    pub async fn load(db: &Db) -> Result<Self> {
        let (people, places, events) = db.with_connection(load_entities).await?;
        Ok(Self::from_parts(people, places, events))
    }

    /// Build a store from raw records, deriving participation lists and
    /// reconciling family links. This is the single construction path; the
    /// loader and test fixtures both go through it.
    pub fn from_parts(people: Vec<Person>, places: Vec<Place>, mut events: Vec<Event>) -> Self {
        let mut people: HashMap<String, Person> =
            people.into_iter().map(|p| (p.id.clone(), p)).collect();
        let mut places: HashMap<String, Place> =
            places.into_iter().map(|p| (p.id.clone(), p)).collect();

        // Derive person->events and place->events from event records,
        // dropping references to entities that do not exist.
        events.sort_by(|a, b| a.id.cmp(&b.id));
        for event in &mut events {
            event.participants.retain(|pid| {
                if let Some(person) = people.get_mut(pid) {
                    if !person.events.contains(&event.id) {
                        person.events.push(event.id.clone());
                    }
                    true
                } else {
                    log::warn!(
                        "event '{}' references unknown participant '{}'; dropping",
                        event.id,
                        pid
                    );
                    false
                }
            });
            event.place_ids.retain(|plid| {
                if let Some(place) = places.get_mut(plid) {
                    if !place.events.contains(&event.id) {
                        place.events.push(event.id.clone());
                    }
                    true
                } else {
                    log::warn!(
                        "event '{}' references unknown place '{}'; dropping",
                        event.id,
                        plid
                    );
                    false
                }
            });
        }
        let events: HashMap<String, Event> =
            events.into_iter().map(|e| (e.id.clone(), e)).collect();

        let mut store = EntityStore { people, places, events };
        store.reconcile();
        store
    }

    /// Enforce the relationship invariants:
    /// - no self-referential parent/child/spouse links,
    /// - no dangling person ids in family links,
    /// - if A lists B as parent, B's children contain A (and vice versa),
    /// - spouse links are symmetric.
    /// Mismatches are repaired additively and logged, never silently dropped.
    fn reconcile(&mut self) {
        use std::collections::HashSet;

        let known: HashSet<String> = self.people.keys().cloned().collect();

        // Self links and dangling ids are removed first.
        for person in self.people.values_mut() {
            let pid = person.id.clone();
            for field in [&mut person.parents, &mut person.children, &mut person.spouses] {
                field.retain(|other| {
                    if *other == pid {
                        log::warn!("person '{}' has a self-referential family link; removed", pid);
                        false
                    } else if !known.contains(other) {
                        log::warn!("person '{}' links to unknown person '{}'; dropping", pid, other);
                        false
                    } else {
                        true
                    }
                });
            }
        }

        // Additive repair of the inverse links.
        let ids: Vec<String> = self.people.keys().cloned().collect();
        for id in &ids {
            let person = &self.people[id];
            let parents = person.parents.clone();
            let children = person.children.clone();
            let spouses = person.spouses.clone();

            for parent_id in parents {
                if let Some(parent) = self.people.get_mut(&parent_id) {
                    if !parent.children.contains(id) {
                        log::warn!(
                            "'{}' lists '{}' as parent but the inverse child link is missing; repaired",
                            id,
                            parent_id
                        );
                        parent.children.push(id.clone());
                    }
                }
            }
            for child_id in children {
                if let Some(child) = self.people.get_mut(&child_id) {
                    if !child.parents.contains(id) {
                        log::warn!(
                            "'{}' lists '{}' as child but the inverse parent link is missing; repaired",
                            id,
                            child_id
                        );
                        child.parents.push(id.clone());
                    }
                }
            }
            for spouse_id in spouses {
                if let Some(spouse) = self.people.get_mut(&spouse_id) {
                    if !spouse.spouses.contains(id) {
                        log::warn!(
                            "spouse link '{}' <-> '{}' was one-directional; repaired",
                            id,
                            spouse_id
                        );
                        spouse.spouses.push(id.clone());
                    }
                }
            }
        }

        // Deterministic adjacency order.
        for person in self.people.values_mut() {
            for field in [
                &mut person.parents,
                &mut person.children,
                &mut person.spouses,
                &mut person.events,
            ] {
                field.sort();
                field.dedup();
            }
        }
        for place in self.places.values_mut() {
            place.events.sort();
            place.events.dedup();
        }
        for event in self.events.values_mut() {
            event.participants.sort();
            event.participants.dedup();
            event.place_ids.sort();
            event.place_ids.dedup();
        }
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.get(id)
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.get(id)
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Split a comma-separated variant-name field, filtering empties.
fn split_variants(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

type RawEntities = (Vec<Person>, Vec<Place>, Vec<Event>);

/// Read every entity and edge table. Runs inside `spawn_blocking`.
fn load_entities(conn: &mut rusqlite::Connection) -> Result<RawEntities> {
    let mut people: Vec<Person> = {
        let mut stmt = conn.prepare(
            "SELECT id, name, also_called, gender, birth_year, death_year, description \
             FROM people",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Person {
                id: row.get(0)?,
                name: row.get(1)?,
                variants: split_variants(row.get(2)?),
                gender: row.get(3)?,
                birth_year: row.get(4)?,
                death_year: row.get(5)?,
                description: row.get(6)?,
                ..Person::default()
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    // Family edges are applied onto the person records; the inverse
    // direction is derived here and re-checked by reconcile().
    {
        let mut by_id: HashMap<String, usize> = people
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        let mut stmt =
            conn.prepare("SELECT from_person, to_person, relationship FROM family_edges")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        for row in rows {
            let (from, to, relationship) = row?;
            if from == to {
                log::warn!("self-referential {} edge on '{}'; skipping", relationship, from);
                continue;
            }
            let (Some(&fi), Some(&ti)) = (by_id.get(&from), by_id.get(&to)) else {
                log::warn!(
                    "family edge {} -> {} references an unknown person; skipping",
                    from,
                    to
                );
                continue;
            };
            match relationship.as_str() {
                "parent_of" => {
                    people[ti].parents.push(from.clone());
                    people[fi].children.push(to.clone());
                }
                "spouse_of" => {
                    people[fi].spouses.push(to.clone());
                    people[ti].spouses.push(from.clone());
                }
                other => {
                    log::warn!("unknown relationship type '{}'; skipping", other);
                }
            }
        }
    }

    let places: Vec<Place> = {
        let mut stmt = conn.prepare(
            "SELECT id, name, latitude, longitude, feature_type FROM places",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Place {
                id: row.get(0)?,
                name: row.get(1)?,
                latitude: row.get(2)?,
                longitude: row.get(3)?,
                feature_type: row.get(4)?,
                events: Vec::new(),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut events: Vec<Event> = {
        let mut stmt = conn.prepare(
            "SELECT id, title, event_type, start_year, era FROM events",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Event {
                id: row.get(0)?,
                title: row.get(1)?,
                event_type: row.get(2)?,
                start_year: row.get(3)?,
                era: row.get(4)?,
                place_ids: Vec::new(),
                participants: Vec::new(),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    {
        let mut by_id: HashMap<String, usize> = events
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        let mut stmt = conn.prepare("SELECT person_id, event_id FROM person_event_edges")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (person_id, event_id) = row?;
            if let Some(&ei) = by_id.get(&event_id) {
                events[ei].participants.push(person_id);
            } else {
                log::warn!("participation edge references unknown event '{}'; skipping", event_id);
            }
        }

        let mut stmt = conn.prepare("SELECT event_id, place_id FROM event_place_edges")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (event_id, place_id) = row?;
            if let Some(&ei) = by_id.get(&event_id) {
                events[ei].place_ids.push(place_id);
            } else {
                log::warn!("location edge references unknown event '{}'; skipping", event_id);
            }
        }
    }

    Ok((people, places, events))
}

/// Fixture builders shared by graph and snapshot tests.
#[cfg(test)]
pub(crate) mod testutil {
    use super::{EntityStore, Event, Person, Place};

    pub(crate) fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
            ..Person::default()
        }
    }

    pub(crate) fn with_parents(mut p: Person, parents: &[&str]) -> Person {
        p.parents = parents.iter().map(|s| s.to_string()).collect();
        p
    }

    pub(crate) fn with_variants(mut p: Person, variants: &[&str]) -> Person {
        p.variants = variants.iter().map(|s| s.to_string()).collect();
        p
    }

    /// A compressed Davidic line: Boaz+Ruth -> Obed -> Jesse -> David ->
    /// Solomon -> Jesus, plus Eliab (sibling of David through Jesse) and
    /// Orpah (disconnected from everyone). Includes Bethlehem and the
    /// anointing of David there.
    pub(crate) fn davidic_line() -> EntityStore {
        let mut ruth = person("ruth_1", "Ruth");
        ruth.spouses = vec!["boaz_1".to_string()];
        let people = vec![
            person("boaz_1", "Boaz"),
            ruth,
            with_parents(person("obed_1", "Obed"), &["boaz_1", "ruth_1"]),
            with_parents(person("jesse_1", "Jesse"), &["obed_1"]),
            with_parents(person("david_1", "David"), &["jesse_1"]),
            with_parents(person("eliab_1", "Eliab"), &["jesse_1"]),
            with_parents(person("solomon_1", "Solomon"), &["david_1"]),
            with_parents(person("jesus_1", "Jesus"), &["solomon_1"]),
            person("orpah_1", "Orpah"),
        ];
        let places = vec![Place {
            id: "bethlehem_1".to_string(),
            name: "Bethlehem".to_string(),
            latitude: Some(31.70),
            longitude: Some(35.20),
            ..Place::default()
        }];
        let events = vec![Event {
            id: "anointing_1".to_string(),
            title: "Anointing of David".to_string(),
            event_type: Some("anointing".to_string()),
            start_year: Some(-1025),
            place_ids: vec!["bethlehem_1".to_string()],
            participants: vec!["david_1".to_string(), "jesse_1".to_string()],
            ..Event::default()
        }];
        EntityStore::from_parts(people, places, events)
    }

    /// Erroneously cyclic parentage: each of the pair records the other as
    /// its parent.
    pub(crate) fn cyclic_pair() -> EntityStore {
        let people = vec![
            with_parents(person("alpha_1", "Alpha"), &["beta_1"]),
            with_parents(person("beta_1", "Beta"), &["alpha_1"]),
        ];
        EntityStore::from_parts(people, vec![], vec![])
    }
}
