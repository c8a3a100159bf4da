//! Passage-entity index: which entities are mentioned in a given passage.
//!
//! A static range-membership lookup, not a traversal. Each mention record
//! associates an entity with a span of scripture (book + inclusive chapter
//! range + optional verse range); a normalized reference matches every
//! mention whose span covers it. Results often seed genealogy and
//! path queries ("who is mentioned here, and how are they related?").

use std::collections::HashMap;

use serde::Serialize;

use crate::db::Db;
use crate::error::Result;
use crate::refs::NormalizedRef;

/// What kind of entity a mention points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Place,
    Event,
}

impl EntityKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "person" => Some(EntityKind::Person),
            "place" => Some(EntityKind::Place),
            "event" => Some(EntityKind::Event),
            _ => None,
        }
    }
}

/// A recorded association between an entity and a span of scripture.
/// `None` bounds are open-ended within the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub book: String,
    pub chapter_start: Option<u32>,
    pub chapter_end: Option<u32>,
    pub verse_start: Option<u32>,
    pub verse_end: Option<u32>,
}

impl Mention {
    /// Whether this mention's span covers the reference. Book equality is
    /// the caller's concern (the index buckets mentions per book).
    fn covers(&self, reference: &NormalizedRef) -> bool {
        let lo = self.chapter_start.unwrap_or(u32::MIN);
        let hi = self.chapter_end.unwrap_or(u32::MAX);
        if reference.chapter < lo || reference.chapter > hi {
            return false;
        }

        // Verse refinement only applies to single-chapter mentions queried
        // at verse granularity; chapter-level queries match the whole span.
        if let (Some(query_verse), Some(mention_verse)) = (reference.verse_start, self.verse_start)
        {
            if lo == hi {
                let query_end = reference.verse_end.unwrap_or(query_verse);
                let mention_end = self.verse_end.unwrap_or(mention_verse);
                return query_verse <= mention_end && mention_verse <= query_end;
            }
        }
        true
    }
}

/// Reverse index from book code to the mentions recorded in that book.
pub struct PassageIndex {
    by_book: HashMap<String, Vec<Mention>>,
}

impl PassageIndex {
    pub fn new(mentions: Vec<Mention>) -> Self {
        let mut by_book: HashMap<String, Vec<Mention>> = HashMap::new();
        for mention in mentions {
            by_book.entry(mention.book.clone()).or_default().push(mention);
        }
        PassageIndex { by_book }
    }

    /// Load every mention row from the database.
    pub async fn load(db: &Db) -> Result<Self> {
        let mentions = db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT entity_kind, entity_id, book, chapter_start, chapter_end, \
                            verse_start, verse_end \
                     FROM mentions",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<u32>>(3)?,
                        row.get::<_, Option<u32>>(4)?,
                        row.get::<_, Option<u32>>(5)?,
                        row.get::<_, Option<u32>>(6)?,
                    ))
                })?;

                let mut mentions = Vec::new();
                for row in rows {
                    let (kind, entity_id, book, cs, ce, vs, ve) = row?;
                    let Some(entity_kind) = EntityKind::parse(&kind) else {
                        log::warn!("mention for '{}' has unknown kind '{}'; skipping", entity_id, kind);
                        continue;
                    };
                    mentions.push(Mention {
                        entity_kind,
                        entity_id,
                        book,
                        chapter_start: cs,
                        chapter_end: ce,
                        verse_start: vs,
                        verse_end: ve,
                    });
                }
                Ok(mentions)
            })
            .await?;

        Ok(Self::new(mentions))
    }

    /// Deduplicated (kind, id) pairs mentioned at the reference, ordered by
    /// kind then id for stable output.
    pub fn entities_in(&self, reference: &NormalizedRef) -> Vec<(EntityKind, &str)> {
        let Some(mentions) = self.by_book.get(&reference.book) else {
            return Vec::new();
        };

        let mut hits: Vec<(EntityKind, &str)> = mentions
            .iter()
            .filter(|m| m.covers(reference))
            .map(|m| (m.entity_kind, m.entity_id.as_str()))
            .collect();
        hits.sort();
        hits.dedup();
        hits
    }

    pub fn mention_count(&self) -> usize {
        self.by_book.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::normalize;

    fn mention(
        kind: EntityKind,
        id: &str,
        book: &str,
        chapters: (Option<u32>, Option<u32>),
        verses: (Option<u32>, Option<u32>),
    ) -> Mention {
        Mention {
            entity_kind: kind,
            entity_id: id.to_string(),
            book: book.to_string(),
            chapter_start: chapters.0,
            chapter_end: chapters.1,
            verse_start: verses.0,
            verse_end: verses.1,
        }
    }

    fn index() -> PassageIndex {
        PassageIndex::new(vec![
            // Abram across Genesis 12-25
            mention(
                EntityKind::Person,
                "abraham_1",
                "Gen",
                (Some(12), Some(25)),
                (None, None),
            ),
            // Joseph only in the late chapters
            mention(
                EntityKind::Person,
                "joseph_1",
                "Gen",
                (Some(37), Some(50)),
                (None, None),
            ),
            // A single-verse mention
            mention(
                EntityKind::Person,
                "melchizedek_1",
                "Gen",
                (Some(14), Some(14)),
                (Some(18), Some(20)),
            ),
            mention(EntityKind::Place, "canaan_1", "Gen", (Some(12), None), (None, None)),
            // Open-ended within the whole book
            mention(EntityKind::Person, "moses_1", "Exo", (None, None), (None, None)),
        ])
    }

    #[test]
    fn test_genesis_15_includes_abram_excludes_joseph() {
        let idx = index();
        let hits = idx.entities_in(&normalize("Genesis 15").unwrap());
        let ids: Vec<&str> = hits.iter().map(|(_, id)| *id).collect();
        assert!(ids.contains(&"abraham_1"));
        assert!(!ids.contains(&"joseph_1"));
    }

    #[test]
    fn test_open_upper_bound_extends_to_book_end() {
        let idx = index();
        let hits = idx.entities_in(&normalize("Genesis 50").unwrap());
        let ids: Vec<&str> = hits.iter().map(|(_, id)| *id).collect();
        assert!(ids.contains(&"canaan_1"));
        assert!(ids.contains(&"joseph_1"));
        assert!(!ids.contains(&"abraham_1"));
    }

    #[test]
    fn test_fully_open_range_matches_any_chapter() {
        let idx = index();
        let hits = idx.entities_in(&normalize("Exodus 19").unwrap());
        assert_eq!(hits, vec![(EntityKind::Person, "moses_1")]);
    }

    #[test]
    fn test_verse_refinement_on_single_chapter_mention() {
        let idx = index();

        let hit = idx.entities_in(&normalize("Genesis 14:18").unwrap());
        assert!(hit.iter().any(|(_, id)| *id == "melchizedek_1"));

        let miss = idx.entities_in(&normalize("Genesis 14:1").unwrap());
        assert!(!miss.iter().any(|(_, id)| *id == "melchizedek_1"));

        // Chapter-level query still matches the verse-level mention
        let chapter = idx.entities_in(&normalize("Genesis 14").unwrap());
        assert!(chapter.iter().any(|(_, id)| *id == "melchizedek_1"));
    }

    #[test]
    fn test_unknown_book_is_empty() {
        let idx = index();
        assert!(idx.entities_in(&normalize("Revelation 1").unwrap()).is_empty());
    }

    #[test]
    fn test_duplicate_mentions_dedup() {
        let idx = PassageIndex::new(vec![
            mention(EntityKind::Person, "p_1", "Gen", (Some(1), Some(2)), (None, None)),
            mention(EntityKind::Person, "p_1", "Gen", (Some(2), Some(3)), (None, None)),
        ]);
        let hits = idx.entities_in(&normalize("Genesis 2").unwrap());
        assert_eq!(hits.len(), 1);
    }
}
