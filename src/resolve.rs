//! Name resolution: free-text name to ranked candidate entity ids.
//!
//! Matching policy: exact case-insensitive match on the canonical name
//! first; if none, exact match against the variant-name set; if still none,
//! a bounded Jaro-Winkler scan over both sets with a similarity floor and a
//! fixed candidate cap. The resolver is a pure function of name data and
//! never touches relationship edges.

use std::collections::HashMap;

use strsim::jaro_winkler;

/// A possible resolution of a name to an entity id.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub score: f64,
}

/// Why a single resolution could not be produced. The caller maps this onto
/// its own error taxonomy (person vs place lookups differ only in wording).
#[derive(Debug)]
pub enum ResolveFailure {
    NotFound,
    Ambiguous(Vec<Candidate>),
}

const EXACT_SCORE: f64 = 1.0;
const VARIANT_SCORE: f64 = 0.95;
const SCORE_EPSILON: f64 = 1e-9;

/// One resolvable entity: id, canonical name, variant names.
#[derive(Debug, Clone)]
pub struct NameEntry {
    pub id: String,
    pub name: String,
    pub variants: Vec<String>,
}

pub struct NameResolver {
    entries: Vec<NameEntry>,
    /// lowercased canonical name -> entry indices
    canonical: HashMap<String, Vec<usize>>,
    /// lowercased variant name -> entry indices
    variants: HashMap<String, Vec<usize>>,
    min_similarity: f64,
    max_candidates: usize,
}

impl NameResolver {
    pub fn new(mut entries: Vec<NameEntry>, min_similarity: f64, max_candidates: usize) -> Self {
        // Sorted entries make candidate ordering deterministic for equal scores.
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        let mut canonical: HashMap<String, Vec<usize>> = HashMap::new();
        let mut variants: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            canonical
                .entry(entry.name.to_lowercase())
                .or_default()
                .push(i);
            for variant in &entry.variants {
                variants.entry(variant.to_lowercase()).or_default().push(i);
            }
        }

        NameResolver {
            entries,
            canonical,
            variants,
            min_similarity,
            max_candidates,
        }
    }

    /// Ranked candidates for a free-text name, best first. Empty when
    /// nothing clears the similarity floor.
    pub fn resolve(&self, query: &str) -> Vec<Candidate> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        if let Some(indices) = self.canonical.get(&needle) {
            return self.collect(indices, EXACT_SCORE);
        }

        if let Some(indices) = self.variants.get(&needle) {
            return self.collect(indices, VARIANT_SCORE);
        }

        // Fuzzy scan: best similarity across canonical and variant names.
        let mut scored: Vec<Candidate> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let mut best = jaro_winkler(&entry.name.to_lowercase(), &needle);
                for variant in &entry.variants {
                    let s = jaro_winkler(&variant.to_lowercase(), &needle);
                    if s > best {
                        best = s;
                    }
                }
                if best >= self.min_similarity {
                    Some(Candidate {
                        id: entry.id.clone(),
                        name: entry.name.clone(),
                        score: best,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(self.max_candidates);
        scored
    }

    /// Resolve to exactly one candidate, failing on a miss or on several
    /// equally-ranked top candidates.
    pub fn resolve_one(&self, query: &str) -> std::result::Result<Candidate, ResolveFailure> {
        let mut candidates = self.resolve(query);
        match candidates.len() {
            0 => Err(ResolveFailure::NotFound),
            1 => Ok(candidates.remove(0)),
            _ => {
                let top = candidates[0].score;
                let tied: Vec<Candidate> = candidates
                    .iter()
                    .take_while(|c| (top - c.score).abs() < SCORE_EPSILON)
                    .cloned()
                    .collect();
                if tied.len() > 1 {
                    Err(ResolveFailure::Ambiguous(tied))
                } else {
                    Ok(candidates.remove(0))
                }
            }
        }
    }

    fn collect(&self, indices: &[usize], score: f64) -> Vec<Candidate> {
        indices
            .iter()
            .take(self.max_candidates)
            .map(|&i| Candidate {
                id: self.entries[i].id.clone(),
                name: self.entries[i].name.clone(),
                score,
            })
            .collect()
    }
}
