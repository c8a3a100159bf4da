//! Typed relationship graph: adjacency index, genealogy traversal, and
//! shortest-path search over the person graph.
//!
//! All algorithms here run against the pre-built [`GraphIndex`] only; they
//! never consult the entity store or the database mid-traversal.

mod index;
mod path;
mod traversal;

pub use index::{GraphIndex, ImmediateFamily};
pub use path::{find_path, PathHop};
pub use traversal::{traverse, GenealogyEntry, GenealogyTree, Lineage};

use serde::Serialize;

use crate::error::{Result, TheomcpError};

/// A (person id, display name) pair as returned by graph queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
}

/// Traversal direction for genealogy queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ancestors,
    Descendants,
    Both,
}

impl Direction {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ancestors" => Ok(Direction::Ancestors),
            "descendants" => Ok(Direction::Descendants),
            "both" => Ok(Direction::Both),
            other => Err(TheomcpError::InvalidInput(format!(
                "direction must be 'ancestors', 'descendants' or 'both', got '{}'",
                other
            ))),
        }
    }
}

/// Relationship used to reach a person during path search.
///
/// Declaration order is the fixed edge-exploration order (parent, child,
/// spouse, sibling), which is the tie-break between equal-length paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Parent,
    Child,
    Spouse,
    Sibling,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::Parent,
        RelationKind::Child,
        RelationKind::Spouse,
        RelationKind::Sibling,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RelationKind::Parent => "parent",
            RelationKind::Child => "child",
            RelationKind::Spouse => "spouse",
            RelationKind::Sibling => "sibling",
        }
    }
}
