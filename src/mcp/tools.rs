use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, TheomcpError};
use crate::graph::{Direction, GenealogyEntry, Lineage, PathHop, PersonRef};
use crate::mcp::types::{ContentItem, Tool, ToolsCallResult};
use crate::snapshot::{GraphSnapshot, PassageEntities, PersonEvents, PlaceProfile};

/// Get all tool definitions for tools/list
pub fn get_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: "explore_genealogy".to_string(),
            description: "Trace a biblical person's family tree: ancestors, descendants, or both, \
                          with generation labels and immediate family."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "person": {
                        "type": "string",
                        "description": "Person's name (e.g. 'David', 'Abraham'). Variant spellings like 'Abram' are resolved."
                    },
                    "direction": {
                        "type": "string",
                        "enum": ["ancestors", "descendants", "both"],
                        "default": "both",
                        "description": "Which direction to trace"
                    },
                    "generations": {
                        "type": "integer",
                        "default": 5,
                        "minimum": 1,
                        "maximum": 50,
                        "description": "How many generations to include"
                    }
                },
                "required": ["person"]
            }),
        },
        Tool {
            name: "find_connection".to_string(),
            description: "Find the shortest relationship path between two biblical persons \
                          through parent, child, spouse and sibling links."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "person1": {
                        "type": "string",
                        "description": "First person's name"
                    },
                    "person2": {
                        "type": "string",
                        "description": "Second person's name"
                    }
                },
                "required": ["person1", "person2"]
            }),
        },
        Tool {
            name: "entities_in_passage".to_string(),
            description: "List the people, places and events mentioned in a passage \
                          (e.g. 'Genesis 15' or 'Romans 8:28'). Useful as a starting point \
                          for genealogy and connection queries."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "reference": {
                        "type": "string",
                        "description": "Bible reference: 'Genesis 15', 'John 3:16' or 'Romans 8:28-30'"
                    }
                },
                "required": ["reference"]
            }),
        },
        Tool {
            name: "explore_person_events".to_string(),
            description: "Chronological timeline of the recorded events in a biblical person's \
                          life, with locations."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "person": {
                        "type": "string",
                        "description": "Person's name"
                    }
                },
                "required": ["person"]
            }),
        },
        Tool {
            name: "explore_place".to_string(),
            description: "Biblical history of a location: the events recorded there and the \
                          people connected to it."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "place": {
                        "type": "string",
                        "description": "Place name (e.g. 'Bethlehem', 'Jerusalem')"
                    }
                },
                "required": ["place"]
            }),
        },
    ]
}

fn success(text: String) -> ToolsCallResult {
    ToolsCallResult {
        content: vec![ContentItem {
            content_type: "text".to_string(),
            text,
        }],
        is_error: None,
    }
}

fn tool_error(text: String) -> ToolsCallResult {
    ToolsCallResult {
        content: vec![ContentItem {
            content_type: "text".to_string(),
            text,
        }],
        is_error: Some(true),
    }
}

/// Genealogy parameters
#[derive(Debug, Deserialize)]
struct GenealogyParams {
    person: String,
    #[serde(default = "default_direction")]
    direction: String,
    #[serde(default = "default_generations")]
    generations: u32,
}

fn default_direction() -> String {
    "both".to_string()
}

fn default_generations() -> u32 {
    5
}

/// Handle explore_genealogy tool
pub fn handle_explore_genealogy(
    snapshot: &GraphSnapshot,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: GenealogyParams = serde_json::from_value(arguments.clone())
        .map_err(|e| TheomcpError::Config(format!("Invalid explore_genealogy params: {}", e)))?;

    let direction = match Direction::parse(&params.direction) {
        Ok(d) => d,
        Err(e) => return Ok(tool_error(e.to_string())),
    };

    match snapshot.explore_genealogy(&params.person, direction, params.generations) {
        Ok(report) => Ok(success(format_genealogy(&report, direction))),
        Err(e @ (TheomcpError::PersonNotFound(_) | TheomcpError::AmbiguousName { .. })) => {
            Ok(tool_error(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Connection parameters
#[derive(Debug, Deserialize)]
struct ConnectionParams {
    person1: String,
    person2: String,
}

/// Handle find_connection tool
pub fn handle_find_connection(
    snapshot: &GraphSnapshot,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: ConnectionParams = serde_json::from_value(arguments.clone())
        .map_err(|e| TheomcpError::Config(format!("Invalid find_connection params: {}", e)))?;

    match snapshot.find_connection(&params.person1, &params.person2) {
        Ok(path) => Ok(success(format_connection(&path))),
        // Disconnection is a legitimate negative result, not a tool failure
        Err(TheomcpError::NoPathFound(a, b)) => Ok(success(format!(
            "No relationship path found between {} and {}; they are not connected \
             through recorded parent, child, spouse or sibling links.",
            a, b
        ))),
        Err(e @ (TheomcpError::PersonNotFound(_) | TheomcpError::AmbiguousName { .. })) => {
            Ok(tool_error(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Passage parameters
#[derive(Debug, Deserialize)]
struct PassageParams {
    reference: String,
}

/// Handle entities_in_passage tool
pub fn handle_entities_in_passage(
    snapshot: &GraphSnapshot,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: PassageParams = serde_json::from_value(arguments.clone())
        .map_err(|e| TheomcpError::Config(format!("Invalid entities_in_passage params: {}", e)))?;

    match snapshot.entities_in_passage(&params.reference) {
        Ok(result) => Ok(success(format_passage_entities(&result))),
        Err(e @ TheomcpError::ReferenceNotRecognized(_)) => Ok(tool_error(e.to_string())),
        Err(e) => Err(e),
    }
}

/// Person-events parameters
#[derive(Debug, Deserialize)]
struct PersonEventsParams {
    person: String,
}

/// Handle explore_person_events tool
pub fn handle_explore_person_events(
    snapshot: &GraphSnapshot,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: PersonEventsParams = serde_json::from_value(arguments.clone())
        .map_err(|e| TheomcpError::Config(format!("Invalid explore_person_events params: {}", e)))?;

    match snapshot.person_events(&params.person) {
        Ok(result) => Ok(success(format_person_events(&result))),
        Err(e @ (TheomcpError::PersonNotFound(_) | TheomcpError::AmbiguousName { .. })) => {
            Ok(tool_error(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Place parameters
#[derive(Debug, Deserialize)]
struct PlaceParams {
    place: String,
}

/// Handle explore_place tool
pub fn handle_explore_place(
    snapshot: &GraphSnapshot,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: PlaceParams = serde_json::from_value(arguments.clone())
        .map_err(|e| TheomcpError::Config(format!("Invalid explore_place params: {}", e)))?;

    match snapshot.place_profile(&params.place) {
        Ok(profile) => Ok(success(format_place(&profile))),
        Err(e @ (TheomcpError::PlaceNotFound(_) | TheomcpError::AmbiguousName { .. })) => {
            Ok(tool_error(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

// =========================================================================
// Formatting
// =========================================================================

fn generation_lines(entries: &[GenealogyEntry], lineage: Lineage) -> Vec<String> {
    let mut by_generation: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for entry in entries {
        if entry.lineage == lineage {
            by_generation
                .entry(entry.generation)
                .or_default()
                .push(entry.person.name.clone());
        }
    }
    by_generation
        .into_iter()
        .map(|(generation, names)| format!("- Generation {}: {}", generation, names.join(", ")))
        .collect()
}

fn names(refs: &[PersonRef]) -> String {
    refs.iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_genealogy(report: &crate::snapshot::GenealogyReport, direction: Direction) -> String {
    let mut out = format!("## Family Tree of {}\n\n", report.tree.focal.name);

    if matches!(direction, Direction::Ancestors | Direction::Both) {
        out.push_str("### Ancestors\n");
        let lines = generation_lines(&report.tree.entries, Lineage::Ancestor);
        if lines.is_empty() {
            out.push_str("No recorded ancestors.\n");
        } else {
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push('\n');
    }

    if matches!(direction, Direction::Descendants | Direction::Both) {
        out.push_str("### Descendants\n");
        let lines = generation_lines(&report.tree.entries, Lineage::Descendant);
        if lines.is_empty() {
            out.push_str("No recorded descendants.\n");
        } else {
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push('\n');
    }

    let mut family_lines = Vec::new();
    if !report.family.parents.is_empty() {
        family_lines.push(format!("**Parents**: {}", names(&report.family.parents)));
    }
    if !report.family.spouses.is_empty() {
        family_lines.push(format!("**Spouse(s)**: {}", names(&report.family.spouses)));
    }
    if !report.family.siblings.is_empty() {
        family_lines.push(format!("**Siblings**: {}", names(&report.family.siblings)));
    }
    if !report.family.children.is_empty() {
        family_lines.push(format!("**Children**: {}", names(&report.family.children)));
    }
    if !family_lines.is_empty() {
        out.push_str("### Immediate Family\n");
        out.push_str(&family_lines.join("\n"));
        out.push_str("\n\n");
    }

    if let Some(description) = &report.description {
        out.push_str("### About\n");
        out.push_str(description);
        out.push_str("\n\n");
    }

    if report.tree.truncated {
        out.push_str("Note: the tree was truncated at the traversal limit.\n");
    }
    if report.tree.cycle_branches > 0 {
        out.push_str(
            "Note: the source data contains a parentage loop here; the affected branch was cut.\n",
        );
    }

    out
}

fn format_connection(path: &[PathHop]) -> String {
    let first = match path.first() {
        Some(hop) => &hop.person.name,
        None => return "Empty path.".to_string(),
    };
    let last = &path[path.len() - 1].person.name;

    if path.len() == 1 {
        return format!("{} and {} are the same person.\n", first, last);
    }

    let mut out = format!("## Relationship Path: {} to {}\n\n", first, last);
    let mut previous = first.as_str();
    for (i, hop) in path.iter().enumerate() {
        match hop.relation {
            None => out.push_str(&format!("{}. {}\n", i + 1, hop.person.name)),
            Some(relation) => out.push_str(&format!(
                "{}. {} ({} of {})\n",
                i + 1,
                hop.person.name,
                relation.label(),
                previous
            )),
        }
        previous = hop.person.name.as_str();
    }
    out.push_str(&format!("\nPath length: {} relationship(s).\n", path.len() - 1));
    out
}

fn format_passage_entities(result: &PassageEntities) -> String {
    let mut out = format!("## Entities in {}\n\n", result.reference);

    if result.people.is_empty() && result.places.is_empty() && result.events.is_empty() {
        out.push_str("No recorded entities for this passage.\n");
        return out;
    }

    for (header, summaries) in [
        ("### People", &result.people),
        ("### Places", &result.places),
        ("### Events", &result.events),
    ] {
        if summaries.is_empty() {
            continue;
        }
        out.push_str(header);
        out.push('\n');
        for summary in summaries {
            match &summary.detail {
                Some(detail) => {
                    out.push_str(&format!("- **{}**: {}\n", summary.name, truncate(detail, 200)))
                }
                None => out.push_str(&format!("- **{}**\n", summary.name)),
            }
        }
        out.push('\n');
    }

    out
}

fn format_person_events(result: &PersonEvents) -> String {
    let mut out = format!("## Events in the Life of {}\n\n", result.person.name);

    if result.events.is_empty() {
        out.push_str("No recorded events for this person.\n");
        return out;
    }

    for (i, event) in result.events.iter().enumerate() {
        out.push_str(&format!("{}. {}", i + 1, event.title));
        if let Some(year) = event.start_year {
            out.push_str(&format!(" ({})", year_label(year)));
        } else if let Some(era) = &event.era {
            out.push_str(&format!(" ({})", era));
        }
        if !event.places.is_empty() {
            out.push_str(&format!(" - at {}", event.places.join(", ")));
        }
        out.push('\n');
    }

    out
}

fn format_place(profile: &PlaceProfile) -> String {
    let mut out = format!("## {}\n", profile.name);
    if let (Some(lat), Some(lon)) = (profile.latitude, profile.longitude) {
        out.push_str(&format!("Coordinates: {:.2}, {:.2}\n", lat, lon));
    }
    out.push('\n');

    if profile.events.is_empty() {
        out.push_str("No recorded events at this place.\n");
    } else {
        out.push_str("### Events Here\n");
        for (i, event) in profile.events.iter().enumerate() {
            out.push_str(&format!("{}. {}", i + 1, event.title));
            if let Some(year) = event.start_year {
                out.push_str(&format!(" ({})", year_label(year)));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !profile.people.is_empty() {
        out.push_str(&format!(
            "### People Connected to {}\n{}\n",
            profile.name,
            names(&profile.people)
        ));
    }

    out
}

/// Render a signed year as a BC/AD label.
fn year_label(year: i32) -> String {
    if year < 0 {
        format!("c. {} BC", -year)
    } else {
        format!("c. {} AD", year)
    }
}

/// Truncate display text without splitting a multi-byte UTF-8 char.
fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let safe_end = (0..=max_len)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    &text[..safe_end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::passage::PassageIndex;
    use crate::store::testutil::davidic_line;

    fn snapshot() -> GraphSnapshot {
        GraphSnapshot::from_parts(davidic_line(), PassageIndex::new(vec![]), GraphConfig::default())
    }

    #[test]
    fn test_tool_definitions_complete() {
        let tools = get_tool_definitions();
        let tool_names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            tool_names,
            vec![
                "explore_genealogy",
                "find_connection",
                "entities_in_passage",
                "explore_person_events",
                "explore_place"
            ]
        );
        for tool in &tools {
            assert!(tool.input_schema.get("properties").is_some());
        }
    }

    #[test]
    fn test_handle_explore_genealogy() {
        let snap = snapshot();
        let result = handle_explore_genealogy(
            &snap,
            &json!({"person": "David", "direction": "ancestors", "generations": 5}),
        )
        .unwrap();
        assert!(result.is_error.is_none());
        let text = &result.content[0].text;
        assert!(text.contains("Family Tree of David"));
        assert!(text.contains("Generation 1: Jesse"));
        assert!(text.contains("Generation 2: Obed"));
        assert!(text.contains("Generation 3: Boaz, Ruth"));
        assert!(text.contains("**Siblings**: Eliab"));
    }

    #[test]
    fn test_handle_explore_genealogy_unknown_person() {
        let snap = snapshot();
        let result =
            handle_explore_genealogy(&snap, &json!({"person": "Nebuchadnezzar"})).unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains("No person found"));
    }

    #[test]
    fn test_handle_explore_genealogy_bad_direction() {
        let snap = snapshot();
        let result = handle_explore_genealogy(
            &snap,
            &json!({"person": "David", "direction": "sideways"}),
        )
        .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_handle_find_connection() {
        let snap = snapshot();
        let result =
            handle_find_connection(&snap, &json!({"person1": "Ruth", "person2": "Jesus"}))
                .unwrap();
        assert!(result.is_error.is_none());
        let text = &result.content[0].text;
        assert!(text.contains("1. Ruth"));
        assert!(text.contains("2. Obed (child of Ruth)"));
        assert!(text.contains("Path length: 5 relationship(s)."));
    }

    #[test]
    fn test_handle_find_connection_disconnected() {
        let snap = snapshot();
        let result =
            handle_find_connection(&snap, &json!({"person1": "David", "person2": "Orpah"}))
                .unwrap();
        // A disconnection is an answer, not a tool failure
        assert!(result.is_error.is_none());
        assert!(result.content[0].text.contains("No relationship path"));
    }

    #[test]
    fn test_handle_find_connection_same_person() {
        let snap = snapshot();
        let result =
            handle_find_connection(&snap, &json!({"person1": "David", "person2": "David"}))
                .unwrap();
        assert!(result.content[0].text.contains("same person"));
    }

    #[test]
    fn test_handle_entities_in_passage_bad_reference() {
        let snap = snapshot();
        let result =
            handle_entities_in_passage(&snap, &json!({"reference": "gibberish"})).unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_handle_explore_person_events() {
        let snap = snapshot();
        let result = handle_explore_person_events(&snap, &json!({"person": "David"})).unwrap();
        let text = &result.content[0].text;
        assert!(text.contains("Anointing of David"));
        assert!(text.contains("c. 1025 BC"));
        assert!(text.contains("at Bethlehem"));
    }

    #[test]
    fn test_handle_explore_place() {
        let snap = snapshot();
        let result = handle_explore_place(&snap, &json!({"place": "Bethlehem"})).unwrap();
        let text = &result.content[0].text;
        assert!(text.contains("## Bethlehem"));
        assert!(text.contains("Anointing of David"));
        assert!(text.contains("David, Jesse"));
    }

    #[test]
    fn test_missing_required_param_is_config_error() {
        let snap = snapshot();
        let err = handle_find_connection(&snap, &json!({"person1": "Ruth"})).unwrap_err();
        assert!(matches!(err, TheomcpError::Config(_)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "αβγδε";
        let cut = truncate(text, 3);
        assert!(cut.len() <= 3);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn test_year_label() {
        assert_eq!(year_label(-1025), "c. 1025 BC");
        assert_eq!(year_label(30), "c. 30 AD");
    }
}
