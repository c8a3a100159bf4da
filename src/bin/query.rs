use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::Instant;
use theomcp::db::{migrate, Db};
use theomcp::graph::{Direction, Lineage};
use theomcp::snapshot::GraphSnapshot;
use theomcp::Config;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Run one-off graph queries against the Theographic snapshot")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trace a person's family tree
    Genealogy {
        person: String,
        /// ancestors, descendants or both
        #[arg(short, long, default_value = "both")]
        direction: String,
        #[arg(short, long, default_value_t = 5)]
        generations: u32,
    },
    /// Shortest relationship path between two persons
    Connection { person1: String, person2: String },
    /// Entities mentioned in a passage
    Passage { reference: String },
    /// Timeline of a person's recorded events
    Events { person: String },
    /// Events at a place and the people connected to it
    Place { place: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    let load_start = Instant::now();
    let snapshot = GraphSnapshot::load(&db, &config).await?;
    log::info!("Snapshot loaded in {:?}", load_start.elapsed());

    let query_start = Instant::now();

    match args.command {
        Command::Genealogy {
            person,
            direction,
            generations,
        } => {
            let direction = Direction::parse(&direction)?;
            let report = snapshot.explore_genealogy(&person, direction, generations)?;

            println!("\nFamily tree of {}", report.tree.focal.name);
            for entry in &report.tree.entries {
                let lineage = match entry.lineage {
                    Lineage::Focal => "focal",
                    Lineage::Ancestor => "ancestor",
                    Lineage::Descendant => "descendant",
                };
                println!(
                    "  gen {:>2}  {:<12}  {}",
                    entry.generation, lineage, entry.person.name
                );
            }
            if !report.family.spouses.is_empty() {
                let spouses: Vec<&str> = report
                    .family
                    .spouses
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect();
                println!("  spouses: {}", spouses.join(", "));
            }
            if report.tree.truncated {
                println!("  (truncated at the traversal limit)");
            }
        }
        Command::Connection { person1, person2 } => {
            let path = snapshot.find_connection(&person1, &person2)?;
            println!();
            for (i, hop) in path.iter().enumerate() {
                match hop.relation {
                    None => println!("  {}. {}", i + 1, hop.person.name),
                    Some(relation) => {
                        println!("  {}. {} ({})", i + 1, hop.person.name, relation.label())
                    }
                }
            }
            println!("\n  Path length: {} relationship(s)", path.len() - 1);
        }
        Command::Passage { reference } => {
            let result = snapshot.entities_in_passage(&reference)?;
            println!("\nEntities in {}:", result.reference);
            for (label, summaries) in [
                ("People", &result.people),
                ("Places", &result.places),
                ("Events", &result.events),
            ] {
                if summaries.is_empty() {
                    continue;
                }
                println!("  {}:", label);
                for summary in summaries {
                    println!("    - {} ({})", summary.name, summary.id);
                }
            }
            if result.people.is_empty() && result.places.is_empty() && result.events.is_empty() {
                println!("  (none recorded)");
            }
        }
        Command::Events { person } => {
            let result = snapshot.person_events(&person)?;
            println!("\nEvents in the life of {}:", result.person.name);
            if result.events.is_empty() {
                println!("  (none recorded)");
            }
            for event in &result.events {
                let year = event
                    .start_year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "?".to_string());
                let places = if event.places.is_empty() {
                    String::new()
                } else {
                    format!("  at {}", event.places.join(", "))
                };
                println!("  [{:>6}] {}{}", year, event.title, places);
            }
        }
        Command::Place { place } => {
            let profile = snapshot.place_profile(&place)?;
            println!("\n{}", profile.name);
            if let (Some(lat), Some(lon)) = (profile.latitude, profile.longitude) {
                println!("  coordinates: {:.2}, {:.2}", lat, lon);
            }
            println!("  events: {}", profile.events.len());
            for event in &profile.events {
                println!("    - {}", event.title);
            }
            if !profile.people.is_empty() {
                let people: Vec<&str> = profile.people.iter().map(|p| p.name.as_str()).collect();
                println!("  people: {}", people.join(", "));
            }
        }
    }

    println!("\nLatency: {:?}", query_start.elapsed());

    Ok(())
}
