use theomcp::db::Db;
use theomcp::error::TheomcpError;
use theomcp::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    println!("\n=== Theographic Graph Statistics ===\n");

    let counts = db
        .with_connection(|conn| {
            let tables = [
                ("People", "people"),
                ("Places", "places"),
                ("Events", "events"),
                ("Family relationships", "family_edges"),
                ("Person-event links", "person_event_edges"),
                ("Event-place links", "event_place_edges"),
                ("Mention ranges", "mentions"),
            ];
            let mut counts = Vec::new();
            for (label, table) in tables {
                let count: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
                counts.push((label, count));
            }
            Ok::<Vec<_>, TheomcpError>(counts)
        })
        .await?;

    println!("{:-<40}", "");
    println!("{:<28} {:>10}", "Table", "Rows");
    println!("{:-<40}", "");
    for (label, count) in &counts {
        println!("{:<28} {:>10}", label, count);
    }
    println!("{:-<40}", "");

    // Largest recorded families
    let top_parents = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT p.name, COUNT(*) as child_count
                FROM family_edges fe
                JOIN people p ON p.id = fe.from_person
                WHERE fe.relationship = 'parent_of'
                GROUP BY fe.from_person
                ORDER BY child_count DESC, p.name
                LIMIT 5
                "#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok::<Vec<_>, TheomcpError>(results)
        })
        .await?;

    if !top_parents.is_empty() {
        println!("\nLargest recorded families:");
        for (name, children) in &top_parents {
            println!("  {:<24} {:>3} children", name, children);
        }
    }

    // Most widely mentioned entities
    let top_mentioned = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT entity_kind, entity_id, COUNT(*) as mention_count
                FROM mentions
                GROUP BY entity_kind, entity_id
                ORDER BY mention_count DESC, entity_id
                LIMIT 5
                "#,
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;
            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok::<Vec<_>, TheomcpError>(results)
        })
        .await?;

    if !top_mentioned.is_empty() {
        println!("\nMost widely mentioned entities:");
        for (kind, id, count) in &top_mentioned {
            println!("  {:<8} {:<24} {:>4} mention ranges", kind, id, count);
        }
    }

    println!();

    Ok(())
}
