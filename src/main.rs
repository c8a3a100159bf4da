use anyhow::Result;
use std::path::Path;
use theomcp::db::{migrate, Db};
use theomcp::mcp::McpServer;
use theomcp::snapshot::{GraphSnapshot, SnapshotHandle};
use theomcp::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level.
    // For MCP server mode logs go to stderr (per MCP spec).
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info"),
    )
    .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => {
            // MCP server mode (stdio transport)
            run_mcp_server().await?;
        }
        "verify" | _ => {
            // Default: verify database schema and graph data
            run_schema_verification().await?;
        }
    }

    Ok(())
}

/// Run MCP server (stdio transport)
async fn run_mcp_server() -> Result<()> {
    let config = Config::load()?;

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    // The only I/O-bound step: build the immutable snapshot once, up front.
    // Every request afterwards is pure in-memory computation.
    let snapshot = GraphSnapshot::load(&db, &config).await?;

    let mut server = McpServer::new(SnapshotHandle::new(snapshot));
    server.run().await?;

    Ok(())
}

/// Run database schema verification
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting Theomcp v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    // Prove the snapshot actually loads
    let snapshot = GraphSnapshot::load(&db, &config).await?;
    log::info!(
        "Snapshot loaded: {} people, {} places, {} events, {} mentions",
        snapshot.person_count(),
        snapshot.place_count(),
        snapshot.event_count(),
        snapshot.mention_count()
    );

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use theomcp::error::TheomcpError;

    db.with_connection(|conn| {
        // Check tables
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = vec![
            "event_place_edges",
            "events",
            "family_edges",
            "mentions",
            "people",
            "person_event_edges",
            "places",
            "schema_migrations",
        ];
        let mut all_tables_exist = true;

        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            } else {
                log::debug!("✓ Table exists: {}", table);
            }
        }

        if !all_tables_exist {
            return Err(TheomcpError::Config(
                "Not all required tables exist".to_string(),
            ));
        }

        // Check indexes
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name",
        )?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index_name in ["idx_family_to", "idx_mentions_book", "idx_mentions_entity"] {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Index exists: {}", index_name);
            } else {
                log::warn!("Index not found: {}", index_name);
            }
        }

        // Check migrations
        let applied = migrate::get_applied_migrations(conn)?;
        if applied.len() < 2 {
            return Err(TheomcpError::Config(format!(
                "Expected at least 2 migrations, found {}",
                applied.len()
            )));
        }
        log::debug!("✓ {} migrations applied", applied.len());

        // Check pragmas
        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(TheomcpError::Config(format!(
                "Journal mode is not WAL: {}",
                journal_mode
            )));
        }
        log::debug!("✓ Journal mode: WAL");

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(TheomcpError::Config("Foreign keys not enabled".to_string()));
        }
        log::debug!("✓ Foreign keys enabled");

        // Integrity check
        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(TheomcpError::Config(format!(
                "Database integrity check failed: {}",
                integrity
            )));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    })
    .await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
