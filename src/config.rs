use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub theomcp: TheomcpConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Theomcp-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TheomcpConfig {
    /// Path to the SQLite snapshot holding the Theographic graph data.
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Graph query limits and name-matching thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Upper bound on requested generations; requests above it are clamped.
    #[serde(default = "default_max_generations")]
    pub max_generations: u32,
    /// Hard cap on visited persons per traversal or path search.
    #[serde(default = "default_max_frontier")]
    pub max_frontier: usize,
    /// Minimum Jaro-Winkler similarity for a fuzzy name candidate.
    #[serde(default = "default_fuzzy_min_similarity")]
    pub fuzzy_min_similarity: f64,
    /// Maximum number of fuzzy candidates returned per lookup.
    #[serde(default = "default_fuzzy_max_candidates")]
    pub fuzzy_max_candidates: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            max_generations: default_max_generations(),
            max_frontier: default_max_frontier(),
            fuzzy_min_similarity: default_fuzzy_min_similarity(),
            fuzzy_max_candidates: default_fuzzy_max_candidates(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_generations() -> u32 {
    50
}

fn default_max_frontier() -> usize {
    25_000
}

fn default_fuzzy_min_similarity() -> f64 {
    0.82
}

fn default_fuzzy_max_candidates() -> usize {
    5
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in THEOMCP_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("THEOMCP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.graph.max_generations == 0 || self.graph.max_generations > 50 {
            anyhow::bail!(
                "graph.max_generations must be between 1 and 50, got {}",
                self.graph.max_generations
            );
        }

        if self.graph.max_frontier == 0 {
            anyhow::bail!("graph.max_frontier must be greater than 0");
        }

        if self.graph.fuzzy_min_similarity <= 0.0 || self.graph.fuzzy_min_similarity > 1.0 {
            anyhow::bail!("graph.fuzzy_min_similarity must be in (0.0, 1.0]");
        }

        if self.graph.fuzzy_max_candidates == 0 {
            anyhow::bail!("graph.fuzzy_max_candidates must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.theomcp.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(temp_dir: &TempDir, body: &str) -> PathBuf {
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, body).unwrap();
        config_path
    }

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("THEOMCP_CONFIG").ok();
        std::env::set_var("THEOMCP_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("THEOMCP_CONFIG");
        if let Some(val) = original {
            std::env::set_var("THEOMCP_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(
            &temp_dir,
            r#"
[theomcp]
db_path = "./db/theographic.db"
log_level = "debug"

[graph]
max_generations = 10
max_frontier = 5000
fuzzy_min_similarity = 0.9
fuzzy_max_candidates = 3
"#,
        );
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.theomcp.log_level, "debug");
            assert_eq!(config.graph.max_generations, 10);
            assert_eq!(config.graph.fuzzy_max_candidates, 3);
        });
    }

    #[test]
    fn test_config_graph_defaults() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(
            &temp_dir,
            r#"
[theomcp]
db_path = "./db/theographic.db"
"#,
        );
        with_config_env(&config_path, || {
            let config = Config::load().unwrap();
            assert_eq!(config.graph.max_generations, 50);
            assert_eq!(config.graph.max_frontier, 25_000);
            assert!(config.graph.fuzzy_min_similarity > 0.0);
            assert_eq!(config.theomcp.log_level, "info");
        });
    }

    #[test]
    fn test_config_rejects_excessive_generations() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(
            &temp_dir,
            r#"
[theomcp]
db_path = "./db/theographic.db"

[graph]
max_generations = 500
"#,
        );
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config
                .unwrap_err()
                .to_string()
                .contains("max_generations"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("THEOMCP_CONFIG").ok();
        std::env::set_var("THEOMCP_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("THEOMCP_CONFIG");
        if let Some(v) = original {
            std::env::set_var("THEOMCP_CONFIG", v);
        }
    }
}
