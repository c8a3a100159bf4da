use thiserror::Error;

/// Main error type for Theomcp
#[derive(Error, Debug)]
pub enum TheomcpError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No person matched the supplied name
    #[error("No person found matching '{0}'")]
    PersonNotFound(String),

    /// No place matched the supplied name
    #[error("No place found matching '{0}'")]
    PlaceNotFound(String),

    /// Several equally-ranked candidates matched when one was required
    #[error("Ambiguous name '{query}': candidates are {}", .candidates.join(", "))]
    AmbiguousName {
        query: String,
        candidates: Vec<String>,
    },

    /// The two persons are not connected in the graph (expected negative result)
    #[error("No relationship path found between '{0}' and '{1}'")]
    NoPathFound(String, String),

    /// Scripture reference could not be parsed or is unknown
    #[error("Unrecognized scripture reference: '{0}'")]
    ReferenceNotRecognized(String),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using TheomcpError
pub type Result<T> = std::result::Result<T, TheomcpError>;
