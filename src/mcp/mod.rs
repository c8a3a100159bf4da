//! MCP protocol layer: JSON-RPC 2.0 types, the stdio server loop, and the
//! graph tool definitions and handlers.

pub mod server;
pub mod tools;
pub mod types;

pub use server::McpServer;
