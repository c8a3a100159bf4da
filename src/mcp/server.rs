use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};

use crate::error::{Result, TheomcpError};
use crate::mcp::tools;
use crate::mcp::types::*;
use crate::snapshot::SnapshotHandle;

/// MCP Server implementation (stdio transport).
///
/// Holds the snapshot handle rather than the snapshot itself: every
/// tools/call clones the current `Arc` once, so an out-of-band data refresh
/// can swap in a rebuilt graph without touching requests in flight.
pub struct McpServer {
    snapshot: SnapshotHandle,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(snapshot: SnapshotHandle) -> Self {
        Self { snapshot }
    }

    /// Process an MCP JSON-RPC request.
    ///
    /// # Returns
    /// * `Ok(Some(response))` - Response to send back to client
    /// * `Ok(None)` - Notification (no response needed)
    /// * `Err(e)` - Error processing request
    pub async fn process_mcp_request(
        &self,
        request: JsonRpcRequest,
        initialized: &mut bool,
    ) -> Result<Option<JsonRpcResponse>> {
        // Handle notifications (no ID) - don't send response
        let id = match &request.id {
            Some(id) => id.clone(),
            None => {
                if request.method == "notifications/initialized" {
                    *initialized = true;
                }
                return Ok(None);
            }
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(&id, &request.params),
            "tools/list" => self.handle_tools_list(&id),
            "tools/call" => self.handle_tools_call(&id, &request.params),
            "shutdown" => self.handle_shutdown(&id),
            _ => self.handle_error(
                &id,
                error_codes::METHOD_NOT_FOUND,
                &format!("Unknown method: {}", request.method),
            ),
        };

        match response {
            Ok(resp) => Ok(Some(resp)),
            Err(e) => {
                // Convert handler error to JSON-RPC error response
                Ok(Some(JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: id.into(),
                    payload: JsonRpcResponsePayload::Error {
                        error: JsonRpcError {
                            code: error_codes::INTERNAL_ERROR,
                            message: format!("Internal error: {}", e),
                            data: Some(serde_json::json!({ "details": e.to_string() })),
                        },
                    },
                }))
            }
        }
    }

    /// Run the MCP server (reads from stdin, writes to stdout)
    pub async fn run(&mut self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdin_reader = AsyncBufReader::new(stdin);
        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();

        let mut line = String::new();
        let mut initialized = false;

        // Log to stderr (per MCP spec)
        let _ = stderr
            .write_all(
                format!("Theomcp MCP Server v{} starting...\n", env!("CARGO_PKG_VERSION"))
                    .as_bytes(),
            )
            .await;

        loop {
            line.clear();
            let bytes_read = stdin_reader.read_line(&mut line).await.map_err(|e| {
                TheomcpError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to read from stdin: {}", e),
                ))
            })?;

            // EOF - client disconnected
            if bytes_read == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(req) => req,
                Err(e) => {
                    // Send parse error response if we have an ID
                    if let Some(id) = extract_id_from_line(trimmed) {
                        let error_response = JsonRpcResponse {
                            jsonrpc: "2.0".to_string(),
                            id,
                            payload: JsonRpcResponsePayload::Error {
                                error: JsonRpcError {
                                    code: error_codes::PARSE_ERROR,
                                    message: format!("Parse error: {}", e),
                                    data: None,
                                },
                            },
                        };
                        send_response(&mut stdout, &error_response).await?;
                    }
                    continue;
                }
            };

            match self.process_mcp_request(request, &mut initialized).await {
                Ok(Some(response)) => {
                    send_response(&mut stdout, &response).await?;
                }
                Ok(None) => {
                    if initialized {
                        let _ = stderr.write_all(b"Client initialized\n").await;
                    }
                }
                Err(e) => {
                    log::error!("Unexpected error in process_mcp_request: {}", e);
                }
            }
        }

        let _ = stderr.write_all(b"MCP server shutting down\n").await;
        Ok(())
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: &JsonRpcId, params: &Option<Value>) -> Result<JsonRpcResponse> {
        let params: InitializeParams =
            serde_json::from_value(params.clone().unwrap_or(serde_json::json!({})))
                .map_err(|e| TheomcpError::McpProtocol(format!("Invalid initialize params: {}", e)))?;

        // Support protocol version 2024-11-05 and 2025-06-18
        let protocol_version = if params.protocol_version.starts_with("2024")
            || params.protocol_version.starts_with("2025")
        {
            "2024-11-05".to_string()
        } else {
            params.protocol_version.clone()
        };

        let result = InitializeResult {
            protocol_version,
            capabilities: serde_json::json!({
                "tools": {}
            }),
            server_info: ServerInfo {
                name: "theomcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        self.result_response(id, serde_json::to_value(&result))
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: &JsonRpcId) -> Result<JsonRpcResponse> {
        let tools = tools::get_tool_definitions();
        let result = ToolsListResult { tools };
        self.result_response(id, serde_json::to_value(&result))
    }

    /// Handle tools/call request
    fn handle_tools_call(&self, id: &JsonRpcId, params: &Option<Value>) -> Result<JsonRpcResponse> {
        let params: ToolsCallParams = serde_json::from_value(
            params
                .clone()
                .ok_or_else(|| TheomcpError::McpProtocol("Missing params for tools/call".to_string()))?,
        )
        .map_err(|e| TheomcpError::McpProtocol(format!("Invalid tools/call params: {}", e)))?;

        let snapshot = self.snapshot.current();

        let result = match params.name.as_str() {
            "explore_genealogy" => tools::handle_explore_genealogy(&snapshot, &params.arguments)?,
            "find_connection" => tools::handle_find_connection(&snapshot, &params.arguments)?,
            "entities_in_passage" => {
                tools::handle_entities_in_passage(&snapshot, &params.arguments)?
            }
            "explore_person_events" => {
                tools::handle_explore_person_events(&snapshot, &params.arguments)?
            }
            "explore_place" => tools::handle_explore_place(&snapshot, &params.arguments)?,
            _ => {
                return Ok(JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: id.clone().into(),
                    payload: JsonRpcResponsePayload::Error {
                        error: JsonRpcError {
                            code: error_codes::INVALID_PARAMS,
                            message: format!("Unknown tool: {}", params.name),
                            data: None,
                        },
                    },
                });
            }
        };

        self.result_response(id, serde_json::to_value(&result))
    }

    /// Handle shutdown request
    fn handle_shutdown(&self, id: &JsonRpcId) -> Result<JsonRpcResponse> {
        Ok(JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: id.clone().into(),
            payload: JsonRpcResponsePayload::Result {
                result: serde_json::json!(null),
            },
        })
    }

    /// Create error response
    fn handle_error(&self, id: &JsonRpcId, code: i32, message: &str) -> Result<JsonRpcResponse> {
        Ok(JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: id.clone().into(),
            payload: JsonRpcResponsePayload::Error {
                error: JsonRpcError {
                    code,
                    message: message.to_string(),
                    data: None,
                },
            },
        })
    }

    fn result_response(
        &self,
        id: &JsonRpcId,
        result: serde_json::Result<Value>,
    ) -> Result<JsonRpcResponse> {
        Ok(JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: id.clone().into(),
            payload: JsonRpcResponsePayload::Result {
                result: result
                    .map_err(|e| TheomcpError::McpProtocol(format!("JSON serialization error: {}", e)))?,
            },
        })
    }
}

/// Send JSON-RPC response to stdout (newline-delimited)
async fn send_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| TheomcpError::McpProtocol(format!("JSON serialization error: {}", e)))?;
    stdout.write_all(json.as_bytes()).await.map_err(TheomcpError::Io)?;
    stdout.write_all(b"\n").await.map_err(TheomcpError::Io)?;
    stdout.flush().await.map_err(TheomcpError::Io)?;
    Ok(())
}

/// Extract ID from JSON line (for error handling)
fn extract_id_from_line(line: &str) -> Option<Value> {
    // Try to extract ID field from malformed JSON
    if let Some(id_start) = line.find(r#""id":"#) {
        let id_str = &line[id_start + 5..];
        if let Some(id_end) = id_str.find(',') {
            let id_val = id_str[..id_end].trim();
            if id_val.starts_with('"') && id_val.ends_with('"') {
                return Some(Value::String(id_val[1..id_val.len() - 1].to_string()));
            } else if let Ok(num) = id_val.parse::<i64>() {
                return Some(Value::Number(num.into()));
            }
        }
    }
    None
}
