//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! Requests arrive one per line on stdin and responses leave one per line on
//! stdout. Tool failures are reported inside a successful JSON-RPC response
//! as a tool result with `isError: true` and a structured error body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};
use crate::error::McpError;

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null if notification, always present per JSON-RPC 2.0).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// The server name identifier.
    pub name: String,
    /// The server version string.
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change dynamically.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// The MCP protocol version supported.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: Capabilities,
    /// Server identification information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Unique tool name (used in tool calls).
    pub name: String,
    /// Human-readable description of the tool.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// The name of the tool to invoke.
    pub name: String,
    /// Optional arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// The content type (e.g., "text").
    #[serde(rename = "type")]
    pub content_type: String,
    /// The text content of the result.
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// The result content items.
    pub content: Vec<ToolResultContent>,
    /// Whether the result represents an error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
///
/// Handles JSON-RPC 2.0 messages over stdin/stdout for MCP protocol
/// communication with clients.
pub struct McpServer {
    /// Shared application state.
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Lines of Thought server starting...");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Only send response if not a notification (per JSON-RPC 2.0 spec)
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                stdout.write_all(response_json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request.
    ///
    /// Returns `None` for notifications (requests without id).
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Check if this is a notification (no id = no response required)
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" => {
                // Notification - no response per JSON-RPC 2.0
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                // Notification - no response
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                // For unknown methods, only respond if it's a request (has id)
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "lines-of-thought".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        let tools = all_tools();

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": tools
            }),
        )
    }

    /// Handle tools/call request
    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let outcome = handle_tool_call(&self.state, &params.name, params.arguments)
            .await
            .and_then(|result| serde_json::to_string_pretty(&result).map_err(McpError::Json));

        let (text, is_error) = match outcome {
            Ok(text) => (text, None),
            Err(e) => {
                if let McpError::Json(ref inner) = e {
                    error!(error = %inner, tool = %params.name, "Failed to serialize tool result");
                } else {
                    debug!(error = %e, tool = %params.name, "Tool call rejected");
                }
                (e.to_payload().to_string(), Some(true))
            }
        };

        let content = ToolResultContent {
            content_type: "text".to_string(),
            text,
        };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id.clone(), -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// Every tool the server exposes, in `tools/list` order.
pub fn all_tools() -> Vec<Tool> {
    vec![
        // Writes
        get_thought_create_tool(),
        get_branch_create_tool(),
        get_thought_delete_tool(),
        get_branch_delete_tool(),
        // Traversal
        get_thought_get_tool(),
        get_thought_neighbors_tool(),
        get_thought_neighbors_batch_tool(),
        get_thought_subgraph_tool(),
        get_thought_branches_tool(),
        // Listing and search
        get_thought_list_tool(),
        get_thought_search_tool(),
    ]
}

/// Schema for tools that take a single `id`.
fn id_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "id": {
                "type": "string",
                "description": description
            }
        },
        "required": ["id"],
        "additionalProperties": false
    })
}

/// Get the thought creation tool definition
fn get_thought_create_tool() -> Tool {
    Tool {
        name: "thought_create".to_string(),
        description: "Create a thought, optionally branching from a parent. The candidate is checked for near-duplicates, moderated, and (with a parent) scored for argument strength before it is stored.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": 5000,
                    "description": "The thought itself"
                },
                "parent_id": {
                    "type": "string",
                    "description": "Thought to branch from (omit for a top-level thought)"
                },
                "perspective": {
                    "type": "string",
                    "maxLength": 500,
                    "description": "Viewpoint label for the branch (requires parent_id)"
                },
                "is_root": {
                    "type": "boolean",
                    "description": "Set false to create a parentless thought that is not listed as top-level"
                }
            },
            "required": ["text"],
            "additionalProperties": false
        }),
    }
}

/// Get the standalone branch tool definition
fn get_branch_create_tool() -> Tool {
    Tool {
        name: "branch_create".to_string(),
        description: "Link an existing parentless, non-root thought under a parent. The new branch is scored for argument strength.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "parent_id": {
                    "type": "string",
                    "description": "Source thought"
                },
                "child_id": {
                    "type": "string",
                    "description": "Target thought (must not already have a parent)"
                },
                "perspective": {
                    "type": "string",
                    "maxLength": 500,
                    "description": "Viewpoint label for the branch"
                }
            },
            "required": ["parent_id", "child_id"],
            "additionalProperties": false
        }),
    }
}

/// Get the thought deletion tool definition
fn get_thought_delete_tool() -> Tool {
    Tool {
        name: "thought_delete".to_string(),
        description: "Delete a thought and every branch touching it. Deleting a missing thought reports 0.".to_string(),
        input_schema: id_schema("Thought to delete"),
    }
}

/// Get the branch deletion tool definition
fn get_branch_delete_tool() -> Tool {
    Tool {
        name: "branch_delete".to_string(),
        description: "Delete a single branch. Deleting a missing branch reports 0.".to_string(),
        input_schema: id_schema("Branch to delete"),
    }
}

/// Get the single thought tool definition
fn get_thought_get_tool() -> Tool {
    Tool {
        name: "thought_get".to_string(),
        description: "Fetch a single thought.".to_string(),
        input_schema: id_schema("Thought ID"),
    }
}

/// Get the neighbourhood tool definition
fn get_thought_neighbors_tool() -> Tool {
    Tool {
        name: "thought_neighbors".to_string(),
        description: "Fetch a thought with its direct children, its parent, and the connecting branches.".to_string(),
        input_schema: id_schema("Thought ID"),
    }
}

/// Get the batch neighbourhood tool definition
fn get_thought_neighbors_batch_tool() -> Tool {
    Tool {
        name: "thought_neighbors_batch".to_string(),
        description: "Fetch several thoughts with their neighbours in one call. Nodes and branches are deduplicated; unknown IDs are skipped.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "maxItems": 100,
                    "description": "Thought IDs"
                }
            },
            "required": ["ids"],
            "additionalProperties": false
        }),
    }
}

/// Get the subgraph tool definition
fn get_thought_subgraph_tool() -> Tool {
    Tool {
        name: "thought_subgraph".to_string(),
        description: "Fetch every thought reachable from a root, at any depth, with the branches among them.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "root_id": {
                    "type": "string",
                    "description": "Thought to start from"
                }
            },
            "required": ["root_id"],
            "additionalProperties": false
        }),
    }
}

/// Get the outgoing branches tool definition
fn get_thought_branches_tool() -> Tool {
    Tool {
        name: "thought_branches".to_string(),
        description: "List the branches leaving a thought, oldest first.".to_string(),
        input_schema: id_schema("Thought ID"),
    }
}

/// Get the listing tool definition
fn get_thought_list_tool() -> Tool {
    Tool {
        name: "thought_list".to_string(),
        description: "List top-level thoughts, newest first, with the total count.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "skip": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Number of thoughts to skip (default: 0)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Page size (default: 9)"
                }
            },
            "additionalProperties": false
        }),
    }
}

/// Get the search tool definition
fn get_thought_search_tool() -> Tool {
    Tool {
        name: "thought_search".to_string(),
        description: "Search top-level thoughts by meaning and keyword. Results carry the hybrid score (0.7 semantic + 0.3 keyword).".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Search text"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 100,
                    "description": "Maximum results (default: 10)"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}
