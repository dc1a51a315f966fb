//! Integration tests for MCP protocol handling
//!
//! Tests JSON-RPC request/response handling and the tool catalogue without
//! reaching any external service.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use lines_of_thought::config::{
    Config, DatabaseConfig, EmbeddingConfig, GateConfig, LangbaseConfig, LogFormat,
    LoggingConfig, PipeConfig, RequestConfig,
};
use lines_of_thought::embeddings::EmbeddingClient;
use lines_of_thought::langbase::LangbaseClient;
use lines_of_thought::server::{all_tools, AppState, JsonRpcRequest, JsonRpcResponse, McpServer};
use lines_of_thought::storage::SqliteStorage;

fn offline_config() -> Config {
    Config {
        langbase: LangbaseConfig {
            api_key: "test-api-key".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        },
        embedding: EmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            model: "test-model".to_string(),
            dimension: None,
        },
        database: DatabaseConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig::default(),
        pipes: PipeConfig::default(),
        gate: GateConfig::default(),
    }
}

/// Server whose collaborators are never contacted by these tests
async fn offline_server() -> McpServer {
    let config = offline_config();
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    let langbase = LangbaseClient::new(&config.langbase, config.request.clone()).unwrap();
    let embedder = EmbeddingClient::new(&config.embedding, &config.request).unwrap();
    let state = AppState::new(config, Arc::new(storage), langbase, Arc::new(embedder));
    McpServer::new(Arc::new(state))
}

fn request(raw: Value) -> JsonRpcRequest {
    serde_json::from_value(raw).expect("valid JSON-RPC request")
}

/// Serialize a response the way it goes out on stdout
fn wire(response: &JsonRpcResponse) -> Value {
    serde_json::to_value(response).expect("response serializes")
}

/// Verify JSON-RPC 2.0 response structure
fn assert_valid_jsonrpc_response(response: &Value) {
    assert_eq!(response["jsonrpc"], "2.0", "Invalid JSON-RPC version");
    assert!(
        response.get("result").is_some() != response.get("error").is_some(),
        "Response must have exactly one of result or error"
    );
}

#[cfg(test)]
mod initialize_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_response_structure() {
        let server = offline_server().await;
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0.0"}
                }
            })))
            .await
            .unwrap();

        let response = wire(&response);
        assert_valid_jsonrpc_response(&response);
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(response["result"]["serverInfo"]["name"], "lines-of-thought");
    }
}

#[cfg(test)]
mod tools_list_tests {
    use super::*;

    #[tokio::test]
    async fn test_tools_list_matches_catalogue() {
        let server = offline_server().await;
        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})))
            .await
            .unwrap();

        let response = wire(&response);
        assert_valid_jsonrpc_response(&response);
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), all_tools().len());
        assert_eq!(tools.len(), 11);
        for tool in tools {
            assert!(tool["name"].is_string());
            assert!(tool["description"].is_string());
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
    }

    #[test]
    fn test_required_arguments() {
        let required = |name: &str| -> Value {
            all_tools()
                .into_iter()
                .find(|t| t.name == name)
                .map(|t| t.input_schema["required"].clone())
                .unwrap_or(Value::Null)
        };

        assert_eq!(required("thought_create"), json!(["text"]));
        assert_eq!(required("branch_create"), json!(["parent_id", "child_id"]));
        assert_eq!(required("thought_neighbors_batch"), json!(["ids"]));
        assert_eq!(required("thought_subgraph"), json!(["root_id"]));
        assert_eq!(required("thought_search"), json!(["query"]));
    }

    #[test]
    fn test_batch_schema_caps_ids() {
        let tool = all_tools()
            .into_iter()
            .find(|t| t.name == "thought_neighbors_batch")
            .unwrap();
        assert_eq!(tool.input_schema["properties"]["ids"]["maxItems"], 100);
    }
}

#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[tokio::test]
    async fn test_method_not_found_error() {
        let server = offline_server().await;
        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": "abc", "method": "prompts/list"})))
            .await
            .unwrap();

        let response = wire(&response);
        assert_valid_jsonrpc_response(&response);
        assert_eq!(response["id"], "abc");
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_tools_call_without_params() {
        let server = offline_server().await;
        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call"})))
            .await
            .unwrap();

        assert_eq!(wire(&response)["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tool_error_not_protocol_error() {
        let server = offline_server().await;
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "thought_merge", "arguments": {}}
            })))
            .await
            .unwrap();

        let response = wire(&response);
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let body: Value =
            serde_json::from_str(response["result"]["content"][0]["text"].as_str().unwrap())
                .unwrap();
        assert_eq!(body["error"]["code"], "unknown_tool");
    }

    #[test]
    fn test_null_id_for_parse_errors() {
        let response = wire(&JsonRpcResponse::error(None, -32700, "Parse error"));
        assert_valid_jsonrpc_response(&response);
        assert_eq!(response["id"], Value::Null);
    }
}

#[cfg(test)]
mod jsonrpc_compliance_tests {
    use super::*;

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = offline_server().await;

        for method in ["initialized", "notifications/cancelled", "notifications/unknown"] {
            let response = server
                .handle_request(request(json!({"jsonrpc": "2.0", "method": method})))
                .await;
            assert!(response.is_none(), "{method} should not be answered");
        }
    }

    #[tokio::test]
    async fn test_ping_preserves_string_id() {
        let server = offline_server().await;
        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": "req-7", "method": "ping"})))
            .await
            .unwrap();

        let response = wire(&response);
        assert_eq!(response["id"], "req-7");
        assert_eq!(response["result"], json!({}));
    }
}
