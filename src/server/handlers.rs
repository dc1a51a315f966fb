use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::SharedState;
use crate::error::{McpError, McpResult};
use crate::pipeline::{CreateThoughtRequest, LinkRequest};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Writes
        "thought_create" => handle_thought_create(state, arguments).await,
        "branch_create" => handle_branch_create(state, arguments).await,
        "thought_delete" => handle_thought_delete(state, arguments).await,
        "branch_delete" => handle_branch_delete(state, arguments).await,
        // Traversal
        "thought_get" => handle_thought_get(state, arguments).await,
        "thought_neighbors" => handle_thought_neighbors(state, arguments).await,
        "thought_neighbors_batch" => handle_thought_neighbors_batch(state, arguments).await,
        "thought_subgraph" => handle_thought_subgraph(state, arguments).await,
        "thought_branches" => handle_thought_branches(state, arguments).await,
        // Listing and search
        "thought_list" => handle_thought_list(state, arguments).await,
        "thought_search" => handle_thought_search(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Parameter types
// ============================================================================

/// Parameters naming a single thought or branch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdParams {
    pub id: String,
}

/// Parameters for a batch neighbourhood fetch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchParams {
    pub ids: Vec<String>,
}

/// Parameters for a subgraph fetch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubgraphParams {
    pub root_id: String,
}

/// Parameters for listing root thoughts.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListParams {
    #[serde(default)]
    pub skip: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters for hybrid search.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Count of records removed by a delete.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: u64,
}

// ============================================================================
// Write handlers
// ============================================================================

/// Handle thought_create tool call
async fn handle_thought_create(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("thought_create", arguments, |params: CreateThoughtRequest| {
        state.pipeline.create(params)
    })
    .await
}

/// Handle branch_create tool call
async fn handle_branch_create(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("branch_create", arguments, |params: LinkRequest| {
        state.pipeline.link(params)
    })
    .await
}

/// Handle thought_delete tool call
async fn handle_thought_delete(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("thought_delete", arguments, |params: IdParams| async move {
        let deleted = state.pipeline.delete_thought(&params.id).await?;
        Ok::<_, crate::error::AppError>(DeleteResponse {
            id: params.id,
            deleted,
        })
    })
    .await
}

/// Handle branch_delete tool call
async fn handle_branch_delete(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("branch_delete", arguments, |params: IdParams| async move {
        let deleted = state.pipeline.delete_branch(&params.id).await?;
        Ok::<_, crate::error::AppError>(DeleteResponse {
            id: params.id,
            deleted,
        })
    })
    .await
}

// ============================================================================
// Traversal handlers
// ============================================================================

/// Handle thought_get tool call
async fn handle_thought_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("thought_get", arguments, |params: IdParams| async move {
        state.retrieval.get(&params.id).await
    })
    .await
}

/// Handle thought_neighbors tool call
async fn handle_thought_neighbors(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    execute_handler("thought_neighbors", arguments, |params: IdParams| async move {
        state.retrieval.get_with_neighbors(&params.id).await
    })
    .await
}

/// Handle thought_neighbors_batch tool call
async fn handle_thought_neighbors_batch(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    execute_handler(
        "thought_neighbors_batch",
        arguments,
        |params: BatchParams| async move { state.retrieval.get_batch_with_neighbors(&params.ids).await },
    )
    .await
}

/// Handle thought_subgraph tool call
async fn handle_thought_subgraph(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("thought_subgraph", arguments, |params: SubgraphParams| async move {
        state.retrieval.get_subgraph(&params.root_id).await
    })
    .await
}

/// Handle thought_branches tool call
async fn handle_thought_branches(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: IdParams = parse_arguments("thought_branches", arguments)?;

    let branches = state
        .retrieval
        .outgoing_branches(&params.id)
        .await
        .map_err(McpError::from)?;

    Ok(json!({ "id": params.id, "branches": branches }))
}

// ============================================================================
// Listing and search handlers
// ============================================================================

/// Handle thought_list tool call. Arguments are optional.
async fn handle_thought_list(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let arguments = arguments.or_else(|| Some(json!({})));
    execute_handler("thought_list", arguments, |params: ListParams| async move {
        state.ranking.list(params.skip, params.limit).await
    })
    .await
}

/// Handle thought_search tool call
async fn handle_thought_search(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SearchParams = parse_arguments("thought_search", arguments)?;

    let results = state
        .ranking
        .search(&params.query, params.limit)
        .await
        .map_err(McpError::from)?;

    Ok(json!({ "query": params.query, "results": results }))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Generic handler that runs an operation with consistent error handling.
///
/// Parses the arguments into `P`, maps the operation's error through the
/// boundary conversion into [`McpError`], and serializes the result.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: Into<McpError>,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params).await.map_err(Into::into)?;

    serde_json::to_value(result).map_err(McpError::Json)
}
