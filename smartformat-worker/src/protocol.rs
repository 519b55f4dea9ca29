//! Messages exchanged with the transform worker and the layout advisor.
//!
//! Worker messages carry a correlation id so concurrent requests can be
//! matched to their replies. Advisor calls use JSON-RPC 2.0 envelopes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartformat_core::{Element, LayoutContext, TransformOptions};

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Advisor method name.
pub const SUGGEST_METHOD: &str = "layout/suggest";

/// Correlation id of an offloaded transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// A transform job for the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    /// Correlation id.
    pub id: RequestId,
    /// Elements to transform.
    pub elements: Vec<Element>,
    /// Source context.
    pub from: LayoutContext,
    /// Destination context.
    pub to: LayoutContext,
    /// Transform options.
    #[serde(default)]
    pub options: TransformOptions,
}

/// The worker's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Correlation id of the request.
    pub id: RequestId,
    /// Transformed elements.
    pub elements: Vec<Element>,
    /// Preset that ran, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    /// Whether the proportional fallback produced the result.
    #[serde(default)]
    pub fallback: bool,
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    /// Protocol version.
    pub jsonrpc: &'a str,
    /// Request id.
    pub id: u64,
    /// Method name.
    pub method: &'a str,
    /// Parameters.
    pub params: P,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    #[serde(default)]
    pub jsonrpc: String,
    /// Result (on success).
    #[serde(default)]
    pub result: Option<Value>,
    /// Error (on failure).
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional data.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Parameters of `layout/suggest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestParams<'a> {
    /// Current elements.
    pub elements: &'a [Element],
    /// Source context.
    pub from: &'a LayoutContext,
    /// Destination context.
    pub to: &'a LayoutContext,
}

/// Result of `layout/suggest`.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestResult {
    /// Suggested elements in the destination context.
    pub elements: Vec<Element>,
}
