//! Tool-call transport for the user record store.
//!
//! Exposes the five store operations as named tools over line-delimited
//! JSON-RPC 2.0 on stdio. All validation and persistence rules live in
//! `userstore_core`; this crate only decodes arguments and shapes results.

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use tools::{call_tool, tool_definitions, Envelope, Pagination};
