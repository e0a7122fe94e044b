//! Line-delimited JSON-RPC server over a reader/writer pair.
//!
//! # Responsibility
//! - Own the store connection opened at startup.
//! - Route protocol methods (`initialize`, `tools/list`, `tools/call`, ...).
//! - Keep one request per line in, one response per line out.
//!
//! # Invariants
//! - Notifications never produce output.
//! - A malformed line yields a JSON-RPC error response, never a shutdown.
//! - Only protocol messages are written to the output stream.

use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::tools::{call_tool, tool_definitions, Envelope};
use log::{debug, info, warn};
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::io::{self, BufRead, Write};
use userstore_core::{RepoResult, SqliteUserRepository, UserService};

pub const SERVER_NAME: &str = "userstore";

/// Tool-call server bound to one store connection.
pub struct McpServer {
    conn: Connection,
}

impl McpServer {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// Returns the repository error when the `users` table is missing or
    /// lacks a required column; the check runs once, not per call.
    pub fn new(conn: Connection) -> RepoResult<Self> {
        SqliteUserRepository::try_new(&conn)?;
        Ok(Self { conn })
    }

    /// Serves stdin/stdout until stdin reaches EOF.
    pub fn run_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    /// Serves requests from `reader` and writes responses to `writer`.
    ///
    /// # Errors
    /// Returns I/O errors from either stream; protocol errors are answered
    /// in-band instead.
    pub fn serve(&self, mut reader: impl BufRead, mut writer: impl Write) -> io::Result<()> {
        info!("event=server_start module=mcp status=ok protocol={MCP_PROTOCOL_VERSION}");
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line),
                Err(err) => {
                    warn!("event=rpc_parse module=mcp status=error error_code=invalid_utf8");
                    encode_response(&JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {err}"),
                    ))
                }
            };
            if let Some(response) = response {
                writer.write_all(response.as_bytes())?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
        }
        info!("event=server_stop module=mcp status=ok reason=eof");
        Ok(())
    }

    /// Handles one raw input line and returns the serialized response, if any.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Err(err) => {
                warn!("event=rpc_parse module=mcp status=error error_code=parse_error");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {err}"),
                ))
            }
            Ok(value) => self.handle_value(value),
        }?;

        encode_response(&response)
    }

    fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        // An explicit `"id": null` is still a request, not a notification.
        let raw_id = value.get("id").cloned();
        let id = raw_id.clone().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(mut request) if request.jsonrpc == JSONRPC_VERSION => {
                if request.id.is_none() {
                    request.id = raw_id;
                }
                self.handle_request(request)
            }
            Ok(_) => Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            Err(err) => Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                format!("Invalid Request: {err}"),
            )),
        }
    }

    /// Dispatches a decoded request; returns `None` for notifications.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("event=rpc_request module=mcp method={}", request.method);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.tools_call(request.params.as_ref()),
            method if method.starts_with("notifications/") => {
                return None;
            }
            method => Err((METHOD_NOT_FOUND, format!("Method not found: {method}"))),
        };

        let id = request.id?;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        })
    }

    fn tools_call(&self, params: Option<&Value>) -> Result<Value, (i64, String)> {
        let params = params.and_then(Value::as_object).ok_or((
            INVALID_PARAMS,
            "Invalid params: expected an object".to_string(),
        ))?;
        let name = params.get("name").and_then(Value::as_str).ok_or((
            INVALID_PARAMS,
            "Invalid params: missing tool name".to_string(),
        ))?;
        let empty = Map::new();
        let args = match params.get("arguments") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(args)) => args,
            Some(_) => {
                return Err((
                    INVALID_PARAMS,
                    "Invalid params: arguments must be an object".to_string(),
                ))
            }
        };

        let envelope = self.with_user_service(|service| call_tool(service, name, args));
        info!(
            "event=tool_call module=mcp tool={name} status={}",
            if envelope.success { "ok" } else { "error" }
        );

        Ok(json!({
            "content": [{ "type": "text", "text": envelope.to_text() }],
            "isError": !envelope.success,
        }))
    }

    fn with_user_service(
        &self,
        f: impl FnOnce(&UserService<SqliteUserRepository<'_>>) -> Envelope,
    ) -> Envelope {
        f(&UserService::new(SqliteUserRepository::new(&self.conn)))
    }
}

fn encode_response(response: &JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!("event=rpc_encode module=mcp status=error error={err}");
            None
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}
