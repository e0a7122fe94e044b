//! Tool catalog and dispatch onto the user record store.
//!
//! # Responsibility
//! - Describe the five user tools and their input schemas.
//! - Decode tool arguments and call the matching `UserService` operation.
//! - Shape every outcome into the success/failure envelope.
//!
//! # Invariants
//! - Store errors never escape as protocol errors; they become
//!   `{success: false, error}` envelopes.
//! - Pagination arguments follow the clamp policy: wrong types are treated
//!   like out-of-range values, not rejected.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt::{Display, Formatter};
use userstore_core::{
    User, UserList, UserPatch, UserRepository, UserService, UserServiceError,
};

pub const CREATE_USER: &str = "create_user";
pub const READ_USER: &str = "read_user";
pub const READ_ALL_USERS: &str = "read_all_users";
pub const UPDATE_USER: &str = "update_user";
pub const DELETE_USER: &str = "delete_user";

/// Applied pagination window echoed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Result envelope returned as text from every tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
            error: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            pagination: None,
            error: Some(error.into()),
        }
    }

    fn user(user: &User) -> Self {
        Self::encoded(user)
    }

    fn list(list: &UserList) -> Self {
        let mut envelope = Self::encoded(&list.users);
        if !envelope.success {
            return envelope;
        }
        envelope.pagination = Some(Pagination {
            total: list.total,
            limit: list.limit,
            offset: list.offset,
        });
        envelope
    }

    fn encoded(data: &impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::ok(value),
            Err(err) => Self::failure(format!("failed to encode result: {err}")),
        }
    }

    /// Pretty-printed JSON text for the tool result content.
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| {
            format!("{{\n  \"success\": false,\n  \"error\": \"failed to encode result: {err}\"\n}}")
        })
    }
}

/// Tool argument decoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    Missing(&'static str),
    WrongType {
        name: &'static str,
        expected: &'static str,
    },
}

impl Display for ArgError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "Missing required argument `{name}`"),
            Self::WrongType { name, expected } => {
                write!(f, "Argument `{name}` must be {expected}")
            }
        }
    }
}

/// Static description of the five user tools for `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": CREATE_USER,
            "description": "Create a new user record with name and email",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "User's full name"},
                    "email": {"type": "string", "description": "User's email address"}
                },
                "required": ["name", "email"]
            }
        },
        {
            "name": READ_USER,
            "description": "Read a specific user by ID",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "integer", "description": "The user's ID"}
                },
                "required": ["user_id"]
            }
        },
        {
            "name": READ_ALL_USERS,
            "description": "Read all users with pagination support",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Number of records to return (default: 100, max: 1000)",
                        "default": 100
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Number of records to skip (default: 0)",
                        "default": 0
                    }
                }
            }
        },
        {
            "name": UPDATE_USER,
            "description": "Update an existing user's name and/or email",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "integer", "description": "The user's ID (required)"},
                    "name": {"type": "string", "description": "New name (optional)"},
                    "email": {"type": "string", "description": "New email (optional)"}
                },
                "required": ["user_id"]
            }
        },
        {
            "name": DELETE_USER,
            "description": "Delete a user record by ID",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": {"type": "integer", "description": "The user's ID"}
                },
                "required": ["user_id"]
            }
        }
    ])
}

/// Runs one named tool and returns its envelope.
///
/// Unknown tool names produce a failure envelope.
pub fn call_tool<R: UserRepository>(
    service: &UserService<R>,
    name: &str,
    args: &Map<String, Value>,
) -> Envelope {
    let outcome = match name {
        CREATE_USER => create_user(service, args),
        READ_USER => read_user(service, args),
        READ_ALL_USERS => Ok(read_all_users(service, args)),
        UPDATE_USER => update_user(service, args),
        DELETE_USER => delete_user(service, args),
        other => return Envelope::failure(format!("Unknown tool: {other}")),
    };
    outcome.unwrap_or_else(|err| Envelope::failure(err.to_string()))
}

fn create_user<R: UserRepository>(
    service: &UserService<R>,
    args: &Map<String, Value>,
) -> Result<Envelope, ArgError> {
    let name = required_str(args, "name")?;
    let email = required_str(args, "email")?;
    Ok(match service.create_user(name, email) {
        Ok(user) => Envelope::user(&user).with_message("User created successfully"),
        Err(err) => service_failure(&err),
    })
}

fn read_user<R: UserRepository>(
    service: &UserService<R>,
    args: &Map<String, Value>,
) -> Result<Envelope, ArgError> {
    let id = required_i64(args, "user_id")?;
    Ok(match service.get_user(id) {
        Ok(user) => Envelope::user(&user),
        Err(err) => service_failure(&err),
    })
}

fn read_all_users<R: UserRepository>(
    service: &UserService<R>,
    args: &Map<String, Value>,
) -> Envelope {
    let limit = args.get("limit").and_then(Value::as_i64);
    let offset = args.get("offset").and_then(Value::as_i64);
    match service.list_users(limit, offset) {
        Ok(list) => Envelope::list(&list),
        Err(err) => service_failure(&err),
    }
}

fn update_user<R: UserRepository>(
    service: &UserService<R>,
    args: &Map<String, Value>,
) -> Result<Envelope, ArgError> {
    let id = required_i64(args, "user_id")?;
    let patch = UserPatch {
        name: optional_str(args, "name")?.map(str::to_string),
        email: optional_str(args, "email")?.map(str::to_string),
    };
    Ok(match service.update_user(id, &patch) {
        Ok(user) => Envelope::user(&user).with_message("User updated successfully"),
        Err(err) => service_failure(&err),
    })
}

fn delete_user<R: UserRepository>(
    service: &UserService<R>,
    args: &Map<String, Value>,
) -> Result<Envelope, ArgError> {
    let id = required_i64(args, "user_id")?;
    Ok(match service.delete_user(id) {
        Ok(user) => {
            Envelope::user(&user).with_message(format!("User {} deleted successfully", user.id))
        }
        Err(err) => service_failure(&err),
    })
}

fn service_failure(err: &UserServiceError) -> Envelope {
    Envelope::failure(err.to_string())
}

fn required_str<'a>(args: &'a Map<String, Value>, name: &'static str) -> Result<&'a str, ArgError> {
    optional_str(args, name)?.ok_or(ArgError::Missing(name))
}

/// `null` and absence both mean "not supplied".
fn optional_str<'a>(
    args: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>, ArgError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(ArgError::WrongType {
            name,
            expected: "a string",
        }),
    }
}

fn required_i64(args: &Map<String, Value>, name: &'static str) -> Result<i64, ArgError> {
    match args.get(name) {
        None | Some(Value::Null) => Err(ArgError::Missing(name)),
        Some(value) => value.as_i64().ok_or(ArgError::WrongType {
            name,
            expected: "an integer",
        }),
    }
}
