//! The `cursorControl` tool surface.
//!
//! One tool, six sub-commands (`move`, `insert`, `execute`, `scroll`, `open`,
//! `terminal`), each with a declarative argument schema. Validation is
//! applied by wrapping the command handler with [`with_validation`] — plain
//! composition, so the check is visible at the registration site.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::rpc::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::rpc::error::RpcError;
use crate::rpc::registry::HandlerFuture;
use crate::schema::{validate, PropertySchema, ValueType};
use crate::target::{CapabilityTarget, Direction, ScrollDirection, TargetError};

/// Method name for tool discovery.
pub const LIST_TOOLS: &str = "list_tools";
/// Method name for tool invocation.
pub const CALL_TOOL: &str = "call_tool";
/// The one tool this server exposes.
pub const CURSOR_CONTROL: &str = "cursorControl";

/// Published description of a tool: name, blurb, and argument schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: PropertySchema,
}

/// Response payload of `list_tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolListing {
    pub tools: Vec<ToolDescriptor>,
}

/// Argument schema for `cursorControl`: one object property per sub-command,
/// with `command` and `args` required at the top level.
pub fn cursor_control_schema() -> PropertySchema {
    fn command(fields: &[(&str, PropertySchema)], required: &[&str]) -> PropertySchema {
        let properties = fields
            .iter()
            .map(|(name, schema)| (name.to_string(), schema.clone()))
            .collect::<BTreeMap<_, _>>();
        PropertySchema::object(properties, required.iter().copied())
    }

    let mut commands = BTreeMap::new();
    commands.insert(
        "move".to_string(),
        command(
            &[(
                "direction",
                PropertySchema::string_enum(["up", "down", "left", "right"]),
            )],
            &["direction"],
        ),
    );
    commands.insert(
        "insert".to_string(),
        command(
            &[("text", PropertySchema::typed(ValueType::String))],
            &["text"],
        ),
    );
    commands.insert(
        "execute".to_string(),
        command(
            &[("commandId", PropertySchema::typed(ValueType::String))],
            &["commandId"],
        ),
    );
    commands.insert(
        "scroll".to_string(),
        command(
            &[("direction", PropertySchema::string_enum(["up", "down"]))],
            &["direction"],
        ),
    );
    commands.insert(
        "open".to_string(),
        command(
            &[("filePath", PropertySchema::typed(ValueType::String))],
            &["filePath"],
        ),
    );
    commands.insert(
        "terminal".to_string(),
        command(
            &[("shellCommand", PropertySchema::typed(ValueType::String))],
            &["shellCommand"],
        ),
    );

    PropertySchema::object(commands, ["command", "args"])
}

pub fn cursor_control_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: CURSOR_CONTROL.to_string(),
        description: "Control editor navigation and editing from a paired device".to_string(),
        input_schema: cursor_control_schema(),
    }
}

/// Wrap a handler with schema validation of the `{command, args}` invocation.
///
/// The top-level required set is checked first, then `args` against the
/// sub-schema for `command`. Either failure raises `invalid_input` listing
/// every violation; a command the schema does not know passes through, so the
/// handler itself decides whether it is dispatchable.
pub fn with_validation<F, Fut>(
    schema: PropertySchema,
    handler: F,
) -> impl Fn(RequestEnvelope) -> HandlerFuture + Send + Sync + 'static
where
    F: Fn(RequestEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    let schema = Arc::new(schema);
    let handler = Arc::new(handler);
    move |envelope: RequestEnvelope| {
        let schema = Arc::clone(&schema);
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let invocation = &envelope.arguments;
            let top = validate(invocation, &schema);
            if !top.valid {
                return Err(RpcError::InvalidInput(top.errors.join(", ")));
            }

            let command = invocation
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if let Some(sub_schema) = schema.properties.get(command) {
                let args = invocation.get("args").cloned().unwrap_or(Value::Null);
                let validation = validate(&args, sub_schema);
                if !validation.valid {
                    return Err(RpcError::InvalidInput(validation.errors.join(", ")));
                }
            }

            handler(envelope).await
        }) as HandlerFuture
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidInput(format!("Missing required field: {}", key)))
}

fn map_target_error(error: TargetError) -> RpcError {
    match error {
        TargetError::NoActiveTarget => RpcError::NoActiveTarget,
        TargetError::Failed(detail) => {
            tracing::error!(%detail, "capability target operation failed");
            RpcError::Internal
        }
    }
}

/// Dispatch one validated sub-command onto the capability target.
///
/// Exactly one target operation runs per invocation; an unrecognized command
/// raises `method_not_found` without touching the target.
pub async fn dispatch_command(
    target: &dyn CapabilityTarget,
    command: &str,
    args: &Value,
) -> Result<ResponseEnvelope, RpcError> {
    match command {
        "move" => {
            let direction = str_arg(args, "direction")?;
            let direction = Direction::parse(direction).ok_or_else(|| {
                RpcError::InvalidInput(
                    "Invalid value for direction: must be one of up, down, left, right".to_string(),
                )
            })?;
            target
                .move_cursor(direction)
                .await
                .map_err(map_target_error)?;
        }
        "insert" => {
            let text = str_arg(args, "text")?;
            target.insert_text(text).await.map_err(map_target_error)?;
        }
        "execute" => {
            let command_id = str_arg(args, "commandId")?;
            target
                .execute_named_command(command_id)
                .await
                .map_err(map_target_error)?;
        }
        "scroll" => {
            let direction = str_arg(args, "direction")?;
            let direction = ScrollDirection::parse(direction).ok_or_else(|| {
                RpcError::InvalidInput(
                    "Invalid value for direction: must be one of up, down".to_string(),
                )
            })?;
            target.scroll(direction).await.map_err(map_target_error)?;
        }
        "open" => {
            let path = str_arg(args, "filePath")?;
            target.open_file(path).await.map_err(map_target_error)?;
        }
        "terminal" => {
            let shell_command = str_arg(args, "shellCommand")?;
            target
                .run_shell_command(shell_command)
                .await
                .map_err(map_target_error)?;
        }
        other => return Err(RpcError::MethodNotFound(other.to_string())),
    }

    Ok(ResponseEnvelope::success(format!(
        "Successfully executed {}",
        command
    )))
}
