//! Shared types used across datacrew modules
//!
//! Contains transcript messages, wire-level chat messages, and tool definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a team member. The set is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Administrator,
    DataEngineer,
    SeniorAnalyst,
    ProductManager,
}

impl RoleId {
    /// All roles in their declared speaking order
    pub const ALL: [RoleId; 4] = [
        RoleId::Administrator,
        RoleId::DataEngineer,
        RoleId::SeniorAnalyst,
        RoleId::ProductManager,
    ];

    /// Name the role goes by inside the conversation
    pub fn display_name(&self) -> &'static str {
        match self {
            RoleId::Administrator => "Admin",
            RoleId::DataEngineer => "Engineer",
            RoleId::SeniorAnalyst => "Sr_Data_Analyst",
            RoleId::ProductManager => "Product_Manager",
        }
    }

    /// Stable machine key (matches the serde representation)
    pub fn key(&self) -> &'static str {
        match self {
            RoleId::Administrator => "administrator",
            RoleId::DataEngineer => "data_engineer",
            RoleId::SeniorAnalyst => "senior_analyst",
            RoleId::ProductManager => "product_manager",
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Who produced a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum Speaker {
    /// The person who asked the question (seed message only)
    User,
    /// A team member
    Role(RoleId),
}

impl Speaker {
    pub fn role(&self) -> Option<RoleId> {
        match self {
            Speaker::User => None,
            Speaker::Role(id) => Some(*id),
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("user"),
            Speaker::Role(id) => id.fmt(f),
        }
    }
}

/// One entry in the team transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub content: String,
    /// Tool calls made during this turn, in execution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// The seed message carrying the user's request
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A message spoken by a team member
    pub fn from_role(role: RoleId, content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Role(role),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Attach the tool calls executed during the turn
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Whether any tool call in this message failed
    pub fn has_tool_error(&self) -> bool {
        self.tool_calls.iter().any(|c| !c.is_success())
    }
}

/// A completed tool invocation recorded in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool that was invoked
    pub name: String,
    /// Arguments the model supplied
    pub arguments: serde_json::Value,
    /// What the tool returned
    pub outcome: ToolOutcome,
}

impl ToolCall {
    pub fn succeeded(
        name: impl Into<String>,
        arguments: serde_json::Value,
        output: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            outcome: ToolOutcome::Success { output },
        }
    }

    pub fn failed(name: impl Into<String>, arguments: serde_json::Value, error: ToolError) -> Self {
        Self {
            name: name.into(),
            arguments,
            outcome: ToolOutcome::Error { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    /// Text form fed back to models and shown to the user
    pub fn render(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { output } => {
                let body = serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string());
                format!("[{} result]\n{}", self.name, body)
            }
            ToolOutcome::Error { error } => format!("[{} error]\n{}", self.name, error),
        }
    }
}

/// Result or error of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ToolOutcome {
    Success { output: serde_json::Value },
    Error { error: ToolError },
}

/// Structured error produced by a tool. Recoverable: the team reads it and
/// tries again on a later turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Machine-readable code (SQLSTATE for database errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            detail: None,
            hint: None,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "ERROR {}: {}", code, self.message)?,
            None => write!(f, "ERROR: {}", self.message)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Role of a chat message on the model wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a model request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Participant name, used to tell team members apart
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls requested by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolRequest>>,
    /// Id of the request a `tool` message answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Assistant message that requested tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolRequest>) -> Self {
        let mut msg = Self::new(ChatRole::Assistant, content);
        msg.tool_calls = Some(calls);
        msg
    }

    /// Tool result answering a request
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(ChatRole::Tool, content);
        msg.tool_call_id = Some(call_id.into());
        msg
    }

    /// Tag the message with a participant name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Provider-assigned id, echoed back in the tool result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_names() {
        assert_eq!(RoleId::SeniorAnalyst.display_name(), "Sr_Data_Analyst");
        assert_eq!(RoleId::ALL[0], RoleId::Administrator);
        assert_eq!(
            serde_json::to_value(RoleId::DataEngineer).unwrap(),
            json!(RoleId::DataEngineer.key())
        );
    }

    #[test]
    fn test_tool_error_render() {
        let call = ToolCall::failed(
            "run_sql",
            json!({"sql": "SELECT * FROM nonexistent_table"}),
            ToolError {
                code: Some("42P01".into()),
                message: "relation \"nonexistent_table\" does not exist".into(),
                detail: None,
                hint: None,
            },
        );
        let text = call.render();
        assert!(text.starts_with("[run_sql error]"));
        assert!(text.contains("42P01"));
        assert!(!call.is_success());
    }

    #[test]
    fn test_chat_message_serialization() {
        let msg = ChatMessage::tool_result("call_1", "ok");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
        assert!(value.get("name").is_none());
    }
}
