//! Role agents
//!
//! A role agent is one team member: a fixed identity, one system instruction
//! and at most one tool. Each turn is a draft, then any requested tool calls,
//! then an optional reflection pass over the tool results.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::conversation::Transcript;
use crate::core::{
    ChatMessage, CrewError, Message, Result, RoleId, Speaker, ToolCall, ToolError, ToolRequest,
};
use crate::llm::{GenerateOptions, LLMProvider};
use crate::tools::{Tool, ToolBinding};

/// One member of the team
#[derive(Clone)]
pub struct RoleAgent {
    id: RoleId,
    name: String,
    description: String,
    system_instruction: String,
    tool: Option<ToolBinding>,
    reflect_on_tool_use: bool,
    llm: Arc<dyn LLMProvider>,
    model: String,
    temperature: Option<f32>,
}

/// Builder for creating RoleAgents
pub struct RoleAgentBuilder {
    id: RoleId,
    name: Option<String>,
    description: Option<String>,
    system_instruction: Option<String>,
    tool: Option<Arc<dyn Tool>>,
    reflect_on_tool_use: bool,
    llm: Option<Arc<dyn LLMProvider>>,
    model: Option<String>,
    temperature: Option<f32>,
}

impl RoleAgentBuilder {
    /// Create a new builder for the given role
    pub fn new(id: RoleId) -> Self {
        Self {
            id,
            name: None,
            description: None,
            system_instruction: None,
            tool: None,
            reflect_on_tool_use: false,
            llm: None,
            model: None,
            temperature: None,
        }
    }

    /// Override the conversational name (defaults to the role's display name)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Description shown to the speaker selector
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the system instruction
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Bind a tool the role may call during its turn
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Ask the model to summarize tool results before ending the turn
    pub fn reflect_on_tool_use(mut self, reflect: bool) -> Self {
        self.reflect_on_tool_use = reflect;
        self
    }

    /// Set the LLM client
    pub fn llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the model to use
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the RoleAgent
    pub fn build(self) -> Result<RoleAgent> {
        let llm = self
            .llm
            .ok_or_else(|| CrewError::config(format!("{} has no LLM client", self.id)))?;
        let model = self
            .model
            .ok_or_else(|| CrewError::config(format!("{} has no model", self.id)))?;

        // Only the analyst touches the database.
        if self.tool.is_some() && self.id != RoleId::SeniorAnalyst {
            return Err(CrewError::config(format!(
                "{} cannot carry a tool; only {} runs SQL",
                self.id,
                RoleId::SeniorAnalyst
            )));
        }

        let name = self.name.unwrap_or_else(|| self.id.display_name().to_string());
        Ok(RoleAgent {
            id: self.id,
            description: self
                .description
                .unwrap_or_else(|| format!("You are the {}", name)),
            system_instruction: self.system_instruction.unwrap_or_else(|| {
                format!("You are {}, a member of a data team. Help answer the request.", name)
            }),
            name,
            tool: self.tool.map(ToolBinding::new),
            reflect_on_tool_use: self.reflect_on_tool_use,
            llm,
            model,
            temperature: self.temperature,
        })
    }
}

impl RoleAgent {
    /// Create a builder for the given role
    pub fn builder(id: RoleId) -> RoleAgentBuilder {
        RoleAgentBuilder::new(id)
    }

    pub fn id(&self) -> RoleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn tool(&self) -> Option<&ToolBinding> {
        self.tool.as_ref()
    }

    pub fn reflects_on_tool_use(&self) -> bool {
        self.reflect_on_tool_use
    }

    fn options(&self) -> Option<GenerateOptions> {
        Some(GenerateOptions {
            temperature: self.temperature,
            ..Default::default()
        })
    }

    /// Produce this role's contribution to the transcript
    pub async fn respond(&self, transcript: &Transcript) -> Result<Message> {
        let mut messages = self.context(transcript);

        let draft = match &self.tool {
            Some(binding) => {
                self.llm
                    .chat_with_tools(
                        &self.model,
                        &messages,
                        std::slice::from_ref(binding.definition()),
                        self.options(),
                    )
                    .await?
            }
            None => self.llm.chat(&self.model, &messages, self.options()).await?,
        };

        let binding = match &self.tool {
            Some(binding) if !draft.tool_calls.is_empty() => binding,
            _ => {
                if !draft.tool_calls.is_empty() {
                    warn!(role = %self.id, "ignoring tool calls from a role without tools");
                }
                debug!(role = %self.id, chars = draft.content.len(), "drafted reply");
                return Ok(Message::from_role(self.id, draft.content));
            }
        };

        let calls = self.execute_tools(binding, &draft.tool_calls).await;
        let rendered = calls
            .iter()
            .map(ToolCall::render)
            .collect::<Vec<_>>()
            .join("\n\n");

        if !self.reflect_on_tool_use {
            return Ok(Message::from_role(self.id, rendered).with_tool_calls(calls));
        }

        messages.push(ChatMessage::assistant_tool_calls(
            draft.content.clone(),
            draft.tool_calls.clone(),
        ));
        for (request, call) in draft.tool_calls.iter().zip(&calls) {
            messages.push(ChatMessage::tool_result(request.id.clone(), call.render()));
        }

        // Tools are withheld on the second pass so the turn cannot recurse.
        let reflection = self.llm.chat(&self.model, &messages, self.options()).await?;
        let content = if reflection.content.trim().is_empty() {
            rendered
        } else {
            reflection.content
        };

        Ok(Message::from_role(self.id, content).with_tool_calls(calls))
    }

    /// Run every requested call in order. Failures become error-carrying
    /// tool calls; nothing here is fatal.
    async fn execute_tools(&self, binding: &ToolBinding, requests: &[ToolRequest]) -> Vec<ToolCall> {
        let mut calls = Vec::with_capacity(requests.len());

        for request in requests {
            let call = if request.name == binding.name() {
                match binding.tool().invoke(&request.arguments).await {
                    Ok(output) => ToolCall::succeeded(&request.name, request.arguments.clone(), output),
                    Err(error) => ToolCall::failed(&request.name, request.arguments.clone(), error),
                }
            } else {
                ToolCall::failed(
                    &request.name,
                    request.arguments.clone(),
                    ToolError::new(format!(
                        "Unknown tool '{}'; available: {}",
                        request.name,
                        binding.name()
                    )),
                )
            };

            info!(
                role = %self.id,
                tool = %call.name,
                success = call.is_success(),
                "tool call finished"
            );
            calls.push(call);
        }

        calls
    }

    /// Chat context for this role: its instruction, then the transcript with
    /// its own turns as assistant messages and everyone else's as named user
    /// messages.
    fn context(&self, transcript: &Transcript) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessage::system(&self.system_instruction));

        for message in transcript.messages() {
            let text = context_text(message);
            let chat = match message.speaker {
                Speaker::Role(id) if id == self.id => ChatMessage::assistant(text),
                Speaker::Role(id) => ChatMessage::user(text).named(id.display_name()),
                Speaker::User => ChatMessage::user(text).named("user"),
            };
            messages.push(chat);
        }

        messages
    }
}

/// Message text as later roles see it: the content plus every tool result or
/// error that the content does not already show.
pub(crate) fn context_text(message: &Message) -> String {
    let mut text = message.content.clone();
    for call in &message.tool_calls {
        let rendered = call.render();
        if !text.contains(&rendered) {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(&rendered);
        }
    }
    text
}

impl std::fmt::Debug for RoleAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAgent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tool", &self.tool)
            .field("reflect_on_tool_use", &self.reflect_on_tool_use)
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChatRole, ToolDefinition};
    use crate::llm::LLMResponse;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records what it was sent
    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<LLMResponse>>,
        requests: Mutex<Vec<(Vec<ChatMessage>, usize)>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<LLMResponse>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn next(&self, messages: &[ChatMessage], tools: usize) -> Result<LLMResponse> {
            self.requests.lock().unwrap().push((messages.to_vec(), tools));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CrewError::model("script exhausted"))
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedLlm {
        async fn chat(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            self.next(messages, 0)
        }

        async fn chat_with_tools(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            tools: &[ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            self.next(messages, tools.len())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::function("run_sql", "echo", json!({"type": "object"}))
        }

        async fn invoke(&self, arguments: &Value) -> std::result::Result<Value, ToolError> {
            match arguments.get("sql").and_then(Value::as_str) {
                Some(sql) if sql.contains("nonexistent_table") => Err(ToolError {
                    code: Some("42P01".into()),
                    message: "relation \"nonexistent_table\" does not exist".into(),
                    detail: None,
                    hint: None,
                }),
                Some(_) => Ok(json!({"rows": [{"total": "100"}]})),
                None => Err(ToolError::new("missing sql")),
            }
        }
    }

    fn sql_request(sql: &str) -> LLMResponse {
        LLMResponse::with_tool_calls("", vec![ToolRequest::new("call_1", "run_sql", json!({"sql": sql}))])
    }

    fn analyst(llm: Arc<ScriptedLlm>, reflect: bool) -> RoleAgent {
        RoleAgent::builder(RoleId::SeniorAnalyst)
            .system_instruction("Run the SQL.")
            .tool(Arc::new(EchoTool))
            .reflect_on_tool_use(reflect)
            .llm(llm)
            .model("test")
            .build()
            .unwrap()
    }

    #[test]
    fn test_only_analyst_may_carry_tool() {
        let err = RoleAgent::builder(RoleId::DataEngineer)
            .tool(Arc::new(EchoTool))
            .llm(ScriptedLlm::new(vec![]))
            .model("test")
            .build()
            .unwrap_err();
        assert!(matches!(err, CrewError::Config(_)));
    }

    #[test]
    fn test_builder_defaults() {
        let agent = RoleAgent::builder(RoleId::ProductManager)
            .llm(ScriptedLlm::new(vec![]))
            .model("test")
            .build()
            .unwrap();
        assert_eq!(agent.name(), "Product_Manager");
        assert!(agent.tool().is_none());
        assert!(!agent.reflects_on_tool_use());
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let llm = ScriptedLlm::new(vec![LLMResponse::text("Plan: sum the sales table.")]);
        let agent = RoleAgent::builder(RoleId::Administrator)
            .system_instruction("Discuss the plan.")
            .llm(llm.clone())
            .model("test")
            .build()
            .unwrap();

        let transcript = Transcript::seeded("show me total sales");
        let message = agent.respond(&transcript).await.unwrap();
        assert_eq!(message.speaker, Speaker::Role(RoleId::Administrator));
        assert_eq!(message.content, "Plan: sum the sales table.");
        assert!(message.tool_calls.is_empty());

        let requests = llm.requests.lock().unwrap();
        let (sent, tools) = &requests[0];
        assert_eq!(*tools, 0);
        assert_eq!(sent[0].role, ChatRole::System);
        assert_eq!(sent[1].name.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_tool_turn_with_reflection() {
        let llm = ScriptedLlm::new(vec![
            sql_request("SELECT SUM(amount) AS total FROM sales"),
            LLMResponse::text("Total sales were 100. Over to Product_Manager."),
        ]);
        let agent = analyst(llm.clone(), true);

        let message = agent.respond(&Transcript::seeded("total sales")).await.unwrap();
        assert_eq!(message.content, "Total sales were 100. Over to Product_Manager.");
        assert_eq!(message.tool_calls.len(), 1);
        assert!(message.tool_calls[0].is_success());

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, 1);
        // Reflection pass sees the tool result and has no tools to call.
        let (reflect_sent, reflect_tools) = &requests[1];
        assert_eq!(*reflect_tools, 0);
        let last = reflect_sent.last().unwrap();
        assert_eq!(last.role, ChatRole::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_tool_turn_without_reflection() {
        let llm = ScriptedLlm::new(vec![sql_request("SELECT 1")]);
        let agent = analyst(llm.clone(), false);

        let message = agent.respond(&Transcript::seeded("one")).await.unwrap();
        assert!(message.content.starts_with("[run_sql result]"));
        assert_eq!(llm.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_error_is_captured() {
        let llm = ScriptedLlm::new(vec![sql_request("SELECT * FROM nonexistent_table")]);
        let agent = analyst(llm, false);

        let message = agent.respond(&Transcript::seeded("broken")).await.unwrap();
        assert!(message.has_tool_error());
        assert!(message.content.contains("nonexistent_table"));
        assert!(message.content.contains("42P01"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_call() {
        let llm = ScriptedLlm::new(vec![LLMResponse::with_tool_calls(
            "",
            vec![ToolRequest::new("call_1", "drop_everything", json!({}))],
        )]);
        let agent = analyst(llm, false);

        let message = agent.respond(&Transcript::seeded("x")).await.unwrap();
        assert!(message.has_tool_error());
        assert!(message.content.contains("Unknown tool 'drop_everything'"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let agent = analyst(ScriptedLlm::new(vec![]), true);
        let err = agent.respond(&Transcript::seeded("x")).await.unwrap_err();
        assert!(err.is_model_failure());
    }

    #[tokio::test]
    async fn test_other_roles_see_tool_errors() {
        let llm = ScriptedLlm::new(vec![LLMResponse::text("Fixed: SELECT 1")]);
        let engineer = RoleAgent::builder(RoleId::DataEngineer)
            .llm(llm.clone())
            .model("test")
            .build()
            .unwrap();

        let mut transcript = Transcript::seeded("x");
        transcript.push(
            Message::from_role(RoleId::SeniorAnalyst, "The query failed.").with_tool_calls(vec![
                ToolCall::failed(
                    "run_sql",
                    json!({"sql": "SELECT * FROM nonexistent_table"}),
                    ToolError::new("relation \"nonexistent_table\" does not exist"),
                ),
            ]),
        );
        engineer.respond(&transcript).await.unwrap();

        let requests = llm.requests.lock().unwrap();
        let analyst_turn = &requests[0].0[2];
        assert_eq!(analyst_turn.name.as_deref(), Some("Sr_Data_Analyst"));
        assert!(analyst_turn.content.starts_with("The query failed."));
        assert!(analyst_turn.content.contains("[run_sql error]"));
    }

    #[test]
    fn test_context_text_does_not_duplicate() {
        let call = ToolCall::succeeded("run_sql", json!({"sql": "SELECT 1"}), json!([1]));
        let message = Message::from_role(RoleId::SeniorAnalyst, call.render())
            .with_tool_calls(vec![call.clone()]);
        assert_eq!(context_text(&message), call.render());
    }
}
