//! Stand-ins for the model client and the database

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use datacrew::agent::team::{
    self, ADMINISTRATOR_PROMPT, DATA_ENGINEER_PROMPT, PRODUCT_MANAGER_PROMPT,
    SR_DATA_ANALYST_PROMPT,
};
use datacrew::agent::{OrchestrationConfig, SelectorPolicy, TeamSettings};
use datacrew::core::{ChatMessage, CrewError, Result, RoleId, ToolDefinition, ToolError, ToolRequest};
use datacrew::db::{QueryRows, SqlExecutor, SqlRow};
use datacrew::llm::{GenerateOptions, LLMProvider, LLMResponse};

pub const SALES_SCHEMA: &str =
    "CREATE TABLE sales (\n    id integer NOT NULL,\n    amount numeric,\n    date date\n);";

const SELECTOR_PREFIX: &str = "You are in a role play game";

/// One request as the model saw it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub role: Option<RoleId>,
    pub messages: Vec<ChatMessage>,
    pub tools: usize,
}

/// Scripted model shared by the whole team. Replies are queued per role and
/// matched on the system instruction; unscripted turns get a neutral reply.
#[derive(Default)]
pub struct TeamScript {
    replies: Mutex<HashMap<RoleId, VecDeque<LLMResponse>>>,
    selections: Mutex<VecDeque<String>>,
    failing: Mutex<Option<RoleId>>,
    pub seen: Mutex<Vec<SeenRequest>>,
}

impl TeamScript {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, role: RoleId, response: LLMResponse) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(response);
        self
    }

    pub fn say(&self, role: RoleId, text: &str) -> &Self {
        self.reply(role, LLMResponse::text(text))
    }

    pub fn run_sql(&self, sql: &str) -> &Self {
        self.reply(
            RoleId::SeniorAnalyst,
            LLMResponse::with_tool_calls("", vec![ToolRequest::new("call_1", "run_sql", json!({ "sql": sql }))]),
        )
    }

    /// Queue an answer for the model-driven selector
    pub fn select(&self, name: &str) -> &Self {
        self.selections.lock().unwrap().push_back(name.to_string());
        self
    }

    /// Make every call from this role fail
    pub fn fail_for(&self, role: RoleId) -> &Self {
        *self.failing.lock().unwrap() = Some(role);
        self
    }

    pub fn requests_from(&self, role: RoleId) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.role == Some(role))
            .cloned()
            .collect()
    }

    fn role_for(system: &str) -> Option<RoleId> {
        [
            (RoleId::Administrator, ADMINISTRATOR_PROMPT),
            (RoleId::DataEngineer, DATA_ENGINEER_PROMPT),
            (RoleId::SeniorAnalyst, SR_DATA_ANALYST_PROMPT),
            (RoleId::ProductManager, PRODUCT_MANAGER_PROMPT),
        ]
        .into_iter()
        .find(|(_, prompt)| system.starts_with(prompt))
        .map(|(id, _)| id)
    }

    fn answer(&self, messages: &[ChatMessage], tools: usize) -> Result<LLMResponse> {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or_default();

        if system.starts_with(SELECTOR_PREFIX) {
            return self
                .selections
                .lock()
                .unwrap()
                .pop_front()
                .map(LLMResponse::text)
                .ok_or_else(|| CrewError::model("no selection scripted"));
        }

        let role = Self::role_for(system);
        self.seen.lock().unwrap().push(SeenRequest {
            role,
            messages: messages.to_vec(),
            tools,
        });

        let role = role.ok_or_else(|| CrewError::model("unknown system prompt"))?;
        if *self.failing.lock().unwrap() == Some(role) {
            return Err(CrewError::model("401 Unauthorized"));
        }

        Ok(self
            .replies
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| LLMResponse::text("Nothing to add.")))
    }
}

#[async_trait]
impl LLMProvider for TeamScript {
    async fn chat(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.answer(messages, 0)
    }

    async fn chat_with_tools(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.answer(messages, tools.len())
    }

    fn name(&self) -> &str {
        "script"
    }
}

/// In-memory database with a single `sales` table
#[derive(Default)]
pub struct FakeSalesDb {
    pub queries: Mutex<Vec<String>>,
    cancel_on_query: Mutex<Option<CancellationToken>>,
}

impl FakeSalesDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Cancel this token while the next query is executing
    pub fn cancel_during_query(&self, token: CancellationToken) {
        *self.cancel_on_query.lock().unwrap() = Some(token);
    }
}

#[async_trait]
impl SqlExecutor for FakeSalesDb {
    async fn run_sql(&self, query: &str) -> std::result::Result<QueryRows, ToolError> {
        self.queries.lock().unwrap().push(query.to_string());
        let cancel = self.cancel_on_query.lock().unwrap().take();
        if let Some(token) = cancel {
            token.cancel();
        }
        tokio::task::yield_now().await;

        let lowered = query.to_lowercase();
        if !lowered.contains("from sales") {
            return Err(ToolError {
                code: Some("42P01".into()),
                message: "relation \"nonexistent_table\" does not exist".into(),
                detail: None,
                hint: None,
            });
        }

        let mut row = SqlRow::new();
        row.insert("total_sales".into(), json!("1234.50"));
        Ok(QueryRows {
            columns: vec!["total_sales".into()],
            rows: vec![row],
            truncated: false,
        })
    }
}

/// The default four-role team wired to the script and the fake database
pub fn team_config(
    script: Arc<TeamScript>,
    db: Arc<FakeSalesDb>,
    selector: SelectorKindChoice,
    max_turns: usize,
    reflect: bool,
) -> OrchestrationConfig {
    let settings = TeamSettings {
        llm: script.clone(),
        model: "test-model".into(),
        temperature: 0.0,
        termination_token: "APPROVED".into(),
        reflect_on_tool_use: reflect,
    };

    let selector = match selector {
        SelectorKindChoice::RoundRobin => SelectorPolicy::RoundRobin,
        SelectorKindChoice::Model => SelectorPolicy::ModelDriven {
            llm: script,
            model: "test-model".into(),
        },
    };

    OrchestrationConfig {
        roster: team::default_roster(&settings, db).expect("roster builds"),
        selector,
        termination_token: "APPROVED".into(),
        max_turns,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SelectorKindChoice {
    RoundRobin,
    Model,
}
