//! The default data team
//!
//! Four roles: the admin discusses the plan, the engineer drafts SQL, the
//! analyst runs it and reports, the product manager reviews and approves.

use std::sync::Arc;

use crate::agent::orchestrator::OrchestrationConfig;
use crate::agent::role::RoleAgent;
use crate::agent::selector::SelectorPolicy;
use crate::core::config::{Config, SelectorKind};
use crate::core::{Result, RoleId};
use crate::db::SqlExecutor;
use crate::llm::LLMProvider;
use crate::tools::SqlTool;

pub const ADMINISTRATOR_PROMPT: &str =
    "Interact with the Data Engineer to discuss the plan to satisfy the prompt.";

pub const DATA_ENGINEER_PROMPT: &str = "You follow an approved plan. Generate the initial SQL based on the requirements provided. Send it to the Sr Data Analyst to be executed.";

pub const SR_DATA_ANALYST_PROMPT: &str = "You follow an approved plan. You run the SQL query (if an error is encountered you correct the query and run the SQL again), generate the response and send it to the Product Manager for final review. If you encounter an error then report it back to the Data Engineer.";

pub const PRODUCT_MANAGER_PROMPT: &str = "Validate the response to make sure it's correct. If the team is unable to get the final output report it to the Sr Data Analyst and ask them to run the corrected SQL again.";

/// Completion instruction appended to the reviewer's prompt
pub fn completion_prompt(token: &str) -> String {
    format!(" If everything looks good, respond with the keyword '{}'.", token)
}

fn description(id: RoleId) -> &'static str {
    match id {
        RoleId::Administrator => "You are the administrator",
        RoleId::DataEngineer => "You are a Data Engineer",
        RoleId::SeniorAnalyst => "You are a Sr Data Analyst",
        RoleId::ProductManager => "You are a Product Manager",
    }
}

/// Settings shared by every role on the default team
#[derive(Clone)]
pub struct TeamSettings {
    pub llm: Arc<dyn LLMProvider>,
    pub model: String,
    pub temperature: f32,
    pub termination_token: String,
    pub reflect_on_tool_use: bool,
}

/// Build the four roles in speaking order; the analyst gets `run_sql`
pub fn default_roster(settings: &TeamSettings, executor: Arc<dyn SqlExecutor>) -> Result<Vec<RoleAgent>> {
    let sql_tool = Arc::new(SqlTool::new(executor));

    RoleId::ALL
        .iter()
        .map(|&id| {
            let builder = RoleAgent::builder(id)
                .description(description(id))
                .llm(settings.llm.clone())
                .model(settings.model.clone())
                .temperature(settings.temperature);

            let builder = match id {
                RoleId::Administrator => builder.system_instruction(ADMINISTRATOR_PROMPT),
                RoleId::DataEngineer => builder.system_instruction(DATA_ENGINEER_PROMPT),
                RoleId::SeniorAnalyst => builder
                    .system_instruction(SR_DATA_ANALYST_PROMPT)
                    .tool(sql_tool.clone())
                    .reflect_on_tool_use(settings.reflect_on_tool_use),
                RoleId::ProductManager => builder.system_instruction(format!(
                    "{}{}",
                    PRODUCT_MANAGER_PROMPT,
                    completion_prompt(&settings.termination_token)
                )),
            };

            builder.build()
        })
        .collect()
}

/// Assemble the orchestration config for the default team
pub fn orchestration_config(
    config: &Config,
    llm: Arc<dyn LLMProvider>,
    executor: Arc<dyn SqlExecutor>,
) -> Result<OrchestrationConfig> {
    let settings = TeamSettings {
        llm: llm.clone(),
        model: config.openai.model.clone(),
        temperature: config.openai.temperature,
        termination_token: config.team.termination_token.clone(),
        reflect_on_tool_use: config.team.reflect_on_tool_use,
    };

    let selector = match config.team.selector {
        SelectorKind::RoundRobin => SelectorPolicy::RoundRobin,
        SelectorKind::Model => SelectorPolicy::ModelDriven {
            llm,
            model: config.openai.model.clone(),
        },
    };

    Ok(OrchestrationConfig {
        roster: default_roster(&settings, executor)?,
        selector,
        termination_token: config.team.termination_token.clone(),
        max_turns: config.team.max_turns,
    })
}
