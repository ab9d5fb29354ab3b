//! Chat-completions backend for pipeline stages

use crate::config::LlmConfig;
use crate::pipeline::{AgentBackend, Stage, StageOutput};
use crate::tools::ToolDefinition;
use crate::{Result, TravelCrewError, http};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, instrument};

pub const PROVIDER: &str = "llm";

const COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Turn one stage into a system and a user message. Tools the stage declares
/// are described in the system message.
#[must_use]
pub fn build_messages(
    stage: &Stage,
    tools: &[ToolDefinition],
    request: &str,
    context: &[&StageOutput],
) -> Vec<ChatMessage> {
    let mut system = format!("You are a {}. Your goal: {}", stage.role, stage.goal);
    let declared: Vec<&ToolDefinition> = tools
        .iter()
        .filter(|t| stage.tools.iter().any(|name| name == t.name))
        .collect();
    if !declared.is_empty() {
        system.push_str("\n\nData sources for this task:");
        for tool in declared {
            let _ = write!(system, "\n- {}: {}", tool.name, tool.description);
        }
    }

    let mut user = format!("{}\n\nCustomer request:\n{}\n", stage.description, request);
    for output in context {
        let _ = write!(user, "\nResult of stage '{}':\n{}\n", output.stage, output.text);
    }
    let _ = write!(user, "\nExpected output: {}", stage.expected_output);

    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ]
}

/// Sends one completion request per stage to an OpenAI-compatible endpoint
pub struct ChatCompletionBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    tools: Vec<ToolDefinition>,
}

impl ChatCompletionBackend {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            tools: Vec::new(),
        })
    }

    /// Tool definitions stages may refer to by name
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

#[async_trait]
impl AgentBackend for ChatCompletionBackend {
    #[instrument(name = "llm_stage", skip_all, fields(stage = %stage.name, model = %self.model))]
    async fn run_stage(
        &self,
        stage: &Stage,
        request: &str,
        context: &[&StageOutput],
    ) -> Result<String> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(TravelCrewError::config(
                    "Missing language model API key. Set OPENAI_API_KEY.",
                ));
            }
        };

        let messages = build_messages(stage, &self.tools, request, context);
        let url = http::endpoint(&self.base_url, COMPLETIONS_PATH, &[])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: &messages,
            })
            .send()
            .await?;
        let response = http::ensure_success(PROVIDER, response).await?;
        let body: ChatResponse = http::decode_json(PROVIDER, response).await?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TravelCrewError::provider(PROVIDER, None, "empty completion"))?;

        debug!("Completion returned {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TravelCrewConfig;
    use crate::locations::CityCodeTable;
    use crate::pipeline::Pipeline;
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    #[test]
    fn test_messages_carry_request_and_context() {
        let pipeline = Pipeline::travel_coordinator();
        let stage = &pipeline.stages()[1];
        let previous = StageOutput {
            stage: "trip_outline".into(),
            text: "Day 1: 인천 -> 오사카".into(),
        };

        let messages = build_messages(stage, &[], "오사카 2박 3일", &[&previous]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains(&stage.role));
        assert!(messages[1].content.contains("오사카 2박 3일"));
        assert!(messages[1].content.contains("Result of stage 'trip_outline'"));
        assert!(messages[1].content.ends_with(&stage.expected_output));
    }

    #[test]
    fn test_declared_tools_are_described_to_the_stage() {
        let cities = Arc::new(CityCodeTable::builtin().unwrap());
        let registry = ToolRegistry::from_config(&TravelCrewConfig::default(), cities).unwrap();
        let pipeline = Pipeline::travel_coordinator();
        let definitions = registry.definitions();

        let outline = build_messages(&pipeline.stages()[0], &definitions, "trip", &[]);
        assert!(outline[0].content.contains("- flight_search: "));
        assert!(outline[0].content.contains("- hotel_search: "));
        assert!(!outline[0].content.contains("exchange_rate"));

        let enrichment = build_messages(&pipeline.stages()[1], &definitions, "trip", &[]);
        assert!(enrichment[0].content.contains("- nearby_places: "));
        assert!(enrichment[0].content.contains("- exchange_rate: "));

        let last = build_messages(&pipeline.stages()[2], &definitions, "trip", &[]);
        assert!(!last[0].content.contains("Data sources"));
        assert!(last[1].content.ends_with(&pipeline.stages()[2].expected_output));
    }

    #[test]
    fn test_completion_body_decoding() {
        let body: ChatResponse = serde_json::from_str(
            r##"{"choices":[{"index":0,"message":{"role":"assistant","content":"# Plan"}}]}"##,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("# Plan"));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let backend = ChatCompletionBackend::new(&LlmConfig::default()).unwrap();
        let pipeline = Pipeline::travel_coordinator();
        let err = backend
            .run_stage(&pipeline.stages()[0], "trip", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TravelCrewError::Config { .. }));
    }
}
