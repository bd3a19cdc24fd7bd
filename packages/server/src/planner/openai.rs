use std::time::Duration;

use async_trait::async_trait;
use common::MessageRole;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ChatTurn, PlannerError, PlannerReply, TaskPlanner};
use crate::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are a study planning assistant for university students working on a \
thesis or final-year project. When the student describes a goal, break it down into concrete steps \
and answer ONLY with JSON of the form \
{\"tasks\":[{\"description\":\"...\",\"difficulty\":\"Easy|Medium|Hard\",\"tips\":\"...\"}]}. \
When the student asks a question or the goal is unclear, answer in plain text.";

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct HttpTaskPlanner {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl HttpTaskPlanner {
    pub fn new(config: &AiConfig) -> Result<Self, PlannerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TaskPlanner for HttpTaskPlanner {
    #[instrument(skip(self, history), fields(turns = history.len(), model = %self.model))]
    async fn reply(&self, history: &[ChatTurn]) -> Result<PlannerReply, PlannerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PlannerError::NotConfigured("ai.api_key is not set".into()))?;

        let messages = std::iter::once(ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT,
        })
        .chain(history.iter().map(|turn| ChatMessage {
            role: match turn.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: &turn.content,
        }))
        .collect();

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(PlannerError::EmptyReply)?;

        tracing::debug!(chars = content.len(), "Planner replied");
        Ok(PlannerReply::parse(&content))
    }
}
