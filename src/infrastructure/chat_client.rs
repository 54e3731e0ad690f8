use crate::domain::models::{AssistantResponse, Task};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_ASSISTANT_ERROR: &str = "Failed to get response from assistant";

/// Body posted to the assistant endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub context: ChatContext,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatContext {
    pub current_tasks: Vec<ChatTaskContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTaskContext {
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub completed: bool,
}

impl From<&Task> for ChatTaskContext {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task
                .scheduled_date
                .map(|date| date.format("%Y-%m-%d").to_string()),
            completed: task.completed,
        }
    }
}

impl ChatRequest {
    pub fn from_tasks(message: impl Into<String>, tasks: &[Task]) -> Self {
        Self {
            message: message.into(),
            context: ChatContext {
                current_tasks: tasks.iter().map(ChatTaskContext::from).collect(),
            },
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<AssistantResponse, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestChatClient {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<String>,
}

impl ReqwestChatClient {
    pub fn new(endpoint: &str) -> Result<Self, InfraError> {
        let endpoint = Url::parse(endpoint.trim()).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid chat endpoint {endpoint}: {error}"))
        })?;
        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Message to surface for a non-success reply: the body's `error` field when present.
fn assistant_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| DEFAULT_ASSISTANT_ERROR.to_string())
}

#[async_trait]
impl ChatClient for ReqwestChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<AssistantResponse, InfraError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            tasks = request.context.current_tasks.len(),
            "posting chat request"
        );
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("chat request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading chat response: {error}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "assistant returned an error status");
            return Err(InfraError::Assistant(assistant_error_message(&body)));
        }

        Ok(serde_json::from_str::<AssistantResponse>(&body)?)
    }
}
