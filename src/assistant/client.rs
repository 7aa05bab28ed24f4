//! HTTP client for the OpenAI Assistants API.
//!
//! The [`AssistantApi`] trait is the seam between the generation job and the
//! external service: one method per remote call, each returning a reference
//! or an error. [`OpenAiClient`] is the production implementation; tests
//! substitute scripted fakes.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use super::AssistantError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ASSISTANTS_BETA_HEADER: &str = "assistants=v1";
const ASSISTANT_MODEL: &str = "gpt-4-turbo-preview";

/// Reference to an uploaded file artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct FileHandle {
    pub id: String,
}

/// Reference to a configured assistant (execution context).
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantHandle {
    pub id: String,
}

/// Reference to a conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadHandle {
    pub id: String,
}

/// One execution attempt of an assistant against a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: String,
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<MessageText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    pub value: String,
}

/// External assistant service interface.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn upload_file(&self, filename: &str, bytes: Vec<u8>)
        -> Result<FileHandle, AssistantError>;

    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        file_id: &str,
    ) -> Result<AssistantHandle, AssistantError>;

    async fn create_thread(&self) -> Result<ThreadHandle, AssistantError>;

    async fn create_message(&self, thread_id: &str, content: &str)
        -> Result<(), AssistantError>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, AssistantError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<MessageList, AssistantError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), AssistantError>;
}

/// reqwest-backed client for api.openai.com.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AssistantError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(AssistantError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AssistantApi for OpenAiClient {
    async fn upload_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<FileHandle, AssistantError> {
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(filename.to_string()));

        let response = self
            .http
            .post(self.url("/files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        file_id: &str,
    ) -> Result<AssistantHandle, AssistantError> {
        let response = self
            .http
            .post(self.url("/assistants"))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .json(&json!({
                "name": name,
                "instructions": instructions,
                "model": ASSISTANT_MODEL,
                "tools": [{ "type": "retrieval" }],
                "file_ids": [file_id],
            }))
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn create_thread(&self) -> Result<ThreadHandle, AssistantError> {
        let response = self
            .http
            .post(self.url("/threads"))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .json(&json!({}))
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<(), AssistantError> {
        let response = self
            .http
            .post(self.url(&format!("/threads/{}/messages", thread_id)))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .json(&json!({ "role": "user", "content": content }))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<Run, AssistantError> {
        let response = self
            .http
            .post(self.url(&format!("/threads/{}/runs", thread_id)))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .json(&json!({ "assistant_id": assistant_id }))
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let response = self
            .http
            .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id)))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<MessageList, AssistantError> {
        let response = self
            .http
            .get(self.url(&format!("/threads/{}/messages", thread_id)))
            .query(&[("run_id", run_id)])
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA_HEADER)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), AssistantError> {
        let response = self
            .http
            .delete(self.url(&format!("/files/{}", file_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
