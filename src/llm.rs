//! # Completion Service
//!
//! The text-completion seam used to phrase answers, and a client for
//! OpenAI-compatible chat-completions endpoints.
use crate::config::Config;
use crate::error::CfoError;
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Completion request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Completion service answered {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("Completion service returned no text")]
    EmptyReplyError,
}

/// One prompt to complete
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
}

/// Turns a prompt into text
pub trait CompletionService {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CfoError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `POST {base_url}/chat/completions`
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, CfoError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ServiceError::from)?;
        Ok(OpenAiClient {
            client,
            api_key: config.api_key.to_owned(),
            base_url: config.base_url.to_owned(),
        })
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CfoError> {
        let body = ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };
        debug!("Sending {} prompt character(s) to {}", request.prompt.chars().count(), request.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(ServiceError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::StatusError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let reply: ChatResponse = response.json().map_err(ServiceError::from)?;
        Ok(reply_text(reply)?)
    }
}

fn reply_text(reply: ChatResponse) -> Result<String, ServiceError> {
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or(ServiceError::EmptyReplyError)
}
