use std::sync::{Arc, Mutex};

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::{
    context_config::ContextConfig,
    context_formatter::format_for_prompt,
    types::{context::MapContext, dto::chat::ChatReply, osm::Layer},
};

pub const API_KEY_VAR: &str = "SLO_VIEW_GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PREAMBLE: &str =
    "You are a helpful assistant for a map application showing San Luis Obispo County, California.";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl GeminiSettings {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_VAR).ok().filter(|key| !key.is_empty()),
            model: std::env::var("SLO_VIEW_GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Ready-to-use handle on one generative model
struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

enum ServiceState {
    Uninitialized,
    Ready(Arc<GeminiModel>),
}

/// Chat model client. Nothing is checked or built until the first message.
pub struct GeminiService {
    settings: GeminiSettings,
    state: Mutex<ServiceState>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiService {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(ServiceState::Uninitialized),
        }
    }

    fn model(&self) -> Result<Arc<GeminiModel>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| eyre!("Gemini service state is poisoned"))?;
        if let ServiceState::Ready(model) = &*state {
            return Ok(model.clone());
        }

        let api_key = self
            .settings
            .api_key
            .clone()
            .ok_or(eyre!("{API_KEY_VAR} is not defined"))?;
        let model = Arc::new(GeminiModel {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                self.settings.base_url, self.settings.model
            ),
            api_key,
        });
        info!("Initialised gemini model {}", self.settings.model);
        *state = ServiceState::Ready(model.clone());
        Ok(model)
    }

    /// Send a user message, with whatever the map is showing as context.
    /// Failures are reported in the reply rather than returned.
    #[instrument(skip(self, map_context, config))]
    pub async fn send_message(
        &self,
        message: &str,
        map_context: Option<&MapContext>,
        config: &ContextConfig,
    ) -> ChatReply {
        let prompt = build_prompt(message, map_context, config);
        match self.generate(&prompt).await {
            Ok(text) => ChatReply::ok(text),
            Err(err) => {
                error!("Error calling Gemini API: {err}");
                ChatReply::failed(err.to_string())
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let model = self.model()?;
        let body = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };
        let response = model
            .client
            .post(&model.endpoint)
            .header("x-goog-api-key", &model.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiError>()
                .await
                .map(|err| err.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(eyre!("Gemini API returned {status}: {message}"));
        }

        response_text(response.json::<GenerateResponse>().await?)
    }
}

fn response_text(response: GenerateResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(eyre!("No candidates in Gemini response"))?;
    Ok(candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}

/// System preamble, map context block and question, as one prompt
pub fn build_prompt(message: &str, map_context: Option<&MapContext>, config: &ContextConfig) -> String {
    match map_context {
        Some(context) if context.selected_layer != Layer::None => {
            let context_block = format_for_prompt(context, config);
            format!(
                "{PREAMBLE} The user is asking about the map data they have loaded.{context_block}\n\n\
                 User Question: {message}\n\n\
                 Please provide a helpful response based on the map data context provided above."
            )
        }
        _ => format!(
            "{PREAMBLE} The user is asking about the map. Please provide a helpful response.\n\n\
             User Question: {message}"
        ),
    }
}
