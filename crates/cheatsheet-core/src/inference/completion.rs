use super::http_utils::{auth_headers, create_http_client, extract_text_content, send_json_request};
use super::template::apply_completion_template;
use super::{CompletionProvider, InferenceError};
use crate::config::{InferenceCredentials, InferenceSettings};
use crate::storage::TemplateStore;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use tracing::{debug, instrument};

const ANSWER_PATH: &[&str] = &["result", "alternatives", "0", "message", "text"];

/// Completion client for the foundation-models API
pub struct FoundationModelsClient {
    http: HttpClient,
    store: Arc<dyn TemplateStore>,
    template_key: String,
    url: String,
    model_uri: String,
    credentials: InferenceCredentials,
}

impl FoundationModelsClient {
    /// Create a completion client from settings.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::MissingConfig` if credentials or the template key are missing,
    /// or `InferenceError::NetworkError` if the HTTP client cannot be built.
    pub fn new(
        settings: &InferenceSettings,
        store: Arc<dyn TemplateStore>,
    ) -> Result<Self, InferenceError> {
        Self::with_http_client(settings, store, create_http_client()?)
    }

    /// Create a completion client with a preconfigured HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::MissingConfig` if credentials or the template key are missing.
    pub fn with_http_client(
        settings: &InferenceSettings,
        store: Arc<dyn TemplateStore>,
        http: HttpClient,
    ) -> Result<Self, InferenceError> {
        let credentials = settings
            .inference_credentials()
            .map_err(|e| InferenceError::MissingConfig(e.to_string()))?;
        let template_key = settings
            .gpt_instruction_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| InferenceError::MissingConfig("GPT_INSTRUCTION_KEY".into()))?;

        Ok(Self {
            http,
            store,
            template_key,
            url: settings.completion_url.clone(),
            model_uri: settings.model_uri(&credentials.folder_id),
            credentials,
        })
    }

    /// Object key of the template this client uses
    #[must_use]
    pub fn template_key(&self) -> &str {
        &self.template_key
    }
}

#[async_trait]
impl CompletionProvider for FoundationModelsClient {
    #[instrument(skip_all, fields(question_len = question.len()))]
    async fn complete(&self, question: &str) -> Result<String, InferenceError> {
        let template = self.store.load_template(&self.template_key).await?;
        let body = apply_completion_template(template, &self.model_uri, question)?;

        let response = send_json_request(
            &self.http,
            &self.url,
            &body,
            &auth_headers(&self.credentials),
        )
        .await?;

        let answer = extract_text_content(&response, ANSWER_PATH)?;
        debug!(answer_len = answer.len(), "Completion received");
        Ok(answer)
    }
}
