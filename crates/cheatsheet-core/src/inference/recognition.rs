use super::http_utils::{auth_headers, create_http_client, extract_text_content, send_json_request};
use super::template::apply_recognition_template;
use super::{InferenceError, RecognitionProvider};
use crate::config::{InferenceCredentials, InferenceSettings};
use crate::storage::TemplateStore;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client as HttpClient;
use std::sync::Arc;
use tracing::{debug, instrument};

const FULL_TEXT_PATH: &[&str] = &["result", "textAnnotation", "fullText"];

/// Text recognition client for the OCR API
pub struct VisionOcrClient {
    http: HttpClient,
    store: Arc<dyn TemplateStore>,
    template_key: String,
    url: String,
    credentials: InferenceCredentials,
}

impl VisionOcrClient {
    /// Create a recognition client from settings.
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

    /// Create a recognition client with a preconfigured HTTP client.
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
            .ocr_instruction_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| InferenceError::MissingConfig("OCR_INSTRUCTION_KEY".into()))?;

        Ok(Self {
            http,
            store,
            template_key,
            url: settings.recognition_url.clone(),
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
impl RecognitionProvider for VisionOcrClient {
    #[instrument(skip_all, fields(image_size = image_bytes.len()))]
    async fn recognize(&self, image_bytes: &[u8]) -> Result<String, InferenceError> {
        let template = self.store.load_template(&self.template_key).await?;
        let content = general_purpose::STANDARD.encode(image_bytes);
        let body = apply_recognition_template(template, content)?;

        let response = send_json_request(
            &self.http,
            &self.url,
            &body,
            &auth_headers(&self.credentials),
        )
        .await?;

        let text = extract_text_content(&response, FULL_TEXT_PATH)?;
        debug!(text_len = text.len(), "Recognized text");
        Ok(text)
    }
}
