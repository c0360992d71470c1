//! Configuration and settings management
//!
//! Loads inference and storage settings from config files and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Default completion endpoint of the foundation-models API
pub const DEFAULT_COMPLETION_URL: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";
/// Default text recognition endpoint of the OCR API
pub const DEFAULT_RECOGNITION_URL: &str = "https://ocr.api.cloud.yandex.net/ocr/v1/recognizeText";
/// Default completion model name, combined with the folder id into the model URI
pub const DEFAULT_COMPLETION_MODEL: &str = "yandexgpt";
/// Directory where the function runtime mounts object storage buckets
pub const DEFAULT_STORAGE_MOUNT_PATH: &str = "/function/storage";

/// Timeout (seconds) for a single inference HTTP call.
pub const INFERENCE_HTTP_TIMEOUT_SECS: u64 = 30;
/// Time-to-live (seconds) for cached request templates.
pub const TEMPLATE_CACHE_TTL_SECS: u64 = 600;

/// Build the layered configuration shared by every settings struct.
///
/// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__`-prefixed environment, plain environment.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case, empty vars count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Inference and template storage settings
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct InferenceSettings {
    /// Service account API key sent as `Authorization: Api-Key ...`
    pub sa_api_key: Option<String>,
    /// Cloud folder id, sent as `x-folder-id` and used in the model URI
    pub folder_id: Option<String>,

    /// Bucket holding the request templates
    pub bucket_name: Option<String>,
    /// Object key of the completion request template
    pub gpt_instruction_key: Option<String>,
    /// Object key of the recognition request template
    pub ocr_instruction_key: Option<String>,

    /// Filesystem mount point of the storage buckets
    #[serde(default = "default_storage_mount_path")]
    pub storage_mount_path: String,
    /// S3-compatible endpoint; when set, templates are read over the API instead of the mount
    pub storage_endpoint_url: Option<String>,
    /// Object storage access key ID
    pub storage_access_key_id: Option<String>,
    /// Object storage secret access key
    pub storage_secret_access_key: Option<String>,
    /// Object storage region
    #[serde(default = "default_storage_region")]
    pub storage_region: String,

    /// Completion endpoint URL
    #[serde(default = "default_completion_url")]
    pub completion_url: String,
    /// Recognition endpoint URL
    #[serde(default = "default_recognition_url")]
    pub recognition_url: String,
    /// Completion model name
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
}

fn default_storage_mount_path() -> String {
    DEFAULT_STORAGE_MOUNT_PATH.to_string()
}

fn default_storage_region() -> String {
    "ru-central1".to_string()
}

fn default_completion_url() -> String {
    DEFAULT_COMPLETION_URL.to_string()
}

fn default_recognition_url() -> String {
    DEFAULT_RECOGNITION_URL.to_string()
}

fn default_completion_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

/// API key and folder id pair attached to every inference request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceCredentials {
    /// Service account API key
    pub api_key: String,
    /// Cloud folder id
    pub folder_id: String,
}

impl InferenceSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;
        // Keep the region usable even if a source set it to an empty string
        if settings.storage_region.trim().is_empty() {
            settings.storage_region = default_storage_region();
        }
        Ok(settings)
    }

    /// Returns the credentials attached to inference requests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` naming the first missing variable.
    pub fn inference_credentials(&self) -> Result<InferenceCredentials, ConfigError> {
        let api_key = non_empty(self.sa_api_key.as_deref())
            .ok_or_else(|| ConfigError::NotFound("SA_API_KEY".into()))?;
        let folder_id = non_empty(self.folder_id.as_deref())
            .ok_or_else(|| ConfigError::NotFound("FOLDER_ID".into()))?;

        Ok(InferenceCredentials {
            api_key: api_key.to_string(),
            folder_id: folder_id.to_string(),
        })
    }

    /// Model URI for the completion request, `gpt://{folder}/{model}`
    #[must_use]
    pub fn model_uri(&self, folder_id: &str) -> String {
        format!("gpt://{folder_id}/{}", self.completion_model)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Get inference HTTP timeout from env or default.
///
/// Environment variable: `INFERENCE_HTTP_TIMEOUT_SECS`.
#[must_use]
pub fn get_inference_http_timeout_secs() -> u64 {
    std::env::var("INFERENCE_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(INFERENCE_HTTP_TIMEOUT_SECS)
}
