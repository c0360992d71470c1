use crate::config::{
    get_group_ledger_max_size, get_group_ledger_ttl, get_telegram_http_timeout_secs, BotSettings,
};
use crate::gateway::TelegramGateway;
use crate::ledger::GroupErrorLedger;
use crate::orchestrator::ResponseOrchestrator;
use crate::webhook::{webhook_router, WebhookState};
use anyhow::Context;
use cheatsheet_core::inference::template::{
    validate_completion_template, validate_recognition_template,
};
use cheatsheet_core::inference::{FoundationModelsClient, VisionOcrClient};
use cheatsheet_core::storage::{build_template_store, TemplateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Run the webhook server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the template store, inference clients or templates are
/// unusable, or if the listener cannot be bound.
pub async fn run_webhook(settings: Arc<BotSettings>) -> anyhow::Result<()> {
    let state = match settings.telegram.token() {
        Some(token) => WebhookState::new(Arc::new(init_orchestrator(&settings, token).await?)),
        None => {
            warn!("TELEGRAM_BOT_TOKEN is not set, updates will be acknowledged and ignored");
            WebhookState::unconfigured()
        }
    };

    let path = settings.telegram.normalized_webhook_path();
    let app = webhook_router(state, &path);

    let listener = TcpListener::bind(&settings.telegram.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.telegram.listen_addr))?;
    info!(
        "Webhook listening on http://{}{}",
        settings.telegram.listen_addr, path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Webhook server stopped");
    Ok(())
}

async fn init_orchestrator(
    settings: &BotSettings,
    token: &str,
) -> anyhow::Result<ResponseOrchestrator> {
    let store = build_template_store(settings.inference.as_ref()).await?;
    if let Err(e) = store.check_connection().await {
        error!("Template storage connection check failed: {}", e);
    }

    let completion = FoundationModelsClient::new(settings.inference.as_ref(), store.clone())?;
    let recognition = VisionOcrClient::new(settings.inference.as_ref(), store.clone())?;
    preflight_templates(store.as_ref(), completion.template_key(), recognition.template_key())
        .await?;
    info!("Inference clients initialized.");

    let timeout = get_telegram_http_timeout_secs();
    let gateway = TelegramGateway::new(token, Duration::from_secs(timeout))?;

    Ok(ResponseOrchestrator::new(
        Arc::new(gateway),
        Arc::new(completion),
        Arc::new(recognition),
        init_group_ledger(),
    )
    .with_typing_indicator(settings.telegram.typing_indicator))
}

/// Load both request templates once so a broken deployment fails at startup
/// instead of on the first user message.
async fn preflight_templates(
    store: &dyn TemplateStore,
    completion_key: &str,
    recognition_key: &str,
) -> anyhow::Result<()> {
    let completion = store
        .load_template(completion_key)
        .await
        .with_context(|| format!("completion template `{completion_key}`"))?;
    validate_completion_template(&completion)
        .with_context(|| format!("completion template `{completion_key}`"))?;

    let recognition = store
        .load_template(recognition_key)
        .await
        .with_context(|| format!("recognition template `{recognition_key}`"))?;
    validate_recognition_template(&recognition)
        .with_context(|| format!("recognition template `{recognition_key}`"))?;

    info!("Request templates loaded and validated.");
    Ok(())
}

fn init_group_ledger() -> GroupErrorLedger {
    let ttl = get_group_ledger_ttl();
    let max_size = get_group_ledger_max_size();

    info!(
        "Initializing GroupErrorLedger (ttl: {}s, max_size: {})",
        ttl, max_size
    );

    GroupErrorLedger::new(ttl, max_size)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheatsheet_core::storage::StorageError;
    use mockall::mock;
    use serde_json::{json, Value};

    mock! {
        TemplateStore {}

        #[async_trait::async_trait]
        impl TemplateStore for TemplateStore {
            async fn load_template(&self, key: &str) -> Result<Value, StorageError>;
            async fn check_connection(&self) -> Result<(), String>;
        }
    }

    fn store_with(completion: Value, recognition: Value) -> MockTemplateStore {
        let mut store = MockTemplateStore::new();
        store
            .expect_load_template()
            .withf(|key| key == "gpt.json")
            .returning(move |_| Ok(completion.clone()));
        store
            .expect_load_template()
            .withf(|key| key == "ocr.json")
            .returning(move |_| Ok(recognition.clone()));
        store
    }

    #[tokio::test]
    async fn test_preflight_accepts_valid_templates() {
        let store = store_with(
            json!({"messages": [{"role": "system", "text": "hi"}, {"role": "user"}]}),
            json!({"mimeType": "JPEG"}),
        );

        assert!(preflight_templates(&store, "gpt.json", "ocr.json").await.is_ok());
    }

    #[tokio::test]
    async fn test_preflight_rejects_short_messages() {
        let store = store_with(
            json!({"messages": [{"role": "system"}]}),
            json!({"mimeType": "JPEG"}),
        );

        let err = preflight_templates(&store, "gpt.json", "ocr.json")
            .await
            .expect_err("template without a user message must fail");
        assert!(err.to_string().contains("gpt.json"));
    }

    #[tokio::test]
    async fn test_preflight_reports_missing_template() {
        let mut store = MockTemplateStore::new();
        store
            .expect_load_template()
            .returning(|key| Err(StorageError::NotFound(key.to_string())));

        let err = preflight_templates(&store, "gpt.json", "ocr.json")
            .await
            .expect_err("missing template must fail");
        assert!(err.to_string().contains("completion template"));
    }
}
