use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tokio::net::TcpListener;

use chat_relay::adapters::ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
use chat_relay::adapters::http::{create_router, AppState};
use chat_relay::adapters::postgres::{
    create_pool, run_migrations, PostgresConversationRepository, PostgresSessionValidator,
};
use chat_relay::application::{StreamMessageHandler, StreamingHandlerConfig};
use chat_relay::config::{AiConfig, AiProvider, AppConfig};
use chat_relay::ports::AIProvider as CompletionProvider;
use chat_relay::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    init_tracing(&config.server).context("failed to install tracing subscriber")?;

    let pool = create_pool(&config.database).await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let provider = completion_provider(&config.ai)?;
    let info = provider.provider_info();
    tracing::info!(provider = %info.name, model = %info.model, "Completion provider ready");

    let repository = Arc::new(PostgresConversationRepository::new(pool.clone()));
    let relay = StreamMessageHandler::with_config(
        repository.clone(),
        provider,
        StreamingHandlerConfig {
            model: Some(config.ai.model.clone()),
            title_model: Some(config.ai.title_model().to_string()),
            temperature: config.ai.temperature,
            max_tokens: config.ai.max_tokens,
            ..StreamingHandlerConfig::default()
        },
    );

    let state = AppState {
        relay,
        repository,
        session_validator: Arc::new(PostgresSessionValidator::new(pool.clone())),
        session_cookie_name: config.auth.session_cookie_name.clone(),
    };
    let router = create_router(state, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

fn completion_provider(config: &AiConfig) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    match config.provider {
        AiProvider::OpenAI => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OpenAI API key is not configured")?;
            let provider = OpenAIProvider::new(
                OpenAIConfig::new(api_key.expose_secret().clone())
                    .with_model(&config.model)
                    .with_base_url(&config.base_url)
                    .with_timeout(config.timeout())
                    .with_max_retries(config.max_retries),
            )?;
            Ok(Arc::new(provider))
        }
        AiProvider::Mock => {
            tracing::warn!("Using the mock completion provider");
            Ok(Arc::new(MockAIProvider::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
