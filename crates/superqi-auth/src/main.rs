use std::sync::Arc;

use anyhow::Context;
use superqi_auth::provider::HttpProviderClient;
use superqi_auth::provider::signer::RsaSha256Signer;
use superqi_auth::{AppConfig, AppState};
use superqi_credential::Sealer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let signer = RsaSha256Signer::from_encoded(
        &config.provider.private_key,
        config.provider.key_version,
    )
    .context("failed to load PROVIDER_PRIVATE_KEY")?;
    let provider = HttpProviderClient::new(&config.provider, Arc::new(signer))
        .context("failed to build provider HTTP client")?;
    info!(
        base_url = %config.provider.base_url,
        client_id = %config.provider.client_id,
        key_version = config.provider.key_version,
        "identity provider configured"
    );

    let sealer = Sealer::new(config.credential_key.clone(), config.credential_ttl);
    info!(
        ttl_secs = config.credential_ttl.num_seconds(),
        "credential sealer configured"
    );

    let state = Arc::new(AppState::new(provider, sealer));
    let app = superqi_auth::router(state);

    let addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(address = %addr, "auth service listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
