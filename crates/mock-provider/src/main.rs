use clap::Parser;
use tracing::info;

/// Mock mini-app provider for local development.
#[derive(Parser, Debug)]
#[command(name = "mock-provider", about = "Mock mini-app provider open API")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 4000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "mock provider listening");
    axum::serve(listener, mock_provider::router()).await?;
    Ok(())
}
