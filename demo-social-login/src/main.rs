use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_login::{
    HttpJsonFetcher, OAuthData, ReconcileConfig, Reconciler, TracingNotifier, store_from_env,
};

/// Reads the payload from the file named by the first argument, or from stdin.
async fn read_payload() -> Result<String, std::io::Error> {
    match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(path).await,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            Ok(raw)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,social_login=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ReconcileConfig::from_env();
    tracing::info!("Reconcile config: {:?}", config);

    let reconciler = Reconciler::new(
        store_from_env().await?,
        Arc::new(HttpJsonFetcher::new(config.avatar_fetch_timeout)?),
        Arc::new(TracingNotifier),
        config,
    );

    let data = OAuthData::from_payload(read_payload().await?)?;
    match reconciler.sign_in(data).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(e) => match e.validation() {
            Some(validation) => {
                eprintln!("Sign-in rejected: {validation}");
                std::process::exit(2);
            }
            None => Err(e.log().into()),
        },
    }
}
