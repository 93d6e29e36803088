use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing - safe to call multiple times
pub fn init_tracing(env: &str, service: &str) {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        // Structured JSON in production, human-readable everywhere else
        if env == "production" {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json())
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().pretty())
                .with(filter)
                .init();
        }

        tracing::info!(service = %service, env = %env, "Tracing initialized");
    });
}
