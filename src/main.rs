/// Content Studio
///
/// Session state for a social-media content preparation tool: uploaded
/// images, watermark templates, publish tasks and AI drafting helpers,
/// served over HTTP.

mod ai;
mod api;
mod config;
mod context;
mod error;
mod images;
mod metrics;
mod platforms;
mod publish;
mod rate_limit;
mod server;

use config::{LoggingConfig, ServerConfig};
use context::AppContext;
use error::StudioResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> StudioResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    init_tracing(&config.logging);

    // Print banner
    print_banner();

    // Create application context
    let ctx = AppContext::new(config)?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
   ______            __             __     _____ __            ___
  / ____/___  ____  / /____  ____  / /_   / ___// /___  ______/ (_)___
 / /   / __ \/ __ \/ __/ _ \/ __ \/ __/   \__ \/ __/ / / / __  / / __ \
/ /___/ /_/ / / / / /_/  __/ / / / /_    ___/ / /_/ /_/ / /_/ / / /_/ /
\____/\____/_/ /_/\__/\___/_/ /_/\__/   /____/\__/\__,_/\__,_/_/\____/

        Content Studio v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
