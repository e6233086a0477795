use prdsmith_cli::{config::Config, logging::init_tracing, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format)?;

    run_server(config).await
}
