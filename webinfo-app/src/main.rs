use anyhow::{Context, Result};
use clap::Parser;
use webinfo_common::observability::init_logging;
use webinfo_config::WebinfoConfigLoader;
use webinfo_app::tether::{build_from_config, log_config};

/// Fetch a web page and print a JSON description of it on one line.
#[derive(Parser, Debug)]
#[command(name = "webinfo", version, about)]
struct Cli {
    /// Page to fetch (http or https).
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    color_eyre::install().map_err(|e| anyhow::anyhow!("color-eyre setup failed: {e}"))?;
    // A missing .env is fine; the key may already be exported.
    dotenv::dotenv().ok();

    // 1) Load config (env wins)
    let cfg = WebinfoConfigLoader::from_env()
        .load()
        .context("failed to load configuration")?;

    let log_path = init_logging(log_config(&cfg.log)?)?;
    tracing::info!(url = %cli.url, log = %log_path.display(), "webinfo.start");

    let pipeline = build_from_config(&cfg)?;
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    pipeline
        .run(&cli.url, &mut stdout, &mut stderr)
        .await
        .with_context(|| format!("failed to describe {}", cli.url))?;

    Ok(())
}
