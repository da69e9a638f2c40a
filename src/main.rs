use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedcache::app::AppContext;
use feedcache::cli::{commands, Cli, Commands};
use feedcache::config::Config;
use feedcache::domain::Rule;
use feedcache::watch::{WatchConfig, Watcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let mut config = Config::load(cli.config.as_deref())?.with_process_env()?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(workers) = cli.workers {
        config.fetcher.workers = workers;
    }

    match cli.command {
        Commands::Fetch {
            rule,
            feed,
            remote,
            force,
            decode,
        } => {
            if force {
                config.fetcher.no_head = true;
            }
            let mut rule = Rule::load(&rule)?;
            rule.remote = remote;

            let ctx = AppContext::new(config)?;
            let summary = commands::fetch_feeds(&ctx, &rule, feed.as_deref(), decode).await?;
            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Get {
            url,
            feed,
            force,
            decode,
        } => {
            if force {
                config.fetcher.no_head = true;
            }
            let rule = Rule::single(&feed, &url);

            let ctx = AppContext::new(config)?;
            let summary = commands::fetch_feeds(&ctx, &rule, Some(&feed), decode).await?;
            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Status { rule, feed, json } => {
            let rule = Rule::load(&rule)?;
            let ctx = AppContext::new(config)?;
            commands::show_status(&ctx, &rule, feed.as_deref(), json)?;
        }
        Commands::Watch {
            rule,
            interval,
            no_initial_update,
        } => {
            let interval_secs =
                WatchConfig::parse_interval(&interval).map_err(|e| anyhow::anyhow!(e))?;
            let rule = Rule::load(&rule)?;

            let ctx = Arc::new(AppContext::new(config)?);
            let watch_config = WatchConfig {
                interval_secs,
                update_on_start: !no_initial_update,
            };
            Watcher::new(ctx, rule, watch_config).run().await?;
        }
    }

    Ok(())
}
