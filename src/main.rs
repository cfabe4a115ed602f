use std::{env, path::PathBuf};

use anyhow::{Context, Result, bail};

use oneira::{config::Config, logging::init_tracing, server};

const USAGE: &str = "usage: oneira [--config <path>]";

fn config_path_from_args() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    let mut config_path = PathBuf::from("./oneira.jsonc");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .with_context(|| format!("missing value for --config. {USAGE}"))?;
                config_path = PathBuf::from(value);
            }
            other => bail!("unknown argument '{other}'. {USAGE}"),
        }
    }

    Ok(config_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let logging_guard = init_tracing(&config.logging)?;
    tracing::info!(
        target: "main",
        run_id = %logging_guard.run_id(),
        config = %config_path.display(),
        "oneira_starting"
    );

    server::run(config).await
}
