use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use veighty_cli::args::CliArgs;
use veighty_cli::commands;
use veighty_config::{CheckerConfig, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let mut config = CheckerConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    init_tracing(&config.logging);
    debug!(config = %cli.config.display(), target = %config.target.address(), "configuration loaded");

    let code = commands::run(&cli.command, &config).await?;
    std::process::exit(code);
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);
    let _ = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
