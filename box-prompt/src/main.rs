use anyhow::{Context, Result};
use box_prompt::config::Config;
use std::{env, path::PathBuf};
use structopt::StructOpt;
use tracing::info_span;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, StructOpt)]
/// Evaluate a segmentation model prompted by ground truth boxes
struct Args {
    #[structopt(long, default_value = "box-prompt.json5")]
    /// configuration file
    pub config_file: PathBuf,
    #[structopt(long)]
    /// experiment name, overriding the one in the configuration file
    pub exp_name: Option<String>,
}

pub fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let Args {
        config_file,
        exp_name,
    } = Args::from_args();
    let mut config = Config::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;
    if let Some(exp_name) = exp_name {
        config.exp_name = Some(exp_name);
    }

    // start evaluation
    let _span = info_span!("box-prompt").entered();
    box_prompt::start(&config)?;

    Ok(())
}
