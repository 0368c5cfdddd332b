//! pipegen-ctl
//!
//! Expands the pipeline templates under a root folder into one merged
//! pipeline document.

mod cli_config;
mod generate;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pipegen-ctl", version, about, styles = output::clap_styles())]
pub(crate) struct Cli {
    /// Path to an output file for the generated pipeline
    #[arg(long, env = "PIPEGEN_OUTPUT")]
    pub output: Option<String>,

    /// Generate a group containing all resources and jobs
    #[arg(long)]
    pub worldgroup: bool,

    /// Name of the group that contains all jobs and resources
    #[arg(long = "worldgroup-name")]
    pub worldgroup_name: Option<String>,

    /// Verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Name of the pipeline to generate (default pipeline when omitted)
    #[arg(long, env = "PIPEGEN_PIPELINE")]
    pub pipeline: Option<String>,

    /// Folder containing jobs, resources, resource_types, groups and partials
    #[arg(long)]
    pub root: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("pipegen_core={level}").parse()?)
                .add_directive(format!("pipegen_ctl={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli_config::load_cli_config();
    let settings = generate::GenerateSettings::resolve(&cli, config);

    if let Err(e) = generate::run(&settings).await {
        output::error(format!("Failed to build pipeline: {e}"));
        std::process::exit(1);
    }

    Ok(())
}
