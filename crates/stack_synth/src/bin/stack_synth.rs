use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use stack_core::synth::synthesize;
use stack_synth::adapters::docker::DockerArtifactBuilder;
use stack_synth::cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings();
    let builder = DockerArtifactBuilder::default();

    let summary = synthesize(&settings, &builder, &cli.output)
        .with_context(|| format!("failed to synthesize stack '{}'", settings.stack_id()))?;

    let endpoint = serde_json::to_string(&summary.endpoint).context("failed to render endpoint")?;
    println!("Stack: {}", summary.stack_id);
    println!("Template: {}", summary.template_path.display());
    println!("Resources: {} ({} tagged)", summary.resource_count, summary.tagged_resources);
    println!("Outputs:\n  Endpoint = {endpoint}");
    Ok(())
}
